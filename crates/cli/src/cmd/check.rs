//! Implementation of the `stubgen check` command.
//!
//! Evaluates the staleness decision and prints it without touching the
//! generated sources, the artifact, or the marker file.

use std::path::PathBuf;

use anyhow::{Context, Result};

use stubgen_lib::build::check;

use crate::output::{self, OutputFormat};

pub fn cmd_check(
  library: PathBuf,
  definition_dir: PathBuf,
  artifact_name: String,
  format: OutputFormat,
) -> Result<()> {
  let definition_dir = dunce::canonicalize(&definition_dir)
    .with_context(|| format!("Definition directory not found: {}", definition_dir.display()))?;

  let report = check(&library, &definition_dir, &artifact_name).context("Check failed")?;

  if format.is_json() {
    return output::print_json(&report);
  }

  if report.is_current() {
    output::print_success("Stubs are current");
  } else {
    output::print_warning("Stubs are stale; a build is required");
  }

  output::print_stat("Definitions", &report.definitions.to_string());
  output::print_stat("Source latest", &report.source_latest.to_string());
  output::print_stat(
    "Library time",
    &report.library_time.as_ref().map_or("absent".to_string(), |m| m.to_string()),
  );
  output::print_stat(
    "Recorded mark",
    &report.recorded_mark.as_ref().map_or("absent".to_string(), |m| m.to_string()),
  );
  output::print_stat("Basis", &report.basis.to_string());
  output::print_stat("Artifact", &report.artifact.display().to_string());

  Ok(())
}
