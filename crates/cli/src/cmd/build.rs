//! Implementation of the `stubgen build` command.
//!
//! Evaluates the staleness decision for the given definition directory and,
//! when stale, runs the external generator per definition file and the
//! compiler once over everything generated, then records the new mark.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use stubgen_lib::build::{BuildOutcome, BuildRequest, build};
use stubgen_lib::tools::ProcessRunner;

use crate::output::{self, format_duration};

pub fn cmd_build(
  generator: PathBuf,
  library: PathBuf,
  definition_dir: PathBuf,
  artifact_name: String,
  metadata_source: Option<PathBuf>,
) -> Result<()> {
  let generator = dunce::canonicalize(&generator)
    .with_context(|| format!("Generator not found: {}", generator.display()))?;
  let definition_dir = dunce::canonicalize(&definition_dir)
    .with_context(|| format!("Definition directory not found: {}", definition_dir.display()))?;

  let request = BuildRequest {
    generator,
    library,
    definition_dir,
    artifact_name,
    metadata_source,
  };

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt.block_on(build(&request, &ProcessRunner)).context("Build failed")?;

  match outcome {
    BuildOutcome::UpToDate { artifact } => {
      output::print_success(&format!("Stubs are up to date: {}", artifact.display()));
    }
    BuildOutcome::Rebuilt {
      artifact,
      definitions,
      sources,
      mark,
    } => {
      output::print_success(&format!("Built {}", artifact.display()));
      output::print_stat("Definitions", &definitions.to_string());
      output::print_stat("Generated sources", &sources.to_string());
      output::print_stat("Recorded mark", &mark.to_string());
      output::print_stat("Elapsed", &format_duration(started.elapsed()));

      info!(artifact = %artifact.display(), "artifact written");
    }
  }

  Ok(())
}
