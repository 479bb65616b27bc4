//! Definition-file discovery and generated-source collection.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::consts::DEF_EXTENSION;
use crate::freshness::Mark;

/// Result of scanning a definition directory.
#[derive(Debug, Clone)]
pub struct SourceScan {
  /// Definition files found at the top level of the directory, sorted.
  pub definitions: Vec<PathBuf>,

  /// Most recent modification time among the definition files and the
  /// directory itself. The directory's own time is what makes a removed
  /// definition visible; the surviving files' times do not change.
  pub source_latest: Mark,
}

/// Scan a definition directory for `*.idl` inputs.
///
/// Only the top level is enumerated; subdirectories are not searched for
/// definitions. The marker file is never enumerated as a definition because
/// it does not carry the definition extension.
pub fn scan_definitions(dir: &Path) -> io::Result<SourceScan> {
  let mut latest = Mark::from_system_time(fs::metadata(dir)?.modified()?);
  let mut definitions = Vec::new();

  for entry in fs::read_dir(dir)? {
    let entry = entry?;
    if !entry.file_type()?.is_file() {
      continue;
    }

    let path = entry.path();
    let is_definition = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| ext.eq_ignore_ascii_case(DEF_EXTENSION));
    if !is_definition {
      continue;
    }

    let modified = Mark::from_system_time(entry.metadata()?.modified()?);
    if modified > latest {
      latest = modified;
    }
    definitions.push(path);
  }

  definitions.sort();

  debug!(
    dir = %dir.display(),
    count = definitions.len(),
    source_latest = %latest,
    "scanned definition directory"
  );

  Ok(SourceScan {
    definitions,
    source_latest: latest,
  })
}

/// Collect every generated source file under `dir`, recursively, sorted.
///
/// A missing directory yields an empty set; the generator may legitimately
/// produce nothing for an empty definition directory.
pub fn collect_generated(dir: &Path) -> io::Result<Vec<PathBuf>> {
  if !dir.exists() {
    return Ok(Vec::new());
  }

  let mut sources = Vec::new();
  for entry in WalkDir::new(dir).sort_by_file_name() {
    let entry = entry.map_err(io::Error::other)?;
    if entry.file_type().is_file() {
      sources.push(entry.into_path());
    }
  }

  Ok(sources)
}

/// Read a file's modification time as a mark, `None` when it does not exist.
pub fn file_mark(path: &Path) -> io::Result<Option<Mark>> {
  match fs::metadata(path) {
    Ok(metadata) => Ok(Some(Mark::from_system_time(metadata.modified()?))),
    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(err) => Err(err),
  }
}
