//! The marker file recording the basis of the last successful build.
//!
//! One plain-text file inside the definition directory, holding a single
//! decimal integer string. It is rewritten only after a fully successful
//! build; a failed run leaves whatever was there before.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::MARK_FILE_NAME;
use crate::freshness::Mark;

/// Path of the marker file inside a definition directory.
pub fn marker_path(definition_dir: &Path) -> PathBuf {
  definition_dir.join(MARK_FILE_NAME)
}

/// Read the recorded mark, `None` when the marker file does not exist.
///
/// The content is trimmed but otherwise taken verbatim; legacy markers with
/// unpadded digits still compare ordinally as they always did.
pub fn read_mark(definition_dir: &Path) -> io::Result<Option<Mark>> {
  let path = marker_path(definition_dir);
  match fs::read_to_string(&path) {
    Ok(content) => {
      let mark = Mark(content.trim().to_string());
      debug!(path = %path.display(), mark = %mark, "read marker");
      Ok(Some(mark))
    }
    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(err) => Err(err),
  }
}

/// Persist the mark for the next invocation to compare against.
pub fn write_mark(definition_dir: &Path, mark: &Mark) -> io::Result<()> {
  let path = marker_path(definition_dir);
  fs::write(&path, &mark.0)?;
  debug!(path = %path.display(), mark = %mark, "wrote marker");
  Ok(())
}
