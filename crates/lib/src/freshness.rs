//! Timestamp marks and the staleness decision.
//!
//! The decision here is the only real logic in the tool: given the reference
//! library's modification time, the latest source modification time, and the
//! mark recorded by the previous successful build, decide whether the
//! expensive regenerate-and-compile path can be skipped.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::consts::MARK_WIDTH;

/// A string-encoded count of 100-nanosecond ticks since the Unix epoch.
///
/// Marks compare ordinally on their string encoding. Marks produced by
/// [`Mark::from_system_time`] are zero-padded to a fixed width so that
/// ordinal and numeric order coincide; marks read back from a marker file
/// keep whatever encoding they were written with.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Mark(pub String);

impl Mark {
  /// Encode a filesystem timestamp as a mark.
  ///
  /// Times before the epoch collapse to tick zero; no filesystem this tool
  /// targets produces them for files that exist.
  pub fn from_system_time(time: SystemTime) -> Self {
    let ticks = time
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_nanos() / 100)
      .unwrap_or(0);
    Mark(format!("{:0width$}", ticks, width = MARK_WIDTH))
  }
}

impl fmt::Display for Mark {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Whether the previous build outputs are still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
  /// Outputs are valid; skip regeneration entirely.
  Current,
  /// Outputs must be regenerated and recompiled.
  Stale,
}

/// Outcome of the staleness decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
  pub freshness: Freshness,

  /// The value a successful rebuild persists as the next recorded mark:
  /// the latest source time, or the reference library's own time when the
  /// library was rebuilt more recently than the last record.
  pub basis: Mark,
}

impl Decision {
  pub fn is_current(&self) -> bool {
    self.freshness == Freshness::Current
  }
}

/// Decide whether the build is up to date.
///
/// `library_time` is the modification time of the compiled library the stubs
/// are built against. It belongs to another build step; this tool only ever
/// reads it, which is what lets a freshly written mark stay current on the
/// following run.
///
/// Two predicates, evaluated in order:
///
/// 1. If the recorded mark compares (ordinally) less than the library time,
///    the library was rebuilt by its own build more recently than the last
///    record; the library's time becomes the basis for the rest of the
///    decision.
/// 2. The build is current when the recorded mark equals the basis exactly,
///    or when it equals the library time while not being older than the
///    basis.
///
/// An absent recorded mark means "never built"; an absent library time means
/// the reference library is missing. Both force a rebuild with the source
/// time as basis.
pub fn decide(library_time: Option<&Mark>, source_latest: &Mark, recorded_mark: Option<&Mark>) -> Decision {
  let stale = |basis: &Mark| Decision {
    freshness: Freshness::Stale,
    basis: basis.clone(),
  };

  let Some(recorded) = recorded_mark else {
    return stale(source_latest);
  };
  let Some(library) = library_time else {
    return stale(source_latest);
  };

  let basis = if recorded < library { library } else { source_latest };

  let up_to_date = recorded == basis || (recorded == library && recorded > basis);

  Decision {
    freshness: if up_to_date { Freshness::Current } else { Freshness::Stale },
    basis: basis.clone(),
  }
}
