//! Orchestration of the regenerate-and-compile path.
//!
//! The flow per invocation: scan the definition directory, read the marker,
//! ask the staleness decision whether anything needs to happen, and if so run
//! the generator once per definition, the compiler once over everything it
//! produced, and persist the new mark only after both succeed.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::consts::GENERATED_DIR_SUFFIX;
use crate::freshness::{Decision, Freshness, Mark, decide};
use crate::marker::{read_mark, write_mark};
use crate::scan::{collect_generated, file_mark, scan_definitions};
use crate::tools::{ToolRunner, compiler_invocation, generator_invocation};

/// Inputs of one build invocation.
#[derive(Debug, Clone)]
pub struct BuildRequest {
  /// Path to the external generator executable.
  pub generator: PathBuf,

  /// Path to the compiled library the generated stubs are built against.
  /// Its parent directory is also where the artifact is written.
  pub library: PathBuf,

  /// Directory holding the interface-definition inputs and the marker file.
  pub definition_dir: PathBuf,

  /// File name of the artifact to produce next to the library.
  pub artifact_name: String,

  /// Optional metadata source compiled in alongside the generated sources.
  pub metadata_source: Option<PathBuf>,
}

impl BuildRequest {
  /// Directory the artifact and generated sources are written into.
  ///
  /// A bare library file name has no directory component; that means the
  /// current directory, not a missing one.
  pub fn output_dir(&self) -> &Path {
    match self.library.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    }
  }

  /// Full path of the artifact this build produces.
  pub fn artifact_path(&self) -> PathBuf {
    self.output_dir().join(&self.artifact_name)
  }

  /// Intermediate directory the generator writes stubs into.
  pub fn generated_dir(&self) -> PathBuf {
    let stem = Path::new(&self.artifact_name)
      .file_stem()
      .and_then(|stem| stem.to_str())
      .unwrap_or(self.artifact_name.as_str());
    self.output_dir().join(format!("{stem}{GENERATED_DIR_SUFFIX}"))
  }
}

/// Errors that can occur while building.
#[derive(Debug, Error)]
pub enum BuildError {
  /// The directory the artifact would be written into does not exist.
  #[error("output directory does not exist: {0}")]
  MissingOutputDir(PathBuf),

  /// The generator exited non-zero for one definition file.
  #[error("generator failed for {input} with exit code {code:?}")]
  GeneratorFailed { input: PathBuf, code: Option<i32> },

  /// The single compiler invocation failed.
  #[error("compiler failed with exit code {code:?}")]
  CompilerFailed { code: Option<i32> },

  /// I/O error while scanning, cleaning, or persisting.
  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

/// What one invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
  /// Outputs were already current; nothing was touched.
  UpToDate { artifact: PathBuf },

  /// The full path ran and the marker was rewritten.
  Rebuilt {
    artifact: PathBuf,
    definitions: usize,
    sources: usize,
    mark: Mark,
  },
}

impl BuildOutcome {
  pub fn artifact(&self) -> &Path {
    match self {
      BuildOutcome::UpToDate { artifact } => artifact,
      BuildOutcome::Rebuilt { artifact, .. } => artifact,
    }
  }

  pub fn was_skipped(&self) -> bool {
    matches!(self, BuildOutcome::UpToDate { .. })
  }
}

/// Read-only staleness evaluation of a build request.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
  pub freshness: Freshness,
  pub basis: Mark,
  pub source_latest: Mark,
  pub library_time: Option<Mark>,
  pub recorded_mark: Option<Mark>,
  pub definitions: usize,
  pub artifact: PathBuf,
  pub artifact_exists: bool,
}

impl CheckReport {
  pub fn is_current(&self) -> bool {
    self.freshness == Freshness::Current && self.artifact_exists
  }
}

/// Evaluate the staleness decision without side effects.
///
/// Takes the paths directly rather than a [`BuildRequest`] because checking
/// never touches the generator.
pub fn check(library: &Path, definition_dir: &Path, artifact_name: &str) -> Result<CheckReport, BuildError> {
  let scan = scan_definitions(definition_dir)?;
  let library_time = file_mark(library)?;
  let recorded = read_mark(definition_dir)?;
  let artifact = library.parent().unwrap_or(Path::new("")).join(artifact_name);
  let artifact_exists = artifact.exists();

  let decision = decide(library_time.as_ref(), &scan.source_latest, recorded.as_ref());

  Ok(CheckReport {
    freshness: decision.freshness,
    basis: decision.basis,
    source_latest: scan.source_latest,
    library_time,
    recorded_mark: recorded,
    definitions: scan.definitions.len(),
    artifact,
    artifact_exists,
  })
}

/// Run one build invocation.
///
/// On a current decision this returns immediately; on a stale one it runs the
/// full path and persists the new mark last, so a failed run never moves the
/// recorded state forward.
pub async fn build<R: ToolRunner>(request: &BuildRequest, runner: &R) -> Result<BuildOutcome, BuildError> {
  let output_dir = request.output_dir();
  if !output_dir.is_dir() {
    return Err(BuildError::MissingOutputDir(output_dir.to_path_buf()));
  }

  let scan = scan_definitions(&request.definition_dir)?;
  let library_time = file_mark(&request.library)?;
  let recorded = read_mark(&request.definition_dir)?;
  let artifact = request.artifact_path();

  let decision = decide(library_time.as_ref(), &scan.source_latest, recorded.as_ref());

  if decision.is_current() && artifact.exists() {
    info!(artifact = %artifact.display(), "stubs are up to date");
    return Ok(BuildOutcome::UpToDate { artifact });
  }

  let sources = regenerate(request, &scan.definitions, runner).await?;
  compile(request, &artifact, &sources, runner).await?;
  finish(request, &artifact, &decision)?;

  Ok(BuildOutcome::Rebuilt {
    artifact,
    definitions: scan.definitions.len(),
    sources: sources.len(),
    mark: decision.basis,
  })
}

/// Clear the previous generated tree and run the generator per definition.
async fn regenerate<R: ToolRunner>(
  request: &BuildRequest,
  definitions: &[PathBuf],
  runner: &R,
) -> Result<Vec<PathBuf>, BuildError> {
  let generated_dir = request.generated_dir();

  // Best effort: a leftover tree that cannot be removed is overwritten in
  // place by the generator.
  if generated_dir.exists()
    && let Err(err) = tokio::fs::remove_dir_all(&generated_dir).await
  {
    warn!(
      dir = %generated_dir.display(),
      error = %err,
      "could not remove stale generated sources, overwriting in place"
    );
  }
  tokio::fs::create_dir_all(&generated_dir).await?;

  for input in definitions {
    info!(input = %input.display(), "generating stubs");

    let invocation = generator_invocation(&request.generator, &generated_dir, input);
    let output = runner.run(&invocation).await?;
    if !output.success {
      return Err(BuildError::GeneratorFailed {
        input: input.clone(),
        code: output.code,
      });
    }
  }

  Ok(collect_generated(&generated_dir)?)
}

/// Run the single compiler invocation over everything generated.
async fn compile<R: ToolRunner>(
  request: &BuildRequest,
  artifact: &Path,
  sources: &[PathBuf],
  runner: &R,
) -> Result<(), BuildError> {
  info!(
    artifact = %artifact.display(),
    sources = sources.len(),
    "compiling generated sources"
  );

  let invocation = compiler_invocation(
    &request.library,
    artifact,
    sources,
    request.metadata_source.as_deref(),
  );
  let output = runner.run(&invocation).await?;
  if !output.success {
    return Err(BuildError::CompilerFailed { code: output.code });
  }

  Ok(())
}

fn finish(request: &BuildRequest, artifact: &Path, decision: &Decision) -> Result<(), BuildError> {
  write_mark(&request.definition_dir, &decision.basis)?;
  info!(artifact = %artifact.display(), mark = %decision.basis, "build complete");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::ffi::OsStr;
  use std::fs;
  use std::sync::Mutex;
  use tempfile::TempDir;

  use crate::consts::MARK_WIDTH;
  use crate::marker::marker_path;
  use crate::tools::{ToolInvocation, ToolOutput};

  type Handler = Box<dyn Fn(&ToolInvocation) -> io::Result<ToolOutput> + Send + Sync>;

  /// Records invocations and delegates behavior to a closure; no processes
  /// are spawned in these tests.
  struct FakeRunner {
    calls: Mutex<Vec<ToolInvocation>>,
    handler: Handler,
  }

  impl FakeRunner {
    fn new(handler: Handler) -> Self {
      Self {
        calls: Mutex::new(Vec::new()),
        handler,
      }
    }

    /// Behaves like working tools: the generator drops one stub per input
    /// into the out-dir, the compiler writes the artifact.
    fn working() -> Self {
      Self::new(Box::new(|invocation| {
        emulate_tool(invocation);
        Ok(ToolOutput {
          success: true,
          code: Some(0),
        })
      }))
    }

    fn calls(&self) -> Vec<ToolInvocation> {
      self.calls.lock().unwrap().clone()
    }
  }

  impl ToolRunner for FakeRunner {
    async fn run(&self, invocation: &ToolInvocation) -> io::Result<ToolOutput> {
      self.calls.lock().unwrap().push(invocation.clone());
      (self.handler)(invocation)
    }
  }

  fn is_generator(invocation: &ToolInvocation) -> bool {
    invocation.args.first().map(|arg| arg.as_os_str()) == Some(OsStr::new("--mode"))
  }

  /// Produce the side effects a real tool would: stub files for the
  /// generator, the artifact file for the compiler.
  fn emulate_tool(invocation: &ToolInvocation) {
    if is_generator(invocation) {
      let out_dir = PathBuf::from(&invocation.args[3]);
      let input = PathBuf::from(invocation.args.last().unwrap());
      let stem = input.file_stem().unwrap().to_str().unwrap();
      fs::write(out_dir.join(format!("{stem}.rs")), "// generated").unwrap();
    } else {
      let artifact = PathBuf::from(&invocation.args[3]);
      fs::write(artifact, "compiled").unwrap();
    }
  }

  /// A workspace with a reference library (created before the definitions so
  /// it is never newer than them) and two definition files.
  fn workspace() -> (TempDir, BuildRequest) {
    let temp = TempDir::new().unwrap();
    let lib_dir = temp.path().join("out");
    let def_dir = temp.path().join("defs");
    fs::create_dir(&lib_dir).unwrap();
    fs::create_dir(&def_dir).unwrap();
    fs::write(lib_dir.join("support.rlib"), "support").unwrap();
    fs::write(def_dir.join("a.idl"), "interface A").unwrap();
    fs::write(def_dir.join("b.idl"), "interface B").unwrap();

    let request = BuildRequest {
      generator: PathBuf::from("/opt/idlgen"),
      library: lib_dir.join("support.rlib"),
      definition_dir: def_dir,
      artifact_name: "widgets.rlib".to_string(),
      metadata_source: None,
    };
    (temp, request)
  }

  #[tokio::test]
  async fn first_run_rebuilds_and_writes_marker() {
    let (_temp, request) = workspace();
    let runner = FakeRunner::working();

    let outcome = build(&request, &runner).await.unwrap();

    let BuildOutcome::Rebuilt {
      definitions, sources, mark, ..
    } = outcome
    else {
      panic!("expected a rebuild on the first run");
    };
    assert_eq!(definitions, 2);
    assert_eq!(sources, 2);
    assert_eq!(mark.0.len(), MARK_WIDTH);

    assert!(request.artifact_path().exists());
    assert_eq!(read_mark(&request.definition_dir).unwrap(), Some(mark));
    // Two generator calls plus one compiler call.
    assert_eq!(runner.calls().len(), 3);
  }

  #[tokio::test]
  async fn repeated_runs_converge_to_up_to_date() {
    let (_temp, request) = workspace();
    let runner = FakeRunner::working();

    // Creating the marker file advances the definition directory's time, so
    // the run after the first may rebuild once more; the run after that must
    // skip without touching the tools.
    build(&request, &runner).await.unwrap();
    build(&request, &runner).await.unwrap();

    let calls_before = runner.calls().len();
    let outcome = build(&request, &runner).await.unwrap();

    assert!(outcome.was_skipped());
    assert_eq!(runner.calls().len(), calls_before);
  }

  #[tokio::test]
  async fn deleted_definition_triggers_rebuild() {
    let (_temp, request) = workspace();
    let runner = FakeRunner::working();

    build(&request, &runner).await.unwrap();
    build(&request, &runner).await.unwrap();
    fs::remove_file(request.definition_dir.join("b.idl")).unwrap();

    let outcome = build(&request, &runner).await.unwrap();

    // Removing a definition only shows up in the directory's own time; the
    // artifact must not keep stubs for the deleted input.
    let BuildOutcome::Rebuilt { definitions, .. } = outcome else {
      panic!("expected a rebuild after deleting a definition");
    };
    assert_eq!(definitions, 1);
  }

  #[tokio::test]
  async fn generator_failure_aborts_without_marker() {
    let (_temp, request) = workspace();
    // First input succeeds, second fails; earlier output stays on disk.
    let runner = FakeRunner::new(Box::new(|invocation| {
      if is_generator(invocation) && PathBuf::from(invocation.args.last().unwrap()).ends_with("b.idl") {
        return Ok(ToolOutput {
          success: false,
          code: Some(2),
        });
      }
      emulate_tool(invocation);
      Ok(ToolOutput {
        success: true,
        code: Some(0),
      })
    }));

    let err = build(&request, &runner).await.unwrap_err();

    match err {
      BuildError::GeneratorFailed { input, code } => {
        assert!(input.ends_with("b.idl"));
        assert_eq!(code, Some(2));
      }
      other => panic!("unexpected error: {other}"),
    }
    assert!(!marker_path(&request.definition_dir).exists());
    assert!(request.generated_dir().join("a.rs").exists());
    assert!(!request.artifact_path().exists());
  }

  #[tokio::test]
  async fn compiler_failure_aborts_without_marker() {
    let (_temp, request) = workspace();
    let runner = FakeRunner::new(Box::new(|invocation| {
      if is_generator(invocation) {
        emulate_tool(invocation);
        Ok(ToolOutput {
          success: true,
          code: Some(0),
        })
      } else {
        Ok(ToolOutput {
          success: false,
          code: Some(1),
        })
      }
    }));

    let err = build(&request, &runner).await.unwrap_err();

    assert!(matches!(err, BuildError::CompilerFailed { code: Some(1) }));
    assert!(!marker_path(&request.definition_dir).exists());
  }

  #[test]
  fn bare_library_filename_resolves_to_current_dir() {
    let request = BuildRequest {
      generator: PathBuf::from("idlgen"),
      library: PathBuf::from("support.rlib"),
      definition_dir: PathBuf::from("defs"),
      artifact_name: "widgets.rlib".to_string(),
      metadata_source: None,
    };

    assert_eq!(request.output_dir(), Path::new("."));
    assert_eq!(request.artifact_path(), Path::new("./widgets.rlib"));
  }

  #[tokio::test]
  async fn missing_output_dir_is_fatal() {
    let (temp, mut request) = workspace();
    request.library = temp.path().join("nowhere").join("support.rlib");
    let runner = FakeRunner::working();

    let err = build(&request, &runner).await.unwrap_err();

    assert!(matches!(err, BuildError::MissingOutputDir(_)));
    assert!(runner.calls().is_empty());
  }

  #[tokio::test]
  async fn empty_definition_dir_still_builds() {
    let (_temp, request) = workspace();
    fs::remove_file(request.definition_dir.join("a.idl")).unwrap();
    fs::remove_file(request.definition_dir.join("b.idl")).unwrap();
    let runner = FakeRunner::working();

    let outcome = build(&request, &runner).await.unwrap();

    let BuildOutcome::Rebuilt { definitions, .. } = outcome else {
      panic!("expected a rebuild");
    };
    assert_eq!(definitions, 0);
    // Only the compiler ran.
    assert_eq!(runner.calls().len(), 1);
  }

  #[tokio::test]
  async fn stale_generated_tree_is_cleared() {
    let (_temp, request) = workspace();
    let generated_dir = request.generated_dir();
    fs::create_dir_all(&generated_dir).unwrap();
    fs::write(generated_dir.join("leftover.rs"), "// old").unwrap();
    let runner = FakeRunner::working();

    build(&request, &runner).await.unwrap();

    assert!(!generated_dir.join("leftover.rs").exists());
    assert!(generated_dir.join("a.rs").exists());
  }

  #[tokio::test]
  async fn missing_artifact_forces_rebuild() {
    let (_temp, request) = workspace();
    let runner = FakeRunner::working();

    // Converge first so the decision alone would skip; the missing artifact
    // must still force the rebuild.
    build(&request, &runner).await.unwrap();
    build(&request, &runner).await.unwrap();
    fs::remove_file(request.artifact_path()).unwrap();
    let outcome = build(&request, &runner).await.unwrap();

    assert!(!outcome.was_skipped());
  }

  #[tokio::test]
  async fn metadata_source_reaches_the_compiler() {
    let (temp, mut request) = workspace();
    let metadata = temp.path().join("meta.rs");
    fs::write(&metadata, "// metadata").unwrap();
    request.metadata_source = Some(metadata.clone());
    let runner = FakeRunner::working();

    build(&request, &runner).await.unwrap();

    let compiler_call = runner.calls().into_iter().find(|c| !is_generator(c)).unwrap();
    assert_eq!(compiler_call.args.last().unwrap().as_os_str(), metadata.as_os_str());
  }

  #[tokio::test]
  async fn check_is_stale_before_and_current_after_build() {
    let (_temp, request) = workspace();
    let runner = FakeRunner::working();

    let before = check(&request.library, &request.definition_dir, &request.artifact_name).unwrap();
    assert_eq!(before.freshness, Freshness::Stale);
    assert!(before.recorded_mark.is_none());
    assert_eq!(before.definitions, 2);

    // Two runs: the first creates the marker and thereby advances the
    // directory time, the second settles on it.
    build(&request, &runner).await.unwrap();
    build(&request, &runner).await.unwrap();

    let after = check(&request.library, &request.definition_dir, &request.artifact_name).unwrap();
    assert!(after.is_current());
    assert_eq!(after.recorded_mark, Some(after.basis.clone()));
  }
}
