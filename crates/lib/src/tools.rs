//! External generator and compiler invocations.
//!
//! The orchestration never spawns processes directly; it builds
//! [`ToolInvocation`]s and hands them to a [`ToolRunner`]. Production code
//! uses [`ProcessRunner`]; tests inject a fake so the decision and
//! orchestration logic run without real processes.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::{COMPILER_ENV, COMPILER_PROGRAM};

/// A fully assembled external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
  pub program: PathBuf,
  pub args: Vec<OsString>,
}

/// Exit status of an external command, stripped to what the build needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOutput {
  pub success: bool,
  pub code: Option<i32>,
}

/// Capability to run an external command to completion.
pub trait ToolRunner {
  fn run(&self, invocation: &ToolInvocation) -> impl Future<Output = io::Result<ToolOutput>>;
}

/// Runs invocations as real child processes, sequentially, each awaited to
/// completion.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
  async fn run(&self, invocation: &ToolInvocation) -> io::Result<ToolOutput> {
    debug!(program = %invocation.program.display(), "spawning process");

    let output = tokio::process::Command::new(&invocation.program)
      .args(&invocation.args)
      .output()
      .await?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let stdout = String::from_utf8_lossy(&output.stdout);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "tool stderr");
      }
      if !stdout.is_empty() {
        debug!(stdout = %stdout, "tool stdout");
      }
    }

    Ok(ToolOutput {
      success: output.status.success(),
      code: output.status.code(),
    })
  }
}

/// Generator call for one definition file: fixed output mode, the generated
/// directory, recursive emission, and the input path.
pub fn generator_invocation(generator: &Path, generated_dir: &Path, input: &Path) -> ToolInvocation {
  ToolInvocation {
    program: generator.to_path_buf(),
    args: vec![
      OsString::from("--mode"),
      OsString::from("stubs"),
      OsString::from("--out-dir"),
      generated_dir.as_os_str().to_owned(),
      OsString::from("--recursive"),
      input.as_os_str().to_owned(),
    ],
  }
}

/// The single compiler call over all generated sources.
///
/// The compiler executable is a fixed program name, overridable through the
/// `STUBGEN_COMPILER` environment variable.
pub fn compiler_invocation(
  library: &Path,
  artifact: &Path,
  sources: &[PathBuf],
  metadata_source: Option<&Path>,
) -> ToolInvocation {
  let mut args = vec![
    OsString::from("--lib"),
    library.as_os_str().to_owned(),
    OsString::from("--out"),
    artifact.as_os_str().to_owned(),
  ];
  args.extend(sources.iter().map(|s| s.as_os_str().to_owned()));
  if let Some(metadata) = metadata_source {
    args.push(metadata.as_os_str().to_owned());
  }

  ToolInvocation {
    program: compiler_program(),
    args,
  }
}

fn compiler_program() -> PathBuf {
  env::var_os(COMPILER_ENV)
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from(COMPILER_PROGRAM))
}
