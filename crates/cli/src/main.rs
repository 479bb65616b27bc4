use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

use output::OutputFormat;

/// stubgen - incremental interface-stub generation and compilation
#[derive(Parser)]
#[command(name = "stubgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Regenerate and compile interface stubs when they are out of date
  Build {
    /// Path to the stub generator executable
    #[arg(long)]
    generator: PathBuf,

    /// Compiled library the generated stubs are built against
    #[arg(long)]
    library: PathBuf,

    /// Directory holding the interface-definition files
    #[arg(long = "definitions")]
    definition_dir: PathBuf,

    /// File name of the artifact to produce next to the library
    #[arg(long = "artifact")]
    artifact_name: String,

    /// Optional metadata source compiled in with the generated stubs
    #[arg(long = "metadata")]
    metadata_source: Option<PathBuf>,
  },

  /// Report whether the stubs are current, without building anything
  Check {
    /// Compiled library the generated stubs are built against
    #[arg(long)]
    library: PathBuf,

    /// Directory holding the interface-definition files
    #[arg(long = "definitions")]
    definition_dir: PathBuf,

    /// File name of the artifact expected next to the library
    #[arg(long = "artifact")]
    artifact_name: String,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::Build {
      generator,
      library,
      definition_dir,
      artifact_name,
      metadata_source,
    } => cmd::cmd_build(generator, library, definition_dir, artifact_name, metadata_source),
    Commands::Check {
      library,
      definition_dir,
      artifact_name,
      format,
    } => cmd::cmd_check(library, definition_dir, artifact_name, format),
  }
}
