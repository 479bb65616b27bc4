//! Fixed names shared across the crate.

/// File extension of interface-definition inputs.
pub const DEF_EXTENSION: &str = "idl";

/// Name of the marker file persisted inside the definition directory.
pub const MARK_FILE_NAME: &str = ".stubgen-mark";

/// Suffix appended to the artifact stem to form the generated-sources
/// directory, e.g. `widgets.stubs/` for artifact `widgets.rlib`.
pub const GENERATED_DIR_SUFFIX: &str = ".stubs";

/// Default compiler executable, resolved from PATH.
pub const COMPILER_PROGRAM: &str = "stubc";

/// Environment variable overriding the compiler executable.
pub const COMPILER_ENV: &str = "STUBGEN_COMPILER";

/// Digit width of marks written by this tool. Zero-padding to a fixed width
/// keeps ordinal string comparison consistent with numeric comparison.
pub const MARK_WIDTH: usize = 20;
