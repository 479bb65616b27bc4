mod build;
mod check;

pub use build::cmd_build;
pub use check::cmd_check;
