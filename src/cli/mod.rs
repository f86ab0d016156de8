//! Command Line Interface (CLI) layer for cloudless.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) that loads the configuration and
//! scene manifest, builds the requested composites and exports them.
//!
//! If you are embedding cloudless into another application, prefer the
//! high-level `cloudless::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
