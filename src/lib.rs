//! # code-insight
//!
//! Streams AI code analysis and rewrites for every source file in a tree.
//!
//! ## Features
//!
//! - Recursive file selection with extension allow-lists and path exclusions
//! - Four run modes: analyze, improve, both, or clear prior artifacts
//! - Streamed completions appended to output files fragment by fragment
//! - Artifacts live in a sibling output directory next to each source file
//!
//! ## Quick Start
//!
//! ```no_run
//! use code_insight::{Operation, OpenAiClient, Pipeline, Settings};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let settings = Settings::load("settings.json")?;
//! let client = OpenAiClient::new(&settings);
//!
//! let stats = Pipeline::new(settings, Box::new(client))?
//!     .run(Path::new("./src"), Operation::Analyze);
//! stats.print_summary();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a pipeline architecture:
//! 1. **Scanner**: Enumerates eligible files under the root
//! 2. **PromptBuilder**: Renders per-operation prompts from templates
//! 3. **Executor**: Streams completions into sibling output files
//! 4. **Pipeline**: Ties the stages together, one file at a time

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod error;
mod executor;
mod operation;
mod pipeline;
mod prompt;
mod scanner;
mod task;

pub use client::{CompletionClient, OpenAiClient};
pub use config::{Settings, SettingsBuilder};
pub use error::{Error, Result};
pub use executor::Outcome;
pub use operation::{Operation, OutputKind};
pub use pipeline::{Pipeline, RunStats};
pub use prompt::{PromptBuilder, PLACEHOLDER};
pub use task::FileTask;

use std::path::Path;

/// Runs the complete pipeline with the given settings.
///
/// This is the main entry point for the library; it wires up the default
/// OpenAI-backed completion client.
///
/// # Errors
///
/// Returns an error if the settings fail validation. Per-file processing
/// errors are handled inside the run and reflected in the returned stats.
pub fn run(settings: Settings, root: &Path, operation: Operation) -> Result<RunStats> {
    let client = OpenAiClient::new(&settings);
    let pipeline = Pipeline::new(settings, Box::new(client))?;
    Ok(pipeline.run(root, operation))
}
