use crate::client::CompletionClient;
use crate::config::Settings;
use crate::error::Result;
use crate::executor::{Executor, Outcome};
use crate::operation::Operation;
use crate::scanner::Scanner;
use crate::task::FileTask;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Statistics collected during a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Operation executed
    pub operation: String,

    /// Number of files matched by the scan
    pub files_matched: usize,

    /// Files fully processed
    pub succeeded: usize,

    /// Files with at least one failed output
    pub partial: usize,

    /// Files with nothing to do
    pub skipped: usize,

    /// Files that could not be processed at all
    pub failed: usize,

    /// Total execution time
    pub duration: Duration,

    /// Run timestamp
    pub generated_at: String,
}

impl RunStats {
    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║                    Run Summary                        ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!("║ Operation:            {:>24}        ║", self.operation);
        println!(
            "║ Files matched:        {:>8}                        ║",
            self.files_matched
        );
        println!(
            "║ Succeeded:            {:>8}                        ║",
            self.succeeded
        );
        println!(
            "║ Partial:              {:>8}                        ║",
            self.partial
        );
        println!(
            "║ Skipped:              {:>8}                        ║",
            self.skipped
        );
        println!(
            "║ Failed:               {:>8}                        ║",
            self.failed
        );
        println!(
            "║ Duration:             {:>8.2}s                       ║",
            self.duration.as_secs_f64()
        );
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Orchestrates a complete run: scan, then execute per file, sequentially.
pub struct Pipeline {
    settings: Settings,
    client: Box<dyn CompletionClient>,
}

impl Pipeline {
    /// Creates a pipeline from validated settings and a completion client.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings fail validation.
    pub fn new(settings: Settings, client: Box<dyn CompletionClient>) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings, client })
    }

    /// Executes `operation` for every matched file under `root`.
    ///
    /// Files are processed strictly one at a time, in scan order. Per-file
    /// failures are logged and counted but never abort the run; progress
    /// reporting is a side channel and cannot affect processing either.
    #[instrument(skip(self), fields(operation = %operation))]
    pub fn run(&self, root: &Path, operation: Operation) -> RunStats {
        let start_time = Instant::now();

        info!("Scanning {}", root.display());
        let scanner = Scanner::new(&self.settings);
        let files = scanner.scan(root);
        info!("Matched {} files", files.len());

        let executor = Executor::new(&self.settings, self.client.as_ref());

        let mut succeeded = 0usize;
        let mut partial = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for path in &files {
            let relative = pathdiff::diff_paths(path, root)
                .unwrap_or_else(|| path.clone())
                .display()
                .to_string();

            let Some(task) = FileTask::for_path(path, &self.settings.output_dir_name) else {
                warn!("{relative}: cannot derive output names, skipping");
                skipped += 1;
                continue;
            };

            info!("{relative}: execution started");

            match executor.execute(&task, operation) {
                Ok(Outcome::Success) => succeeded += 1,
                Ok(Outcome::Partial) => partial += 1,
                Ok(Outcome::Skipped) => skipped += 1,
                Err(e) => {
                    warn!("{relative}: {e}");
                    failed += 1;
                }
            }

            info!("{relative}: execution complete");
        }

        let stats = RunStats {
            operation: operation.to_string(),
            files_matched: files.len(),
            succeeded,
            partial,
            skipped,
            failed,
            duration: start_time.elapsed(),
            generated_at: chrono::Local::now().to_rfc3339(),
        };

        info!(
            "Run complete: {} succeeded, {} partial, {} skipped, {} failed in {:.2}s",
            stats.succeeded,
            stats.partial,
            stats.skipped,
            stats.failed,
            stats.duration.as_secs_f64()
        );

        stats
    }
}
