use crate::client::CompletionClient;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::operation::{Operation, OutputKind};
use crate::prompt::PromptBuilder;
use crate::task::FileTask;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Result of executing one operation against one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// All requested outputs were produced (or removed, for clear)
    Success,
    /// At least one output failed; partial content may remain on disk
    Partial,
    /// Nothing to do (e.g. clearing a directory that does not exist)
    Skipped,
}

/// Executes the selected operation for individual file tasks.
///
/// Outputs within a task are produced strictly one at a time, in the
/// order the prompt builder emits them; fragments are appended as they
/// arrive and never buffered beyond a single fragment.
pub(crate) struct Executor<'a> {
    settings: &'a Settings,
    prompts: PromptBuilder,
    client: &'a dyn CompletionClient,
}

impl<'a> Executor<'a> {
    /// Creates an executor bound to the run settings and a completion client.
    #[must_use]
    pub(crate) fn new(settings: &'a Settings, client: &'a dyn CompletionClient) -> Self {
        Self {
            settings,
            prompts: PromptBuilder::new(settings),
            client,
        }
    }

    /// Executes `operation` for a single file task.
    ///
    /// Completion-service failures are handled here: the error is logged,
    /// any partially streamed content stays on disk, and remaining outputs
    /// are still attempted. Only task-level setup failures (unreadable
    /// source, uncreatable output directory) surface as errors, and the
    /// pipeline treats those as per-file, not fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if the source file cannot be read or the output
    /// directory cannot be created or removed.
    pub(crate) fn execute(&self, task: &FileTask, operation: Operation) -> Result<Outcome> {
        if operation.is_clear() {
            return self.clear(task);
        }

        let content = fs::read_to_string(&task.source_path)
            .map_err(|e| Error::io(&task.source_path, e))?;

        fs::create_dir_all(&task.output_dir).map_err(|e| Error::io(&task.output_dir, e))?;

        let mut failures = 0usize;
        for (kind, prompt) in self.prompts.build(operation, &task.extension, &content) {
            let output_path = task.output_path(self.kind_file_name(kind));

            if let Err(e) = self.stream_to_file(&prompt, &output_path) {
                warn!(
                    "Completion failed for {} ({:?}): {e}",
                    output_path.display(),
                    kind
                );
                failures += 1;
            }
        }

        Ok(if failures == 0 {
            Outcome::Success
        } else {
            Outcome::Partial
        })
    }

    /// Removes the task's output directory and everything under it.
    fn clear(&self, task: &FileTask) -> Result<Outcome> {
        if !task.output_dir.exists() {
            return Ok(Outcome::Skipped);
        }

        fs::remove_dir_all(&task.output_dir).map_err(|e| Error::io(&task.output_dir, e))?;
        debug!("Removed {}", task.output_dir.display());
        Ok(Outcome::Success)
    }

    /// Streams one completion into one output file.
    ///
    /// The file is truncated before streaming begins; prior content at
    /// that path is discarded. Each fragment is appended as soon as it
    /// arrives, so an interrupted stream leaves a readable prefix.
    fn stream_to_file(&self, prompt: &str, output_path: &Path) -> Result<()> {
        let mut file = File::create(output_path).map_err(|e| Error::io(output_path, e))?;

        self.client.stream_completion(prompt, &mut |fragment| {
            file.write_all(fragment.as_bytes())
                .and_then(|()| file.flush())
                .map_err(|e| Error::io(output_path, e))
        })?;

        debug!("Wrote {}", output_path.display());
        Ok(())
    }

    fn kind_file_name(&self, kind: OutputKind) -> &str {
        match kind {
            OutputKind::Analysis => self.settings.analysis_file_name.as_str(),
            OutputKind::Improved => self.settings.improved_file_name.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    fn test_settings() -> Settings {
        Settings::builder()
            .analysis_file_name("_analysis.md")
            .improved_file_name("_improved.md")
            .allowed_extensions(vec![".py".to_string()])
            .analysis_prompt("Analyze ### code:")
            .improve_prompt("Improve ### code:")
            .api_key("sk-test")
            .build()
            .unwrap()
    }

    /// Emits a fixed fragment sequence and records each prompt it sees.
    struct MockClient {
        fragments: Vec<&'static str>,
        prompts: RefCell<Vec<String>>,
    }

    impl MockClient {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl CompletionClient for MockClient {
        fn stream_completion(
            &self,
            prompt: &str,
            on_fragment: &mut dyn FnMut(&str) -> Result<()>,
        ) -> Result<()> {
            self.prompts.borrow_mut().push(prompt.to_string());
            for fragment in &self.fragments {
                on_fragment(fragment)?;
            }
            Ok(())
        }
    }

    /// Fails mid-stream on its first call, succeeds afterwards.
    struct FlakyClient {
        calls: RefCell<usize>,
    }

    impl CompletionClient for FlakyClient {
        fn stream_completion(
            &self,
            _prompt: &str,
            on_fragment: &mut dyn FnMut(&str) -> Result<()>,
        ) -> Result<()> {
            let call = *self.calls.borrow();
            *self.calls.borrow_mut() += 1;

            if call == 0 {
                on_fragment("partial ")?;
                return Err(Error::completion("connection reset"));
            }
            on_fragment("complete")?;
            Ok(())
        }
    }

    /// Asserts the analysis file already exists when the improve prompt
    /// is requested.
    struct OrderProbeClient {
        analysis_path: PathBuf,
        calls: RefCell<usize>,
    }

    impl CompletionClient for OrderProbeClient {
        fn stream_completion(
            &self,
            _prompt: &str,
            on_fragment: &mut dyn FnMut(&str) -> Result<()>,
        ) -> Result<()> {
            let call = *self.calls.borrow();
            *self.calls.borrow_mut() += 1;

            if call == 1 {
                assert!(
                    self.analysis_path.exists(),
                    "analysis output must be created before the improved output starts"
                );
            }
            on_fragment("ok")
        }
    }

    fn task_for(temp: &assert_fs::TempDir, name: &str) -> FileTask {
        FileTask::for_path(&temp.path().join(name), "codeanalysis").unwrap()
    }

    #[test]
    fn test_analyze_streams_fragments_to_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("main.py").write_str("print('hi')").unwrap();

        let settings = test_settings();
        let client = MockClient::new(vec!["Looks ", "good", "."]);
        let executor = Executor::new(&settings, &client);

        let outcome = executor
            .execute(&task_for(&temp, "main.py"), Operation::Analyze)
            .unwrap();

        assert_eq!(outcome, Outcome::Success);
        temp.child("codeanalysis/main_analysis.md")
            .assert("Looks good.");
        assert!(client.prompts.borrow()[0].starts_with("Analyze .py code:"));
    }

    #[test]
    fn test_analyze_and_improve_produces_both_outputs() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("main.py").write_str("print('hi')").unwrap();

        let settings = test_settings();
        let client = MockClient::new(vec!["out"]);
        let executor = Executor::new(&settings, &client);

        let outcome = executor
            .execute(&task_for(&temp, "main.py"), Operation::AnalyzeAndImprove)
            .unwrap();

        assert_eq!(outcome, Outcome::Success);
        temp.child("codeanalysis/main_analysis.md").assert("out");
        temp.child("codeanalysis/main_improved.md").assert("out");

        let prompts = client.prompts.borrow();
        assert!(prompts[0].starts_with("Analyze"));
        assert!(prompts[1].starts_with("Improve"));
    }

    #[test]
    fn test_analysis_write_begins_before_improved() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("main.py").write_str("print('hi')").unwrap();

        let settings = test_settings();
        let task = task_for(&temp, "main.py");
        let client = OrderProbeClient {
            analysis_path: task.output_path("_analysis.md"),
            calls: RefCell::new(0),
        };
        let executor = Executor::new(&settings, &client);

        executor
            .execute(&task, Operation::AnalyzeAndImprove)
            .unwrap();
        assert_eq!(*client.calls.borrow(), 2);
    }

    #[test]
    fn test_completion_failure_keeps_partial_and_continues() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("main.py").write_str("print('hi')").unwrap();

        let settings = test_settings();
        let client = FlakyClient {
            calls: RefCell::new(0),
        };
        let executor = Executor::new(&settings, &client);

        let outcome = executor
            .execute(&task_for(&temp, "main.py"), Operation::AnalyzeAndImprove)
            .unwrap();

        assert_eq!(outcome, Outcome::Partial);
        temp.child("codeanalysis/main_analysis.md").assert("partial ");
        temp.child("codeanalysis/main_improved.md").assert("complete");
    }

    #[test]
    fn test_rerun_overwrites_prior_output() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("main.py").write_str("print('hi')").unwrap();

        let settings = test_settings();
        let task = task_for(&temp, "main.py");

        let first = MockClient::new(vec!["first run content"]);
        Executor::new(&settings, &first)
            .execute(&task, Operation::Analyze)
            .unwrap();

        let second = MockClient::new(vec!["second"]);
        Executor::new(&settings, &second)
            .execute(&task, Operation::Analyze)
            .unwrap();

        temp.child("codeanalysis/main_analysis.md").assert("second");
    }

    #[test]
    fn test_clear_removes_output_dir_only() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("main.py").write_str("print('hi')").unwrap();
        temp.child("codeanalysis/main_analysis.md")
            .write_str("stale")
            .unwrap();

        let settings = test_settings();
        let client = MockClient::new(vec![]);
        let executor = Executor::new(&settings, &client);

        let outcome = executor
            .execute(&task_for(&temp, "main.py"), Operation::ClearAnalysis)
            .unwrap();

        assert_eq!(outcome, Outcome::Success);
        assert!(!temp.child("codeanalysis").exists());
        temp.child("main.py").assert("print('hi')");
        assert!(client.prompts.borrow().is_empty());
    }

    #[test]
    fn test_clear_missing_dir_is_skipped() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("main.py").write_str("print('hi')").unwrap();

        let settings = test_settings();
        let client = MockClient::new(vec![]);
        let executor = Executor::new(&settings, &client);

        let outcome = executor
            .execute(&task_for(&temp, "main.py"), Operation::ClearAnalysis)
            .unwrap();

        assert_eq!(outcome, Outcome::Skipped);
    }

    #[test]
    fn test_missing_source_file_is_an_error() {
        let temp = assert_fs::TempDir::new().unwrap();

        let settings = test_settings();
        let client = MockClient::new(vec![]);
        let executor = Executor::new(&settings, &client);

        let result = executor.execute(&task_for(&temp, "gone.py"), Operation::Analyze);
        assert!(result.is_err());
    }
}
