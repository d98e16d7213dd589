use crate::error::{Error, Result};
use crate::prompt;
use serde::Deserialize;
use std::fs;
use std::path::Path;

const DEFAULT_OUTPUT_DIR_NAME: &str = "codeanalysis";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1/completions";

/// Immutable run configuration.
///
/// Loaded once at process start from a JSON settings file (or assembled via
/// [`Settings::builder()`] in library use) and validated before any file is
/// touched. Never mutated during a run.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct Settings {
    /// Name of the output subdirectory created next to each processed file.
    ///
    /// The same name is the reserved marker skipped during scanning, so a
    /// run never re-ingests its own artifacts.
    #[serde(default = "default_output_dir_name")]
    pub output_dir_name: String,

    /// File name appended to the source stem for analysis output.
    pub analysis_file_name: String,

    /// File name appended to the source stem for improved-code output.
    pub improved_file_name: String,

    /// Extensions eligible for processing, with leading dot (e.g. ".py").
    pub allowed_extensions: Vec<String>,

    /// Path substrings that exclude a file when matched anywhere in its path.
    #[serde(default)]
    pub excluded_substrings: Vec<String>,

    /// Prompt template for analysis; must contain the extension placeholder.
    pub analysis_prompt: String,

    /// Prompt template for improved code; must contain the extension placeholder.
    pub improve_prompt: String,

    /// API credential for the completion service.
    pub api_key: String,

    /// Completion model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Completions endpoint URL.
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// Maximum tokens per completion.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Presence penalty.
    pub presence_penalty: f32,

    /// Frequency penalty.
    pub frequency_penalty: f32,
}

fn default_output_dir_name() -> String {
    DEFAULT_OUTPUT_DIR_NAME.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

impl Settings {
    /// Creates a new settings builder.
    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Loads and validates settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON for
    /// the settings schema, or fails validation. All of these are fatal:
    /// no file processing happens with a broken configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let settings: Self = serde_json::from_str(&raw).map_err(|e| {
            Error::config(format!("Failed to parse '{}': {e}", path.display()))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The output directory name is empty or contains path separators
    /// - Output file names are empty
    /// - The extension allow-list is empty
    /// - A prompt template is missing the extension placeholder
    /// - The API credential is empty
    pub fn validate(&self) -> Result<()> {
        if self.output_dir_name.is_empty() {
            return Err(Error::config("output_dir_name must not be empty"));
        }

        if self.output_dir_name.contains(['/', '\\']) {
            return Err(Error::config(format!(
                "output_dir_name must be a plain directory name, got '{}'",
                self.output_dir_name
            )));
        }

        if self.analysis_file_name.is_empty() {
            return Err(Error::config("analysis_file_name must not be empty"));
        }

        if self.improved_file_name.is_empty() {
            return Err(Error::config("improved_file_name must not be empty"));
        }

        // An empty allow-list can never select a file, which is always a
        // misconfiguration rather than an intent.
        if self.allowed_extensions.is_empty() {
            return Err(Error::config(
                "allowed_extensions must list at least one extension",
            ));
        }

        for ext in &self.allowed_extensions {
            if !ext.starts_with('.') {
                return Err(Error::config(format!(
                    "allowed_extensions entries must start with '.', got '{ext}'"
                )));
            }
        }

        if !prompt::contains_placeholder(&self.analysis_prompt) {
            return Err(Error::config(format!(
                "analysis_prompt must contain the '{}' extension placeholder",
                prompt::PLACEHOLDER
            )));
        }

        if !prompt::contains_placeholder(&self.improve_prompt) {
            return Err(Error::config(format!(
                "improve_prompt must contain the '{}' extension placeholder",
                prompt::PLACEHOLDER
            )));
        }

        if self.api_key.is_empty() {
            return Err(Error::config("api_key must not be empty"));
        }

        if self.max_tokens == 0 {
            return Err(Error::config("max_tokens must be greater than 0"));
        }

        Ok(())
    }
}

/// Builder for creating [`Settings`] without a settings file.
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    output_dir_name: Option<String>,
    analysis_file_name: Option<String>,
    improved_file_name: Option<String>,
    allowed_extensions: Vec<String>,
    excluded_substrings: Vec<String>,
    analysis_prompt: Option<String>,
    improve_prompt: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    api_endpoint: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    presence_penalty: Option<f32>,
    frequency_penalty: Option<f32>,
}

impl SettingsBuilder {
    /// Sets the output subdirectory name.
    #[must_use]
    pub fn output_dir_name(mut self, name: impl Into<String>) -> Self {
        self.output_dir_name = Some(name.into());
        self
    }

    /// Sets the analysis output file name.
    #[must_use]
    pub fn analysis_file_name(mut self, name: impl Into<String>) -> Self {
        self.analysis_file_name = Some(name.into());
        self
    }

    /// Sets the improved-code output file name.
    #[must_use]
    pub fn improved_file_name(mut self, name: impl Into<String>) -> Self {
        self.improved_file_name = Some(name.into());
        self
    }

    /// Sets the extension allow-list.
    #[must_use]
    pub fn allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.allowed_extensions = extensions;
        self
    }

    /// Sets the path-substring exclusion list.
    #[must_use]
    pub fn excluded_substrings(mut self, substrings: Vec<String>) -> Self {
        self.excluded_substrings = substrings;
        self
    }

    /// Sets the analysis prompt template.
    #[must_use]
    pub fn analysis_prompt(mut self, template: impl Into<String>) -> Self {
        self.analysis_prompt = Some(template.into());
        self
    }

    /// Sets the improved-code prompt template.
    #[must_use]
    pub fn improve_prompt(mut self, template: impl Into<String>) -> Self {
        self.improve_prompt = Some(template.into());
        self
    }

    /// Sets the API credential.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the completion model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the completions endpoint URL.
    #[must_use]
    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the maximum tokens per completion.
    #[must_use]
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the presence penalty.
    #[must_use]
    pub fn presence_penalty(mut self, penalty: f32) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }

    /// Sets the frequency penalty.
    #[must_use]
    pub fn frequency_penalty(mut self, penalty: f32) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Settings> {
        let settings = Settings {
            output_dir_name: self
                .output_dir_name
                .unwrap_or_else(default_output_dir_name),
            analysis_file_name: self.analysis_file_name.unwrap_or_default(),
            improved_file_name: self.improved_file_name.unwrap_or_default(),
            allowed_extensions: self.allowed_extensions,
            excluded_substrings: self.excluded_substrings,
            analysis_prompt: self.analysis_prompt.unwrap_or_default(),
            improve_prompt: self.improve_prompt.unwrap_or_default(),
            api_key: self.api_key.unwrap_or_default(),
            model: self.model.unwrap_or_else(default_model),
            api_endpoint: self.api_endpoint.unwrap_or_else(default_api_endpoint),
            max_tokens: self.max_tokens.unwrap_or(1024),
            temperature: self.temperature.unwrap_or(0.2),
            presence_penalty: self.presence_penalty.unwrap_or(0.0),
            frequency_penalty: self.frequency_penalty.unwrap_or(0.0),
        };

        settings.validate()?;
        Ok(settings)
    }
}
