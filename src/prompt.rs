use crate::config::Settings;
use crate::operation::{Operation, OutputKind};

/// Marker token inside prompt templates, substituted with the file extension.
pub const PLACEHOLDER: &str = "###";

/// Returns true if the template contains the extension placeholder.
///
/// The check is case-insensitive, matching the substitution rules.
#[must_use]
pub(crate) fn contains_placeholder(template: &str) -> bool {
    template
        .to_ascii_lowercase()
        .contains(&PLACEHOLDER.to_ascii_lowercase())
}

/// Replaces every occurrence of the placeholder token, ignoring ASCII case.
///
/// Only the token match is case-insensitive; the surrounding template text
/// and the replacement are copied verbatim.
fn replace_placeholder(template: &str, replacement: &str) -> String {
    let haystack = template.to_ascii_lowercase();
    let needle = PLACEHOLDER.to_ascii_lowercase();

    let mut rendered = String::with_capacity(template.len() + replacement.len());
    let mut last = 0;
    let mut search_from = 0;

    while let Some(found) = haystack[search_from..].find(&needle) {
        let start = search_from + found;
        rendered.push_str(&template[last..start]);
        rendered.push_str(replacement);
        last = start + needle.len();
        search_from = last;
    }

    rendered.push_str(&template[last..]);
    rendered
}

/// Renders the prompts an operation requires for one file.
///
/// Owns no state beyond the two configured templates; the same builder is
/// reused for every file in a run.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    analysis_template: String,
    improve_template: String,
}

impl PromptBuilder {
    /// Creates a prompt builder from the run settings.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            analysis_template: settings.analysis_prompt.clone(),
            improve_template: settings.improve_prompt.clone(),
        }
    }

    /// Builds the ordered prompt list for an operation.
    ///
    /// Each entry pairs an output kind with its fully rendered prompt:
    /// the template with the placeholder replaced by `extension`, a
    /// newline, the raw file content, and a trailing newline. Content is
    /// inserted verbatim, with no escaping or truncation.
    ///
    /// `ClearAnalysis` yields an empty list; it never reaches the
    /// completion service.
    #[must_use]
    pub fn build(
        &self,
        operation: Operation,
        extension: &str,
        content: &str,
    ) -> Vec<(OutputKind, String)> {
        operation
            .output_kinds()
            .iter()
            .map(|&kind| {
                let template = match kind {
                    OutputKind::Analysis => &self.analysis_template,
                    OutputKind::Improved => &self.improve_template,
                };
                let rendered = replace_placeholder(template, extension);
                (kind, format!("{rendered}\n{content}\n"))
            })
            .collect()
    }
}
