use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// The artifact kinds an operation can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// Analysis report of the source file
    Analysis,
    /// Improved rewrite of the source file
    Improved,
}

/// The single mode selected for a run.
///
/// Exactly one operation governs an entire run; it determines which
/// artifacts are produced or removed for every matched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Generate an analysis report per file
    Analyze,
    /// Generate an improved rewrite per file
    Improve,
    /// Generate both, analysis first
    AnalyzeAndImprove,
    /// Remove previously generated output directories
    ClearAnalysis,
}

impl Operation {
    /// Returns the output kinds this operation produces, in write order.
    ///
    /// `ClearAnalysis` produces nothing; it removes artifacts instead.
    /// For `AnalyzeAndImprove` the analysis output always precedes the
    /// improved output.
    #[must_use]
    pub const fn output_kinds(self) -> &'static [OutputKind] {
        match self {
            Self::Analyze => &[OutputKind::Analysis],
            Self::Improve => &[OutputKind::Improved],
            Self::AnalyzeAndImprove => &[OutputKind::Analysis, OutputKind::Improved],
            Self::ClearAnalysis => &[],
        }
    }

    /// Returns true if this operation only removes prior artifacts.
    #[must_use]
    pub const fn is_clear(self) -> bool {
        matches!(self, Self::ClearAnalysis)
    }

    /// The command-line spelling of this operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Improve => "improve",
            Self::AnalyzeAndImprove => "analyze-and-improve",
            Self::ClearAnalysis => "clear-analysis",
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    /// Parses a command-line operation name. Matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analyze" => Ok(Self::Analyze),
            "improve" => Ok(Self::Improve),
            "analyze-and-improve" => Ok(Self::AnalyzeAndImprove),
            "clear-analysis" => Ok(Self::ClearAnalysis),
            other => Err(Error::unknown_operation(other)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
