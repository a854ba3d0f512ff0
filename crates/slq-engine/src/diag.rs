//! Soft diagnostics aggregated across a run.
//!
//! Nothing here is fatal: diagnostics accumulate while blocks execute
//! and are reported once at the end of the run.

use camino::Utf8PathBuf;
use std::fmt;

/// One non-critical problem, attributed to the block it happened in.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub block: usize,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(block: usize, kind: DiagnosticKind) -> Self {
        Self { block, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    /// Option key not recognized; the option set is unchanged.
    UnknownOption { key: String },
    /// Option value malformed; the previous value is kept.
    InvalidOption { key: String },
    /// Query expression failed to compile; the field is inactive for
    /// this block.
    BadExpression { field: String, reason: String },
    /// Log location could not be opened; other locations still run.
    OpenFailed { path: Utf8PathBuf, reason: String },
    /// Log location failed mid-read; the scan of it stopped early.
    ReadFailed { path: Utf8PathBuf, reason: String },
    /// One or more records could not be judged against a predicate
    /// (reported once per block, not per record).
    Evaluation,
    /// One or more records could not be formatted for output.
    Print,
    /// Real-name lookup failed.
    RealName,
    /// Fewer matches than requested by end of scan.
    Shortfall { found: usize, requested: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block {}: ", self.block)?;
        match &self.kind {
            DiagnosticKind::UnknownOption { key } => {
                write!(f, "Did not recognize the variable \"{key}\"; was it entered correctly?")
            }
            DiagnosticKind::InvalidOption { key } => {
                write!(f, "Failed to update variable \"{key}\"; was it set correctly?")
            }
            DiagnosticKind::BadExpression { field, reason } => {
                write!(f, "Failed to read the expression for \"{field}\": {reason}.")
            }
            DiagnosticKind::OpenFailed { path, reason } => {
                write!(f, "Failed to open the log file {path}: {reason}.")
            }
            DiagnosticKind::ReadFailed { path, reason } => {
                write!(f, "Failed while reading the log file {path}: {reason}.")
            }
            DiagnosticKind::Evaluation => write!(
                f,
                "Failed to evaluate one or more lines. This may be related to formatting in the log file itself."
            ),
            DiagnosticKind::Print => write!(
                f,
                "Failed to print one or more lines. This may be related to formatting in the log file itself."
            ),
            DiagnosticKind::RealName => {
                write!(f, "Failed to find user's real name. Is finger available?")
            }
            DiagnosticKind::Shortfall { found, requested } => {
                let was_were = if *found == 1 { "was" } else { "were" };
                write!(
                    f,
                    "Too few results. Of {requested} requested (\"show\"), {found} {was_were} found."
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortfall_message() {
        let diag = Diagnostic::new(2, DiagnosticKind::Shortfall { found: 2, requested: 5 });
        assert_eq!(
            diag.to_string(),
            "Block 2: Too few results. Of 5 requested (\"show\"), 2 were found."
        );

        let diag = Diagnostic::new(1, DiagnosticKind::Shortfall { found: 1, requested: 5 });
        assert!(diag.to_string().contains("1 was found"));
    }

    #[test]
    fn test_unknown_option_message() {
        let diag = Diagnostic::new(1, DiagnosticKind::UnknownOption { key: "colour".into() });
        assert_eq!(
            diag.to_string(),
            "Block 1: Did not recognize the variable \"colour\"; was it entered correctly?"
        );
    }
}
