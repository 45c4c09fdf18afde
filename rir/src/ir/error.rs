use thiserror::Error;

/// Errors that callers may want to recognize after downcasting an
/// [anyhow::Error].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrError {
    /// A valid construct that the analysis does not know how to interpret.
    #[error("unsupported {construct}: `{text}`")]
    UnsupportedConstruct { construct: String, text: String },
    #[error("cannot choose an induction variable among {candidates:?}")]
    AmbiguousInductionVariable { candidates: Vec<String> },
}

impl IrError {
    pub fn unsupported(construct: &str, text: &str) -> IrError {
        IrError::UnsupportedConstruct {
            construct: construct.to_string(),
            text: text.to_string(),
        }
    }
}
