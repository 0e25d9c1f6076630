use thiserror::Error;

/// Failure of the checker itself, as opposed to a diagnostic about the checked program.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("invalid tree at {location}: {message}")]
    InvalidAst { message: String, location: String },
    #[error("{construct} is not supported in this position ({location})")]
    Unsupported {
        construct: &'static str,
        location: String,
    },
    #[error("next self should be set before checking the implicit lifetime job at {location}")]
    MissingNextSelf { location: String },
    #[error("check cancelled")]
    Cancelled,
    #[error("step budget of {0} node visits exhausted")]
    StepBudgetExhausted(u64),
    #[error("internal error while checking the node at {location}: {message}")]
    Panic {
        message: String,
        location: String,
        backtrace: String,
    },
    #[error("failed to load module '{path}': {message}")]
    ModuleLoad { path: String, message: String },
    #[error("invalid check options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}

impl CheckError {
    pub(crate) fn invalid_ast(message: impl Into<String>, location: impl Into<String>) -> Self {
        CheckError::InvalidAst {
            message: message.into(),
            location: location.into(),
        }
    }

    /// Whether the error was caused by the host (cancellation, budget) rather than the checker.
    pub fn is_interruption(&self) -> bool {
        matches!(
            self,
            CheckError::Cancelled | CheckError::StepBudgetExhausted(_)
        )
    }
}
