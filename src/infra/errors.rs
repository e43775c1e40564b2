// src/infra/errors.rs — Error types for convogen

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvoGenError {
    // Run-level errors: block start() or fail the whole run
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Schedule error: {0}")]
    Schedule(String),

    // External call errors (per-item, non-fatal to the run)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("External call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Evaluator response rejected: {0}")]
    Evaluation(String),

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConvoGenError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ConvoGenError::Provider {
                retriable: true,
                ..
            } | ConvoGenError::Timeout { .. }
        )
    }

    /// True for errors that block `start()` or fail the run as a whole;
    /// everything else is isolated to a single conversation slot.
    pub fn is_run_level(&self) -> bool {
        matches!(
            self,
            ConvoGenError::Validation(_) | ConvoGenError::Schedule(_)
        )
    }
}
