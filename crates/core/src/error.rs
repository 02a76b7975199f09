use std::path::PathBuf;

/// Fatal errors for one validation run.
///
/// Rule violations are not errors: they are collected into the
/// [`FailureSet`](crate::validation::failures::FailureSet) and never stop a run.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Schema mismatch: rule '{rule}' requires missing column '{column}'")]
    Schema { rule: &'static str, column: String },

    #[error("Schema mismatch: duplicate column '{0}' in input header")]
    DuplicateColumn(String),

    #[error("Failed to persist {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },

    #[error("Malformed table: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Pipeline stage the error aborted, used in failure reports.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Schema { .. } | Self::DuplicateColumn(_) => "schema",
            Self::Persistence { .. } => "persistence",
            Self::Csv(_) | Self::Io(_) => "load",
            Self::Config(_) => "config",
        }
    }
}
