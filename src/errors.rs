use thiserror::Error;

/// Error type for the auto-configuration resolution phase.
///
/// Every variant except the index-loading ones is fatal to the bootstrap:
/// resolution never produces a partial candidate set.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid index entry at {origin}:{line}: {message}")]
    InvalidIndex {
        origin: String,
        line: usize,
        message: String,
    },

    #[error(
        "no auto-configuration candidates registered for marker '{marker}'. \
         If you are using custom packaging, make sure the registration index \
         is included in the deployment"
    )]
    RegistryEmpty { marker: String },

    #[error(
        "the following classes could not be excluded because they are not \
         auto-configuration candidates: {}", .exclusions.join(", ")
    )]
    InvalidExclusions { exclusions: Vec<String> },

    #[error("auto-configure cycle detected between '{current}' and '{after}'")]
    CycleDetected { current: String, after: String },

    #[error("condition filter '{filter}' failed: {message}")]
    Filter { filter: String, message: String },
}

impl ResolutionError {
    /// Create an index parsing error for a named origin.
    pub fn invalid_index(
        origin: impl Into<String>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidIndex {
            origin: origin.into(),
            line,
            message: message.into(),
        }
    }

    /// Create a filter evaluation error.
    pub fn filter(filter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Filter {
            filter: filter.into(),
            message: message.into(),
        }
    }
}
