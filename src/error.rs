use std::fmt;

/// Result type for duelnet operations
pub type Result<T> = std::result::Result<T, DuelnetError>;

/// Main error type for the duelnet library
#[derive(Debug, Clone)]
pub enum DuelnetError {
    /// Invalid dimensions for operations
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Sampling more transitions than the replay buffer holds
    InsufficientSamples {
        requested: usize,
        available: usize,
    },

    /// Invalid action
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// Failure reported by the game environment
    Environment(String),

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),
}

impl fmt::Display for DuelnetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuelnetError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            DuelnetError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            DuelnetError::InsufficientSamples { requested, available } => {
                write!(f, "Cannot sample {} transitions: buffer holds {}", requested, available)
            }
            DuelnetError::InvalidAction { action, max_actions } => {
                write!(f, "Invalid action {}: must be less than {}", action, max_actions)
            }
            DuelnetError::Environment(msg) => write!(f, "Environment error: {}", msg),
            DuelnetError::IoError(msg) => write!(f, "IO error: {}", msg),
            DuelnetError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for DuelnetError {}

impl From<std::io::Error> for DuelnetError {
    fn from(err: std::io::Error) -> Self {
        DuelnetError::IoError(err.to_string())
    }
}

impl From<bincode::Error> for DuelnetError {
    fn from(err: bincode::Error) -> Self {
        DuelnetError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for DuelnetError {
    fn from(err: serde_json::Error) -> Self {
        DuelnetError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for DuelnetError {
    fn from(err: ndarray::ShapeError) -> Self {
        DuelnetError::DimensionMismatch {
            expected: "compatible array shape".to_string(),
            actual: err.to_string(),
        }
    }
}

// Helper functions for common error patterns
impl DuelnetError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        DuelnetError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        DuelnetError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
