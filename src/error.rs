/// All errors that can occur within ferrite-rnn.
///
/// Arithmetic on `Matrix` still panics on mismatched operands; this type covers
/// the fallible edges of the library: configuration, batching and persistence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two shapes that must agree did not, e.g. a window whose rows differ in length.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// A hyperparameter combination that cannot produce a single training step.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }
}

/// Convenience Result type used throughout ferrite-rnn.
pub type Result<T> = std::result::Result<T, Error>;
