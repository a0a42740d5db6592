use thiserror::Error;

/// Errors produced while building or updating a speaker model.
///
/// All of these are reported synchronously to the immediate caller and are
/// not retryable with the same inputs.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid or contradictory input, detected before any model is built.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The equation solve found no solution. The mass matrix of the
    /// assembled equation set is singular, which is a structural defect in
    /// the equations themselves, never a data problem.
    #[error("equation assembly failed: {0}")]
    Assembly(String),

    /// Numeric substitution produced NaN or Inf. The caller keeps its
    /// previously valid model.
    #[error("numeric degeneracy: {0}")]
    Degenerate(String),
}

impl SimError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SimError::Config(msg.into())
    }

    pub(crate) fn degenerate(msg: impl Into<String>) -> Self {
        SimError::Degenerate(msg.into())
    }
}
