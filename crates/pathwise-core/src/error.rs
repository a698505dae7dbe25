//! Error types for the pathwise construction.

use thiserror::Error;

/// Errors surfaced by the construction pipeline.
#[derive(Debug, Clone, Error)]
pub enum PathwiseError {
    /// The covariance kernel failed a positive-semidefiniteness check.
    #[error("Invalid kernel: {reason}")]
    InvalidKernel { reason: String },

    /// A finite-dimensional law disagrees with the marginal of a larger one.
    #[error(
        "Inconsistent projective family: marginal mismatch at ({i}, {j}): \
         expected {expected}, got {actual}"
    )]
    InconsistentFamily {
        i: usize,
        j: usize,
        expected: f64,
        actual: f64,
    },

    /// No moment certificate with a positive Hölder exponent is available.
    #[error("Moment bound unavailable: no certificate with positive exponent")]
    MomentBoundUnavailable,

    /// Covering growth defeats the available moment bound (chaining series diverges).
    #[error(
        "Covering divergent: chaining series diverges for beta = {beta} \
         against certificate exponent {ceiling}"
    )]
    CoveringDivergent { beta: f64, ceiling: f64 },

    /// A configuration or call parameter is out of range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: &'static str },

    /// Empty input where at least one element is required.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Dimension mismatch between related inputs.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A time lies outside the model's index domain.
    #[error("Time {t} outside domain [0, {upper}]")]
    OutOfDomain { t: f64, upper: f64 },
}

impl PathwiseError {
    /// Invalid kernel with a formatted reason.
    pub fn invalid_kernel(reason: impl Into<String>) -> Self {
        Self::InvalidKernel {
            reason: reason.into(),
        }
    }

    /// Out-of-range parameter.
    pub fn invalid_parameter(name: &'static str, reason: &'static str) -> Self {
        Self::InvalidParameter { name, reason }
    }

    /// Empty input.
    pub fn empty_input(what: impl Into<String>) -> Self {
        Self::EmptyInput(what.into())
    }
}

/// Result type alias for pathwise operations.
pub type Result<T> = std::result::Result<T, PathwiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PathwiseError::invalid_parameter("beta", "must be in (0, 1)");
        assert_eq!(err.to_string(), "Invalid parameter `beta`: must be in (0, 1)");

        let err = PathwiseError::invalid_kernel("asymmetric at (0.5, 1.0)");
        assert!(err.to_string().contains("asymmetric"));
    }

    #[test]
    fn test_covering_divergent_message() {
        let err = PathwiseError::CoveringDivergent {
            beta: 0.6,
            ceiling: 0.5,
        };
        assert!(err.to_string().contains("0.6"));
    }
}
