//! Error type shared by the tensor builders, the sampler and the estimator.

use thiserror::Error;

/// Errors surfaced to callers of this crate.
///
/// Numerical degeneracy while normalizing a Gaussian draw is not an error:
/// the sampler discards the draw and tries again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MomentsError {
    /// An argument violates its documented domain (zero dimension,
    /// zero sample count, points of the wrong dimensionality, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl MomentsError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        MomentsError::InvalidArgument(msg.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MomentsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_message() {
        let err = MomentsError::invalid("n_samples must be positive, got 0");
        assert_eq!(
            err.to_string(),
            "invalid argument: n_samples must be positive, got 0"
        );
    }
}
