use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for configuration validation and the DSMC time loop.
///
/// Configuration problems surface as `InvalidParam` before any realization
/// starts. The remaining variants are raised from inside a timestep and abort
/// only the realization that produced them.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Non-finite state produced by a wall crossing or a collision.
    #[error("numerical error: {0}")]
    MathError(String),

    /// A particle could not be brought back inside `[0, Lz]`.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    /// The run was cancelled through a [`CancelToken`](crate::core::CancelToken).
    #[error("cancelled at realization {realization}, step {step}")]
    Cancelled { realization: usize, step: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = Error::InvalidParam("n0 must be > 0".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("invalid parameter"));
        assert!(msg.contains("n0"));
    }

    #[test]
    fn cancelled_reports_position() {
        let e = Error::Cancelled {
            realization: 2,
            step: 17,
        };
        let msg = e.to_string();
        assert!(msg.contains("realization 2"));
        assert!(msg.contains("step 17"));
    }
}
