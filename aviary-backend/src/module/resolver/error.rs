use thiserror::Error;

/// Why a single resolution step produced nothing.
///
/// Every variant is treated the same by the fallback chain: the step is
/// abandoned and the next one runs.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Request rejected, timed out or answered with a non-2xx status
    #[error("{step}: network failure: {message}")]
    Network { step: &'static str, message: String },

    /// Body was not the JSON shape we expected
    #[error("{step}: malformed response: {message}")]
    Parse { step: &'static str, message: String },

    /// Valid response without a usable image
    #[error("{step}: no qualifying image")]
    NoResult { step: &'static str },
}

impl ResolveError {
    pub fn step(&self) -> &'static str {
        match self {
            ResolveError::Network { step, .. }
            | ResolveError::Parse { step, .. }
            | ResolveError::NoResult { step } => step,
        }
    }

    pub fn is_no_result(&self) -> bool {
        matches!(self, ResolveError::NoResult { .. })
    }
}
