//! Classification of completed attempts.

use crate::client::HttpError;

/// Terminal result of one completed attempt.
#[derive(Debug)]
pub enum Outcome {
    /// Success status; the body goes to `on_success`.
    Success(String),
    /// Failure; the cause goes to `on_error`.
    Failure(HttpError),
}

impl Outcome {
    /// Convert into a plain `Result` for channel-style consumers.
    pub fn into_result(self) -> Result<String, HttpError> {
        match self {
            Outcome::Success(body) => Ok(body),
            Outcome::Failure(error) => Err(error),
        }
    }
}

/// Classify a completed attempt that received a response.
///
/// A failure status with a non-empty body surfaces that body as the cause. A
/// failure status with an empty body is the offline-with-no-cache-entry case:
/// the transport's response cache had nothing to serve, and an empty message
/// would be uninformative, so a fixed diagnostic is substituted.
pub fn classify(status: u16, body: String) -> Outcome {
    if (200..300).contains(&status) {
        return Outcome::Success(body);
    }

    if body.is_empty() {
        Outcome::Failure(HttpError::NoCachedData)
    } else {
        Outcome::Failure(HttpError::Status { status, body })
    }
}
