//! Error types for arbor-vis.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::playback::PlaybackState;

/// Result type for arbor-vis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving playback or serving it.
#[derive(Debug, Error)]
pub enum Error {
    /// The player is in the wrong state for the requested command.
    #[error("invalid playback state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: PlaybackState,
    },

    /// Configuration or request input could not be used.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidState { .. } => StatusCode::CONFLICT,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Serialization(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_maps_to_conflict() {
        let err = Error::InvalidState {
            expected: "idle or paused",
            actual: PlaybackState::Playing,
        };
        assert_eq!(err.to_string(), "invalid playback state: expected idle or paused, got playing");
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_input_maps_to_bad_request() {
        let err = Error::InvalidInput("ARBOR_ADDR".into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
