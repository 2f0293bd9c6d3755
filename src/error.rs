use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::fetch::FetchError;
use crate::request::RequestError;

/// Everything that stops a request from producing an envelope.
///
/// Decode failures are not here: they are reported inside the envelope.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Request body too large: {0}")]
    BodyTooLarge(String),
}

impl ProcessError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Request(_) => StatusCode::BAD_REQUEST,
            Self::Fetch(FetchError::Failed { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Fetch(FetchError::TimedOut { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

/// Plain-text body carrying the error message.
impl IntoResponse for ProcessError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
