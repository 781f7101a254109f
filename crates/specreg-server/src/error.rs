use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use specreg_registry::{ErrorKind, RegistryError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{0}")]
    BadRequest(String),

    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Registry(e) => match e.kind() {
                ErrorKind::Validation | ErrorKind::VersionMismatch => StatusCode::BAD_REQUEST,
                ErrorKind::QuotaExceeded => StatusCode::PAYMENT_REQUIRED,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Storage | ErrorKind::Database => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the client. Server faults are not described in detail.
    pub fn user_message(&self) -> String {
        match self {
            Self::Registry(e) => match e.kind() {
                ErrorKind::Storage => "something went wrong whilst accessing the spec storage".into(),
                ErrorKind::Database => "something went wrong whilst accessing the database".into(),
                _ => e.to_string(),
            },
            Self::Unauthorized(_) => "missing or invalid credentials".into(),
            Self::BadRequest(message) => message.clone(),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => "internal server error".into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, self.user_message()).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_errors_map_to_statuses() {
        let cases = [
            (RegistryError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (RegistryError::QuotaExceeded("full".into()), StatusCode::PAYMENT_REQUIRED),
            (RegistryError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (RegistryError::PublicKeyConflict("pk".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status_code(), status);
        }
    }

    #[test]
    fn server_faults_hide_details() {
        let err = ServerError::Internal("secret path /etc".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.user_message().contains("/etc"));
    }

    #[test]
    fn quota_reason_is_shown_verbatim() {
        let err = ServerError::from(RegistryError::QuotaExceeded("the reason".into()));
        assert_eq!(err.user_message(), "the reason");
    }
}
