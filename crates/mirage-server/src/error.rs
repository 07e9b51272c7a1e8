//! Error types and response envelope for the dispatch server.

use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::any::Any;
use thiserror::Error;

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// No endpoint matches the method and path.
    #[error("API endpoint not found")]
    RouteNotFound { method: String, path: String },

    /// The body is neither JSON nor form data.
    #[error("Invalid request format. Expected JSON")]
    InvalidBodyFormat(String),

    /// A JSON body failed to parse.
    #[error("Invalid JSON in request body")]
    InvalidJson(String),

    /// The body exceeds the configured size limit.
    #[error("Request body too large")]
    PayloadTooLarge(String),

    /// Any unexpected failure while handling the request.
    #[error("Internal server Error")]
    Internal { detail: String, traceback: String },
}

impl ServerError {
    /// Wrap an unexpected error, keeping its cause chain.
    pub fn internal(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        let mut traceback = format!("error: {}", err);
        for line in chain {
            traceback.push('\n');
            traceback.push_str(&line);
        }

        ServerError::Internal {
            detail: err.to_string(),
            traceback,
        }
    }

    /// Describe a panic caught while handling the request.
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "unknown panic payload".to_string()
        };

        ServerError::Internal {
            traceback: format!("panic: {}", message),
            detail: message,
        }
    }

    /// Drop internal diagnostic detail from the response.
    pub fn redacted(self) -> Self {
        match self {
            ServerError::Internal { .. } => ServerError::Internal {
                detail: String::new(),
                traceback: String::new(),
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ServerError::InvalidBodyFormat(_) | ServerError::InvalidJson(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BytesRejection> for ServerError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(rejection.body_text())
        } else {
            ServerError::InvalidBodyFormat(rejection.body_text())
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ServerError::Internal { detail, traceback } => json!({
                "status": "error",
                "message": self.to_string(),
                "error_detail": detail,
                "traceback": traceback,
            }),
            _ => json!({
                "status": "error",
                "error": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Outer(Inner);

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("model request failed")
        }
    }

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection reset")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    impl std::error::Error for Inner {}

    #[test]
    fn test_internal_keeps_cause_chain() {
        let err = ServerError::internal(&Outer(Inner));
        match &err {
            ServerError::Internal { detail, traceback } => {
                assert_eq!(detail, "model request failed");
                assert_eq!(
                    traceback,
                    "error: model request failed\ncaused by: connection reset"
                );
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_redaction_only_touches_internal() {
        let err = ServerError::internal(&Outer(Inner)).redacted();
        assert!(matches!(
            err,
            ServerError::Internal { ref detail, ref traceback } if detail.is_empty() && traceback.is_empty()
        ));

        let not_found = ServerError::RouteNotFound {
            method: "GET".to_string(),
            path: "/x".to_string(),
        }
        .redacted();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_client_error_statuses() {
        assert_eq!(
            ServerError::InvalidJson("eof".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::InvalidBodyFormat("binary".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::PayloadTooLarge("length limit exceeded".to_string()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_panic_payloads() {
        let err = ServerError::from_panic(Box::new("index out of bounds"));
        assert!(matches!(
            err,
            ServerError::Internal { ref detail, ref traceback }
                if detail == "index out of bounds" && traceback == "panic: index out of bounds"
        ));

        let err = ServerError::from_panic(Box::new(format!("row {} missing", 7)));
        assert!(matches!(err, ServerError::Internal { ref detail, .. } if detail == "row 7 missing"));

        let err = ServerError::from_panic(Box::new(42u8));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
