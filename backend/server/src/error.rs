use std::io;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to connect to the store: {0}")]
    Connection(#[source] BoxError),

    #[error("Failed to prepare the schema: {0}")]
    Schema(#[source] BoxError),

    #[error("Failed to write record: {0}")]
    Write(#[source] BoxError),

    #[error("Failed to query records: {0}")]
    Query(#[source] BoxError),
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] io::Error),
}

/// Per-request failures. Only the short message reaches the client.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request")]
    InvalidRequest,

    #[error("{message}")]
    Store {
        message: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    pub fn store(message: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| AppError::Store { message, source }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest => StatusCode::BAD_REQUEST,
            AppError::Store { message, source } => {
                error!(error = %source, "{message}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_body(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn invalid_request_is_bad_request() {
        let resp = AppError::InvalidRequest.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = response_body(resp).await;
        assert_eq!(body, json!({ "error": "Invalid request" }));
    }

    #[tokio::test]
    async fn store_failure_hides_driver_detail() {
        let source = StoreError::Write("relation \"article_logs\" does not exist".into());
        let resp = AppError::store("Failed to log click")(source).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response_body(resp).await;
        assert_eq!(body, json!({ "error": "Failed to log click" }));
    }

    #[test]
    fn config_error_names_the_key() {
        let err = ConfigError::Invalid {
            key: "RUST_PORT",
            value: "eighty".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        assert!(err.to_string().starts_with("Invalid RUST_PORT value \"eighty\""));
    }
}
