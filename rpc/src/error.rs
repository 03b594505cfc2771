//! RPC error types and their HTTP mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use subledger_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("server error: {0}")]
    Server(String),
}

impl From<JsonRejection> for RpcError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    error: String,
}

impl RpcError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Engine(e) => e.kind(),
            Self::InvalidRequest(_) => "invalid_request",
            Self::Server(_) => "server",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e {
                EngineError::AlreadySubscribed
                | EngineError::NotSubscribed
                | EngineError::AlreadyInitialized => StatusCode::CONFLICT,
                EngineError::InsufficientDeposit { .. }
                | EngineError::InsufficientIncrease { .. }
                | EngineError::NothingToWithdraw
                | EngineError::InvalidTimestamp(_)
                | EngineError::Overflow => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::InvalidConfiguration(_)
                | EngineError::NotInitialized
                | EngineError::TransferFailed(_)
                | EngineError::Store(_)
                | EngineError::Unreconciled(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "rpc call failed");
        }
        let body = ErrorBody {
            kind: self.kind(),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
