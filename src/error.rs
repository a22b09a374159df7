use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },
    #[error("{0}")]
    Integration(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketError {
    pub fn validation(msg: impl Into<String>) -> Self {
        MarketError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        MarketError::NotFound(what.into())
    }

    pub fn unauthorized() -> Self {
        MarketError::Authentication("Unauthorized".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MarketError::Validation(_)
            | MarketError::EmptyCart
            | MarketError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
            MarketError::Authentication(_) => StatusCode::UNAUTHORIZED,
            MarketError::Forbidden(_) => StatusCode::FORBIDDEN,
            MarketError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketError::Conflict(_) => StatusCode::CONFLICT,
            MarketError::Integration(_) => StatusCode::BAD_GATEWAY,
            MarketError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to a client. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            MarketError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

pub type MarketResult<T> = Result<T, MarketError>;

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            MarketError::Internal(detail) => error!("Internal error: {}", detail),
            MarketError::Integration(detail) => warn!("Integration failure: {}", detail),
            _ => {}
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

impl From<JsonRejection> for MarketError {
    fn from(rejection: JsonRejection) -> Self {
        MarketError::Validation(rejection.body_text())
    }
}
