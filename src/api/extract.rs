use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::ApiState;
use crate::account::Identity;
use crate::error::MarketError;

/// Bearer identity of the caller. Missing, malformed, tampered or expired
/// tokens reject the request with 401.
pub struct Authenticated(pub Identity);

#[async_trait]
impl FromRequestParts<ApiState> for Authenticated {
    type Rejection = MarketError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(MarketError::unauthorized)?;

        state.accounts.authenticate(token).map(Authenticated)
    }
}

/// `Json` whose rejections come back in the usual `{ "error": .. }` shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(MarketError))]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}
