//! Bearer-token guard for the admin, dashboard and export routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::handlers::AppState;

/// Checks `Authorization: Bearer <token>` against the configured admin token.
///
/// With no token configured the check passes; `main` warns about this at
/// startup.
pub fn validate_admin_token(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if !bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
        return Err(AppError::Unauthorized("Invalid admin token".to_string()));
    }

    Ok(())
}

pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    match validate_admin_token(state.config.admin_api_token.as_deref(), req.headers()) {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}
