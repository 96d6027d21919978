//! Request extractors whose rejections answer with the JSON error envelope.

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;

use crate::errors::AppError;

/// JSON body; malformed or mistyped input becomes a 400 `AppError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string; a bad parameter becomes a 400 `AppError`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Path parameters; an unparsable segment becomes a 400 `AppError`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
