use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::errors::AppError;
use crate::extract::AppJson;
use crate::handlers::AppState;
use crate::mfa::{self, MfaAction, SetupMfaRequest, SetupMfaResponse, VerifyMfaRequest, VerifyOutcome};

fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}

fn action_name(action: MfaAction) -> &'static str {
    match action {
        MfaAction::Enable => "enable",
        MfaAction::Login => "login",
        MfaAction::Disable => "disable",
    }
}

/// POST /api/auth/setup-mfa
///
/// Issues a new TOTP secret and backup codes. The enrollment stays pending
/// until confirmed through verify-mfa with `action: "enable"`.
///
/// # Returns
///
/// * `Result<Json<SetupMfaResponse>, AppError>` - Secret, provisioning URI and plaintext backup codes.
pub async fn setup_mfa(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<SetupMfaRequest>,
) -> Result<Json<SetupMfaResponse>, AppError> {
    let user_id = required(payload.user_id, "User ID is required")?;
    tracing::info!("POST /auth/setup-mfa - user: {}", user_id);

    let response = mfa::setup(state.store.as_ref(), &user_id, &state.config.mfa_issuer).await?;
    Ok(Json(response))
}

/// POST /api/auth/verify-mfa
///
/// Checks a TOTP or backup code for `enable`, `login` or `disable`. Every
/// failure, including a wrong code (401), answers `{success: false, error}`.
pub async fn verify_mfa(
    State(state): State<Arc<AppState>>,
    payload: Result<AppJson<VerifyMfaRequest>, AppError>,
) -> Response {
    let result = match payload {
        Ok(AppJson(payload)) => verify(&state, payload).await,
        Err(err) => Err(err),
    };
    result.unwrap_or_else(failure)
}

fn failure(err: AppError) -> Response {
    err.log();
    (
        err.status(),
        Json(json!({
            "success": false,
            "error": err.public_message(),
        })),
    )
        .into_response()
}

async fn verify(state: &AppState, payload: VerifyMfaRequest) -> Result<Response, AppError> {
    let user_id = required(payload.user_id, "User ID is required")?;
    let token = required(payload.token, "Token is required")?;
    let action: MfaAction = required(payload.action, "Action is required")?
        .to_lowercase()
        .parse()
        .map_err(|e| AppError::BadRequest(format!("{}", e)))?;

    tracing::info!(
        "POST /auth/verify-mfa - user: {}, action: {}",
        user_id,
        action_name(action)
    );

    let outcome = mfa::verify(state.store.as_ref(), &user_id, &token, action).await?;

    let response = match outcome {
        VerifyOutcome::Verified { action } => Json(json!({
            "success": true,
            "action": action_name(action),
        }))
        .into_response(),
        VerifyOutcome::VerifiedWithBackupCode { remaining } => Json(json!({
            "success": true,
            "action": action_name(MfaAction::Login),
            "backupCodesRemaining": remaining,
        }))
        .into_response(),
        VerifyOutcome::Rejected => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "error": "Invalid verification code",
            })),
        )
            .into_response(),
    };

    Ok(response)
}
