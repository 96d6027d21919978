//! Multi-factor enrollment and verification.
//!
//! An enrollment starts pending when the secret is issued and becomes
//! enabled once the user proves possession with a first valid code. Every
//! accepted time step is recorded so a code cannot be replayed, and backup
//! codes are stored only as SHA-256 digests and consumed on use.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use std::str::FromStr;

use crate::errors::AppError;
use crate::models::UnknownVariant;
use crate::store::Store;
use crate::totp;

/// Number of backup codes issued at setup.
pub const BACKUP_CODE_COUNT: usize = 10;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MfaEnrollment {
    pub user_id: String,
    pub secret: String,
    pub backup_code_hashes: Vec<String>,
    pub enabled: bool,
    pub last_used_step: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub enabled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfaAction {
    /// Confirms a pending enrollment.
    Enable,
    /// Second-factor check at sign-in.
    Login,
    /// Removes an enabled enrollment.
    Disable,
}

impl FromStr for MfaAction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enable" | "setup" => Ok(MfaAction::Enable),
            "login" | "verify" => Ok(MfaAction::Login),
            "disable" => Ok(MfaAction::Disable),
            other => Err(UnknownVariant::new("MFA action", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMfaRequest {
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMfaResponse {
    pub secret: String,
    pub qr_code_url: String,
    pub backup_codes: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyMfaRequest {
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

/// Result of a verification attempt that reached the credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified { action: MfaAction },
    VerifiedWithBackupCode { remaining: usize },
    /// Wrong, stale or replayed code.
    Rejected,
}

/// Generates backup codes formatted `XXXX-XXXX`.
pub fn generate_backup_codes(count: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            let mut bytes = [0u8; 4];
            OsRng.fill_bytes(&mut bytes);
            let hex = hex::encode_upper(bytes);
            format!("{}-{}", &hex[..4], &hex[4..])
        })
        .collect()
}

/// Canonical form of a backup code: uppercase hex without separators.
fn normalize_backup_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Whether `token` looks like a backup code rather than a TOTP code.
pub fn is_backup_code_shaped(token: &str) -> bool {
    let normalized = normalize_backup_code(token);
    normalized.len() == 8
        && normalized.chars().all(|c| c.is_ascii_hexdigit())
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ')
}

/// SHA-256 digest (hex) under which a backup code is stored.
pub fn hash_backup_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_backup_code(code).as_bytes());
    hex::encode(hasher.finalize())
}

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// Issues a new secret and backup codes for `user_id` as a pending enrollment.
pub async fn setup(
    store: &dyn Store,
    user_id: &str,
    issuer: &str,
) -> Result<SetupMfaResponse, AppError> {
    if let Some(existing) = store.get_mfa_enrollment(user_id).await? {
        if existing.enabled {
            return Err(AppError::Conflict(
                "MFA is already enabled for this user".to_string(),
            ));
        }
    }

    let secret = totp::generate_secret();
    let backup_codes = generate_backup_codes(BACKUP_CODE_COUNT);
    let hashes: Vec<String> = backup_codes.iter().map(|c| hash_backup_code(c)).collect();

    let saved = store
        .save_pending_mfa_enrollment(user_id, &secret, &hashes)
        .await?;
    if saved.is_none() {
        // Enabled by a concurrent request between the check and the write
        return Err(AppError::Conflict(
            "MFA is already enabled for this user".to_string(),
        ));
    }

    tracing::info!("Issued pending MFA enrollment for user {}", user_id);

    Ok(SetupMfaResponse {
        qr_code_url: totp::provisioning_uri(&secret, issuer, user_id),
        secret,
        backup_codes,
    })
}

/// Verifies `token` for `action` at the current time.
pub async fn verify(
    store: &dyn Store,
    user_id: &str,
    token: &str,
    action: MfaAction,
) -> Result<VerifyOutcome, AppError> {
    verify_at(store, user_id, token, action, unix_now()).await
}

/// Verifies `token` for `action` as if the clock read `unix_secs`.
pub async fn verify_at(
    store: &dyn Store,
    user_id: &str,
    token: &str,
    action: MfaAction,
    unix_secs: u64,
) -> Result<VerifyOutcome, AppError> {
    let token = token.trim();
    let is_code = totp::is_code_shaped(token);
    let is_backup = action == MfaAction::Login && is_backup_code_shaped(token);

    if !is_code && !is_backup {
        return Err(AppError::BadRequest(
            "Token must be a 6-digit code".to_string(),
        ));
    }

    let enrollment = store
        .get_mfa_enrollment(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("MFA is not set up for this user".to_string()))?;

    match (action, enrollment.enabled) {
        (MfaAction::Enable, true) => {
            return Err(AppError::Conflict("MFA is already enabled".to_string()))
        }
        (MfaAction::Login | MfaAction::Disable, false) => {
            return Err(AppError::Conflict("MFA is not enabled".to_string()))
        }
        _ => {}
    }

    if is_backup {
        let remaining = store
            .consume_backup_code(user_id, &hash_backup_code(token))
            .await?;
        return Ok(match remaining {
            Some(remaining) => {
                tracing::info!(
                    "Backup code used for user {} ({} remaining)",
                    user_id,
                    remaining
                );
                VerifyOutcome::VerifiedWithBackupCode { remaining }
            }
            None => {
                tracing::warn!("Rejected backup code for user {}", user_id);
                VerifyOutcome::Rejected
            }
        });
    }

    let step = totp::verify_at(&enrollment.secret, token, unix_secs)
        .map_err(|e| AppError::InternalError(format!("Stored MFA secret unusable: {}", e)))?;

    let Some(step) = step else {
        tracing::warn!("Rejected MFA code for user {}", user_id);
        return Ok(VerifyOutcome::Rejected);
    };
    let step = i64::try_from(step)
        .map_err(|_| AppError::InternalError("Time step out of range".to_string()))?;

    // Claims the step; fails when this or a later step was already accepted
    let accepted = store
        .record_mfa_step(user_id, step, action == MfaAction::Enable)
        .await?;
    if !accepted {
        tracing::warn!("Replayed MFA code for user {}", user_id);
        return Ok(VerifyOutcome::Rejected);
    }

    if action == MfaAction::Disable {
        store.delete_mfa_enrollment(user_id).await?;
        tracing::info!("MFA disabled for user {}", user_id);
    } else if action == MfaAction::Enable {
        tracing::info!("MFA enabled for user {}", user_id);
    }

    Ok(VerifyOutcome::Verified { action })
}
