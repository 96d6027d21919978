//! Time-based one-time passwords (RFC 6238) over HMAC-SHA1 (RFC 4226).
//!
//! Secrets are 160 random bits from the OS CSPRNG, exchanged as unpadded
//! RFC 4648 base32 so authenticator apps can import them from the
//! `otpauth://` provisioning URI.

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// Length of a generated shared secret in bytes.
pub const SECRET_LEN: usize = 20;
/// Seconds per time step.
pub const PERIOD: u64 = 30;
/// Digits in a generated code.
pub const DIGITS: u32 = 6;
/// Accepted clock drift, in steps, on either side of the current one.
pub const SKEW: u64 = 1;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TotpError {
    #[error("secret is not valid base32")]
    InvalidSecret,
    #[error("secret is empty")]
    EmptySecret,
}

/// Generates a fresh base32-encoded shared secret.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_LEN];
    OsRng.fill_bytes(&mut bytes);
    BASE32_NOPAD.encode(&bytes)
}

fn decode_secret(secret: &str) -> Result<Vec<u8>, TotpError> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let bytes = BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|_| TotpError::InvalidSecret)?;
    if bytes.is_empty() {
        return Err(TotpError::EmptySecret);
    }
    Ok(bytes)
}

/// Time step containing `unix_secs`.
pub fn time_step(unix_secs: u64) -> u64 {
    unix_secs / PERIOD
}

/// RFC 4226 HOTP value for a raw key and counter.
fn hotp(key: &[u8], counter: u64) -> u32 {
    // HMAC accepts keys of any length
    let mut mac = HmacSha1::new_from_slice(key).unwrap_or_else(|_| unreachable!());
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    binary % 10u32.pow(DIGITS)
}

/// Code for a given time step, zero-padded to `DIGITS`.
pub fn code_for_step(secret: &str, step: u64) -> Result<String, TotpError> {
    let key = decode_secret(secret)?;
    Ok(format!("{:0width$}", hotp(&key, step), width = DIGITS as usize))
}

/// Code valid at `unix_secs`.
pub fn code_at(secret: &str, unix_secs: u64) -> Result<String, TotpError> {
    code_for_step(secret, time_step(unix_secs))
}

/// Whether `token` has the shape of a code: exactly `DIGITS` ASCII digits.
pub fn is_code_shaped(token: &str) -> bool {
    token.len() == DIGITS as usize && token.bytes().all(|b| b.is_ascii_digit())
}

/// Checks `token` against the steps around `unix_secs`.
///
/// Returns the matching step so callers can refuse to accept it twice.
pub fn verify_at(secret: &str, token: &str, unix_secs: u64) -> Result<Option<u64>, TotpError> {
    let key = decode_secret(secret)?;
    if !is_code_shaped(token) {
        return Ok(None);
    }

    let current = time_step(unix_secs);
    let first = current.saturating_sub(SKEW);
    let mut matched = None;

    // Every candidate is checked so timing does not reveal which step matched
    for step in first..=current + SKEW {
        let candidate = format!("{:0width$}", hotp(&key, step), width = DIGITS as usize);
        if bool::from(candidate.as_bytes().ct_eq(token.as_bytes())) && matched.is_none() {
            matched = Some(step);
        }
    }

    Ok(matched)
}

/// Builds the `otpauth://totp/...` provisioning URI rendered as a QR code.
pub fn provisioning_uri(secret: &str, issuer: &str, account: &str) -> String {
    let mut uri = match Url::parse("otpauth://totp/") {
        Ok(uri) => uri,
        Err(_) => unreachable!(),
    };
    uri.set_path(&format!("/{}:{}", issuer, account));
    uri.query_pairs_mut()
        .append_pair("secret", secret)
        .append_pair("issuer", issuer)
        .append_pair("algorithm", "SHA1")
        .append_pair("digits", &DIGITS.to_string())
        .append_pair("period", &PERIOD.to_string());
    uri.to_string()
}
