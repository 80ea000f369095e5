//! 凭证签发与校验：HS256 JWT（`header.payload.signature`，base64url 无填充）。

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use cd_shared_protocol::IdentityClaim;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::api::error::ApiError;

/// 凭证有效期（秒）。
pub(crate) const CREDENTIAL_TTL_SEC: u64 = 3600;
/// 固定 JOSE 头。
const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

type HmacSha256 = Hmac<Sha256>;

/// 凭证 payload。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CredentialClaims {
    pub(crate) email: String,
    pub(crate) iat: u64,
    pub(crate) exp: u64,
}

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
}

/// 凭证校验失败原因（仅用于日志，对外统一 401）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum CredentialError {
    #[error("credential is not a three-part token")]
    Malformed,
    #[error("credential header is not HS256")]
    UnsupportedHeader,
    #[error("credential signature mismatch")]
    BadSignature,
    #[error("credential claims are invalid")]
    BadClaims,
    #[error("credential expired")]
    Expired,
}

/// 签发凭证：`exp = now + CREDENTIAL_TTL_SEC`。
pub(crate) fn issue_credential(
    signing_secret: &str,
    claim: &IdentityClaim,
    now: u64,
) -> Result<String, ApiError> {
    let claims = CredentialClaims {
        email: claim.email.clone(),
        iat: now,
        exp: now.saturating_add(CREDENTIAL_TTL_SEC),
    };
    let payload = serde_json::to_vec(&claims)
        .map_err(|err| ApiError::internal(format!("encode credential claims failed: {err}")))?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(JWT_HEADER.as_bytes()),
        URL_SAFE_NO_PAD.encode(payload)
    );
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|_| ApiError::internal("credential signing key rejected"))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{signing_input}.{signature}"))
}

/// 校验凭证签名与有效期，返回其中的身份声明。
pub(crate) fn verify_credential(
    token: &str,
    signing_secret: &str,
    now: u64,
) -> Result<IdentityClaim, CredentialError> {
    let mut parts = token.trim().split('.');
    let header_b64 = parts.next().unwrap_or_default();
    let payload_b64 = parts.next().unwrap_or_default();
    let sig_b64 = parts.next().unwrap_or_default();
    if header_b64.is_empty() || payload_b64.is_empty() || sig_b64.is_empty() || parts.next().is_some()
    {
        return Err(CredentialError::Malformed);
    }

    let header_raw = URL_SAFE_NO_PAD
        .decode(header_b64.as_bytes())
        .map_err(|_| CredentialError::Malformed)?;
    let header: JwtHeader =
        serde_json::from_slice(&header_raw).map_err(|_| CredentialError::Malformed)?;
    if header.alg != "HS256" {
        return Err(CredentialError::UnsupportedHeader);
    }

    let sig = URL_SAFE_NO_PAD
        .decode(sig_b64.as_bytes())
        .map_err(|_| CredentialError::Malformed)?;
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|_| CredentialError::BadSignature)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&sig)
        .map_err(|_| CredentialError::BadSignature)?;

    let payload_raw = URL_SAFE_NO_PAD
        .decode(payload_b64.as_bytes())
        .map_err(|_| CredentialError::BadClaims)?;
    let claims: CredentialClaims =
        serde_json::from_slice(&payload_raw).map_err(|_| CredentialError::BadClaims)?;

    if claims.exp <= now {
        return Err(CredentialError::Expired);
    }

    IdentityClaim::new(&claims.email).map_err(|_| CredentialError::BadClaims)
}
