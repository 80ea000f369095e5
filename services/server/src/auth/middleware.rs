//! 凭证校验中间件、已认证身份提取器与归属检查。

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use cd_shared_protocol::{IdentityClaim, unix_now};
use tracing::{debug, warn};

use crate::{
    api::error::ApiError,
    auth::{cookie::CREDENTIAL_COOKIE, token::verify_credential},
    state::AppState,
};

/// 校验 `token` cookie：缺失或无效直接 401，有效则把身份声明挂到请求扩展上。
pub(crate) async fn require_credential(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(cookie) = jar.get(CREDENTIAL_COOKIE) else {
        warn!(uri = %request.uri(), "credential missing");
        return Err(ApiError::unauthorized());
    };
    let claim = verify_credential(cookie.value(), &state.signing_secret, unix_now()).map_err(
        |reason| {
            warn!(uri = %request.uri(), %reason, "credential rejected");
            ApiError::unauthorized()
        },
    )?;
    debug!(email = %claim.email, "credential verified");
    request.extensions_mut().insert(claim);
    Ok(next.run(request).await)
}

/// 已通过校验的调用方身份。
#[derive(Debug, Clone)]
pub(crate) struct Authenticated(pub(crate) IdentityClaim);

impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityClaim>()
            .cloned()
            .map(Self)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// 归属检查：请求范围必须存在且与凭证身份一致，返回可用于过滤的邮箱。
pub(crate) fn authorize_scope<'a>(
    identity: &IdentityClaim,
    requested: Option<&'a str>,
) -> Result<&'a str, ApiError> {
    let Some(requested) = requested.map(str::trim).filter(|value| !value.is_empty()) else {
        warn!(email = %identity.email, "booking scope missing");
        return Err(ApiError::forbidden());
    };
    if requested != identity.email {
        warn!(email = %identity.email, requested, "booking scope mismatch");
        return Err(ApiError::forbidden());
    }
    Ok(requested)
}
