//! 登录（签发凭证 cookie）与登出接口。

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use axum_extra::extract::cookie::CookieJar;
use cd_shared_protocol::{IdentityClaim, SuccessBody, unix_now};
use tracing::info;

use crate::{
    api::{error::ApiError, types::IssueCredentialRequest},
    auth::{
        cookie::{credential_cookie, removal_cookie},
        token::issue_credential,
    },
    state::AppState,
};

/// `POST /jwt`：校验身份声明后签发凭证，只写 cookie，不在响应体返回凭证。
pub(crate) async fn issue_credential_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<IssueCredentialRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<SuccessBody>), ApiError> {
    let Json(req) = payload?;
    let claim = IdentityClaim::new(&req.email)?;
    let token = issue_credential(&state.signing_secret, &claim, unix_now())?;
    info!(email = %claim.email, "credential issued");
    Ok((
        jar.add(credential_cookie(token, state.cookie_secure)),
        Json(SuccessBody::ok()),
    ))
}

/// `POST /logout`：无条件清除凭证 cookie。
pub(crate) async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<SuccessBody>) {
    info!("credential cookie cleared");
    (
        jar.add(removal_cookie(state.cookie_secure)),
        Json(SuccessBody::ok()),
    )
}
