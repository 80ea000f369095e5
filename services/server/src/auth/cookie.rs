//! 凭证 cookie 构造。

use axum_extra::extract::cookie::Cookie;

/// 凭证 cookie 名。
pub(crate) const CREDENTIAL_COOKIE: &str = "token";

/// 写入凭证的 cookie：HttpOnly，按配置附带 Secure，作用于全站路径。
pub(crate) fn credential_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CREDENTIAL_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .path("/")
        .build()
}

/// 清除凭证的 cookie：空值 + `Max-Age=0` + 过期时间置于过去。
pub(crate) fn removal_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = credential_cookie(String::new(), secure);
    cookie.make_removal();
    cookie
}
