//! 鉴权模块：凭证签发/校验、凭证 cookie、校验中间件与归属检查。

pub(crate) mod cookie;
pub(crate) mod handlers;
pub(crate) mod middleware;
pub(crate) mod token;
