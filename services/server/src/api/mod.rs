//! HTTP 接口公共层：错误、响应包裹与请求类型。

pub(crate) mod error;
pub(crate) mod response;
pub(crate) mod types;
