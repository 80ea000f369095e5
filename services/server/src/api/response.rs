//! API 错误响应包裹。

use serde::{Deserialize, Serialize};

/// 失败响应体：`message` 字段始终存在，便于前端直接展示。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiEnvelope {
    pub(crate) ok: bool,
    pub(crate) code: String,
    pub(crate) message: String,
    pub(crate) suggestion: String,
}
