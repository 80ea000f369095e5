//! API 请求/查询参数类型。

use serde::Deserialize;

/// 凭证签发请求：只读取 `email`，其他字段忽略。
#[derive(Debug, Deserialize)]
pub(crate) struct IssueCredentialRequest {
    #[serde(default)]
    pub(crate) email: String,
}

/// 预约列表查询参数。
#[derive(Debug, Default, Deserialize)]
pub(crate) struct BookingsQuery {
    #[serde(default)]
    pub(crate) email: Option<String>,
}
