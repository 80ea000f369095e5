//! API 错误定义与响应转换。

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cd_shared_protocol::{ClaimError, IdParseError};
use tracing::{error, warn};

use super::response::ApiEnvelope;
use crate::store::StoreError;

/// 认证与接口错误。
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) code: &'static str,
    pub(crate) message: String,
    pub(crate) suggestion: &'static str,
}

impl ApiError {
    /// 构造统一 API 错误。
    pub(crate) fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        suggestion: &'static str,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            suggestion,
        }
    }

    /// 缺少或无效凭证；不区分具体原因。
    pub(crate) fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "未授权访问",
            "请重新登录",
        )
    }

    /// 身份与请求范围不一致。
    pub(crate) fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "禁止访问",
            "只能查询当前登录账号的数据",
        )
    }

    /// 请求参数或请求体校验失败。
    pub(crate) fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message, "请检查请求参数")
    }

    /// 服务端内部错误，细节只写日志。
    pub(crate) fn internal(detail: impl std::fmt::Display) -> Self {
        error!("internal error: {detail}");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "服务内部错误",
            "请稍后重试",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiEnvelope {
                ok: false,
                code: self.code.to_string(),
                message: self.message,
                suggestion: self.suggestion.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!("storage operation failed: {err}");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "STORAGE_ERROR",
            "存储服务异常",
            "请稍后重试",
        )
    }
}

impl From<IdParseError> for ApiError {
    fn from(err: IdParseError) -> Self {
        Self::bad_request("INVALID_ID", format!("记录 ID 无效: {err}"))
    }
}

impl From<ClaimError> for ApiError {
    fn from(err: ClaimError) -> Self {
        Self::bad_request("INVALID_IDENTITY", format!("身份信息无效: {err}"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("reject request body: {rejection}");
        Self::bad_request("INVALID_BODY", format!("请求体无效: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!("reject query string: {rejection}");
        Self::bad_request("INVALID_BODY", format!("查询参数无效: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, response::IntoResponse};

    use super::*;

    #[tokio::test]
    async fn error_body_carries_code_and_message() {
        let resp = ApiError::forbidden().into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "FORBIDDEN");
        assert!(body["message"].is_string());
    }

    #[test]
    fn storage_errors_map_to_500_without_detail() {
        let err = ApiError::from(StoreError::Persist("disk full".to_string()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "STORAGE_ERROR");
        assert!(!err.message.contains("disk full"));
    }

    #[test]
    fn malformed_ids_map_to_400() {
        let err = ApiError::from("nope".parse::<cd_shared_protocol::RecordId>().unwrap_err());
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INVALID_ID");
    }
}
