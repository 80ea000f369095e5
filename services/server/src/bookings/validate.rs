//! 预约写入前的结构校验。

use cd_shared_protocol::{ClaimError, ID_FIELD, validate_email};
use serde_json::Value;
use thiserror::Error;

use crate::store::Document;

/// 预约状态最大长度。
pub(crate) const MAX_STATUS_LEN: usize = 64;
/// 若出现则必须为字符串的字段。
const STRING_FIELDS: &[&str] = &["service_id", "date", "customerName", "service", "img"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum BookingValidationError {
    #[error("body must be a JSON object")]
    NotObject,
    #[error("`email` {0}")]
    Email(ClaimError),
    #[error("`_id` is assigned by the server")]
    IdSupplied,
    #[error("`{0}` must be a string")]
    NotString(&'static str),
    #[error("`price` must be a number or a numeric string")]
    Price,
    #[error("`status` must be a non-empty string of at most 64 characters")]
    Status,
}

/// 通过校验的新预约文档。
#[derive(Debug)]
pub(crate) struct NewBooking(Document);

impl NewBooking {
    /// 校验请求体：必须有合法 `email`，已知字段类型正确，其余字段原样保留。
    pub(crate) fn parse(body: Value) -> Result<Self, BookingValidationError> {
        let Value::Object(mut doc) = body else {
            return Err(BookingValidationError::NotObject);
        };
        if doc.contains_key(ID_FIELD) {
            return Err(BookingValidationError::IdSupplied);
        }

        let email = match doc.get("email") {
            Some(Value::String(raw)) => validate_email(raw)
                .map_err(BookingValidationError::Email)?
                .to_string(),
            Some(_) => return Err(BookingValidationError::NotString("email")),
            None => return Err(BookingValidationError::Email(ClaimError::Empty)),
        };
        doc.insert("email".to_string(), Value::String(email));

        for field in STRING_FIELDS {
            if let Some(value) = doc.get(*field)
                && !value.is_string()
            {
                return Err(BookingValidationError::NotString(*field));
            }
        }

        match doc.get("price") {
            None | Some(Value::Number(_)) => {}
            Some(Value::String(raw)) if is_finite_number(raw) => {}
            Some(_) => return Err(BookingValidationError::Price),
        }

        if let Some(value) = doc.get("status") {
            let status = normalize_status(value)?;
            doc.insert("status".to_string(), Value::String(status));
        }

        Ok(Self(doc))
    }

    pub(crate) fn email(&self) -> &str {
        self.0
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub(crate) fn into_document(self) -> Document {
        self.0
    }
}

/// 状态更新：只接受 `status`，其余字段忽略。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatusUpdate {
    pub(crate) status: String,
}

impl StatusUpdate {
    pub(crate) fn parse(body: Value) -> Result<Self, BookingValidationError> {
        let Value::Object(doc) = body else {
            return Err(BookingValidationError::NotObject);
        };
        let status = doc
            .get("status")
            .ok_or(BookingValidationError::Status)
            .and_then(normalize_status)?;
        Ok(Self { status })
    }

    /// 转为 `$set` 风格的字段集合。
    pub(crate) fn into_set(self) -> Document {
        let mut set = Document::new();
        set.insert("status".to_string(), Value::String(self.status));
        set
    }
}

fn is_finite_number(raw: &str) -> bool {
    raw.trim()
        .parse::<f64>()
        .is_ok_and(|value| value.is_finite())
}

fn normalize_status(value: &Value) -> Result<String, BookingValidationError> {
    let status = value
        .as_str()
        .map(str::trim)
        .filter(|status| !status.is_empty() && status.chars().count() <= MAX_STATUS_LEN)
        .ok_or(BookingValidationError::Status)?;
    Ok(status.to_string())
}
