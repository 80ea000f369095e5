// 文件职责：
// 1) 定义 server 与运维工具共用的协议数据结构（记录 ID、身份声明、写操作结果）。
// 2) 提供时间戳、邮箱校验等跨模块一致的基础函数。
// 3) 作为 Rust 侧协议唯一代码源，供其他 crate 复用。

use std::{fmt, str::FromStr};

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;
use uuid::Uuid;

/// 逻辑数据库名（持久化文件与日志中使用）。
pub const DATABASE_NAME: &str = "carDoctor";
/// 服务项目集合。
pub const SERVICES_COLLECTION: &str = "services";
/// 预约集合。
pub const BOOKINGS_COLLECTION: &str = "bookings";
/// 文档主键字段。
pub const ID_FIELD: &str = "_id";
/// 邮箱最大长度（RFC 5321 路径上限）。
pub const MAX_EMAIL_LEN: usize = 254;

/// 当前 unix 秒。
pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

/// 生成纳秒精度 UTC 时间戳（RFC3339）。
pub fn now_rfc3339_nanos() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

/// 记录 ID 解析错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("record id must be 24 hex characters, got {0}")]
    Length(usize),
    #[error("record id contains non-hex characters")]
    NotHex,
}

/// 12 字节记录 ID：4 字节大端秒级时间戳 + 8 字节随机数，文本形式为 24 位小写 hex。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId([u8; 12]);

impl RecordId {
    /// 生成新的记录 ID。
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        let ts = u32::try_from(unix_now()).unwrap_or(u32::MAX);
        let random = Uuid::new_v4();
        bytes[..4].copy_from_slice(&ts.to_be_bytes());
        bytes[4..].copy_from_slice(&random.as_bytes()[..8]);
        Self(bytes)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for RecordId {
    type Err = IdParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.len() != 24 {
            return Err(IdParseError::Length(raw.len()));
        }
        if !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdParseError::NotHex);
        }
        let mut bytes = [0u8; 12];
        for (idx, slot) in bytes.iter_mut().enumerate() {
            let pair = &raw[idx * 2..idx * 2 + 2];
            *slot = u8::from_str_radix(pair, 16).map_err(|_| IdParseError::NotHex)?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// 身份声明校验错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("email is required")]
    Empty,
    #[error("email exceeds 254 characters")]
    TooLong,
    #[error("email is malformed")]
    Malformed,
}

/// 校验邮箱形态，返回去除首尾空白后的值。
pub fn validate_email(raw: &str) -> Result<&str, ClaimError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(ClaimError::Empty);
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(ClaimError::TooLong);
    }
    let mut parts = email.split('@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty()
        || domain.is_empty()
        || parts.next().is_some()
        || email.chars().any(char::is_whitespace)
    {
        return Err(ClaimError::Malformed);
    }
    Ok(email)
}

/// 凭证内携带的身份声明。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    // 登录身份（邮箱）。
    pub email: String,
}

impl IdentityClaim {
    /// 校验并构造身份声明。
    pub fn new(raw_email: &str) -> Result<Self, ClaimError> {
        let email = validate_email(raw_email)?;
        Ok(Self {
            email: email.to_string(),
        })
    }
}

/// 通用成功响应 `{ "success": true }`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessBody {
    pub success: bool,
}

impl SuccessBody {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResult {
    // 写入是否被存储层确认。
    pub acknowledged: bool,
    // 新文档 ID。
    pub inserted_id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    // 写入是否被存储层确认。
    pub acknowledged: bool,
    // 命中过滤条件的文档数。
    pub matched_count: u64,
    // 实际发生变更的文档数。
    pub modified_count: u64,
    // upsert 插入数（本服务恒为 0）。
    pub upserted_count: u64,
    // upsert 插入的文档 ID（本服务恒为 null）。
    pub upserted_id: Option<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    // 写入是否被存储层确认。
    pub acknowledged: bool,
    // 删除的文档数。
    pub deleted_count: u64,
}
