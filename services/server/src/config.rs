//! 配置模块职责：
//! 1. 读取服务运行所需的环境变量（可由 `.env` 预加载），并提供默认值。
//! 2. 校验签名密钥、端口等启动必需项，缺失时拒绝启动。
//! 3. 提供布尔/CSV 解析与脱敏输出（供 `doctor` 命令使用）。

use std::{fmt, path::PathBuf};

use anyhow::{Context, anyhow, bail};
use serde_json::{Value, json};

use crate::store::persist::resolve_data_path;

/// 默认监听端口。
pub(crate) const DEFAULT_PORT: u16 = 5000;
/// 默认监听地址。
const DEFAULT_BIND_HOST: &str = "0.0.0.0";
/// 默认允许的前端来源。
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";
/// 签名密钥最短字节数。
const MIN_SECRET_LEN: usize = 16;
/// 签名密钥环境变量。
pub(crate) const SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";

/// 服务运行时配置。
#[derive(Clone)]
pub(crate) struct Config {
    /// 监听地址（host:port）。
    pub(crate) bind_addr: String,
    /// 凭证签名密钥。
    pub(crate) signing_secret: String,
    /// 文档存储文件路径。
    pub(crate) data_path: PathBuf,
    /// CORS 允许来源。
    pub(crate) cors_origins: Vec<String>,
    /// 凭证 cookie 是否附带 Secure。
    pub(crate) cookie_secure: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("signing_secret", &"<redacted>")
            .field("data_path", &self.data_path)
            .field("cors_origins", &self.cors_origins)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

impl Config {
    /// 从进程环境变量构建配置。
    pub(crate) fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源构建配置，空白值视为未设置。
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid PORT: {raw}"))?,
            None => DEFAULT_PORT,
        };
        let host = get("CD_BIND_HOST").unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());

        let Some(signing_secret) = get(SECRET_ENV) else {
            bail!("{SECRET_ENV} is required");
        };
        if signing_secret.len() < MIN_SECRET_LEN {
            bail!("{SECRET_ENV} must be at least {MIN_SECRET_LEN} bytes");
        }

        let cookie_secure = match get("CD_COOKIE_SECURE") {
            Some(raw) => {
                parse_bool(&raw).ok_or_else(|| anyhow!("invalid CD_COOKIE_SECURE: {raw}"))?
            }
            None => true,
        };

        let cors_origins = parse_csv(
            &get("CD_CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
        );
        if cors_origins.iter().any(|origin| origin == "*") {
            bail!("CD_CORS_ORIGINS cannot contain '*' when credentials are allowed");
        }

        Ok(Self {
            bind_addr: format!("{host}:{port}"),
            signing_secret,
            data_path: resolve_data_path(get("CD_DATA_PATH").as_deref()),
            cors_origins,
            cookie_secure,
        })
    }

    /// 脱敏后的配置快照。
    pub(crate) fn redacted_json(&self) -> Value {
        json!({
            "bindAddr": self.bind_addr,
            "signingSecret": "<redacted>",
            "dataPath": self.data_path.display().to_string(),
            "corsOrigins": self.cors_origins,
            "cookieSecure": self.cookie_secure,
        })
    }
}

/// 解析布尔值：`1/true/yes/on` 与 `0/false/no/off`。
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// 解析逗号分隔列表，去空白与空项。
pub(crate) fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect()
}
