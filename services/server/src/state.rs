//! 服务共享状态：文档存储句柄与凭证配置。

use std::sync::Arc;

use crate::{config::Config, store::DocumentStore};

/// 请求处理共享状态，启动时显式构造一次。
#[derive(Clone)]
pub(crate) struct AppState {
    /// 文档存储（进程生命周期内唯一）。
    pub(crate) store: Arc<DocumentStore>,
    /// 凭证签名密钥（启动后只读）。
    pub(crate) signing_secret: Arc<str>,
    /// 凭证 cookie 是否附带 Secure。
    pub(crate) cookie_secure: bool,
}

impl AppState {
    /// 由配置与已打开的存储构造状态。
    pub(crate) fn new(config: &Config, store: DocumentStore) -> Self {
        Self {
            store: Arc::new(store),
            signing_secret: Arc::from(config.signing_secret.as_str()),
            cookie_secure: config.cookie_secure,
        }
    }
}
