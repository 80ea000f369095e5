//! 文档存储文件读写。

use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use cd_shared_protocol::{DATABASE_NAME, now_rfc3339_nanos};
use serde::{Deserialize, Serialize};

use super::{Document, StoreError};

/// 默认存储文件路径（相对当前工作目录）。
pub(crate) const DEFAULT_DATA_PATH: &str = "data/car-doctor.json";

/// 落盘文件结构（读取）。
#[derive(Debug, Default, Deserialize)]
struct StoreFile {
    #[serde(default)]
    collections: BTreeMap<String, Vec<Document>>,
}

/// 落盘文件结构（写入，借用内存数据避免整库克隆）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreFileRef<'a> {
    database: &'a str,
    saved_at: String,
    collections: BTreeMap<&'a str, &'a [Document]>,
}

/// 解析存储文件路径：空值回退默认路径。
pub(crate) fn resolve_data_path(raw: Option<&str>) -> PathBuf {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => PathBuf::from(value),
        None => PathBuf::from(DEFAULT_DATA_PATH),
    }
}

/// 加载全部集合；文件不存在视为空库。
pub(crate) fn load_collections(path: &Path) -> Result<BTreeMap<String, Vec<Document>>, StoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw = fs::read(path)
        .map_err(|err| StoreError::Load(format!("read {} failed: {err}", path.display())))?;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }
    let parsed: StoreFile = serde_json::from_slice(&raw)
        .map_err(|err| StoreError::Load(format!("decode {} failed: {err}", path.display())))?;
    Ok(parsed.collections)
}

/// 持久化全部集合：在当前任务内编码，文件写入交给阻塞线程池。
pub(crate) async fn persist_collections(
    path: &Path,
    collections: BTreeMap<&str, &[Document]>,
) -> Result<(), StoreError> {
    let file = StoreFileRef {
        database: DATABASE_NAME,
        saved_at: now_rfc3339_nanos(),
        collections,
    };
    let encoded = serde_json::to_vec_pretty(&file)
        .map_err(|err| StoreError::Persist(format!("encode store failed: {err}")))?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomically(&path, &encoded))
        .await
        .map_err(|err| StoreError::Persist(format!("persist task failed: {err}")))?
}

/// 先写临时文件再原子替换；替换失败时清理临时文件。
fn write_atomically(path: &Path, encoded: &[u8]) -> Result<(), StoreError> {
    ensure_parent_dir(path).map_err(StoreError::Persist)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, encoded)
        .map_err(|err| StoreError::Persist(format!("write {} failed: {err}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|err| {
        let _ = fs::remove_file(&tmp);
        StoreError::Persist(format!(
            "rename {} -> {} failed: {err}",
            tmp.display(),
            path.display()
        ))
    })
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|err| format!("create store dir {} failed: {err}", parent.display())),
        _ => Ok(()),
    }
}

/// 存储文件独占锁（`<path>.lock`），同一文件同时只允许一个进程打开；句柄释放时删除。
#[derive(Debug)]
pub(crate) struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    pub(crate) fn acquire(data_path: &Path) -> Result<Self, StoreError> {
        ensure_parent_dir(data_path).map_err(StoreError::Load)?;
        let path = lock_path(data_path);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self { path })
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Err(StoreError::Load(format!(
                "{} is already opened by another process; stop it first or remove stale lock {}",
                data_path.display(),
                path.display()
            ))),
            Err(err) => Err(StoreError::Load(format!(
                "create lock {} failed: {err}",
                path.display()
            ))),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn lock_path(data_path: &Path) -> PathBuf {
    let mut raw = data_path.as_os_str().to_owned();
    raw.push(".lock");
    PathBuf::from(raw)
}
