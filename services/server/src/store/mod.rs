//! 文档存储：按集合保存 JSON 文档，支持按条件查询/插入/更新/删除，可选落盘。
//!
//! 进程启动时构造一次，经 `AppState` 共享给所有请求。集合由 `RwLock` 保护：
//! 读操作并发执行，写操作互斥，并在同一把写锁内完成落盘。

pub(crate) mod persist;

use std::{collections::BTreeMap, path::PathBuf};

use cd_shared_protocol::{DeleteResult, ID_FIELD, InsertOneResult, RecordId, UpdateResult};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// 单个 JSON 文档。
pub(crate) type Document = serde_json::Map<String, Value>;

/// 存储层错误。
#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("load store failed: {0}")]
    Load(String),
    #[error("persist store failed: {0}")]
    Persist(String),
    #[error("document in `{collection}` has invalid _id: {reason}")]
    InvalidId { collection: String, reason: String },
}

/// 等值条件的合取。
#[derive(Debug, Clone, Default)]
pub(crate) struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    /// 匹配全部文档。
    pub(crate) fn all() -> Self {
        Self::default()
    }

    /// 按主键匹配。
    pub(crate) fn by_id(id: RecordId) -> Self {
        Self::all().eq(ID_FIELD, id.to_string())
    }

    /// 追加字段等值条件。
    pub(crate) fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    fn matches(&self, doc: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| doc.get(field) == Some(value))
    }
}

/// 字段投影：保留 `_id` 与指定字段。
#[derive(Debug, Clone)]
pub(crate) struct Projection {
    fields: &'static [&'static str],
}

impl Projection {
    pub(crate) const fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }

    fn apply(&self, doc: &Document) -> Document {
        doc.iter()
            .filter(|(key, _)| key.as_str() == ID_FIELD || self.fields.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// 文档存储句柄。
pub(crate) struct DocumentStore {
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
    path: Option<PathBuf>,
    _lock: Option<persist::StoreLock>,
}

impl DocumentStore {
    /// 纯内存存储（不落盘）。
    pub(crate) fn in_memory() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
            path: None,
            _lock: None,
        }
    }

    /// 打开落盘存储并独占该文件；文件不存在时从空库开始。
    pub(crate) fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let lock = persist::StoreLock::acquire(&path)?;
        let collections = persist::load_collections(&path)?;
        Ok(Self {
            collections: RwLock::new(collections),
            path: Some(path),
            _lock: Some(lock),
        })
    }

    /// 连通性检查：返回各集合文档数。
    pub(crate) async fn ping(&self) -> BTreeMap<String, usize> {
        let guard = self.collections.read().await;
        guard
            .iter()
            .map(|(name, docs)| (name.clone(), docs.len()))
            .collect()
    }

    /// 查询全部匹配文档，保持插入顺序。
    pub(crate) async fn find(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default())
    }

    /// 查询首个匹配文档，可选投影。
    pub(crate) async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        let found = guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)));
        Ok(found.map(|doc| match projection {
            Some(projection) => projection.apply(doc),
            None => doc.clone(),
        }))
    }

    /// 插入新文档，总是分配新的 `_id`。
    pub(crate) async fn insert_one(
        &self,
        collection: &str,
        mut doc: Document,
    ) -> Result<InsertOneResult, StoreError> {
        let id = RecordId::generate();
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        self.mutate(collection, |docs| {
            docs.push(doc);
            ((), true)
        })
        .await?;
        debug!(collection, %id, "document inserted");
        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: id,
        })
    }

    /// 批量导入：带 `_id` 且已存在的文档跳过，缺 `_id` 的分配新值。返回实际插入数。
    pub(crate) async fn insert_many_if_absent(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<usize, StoreError> {
        let mut prepared = Vec::with_capacity(docs.len());
        for mut doc in docs {
            let id = match doc.get(ID_FIELD) {
                None => RecordId::generate(),
                Some(Value::String(raw)) => {
                    raw.parse::<RecordId>()
                        .map_err(|err| StoreError::InvalidId {
                            collection: collection.to_string(),
                            reason: err.to_string(),
                        })?
                }
                Some(other) => {
                    return Err(StoreError::InvalidId {
                        collection: collection.to_string(),
                        reason: format!("expected string, got {other}"),
                    });
                }
            };
            doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            prepared.push(doc);
        }

        self.mutate(collection, |existing| {
            let mut inserted = 0;
            for doc in prepared {
                let duplicate = existing
                    .iter()
                    .any(|current| current.get(ID_FIELD) == doc.get(ID_FIELD));
                if !duplicate {
                    existing.push(doc);
                    inserted += 1;
                }
            }
            (inserted, inserted > 0)
        })
        .await
    }

    /// 更新首个匹配文档的指定字段；`_id` 不可修改。
    pub(crate) async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<UpdateResult, StoreError> {
        let (matched, modified) = self
            .mutate(collection, |docs| {
                let Some(doc) = docs.iter_mut().find(|doc| filter.matches(doc)) else {
                    return ((0, 0), false);
                };
                let mut changed = false;
                for (key, value) in set {
                    if key == ID_FIELD {
                        continue;
                    }
                    if doc.get(&key) != Some(&value) {
                        doc.insert(key, value);
                        changed = true;
                    }
                }
                ((1, u64::from(changed)), changed)
            })
            .await?;
        Ok(UpdateResult {
            acknowledged: true,
            matched_count: matched,
            modified_count: modified,
            upserted_count: 0,
            upserted_id: None,
        })
    }

    /// 删除首个匹配文档。
    pub(crate) async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<DeleteResult, StoreError> {
        let deleted = self
            .mutate(collection, |docs| {
                match docs.iter().position(|doc| filter.matches(doc)) {
                    Some(idx) => {
                        docs.remove(idx);
                        (1, true)
                    }
                    None => (0, false),
                }
            })
            .await?;
        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: deleted,
        })
    }

    /// 在写锁内对集合副本执行变更；有变更且需落盘时先落盘成功再替换内存数据。
    async fn mutate<T>(
        &self,
        collection: &str,
        op: impl FnOnce(&mut Vec<Document>) -> (T, bool),
    ) -> Result<T, StoreError> {
        let mut guard = self.collections.write().await;
        let mut staged = guard.get(collection).cloned().unwrap_or_default();
        let (out, changed) = op(&mut staged);
        if !changed {
            return Ok(out);
        }

        if let Some(path) = &self.path {
            let view = guard
                .iter()
                .filter(|(name, _)| name.as_str() != collection)
                .map(|(name, docs)| (name.as_str(), docs.as_slice()))
                .chain(std::iter::once((collection, staged.as_slice())))
                .collect();
            persist::persist_collections(path, view).await?;
        }
        guard.insert(collection.to_string(), staged);
        Ok(out)
    }
}
