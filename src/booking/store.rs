//! 预订持久化
//!
//! 每条预订以新生成的 UUID 为键写入独立 JSON 文件（reservation-<id>.json）：
//! 先写临时文件再 rename，目标文件以 create_new 语义占位，并发写入方互不覆盖。
//! 写入失败或被中途取消时，占位文件与临时文件一并删除，目录里不会留下空预订。

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::booking::ReservationRecord;

/// 预订标识（存储键）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("reservation {0} already exists")]
    AlreadyExists(ReservationId),

    #[error("reservation {0} not found")]
    NotFound(ReservationId),
}

/// 预订存储：save 生成新键并写入，load 按键读取
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn save(&self, record: &ReservationRecord) -> Result<ReservationId, StoreError>;

    async fn load(&self, id: ReservationId) -> Result<ReservationRecord, StoreError>;
}

/// 序列化为持久化格式（字段名为键的 pretty JSON）
pub fn to_document(record: &ReservationRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(record)
}

pub fn from_document(data: &str) -> Result<ReservationRecord, serde_json::Error> {
    serde_json::from_str(data)
}

/// 文件存储：目录下每条预订一个文件
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, id: ReservationId) -> PathBuf {
        self.dir.join(format!("reservation-{}.json", id))
    }

    fn tmp_path_for(&self, id: ReservationId) -> PathBuf {
        self.dir.join(format!(".reservation-{}.json.tmp", id))
    }

    /// 以给定键写入；键已存在时返回 AlreadyExists，绝不覆盖
    pub async fn save_as(
        &self,
        id: ReservationId,
        record: &ReservationRecord,
    ) -> Result<(), StoreError> {
        let doc = to_document(record)?;
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(id);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(id));
            }
            Err(e) => return Err(e.into()),
        }

        let tmp = self.tmp_path_for(id);
        let mut guard = PendingWrite::new(path.clone(), tmp.clone());
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(doc.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &path).await?;
        guard.commit();

        tracing::info!(reservation_id = %id, path = %path.display(), "reservation saved");
        Ok(())
    }

    /// 列出目录下已保存的预订键
    pub async fn list(&self) -> Result<Vec<ReservationId>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name
                .strip_prefix("reservation-")
                .and_then(|s| s.strip_suffix(".json"))
                .and_then(ReservationId::parse)
            {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

/// 已占位但尚未 rename 完成的写入；未 commit 就被 drop 时删除占位与临时文件
struct PendingWrite {
    path: PathBuf,
    tmp: PathBuf,
    committed: bool,
}

impl PendingWrite {
    fn new(path: PathBuf, tmp: PathBuf) -> Self {
        Self {
            path,
            tmp,
            committed: false,
        }
    }

    fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for PendingWrite {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // 两个文件都可能不存在
        let _ = std::fs::remove_file(&self.tmp);
        let _ = std::fs::remove_file(&self.path);
        tracing::warn!(path = %self.path.display(), "reservation write abandoned, placeholder removed");
    }
}

#[async_trait]
impl ReservationStore for JsonFileStore {
    async fn save(&self, record: &ReservationRecord) -> Result<ReservationId, StoreError> {
        let id = ReservationId::generate();
        self.save_as(id, record).await?;
        Ok(id)
    }

    async fn load(&self, id: ReservationId) -> Result<ReservationRecord, StoreError> {
        let data = match fs::read_to_string(self.path_for(id)).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(from_document(&data)?)
    }
}

/// 内存存储（测试与试运行用）
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<ReservationId, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn ids(&self) -> Vec<ReservationId> {
        self.records.lock().await.keys().copied().collect()
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn save(&self, record: &ReservationRecord) -> Result<ReservationId, StoreError> {
        let doc = to_document(record)?;
        let id = ReservationId::generate();
        let mut records = self.records.lock().await;
        if records.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        records.insert(id, doc);
        Ok(id)
    }

    async fn load(&self, id: ReservationId) -> Result<ReservationRecord, StoreError> {
        let records = self.records.lock().await;
        let doc = records.get(&id).ok_or(StoreError::NotFound(id))?;
        Ok(from_document(doc)?)
    }
}
