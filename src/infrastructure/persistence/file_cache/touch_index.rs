//! Touch Index - key → last-touched 索引
//!
//! 淘汰顺序不依赖文件系统 mtime 精度：按 (last_touched_ms, seq) 排序，
//! seq 为单调递增计数，同一毫秒内的写入/读取仍然有确定先后。
//! 索引以 bincode 快照保存在命名空间目录下的隐藏文件中。

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::application::ports::{AudioContainer, CacheError};
use crate::domain::ContentKey;

/// 索引文件名
pub const INDEX_FILE_NAME: &str = ".touch-index";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub container: AudioContainer,
    pub size_bytes: u64,
    pub last_touched_ms: i64,
    pub seq: u64,
}

impl IndexEntry {
    fn order_key(&self) -> (i64, u64) {
        (self.last_touched_ms, self.seq)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexSnapshot {
    next_seq: u64,
    entries: Vec<(ContentKey, IndexEntry)>,
}

pub struct TouchIndex {
    path: PathBuf,
    entries: DashMap<ContentKey, IndexEntry>,
    next_seq: AtomicU64,
}

impl TouchIndex {
    /// 加载索引快照；文件缺失或损坏时从空索引开始
    pub async fn load(dir: &Path) -> Self {
        let path = dir.join(INDEX_FILE_NAME);
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => bincode::deserialize::<IndexSnapshot>(&bytes).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt cache index, rebuilding"
                );
                IndexSnapshot::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexSnapshot::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read cache index");
                IndexSnapshot::default()
            }
        };

        let entries = DashMap::new();
        for (key, entry) in snapshot.entries {
            entries.insert(key, entry);
        }

        Self {
            path,
            entries,
            next_seq: AtomicU64::new(snapshot.next_seq),
        }
    }

    fn bump_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self, key: &ContentKey) -> Option<IndexEntry> {
        self.entries.get(key).map(|e| e.clone())
    }

    /// 记录新写入（或覆盖）的条目，视为最新
    pub fn insert(&self, key: ContentKey, container: AudioContainer, size_bytes: u64) {
        let entry = IndexEntry {
            container,
            size_bytes,
            last_touched_ms: Utc::now().timestamp_millis(),
            seq: self.bump_seq(),
        };
        self.entries.insert(key, entry);
    }

    /// 接管磁盘上已有但未登记的文件，使用其 mtime
    pub fn adopt(
        &self,
        key: ContentKey,
        container: AudioContainer,
        size_bytes: u64,
        touched_ms: i64,
    ) {
        let entry = IndexEntry {
            container,
            size_bytes,
            last_touched_ms: touched_ms,
            seq: self.bump_seq(),
        };
        self.entries.insert(key, entry);
    }

    /// 刷新 last-touched
    pub fn touch(&self, key: &ContentKey) -> Option<IndexEntry> {
        let seq = self.bump_seq();
        let mut entry = self.entries.get_mut(key)?;
        entry.last_touched_ms = Utc::now().timestamp_millis();
        entry.seq = seq;
        Some(entry.clone())
    }

    pub fn remove(&self, key: &ContentKey) -> Option<IndexEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }

    pub fn keys(&self) -> Vec<ContentKey> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// 按 touch 先后排序，最旧的在前
    pub fn oldest_first(&self) -> Vec<(ContentKey, IndexEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by_key(|(_, entry)| entry.order_key());
        entries
    }

    /// 写回快照
    pub async fn persist(&self) -> Result<(), CacheError> {
        let snapshot = IndexSnapshot {
            next_seq: self.next_seq.load(Ordering::Relaxed),
            entries: self.oldest_first(),
        };
        let bytes =
            bincode::serialize(&snapshot).map_err(|e| CacheError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| CacheError::Io(e.to_string()))
    }
}
