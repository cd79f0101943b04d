//! Cache Store Port - 内容寻址音频缓存
//!
//! 两个互相独立的命名空间，各自有字节上限

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::audio_codec::AudioContainer;
use crate::domain::ContentKey;

/// Cache 错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// 缓存命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheNamespace {
    /// 原始合成音频（voice + rate + mode + text）
    Raw,
    /// 变声后的输出音频（额外包含模型与变声参数）
    Output,
}

impl CacheNamespace {
    pub const ALL: [CacheNamespace; 2] = [CacheNamespace::Raw, CacheNamespace::Output];

    pub fn name(&self) -> &'static str {
        match self {
            CacheNamespace::Raw => "raw",
            CacheNamespace::Output => "output",
        }
    }
}

impl std::fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 缓存统计信息
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub namespace: CacheNamespace,
    pub dir: PathBuf,
    pub file_count: usize,
    pub total_size: u64,
}

impl CacheStats {
    pub fn size_mb(&self) -> f64 {
        self.total_size as f64 / (1024.0 * 1024.0)
    }
}

/// Cache Store Port
#[async_trait]
pub trait CacheStorePort: Send + Sync {
    /// 查找条目；命中时刷新 last-touched 并返回字节副本
    async fn get(
        &self,
        namespace: CacheNamespace,
        key: &ContentKey,
    ) -> Result<Option<Vec<u8>>, CacheError>;

    /// 写入条目并按当前配置上限淘汰
    ///
    /// 空数据不写入，返回 `Ok(None)`
    async fn put(
        &self,
        namespace: CacheNamespace,
        key: &ContentKey,
        blob: &[u8],
        container: AudioContainer,
    ) -> Result<Option<PathBuf>, CacheError>;

    /// 同 `put`，但使用调用方给出的上限（字节）
    async fn put_with_limit(
        &self,
        namespace: CacheNamespace,
        key: &ContentKey,
        blob: &[u8],
        container: AudioContainer,
        max_bytes: u64,
    ) -> Result<Option<PathBuf>, CacheError>;

    /// 命名空间内所有条目的总字节数
    async fn size(&self, namespace: CacheNamespace) -> u64;

    /// 按 last-touched 从旧到新淘汰，直到不超过上限
    ///
    /// 单个条目本身超限时保留它
    async fn evict_to_limit(&self, namespace: CacheNamespace, max_bytes: u64) -> usize;

    async fn clear(&self, namespace: CacheNamespace) -> usize;

    /// 删除 last-touched 早于 now - age 的条目
    async fn clear_older_than(&self, namespace: CacheNamespace, age: Duration) -> usize;

    async fn stats(&self, namespace: CacheNamespace) -> CacheStats;
}
