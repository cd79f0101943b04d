//! Cache Commands - 缓存维护

use serde::Serialize;
use std::time::Duration;

use crate::application::ports::CacheNamespace;

/// 清理两个命名空间的缓存
#[derive(Debug, Clone, Default)]
pub struct ClearCache {
    /// 只删除超过该时长未被访问的条目；None 表示全部删除
    pub older_than: Option<Duration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceCleared {
    pub namespace: CacheNamespace,
    pub removed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    pub cleared: Vec<NamespaceCleared>,
}

impl ClearCacheResponse {
    pub fn total_removed(&self) -> usize {
        self.cleared.iter().map(|c| c.removed).sum()
    }
}
