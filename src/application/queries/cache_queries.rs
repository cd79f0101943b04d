//! Cache Queries - 缓存统计查询

use serde::Serialize;
use std::path::PathBuf;

use crate::application::ports::{CacheNamespace, CacheStats};

/// 获取两个命名空间的缓存统计
#[derive(Debug, Clone, Default)]
pub struct GetCacheStats;

/// 单个命名空间的统计
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceStats {
    pub namespace: CacheNamespace,
    pub dir: PathBuf,
    pub file_count: usize,
    pub total_size: u64,
    pub size_mb: f64,
}

impl From<CacheStats> for NamespaceStats {
    fn from(stats: CacheStats) -> Self {
        Self {
            size_mb: stats.size_mb(),
            namespace: stats.namespace,
            dir: stats.dir,
            file_count: stats.file_count,
            total_size: stats.total_size,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetCacheStatsResponse {
    pub namespaces: Vec<NamespaceStats>,
}
