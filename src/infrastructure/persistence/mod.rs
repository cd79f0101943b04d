//! Persistence Layer - 数据持久化
//!
//! 音频缓存的文件系统实现

pub mod file_cache;

pub use file_cache::{FileCacheConfig, FileCacheStore, NamespaceConfig, SizeLimit};
