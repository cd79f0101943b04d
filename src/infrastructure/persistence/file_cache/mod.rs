//! File Cache - 基于目录的内容寻址音频缓存

mod cache_store;
mod touch_index;

pub use cache_store::{FileCacheConfig, FileCacheStore, NamespaceConfig, SizeLimit};
