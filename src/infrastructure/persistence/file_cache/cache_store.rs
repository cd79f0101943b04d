//! File-backed Audio Cache Implementation
//!
//! 每个命名空间一个根目录，扁平存放 `<md5>.<ext>` 文件

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::touch_index::TouchIndex;
use crate::application::ports::{
    AudioContainer, CacheError, CacheNamespace, CacheStats, CacheStorePort,
};
use crate::domain::ContentKey;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// 命名空间字节上限
///
/// `Env` 在每次淘汰时读取环境变量，进程内修改后下一次写入即生效
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeLimit {
    Fixed(u64),
    Env { var: String, default_mb: u64 },
}

impl SizeLimit {
    pub fn env(var: impl Into<String>, default_mb: u64) -> Self {
        SizeLimit::Env {
            var: var.into(),
            default_mb,
        }
    }

    pub fn fixed_mb(mb: u64) -> Self {
        SizeLimit::Fixed(mb * BYTES_PER_MB)
    }

    /// 当前上限（字节）
    pub fn resolve(&self) -> u64 {
        match self {
            SizeLimit::Fixed(bytes) => *bytes,
            SizeLimit::Env { var, default_mb } => {
                let mb = std::env::var(var)
                    .ok()
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(*default_mb);
                mb * BYTES_PER_MB
            }
        }
    }
}

/// 单个命名空间配置
#[derive(Debug, Clone)]
pub struct NamespaceConfig {
    pub dir: PathBuf,
    pub limit: SizeLimit,
}

/// 文件缓存配置
#[derive(Debug, Clone)]
pub struct FileCacheConfig {
    pub raw: NamespaceConfig,
    pub output: NamespaceConfig,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            raw: NamespaceConfig {
                dir: PathBuf::from("assets/tts_cache"),
                limit: SizeLimit::env("SRT_TTS_CACHE_SIZE_MB", 512),
            },
            output: NamespaceConfig {
                dir: PathBuf::from("assets/tts_output_cache"),
                limit: SizeLimit::env("SRT_TTS_OUTPUT_CACHE_SIZE_MB", 256),
            },
        }
    }
}

struct NamespaceStore {
    namespace: CacheNamespace,
    dir: PathBuf,
    limit: SizeLimit,
    index: TouchIndex,
}

impl NamespaceStore {
    async fn open(namespace: CacheNamespace, config: &NamespaceConfig) -> Result<Self, CacheError> {
        tokio::fs::create_dir_all(&config.dir)
            .await
            .map_err(|e| CacheError::Io(e.to_string()))?;

        let store = Self {
            namespace,
            dir: config.dir.clone(),
            limit: config.limit.clone(),
            index: TouchIndex::load(&config.dir).await,
        };
        store.reconcile().await?;

        tracing::info!(
            namespace = %namespace,
            dir = %store.dir.display(),
            entries = store.index.len(),
            size_bytes = store.index.total_size(),
            "Cache namespace opened"
        );
        Ok(store)
    }

    fn path_for(&self, key: &ContentKey, container: AudioContainer) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.as_str(), container.extension()))
    }

    /// 对齐索引与磁盘：接管未登记的文件，丢弃文件已不存在的条目
    async fn reconcile(&self) -> Result<(), CacheError> {
        let mut on_disk: Vec<(ContentKey, AudioContainer, u64, i64)> = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| CacheError::Io(e.to_string()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::Io(e.to_string()))?
        {
            let Some((key, container)) = parse_file_name(&entry.path()) else {
                continue;
            };
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let touched_ms = metadata
                .modified()
                .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
                .unwrap_or_else(|_| Utc::now().timestamp_millis());
            on_disk.push((key, container, metadata.len(), touched_ms));
        }

        let mut changed = false;
        for key in self.index.keys() {
            let present = on_disk.iter().any(|(k, ..)| *k == key);
            if !present {
                self.index.remove(&key);
                changed = true;
            }
        }

        on_disk.sort_by_key(|(.., touched_ms)| *touched_ms);
        for (key, container, size, touched_ms) in on_disk {
            if self.index.get(&key).is_none() {
                self.index.adopt(key, container, size, touched_ms);
                changed = true;
            }
        }

        if changed {
            self.index.persist().await?;
        }
        Ok(())
    }

    /// 其他进程写入、本进程索引未登记的文件
    async fn adopt_from_disk(&self, key: &ContentKey) -> bool {
        for container in [AudioContainer::Wav, AudioContainer::Mp3] {
            let path = self.path_for(key, container);
            if let Ok(metadata) = tokio::fs::metadata(&path).await {
                if metadata.is_file() {
                    self.index.insert(key.clone(), container, metadata.len());
                    return true;
                }
            }
        }
        false
    }

    async fn persist_index(&self) {
        if let Err(e) = self.index.persist().await {
            tracing::warn!(
                namespace = %self.namespace,
                error = %e,
                "Failed to persist cache index"
            );
        }
    }

    async fn get(&self, key: &ContentKey) -> Result<Option<Vec<u8>>, CacheError> {
        if self.index.get(key).is_none() && !self.adopt_from_disk(key).await {
            return Ok(None);
        }
        let Some(entry) = self.index.touch(key) else {
            return Ok(None);
        };

        let path = self.path_for(key, entry.container);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                self.persist_index().await;
                tracing::debug!(
                    namespace = %self.namespace,
                    key = %key,
                    size_bytes = bytes.len(),
                    "Cache HIT"
                );
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // 文件被外部删除
                self.index.remove(key);
                self.persist_index().await;
                Ok(None)
            }
            Err(e) => Err(CacheError::Io(format!("{}: {}", path.display(), e))),
        }
    }

    async fn put(
        &self,
        key: &ContentKey,
        blob: &[u8],
        container: AudioContainer,
        max_bytes: u64,
    ) -> Result<Option<PathBuf>, CacheError> {
        if blob.is_empty() {
            tracing::debug!(
                namespace = %self.namespace,
                key = %key,
                "Refusing to cache empty payload"
            );
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CacheError::Io(e.to_string()))?;

        // 同 key 换了容器格式时清掉旧文件
        if let Some(previous) = self.index.get(key) {
            if previous.container != container {
                let stale = self.path_for(key, previous.container);
                match tokio::fs::remove_file(&stale).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!(
                            namespace = %self.namespace,
                            path = %stale.display(),
                            error = %e,
                            "Failed to remove stale cache file"
                        );
                    }
                }
            }
        }

        let path = self.path_for(key, container);
        tokio::fs::write(&path, blob)
            .await
            .map_err(|e| CacheError::Io(format!("{}: {}", path.display(), e)))?;
        self.index.insert(key.clone(), container, blob.len() as u64);

        tracing::debug!(
            namespace = %self.namespace,
            key = %key,
            size_bytes = blob.len(),
            "Cache SAVE"
        );

        let evicted = self.evict_to_limit(max_bytes).await;
        if evicted == 0 {
            self.persist_index().await;
        }
        Ok(Some(path))
    }

    async fn evict_to_limit(&self, max_bytes: u64) -> usize {
        let mut current = self.index.total_size();
        if current <= max_bytes {
            return 0;
        }

        // 最新的条目即使单独超限也保留
        let mut candidates = self.index.oldest_first();
        candidates.pop();

        let mut evicted = 0;
        for (key, entry) in candidates {
            if current <= max_bytes {
                break;
            }

            let path = self.path_for(&key, entry.container);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        namespace = %self.namespace,
                        path = %path.display(),
                        error = %e,
                        "Failed to evict cache entry"
                    );
                    continue;
                }
            }

            self.index.remove(&key);
            current = current.saturating_sub(entry.size_bytes);
            evicted += 1;
            tracing::debug!(
                namespace = %self.namespace,
                key = %key,
                size_bytes = entry.size_bytes,
                "Cache EVICT"
            );
        }

        if evicted > 0 {
            tracing::info!(
                namespace = %self.namespace,
                evicted = evicted,
                size_bytes = current,
                max_bytes = max_bytes,
                "Cache limit enforced"
            );
            self.persist_index().await;
        }
        evicted
    }

    /// 删除满足条件的条目，单个失败只记录日志
    async fn remove_where(&self, predicate: impl Fn(i64) -> bool) -> usize {
        let mut removed = 0;
        for (key, entry) in self.index.oldest_first() {
            if !predicate(entry.last_touched_ms) {
                continue;
            }
            let path = self.path_for(&key, entry.container);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        namespace = %self.namespace,
                        path = %path.display(),
                        error = %e,
                        "Failed to remove cache entry"
                    );
                    continue;
                }
            }
            self.index.remove(&key);
        }
        self.persist_index().await;
        removed
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            namespace: self.namespace,
            dir: self.dir.clone(),
            file_count: self.index.len(),
            total_size: self.index.total_size(),
        }
    }
}

fn parse_file_name(path: &Path) -> Option<(ContentKey, AudioContainer)> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some((ContentKey::from_hex(stem)?, AudioContainer::from_extension(ext)?))
}

/// 文件缓存
///
/// 并发写同一个 key 时后写者覆盖；读到正在被覆盖的文件可能得到不完整数据
pub struct FileCacheStore {
    raw: NamespaceStore,
    output: NamespaceStore,
}

impl FileCacheStore {
    pub async fn open(config: &FileCacheConfig) -> Result<Self, CacheError> {
        if config.raw.dir == config.output.dir {
            return Err(CacheError::Io(
                "raw and output cache directories must differ".to_string(),
            ));
        }
        Ok(Self {
            raw: NamespaceStore::open(CacheNamespace::Raw, &config.raw).await?,
            output: NamespaceStore::open(CacheNamespace::Output, &config.output).await?,
        })
    }

    /// 打开失败时记录告警并返回 None，调用方不带缓存继续运行
    pub async fn open_or_disabled(config: &FileCacheConfig) -> Option<Self> {
        match Self::open(config).await {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(
                    raw_dir = %config.raw.dir.display(),
                    output_dir = %config.output.dir.display(),
                    error = %e,
                    "Audio cache unavailable, continuing without cache"
                );
                None
            }
        }
    }

    fn store(&self, namespace: CacheNamespace) -> &NamespaceStore {
        match namespace {
            CacheNamespace::Raw => &self.raw,
            CacheNamespace::Output => &self.output,
        }
    }
}

#[async_trait]
impl CacheStorePort for FileCacheStore {
    async fn get(
        &self,
        namespace: CacheNamespace,
        key: &ContentKey,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        self.store(namespace).get(key).await
    }

    async fn put(
        &self,
        namespace: CacheNamespace,
        key: &ContentKey,
        blob: &[u8],
        container: AudioContainer,
    ) -> Result<Option<PathBuf>, CacheError> {
        let store = self.store(namespace);
        let max_bytes = store.limit.resolve();
        store.put(key, blob, container, max_bytes).await
    }

    async fn put_with_limit(
        &self,
        namespace: CacheNamespace,
        key: &ContentKey,
        blob: &[u8],
        container: AudioContainer,
        max_bytes: u64,
    ) -> Result<Option<PathBuf>, CacheError> {
        self.store(namespace).put(key, blob, container, max_bytes).await
    }

    async fn size(&self, namespace: CacheNamespace) -> u64 {
        self.store(namespace).index.total_size()
    }

    async fn evict_to_limit(&self, namespace: CacheNamespace, max_bytes: u64) -> usize {
        self.store(namespace).evict_to_limit(max_bytes).await
    }

    async fn clear(&self, namespace: CacheNamespace) -> usize {
        let removed = self.store(namespace).remove_where(|_| true).await;
        tracing::info!(namespace = %namespace, removed = removed, "Cache cleared");
        removed
    }

    async fn clear_older_than(&self, namespace: CacheNamespace, age: Duration) -> usize {
        let age_ms = i64::try_from(age.as_millis()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(age_ms);
        let removed = self
            .store(namespace)
            .remove_where(|touched_ms| touched_ms <= cutoff)
            .await;
        tracing::info!(
            namespace = %namespace,
            removed = removed,
            age_secs = age.as_secs(),
            "Expired cache entries cleared"
        );
        removed
    }

    async fn stats(&self, namespace: CacheNamespace) -> CacheStats {
        self.store(namespace).stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn key(n: u32) -> ContentKey {
        ContentKey::derive("azure", &["voice", "1.0", &format!("text {}", n)])
    }

    fn config_in(dir: &TempDir, raw_limit: SizeLimit) -> FileCacheConfig {
        FileCacheConfig {
            raw: NamespaceConfig {
                dir: dir.path().join("raw"),
                limit: raw_limit,
            },
            output: NamespaceConfig {
                dir: dir.path().join("output"),
                limit: SizeLimit::Fixed(1024 * 1024),
            },
        }
    }

    async fn open(dir: &TempDir, raw_limit: SizeLimit) -> FileCacheStore {
        FileCacheStore::open(&config_in(dir, raw_limit)).await.unwrap()
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(1024 * 1024)).await;
        let blob = vec![7u8; 300];

        let path = cache
            .put(CacheNamespace::Raw, &key(1), &blob, AudioContainer::Wav)
            .await
            .unwrap()
            .unwrap();
        assert!(path.ends_with(format!("{}.wav", key(1))));
        assert!(path.exists());

        let read = cache.get(CacheNamespace::Raw, &key(1)).await.unwrap();
        assert_eq!(read, Some(blob));
        assert_eq!(cache.get(CacheNamespace::Raw, &key(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_payload_is_not_stored() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(1024)).await;
        let stored = cache
            .put(CacheNamespace::Raw, &key(1), &[], AudioContainer::Mp3)
            .await
            .unwrap();
        assert!(stored.is_none());
        assert_eq!(cache.stats(CacheNamespace::Raw).await.file_count, 0);
    }

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(1024 * 1024)).await;
        cache
            .put(CacheNamespace::Raw, &key(1), &[1u8; 100], AudioContainer::Wav)
            .await
            .unwrap();
        cache
            .put(CacheNamespace::Output, &key(2), &[2u8; 40], AudioContainer::Wav)
            .await
            .unwrap();

        assert_eq!(cache.size(CacheNamespace::Raw).await, 100);
        assert_eq!(cache.size(CacheNamespace::Output).await, 40);
        assert_eq!(cache.get(CacheNamespace::Output, &key(1)).await.unwrap(), None);

        assert_eq!(cache.clear(CacheNamespace::Raw).await, 1);
        assert_eq!(cache.stats(CacheNamespace::Output).await.file_count, 1);
    }

    #[tokio::test]
    async fn test_fifo_eviction_removes_oldest() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(1024 * 1024)).await;
        for n in 1..=3 {
            cache
                .put(CacheNamespace::Raw, &key(n), &[0u8; 100], AudioContainer::Wav)
                .await
                .unwrap();
        }

        let evicted = cache.evict_to_limit(CacheNamespace::Raw, 250).await;
        assert_eq!(evicted, 1);
        assert_eq!(cache.get(CacheNamespace::Raw, &key(1)).await.unwrap(), None);
        assert!(cache.get(CacheNamespace::Raw, &key(2)).await.unwrap().is_some());
        assert!(cache.get(CacheNamespace::Raw, &key(3)).await.unwrap().is_some());
        assert!(cache.size(CacheNamespace::Raw).await <= 250);
    }

    #[tokio::test]
    async fn test_read_refreshes_touch_time() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(1024 * 1024)).await;
        for n in 1..=3 {
            cache
                .put(CacheNamespace::Raw, &key(n), &[0u8; 100], AudioContainer::Wav)
                .await
                .unwrap();
        }

        // 读取最旧的条目后，淘汰落到第二旧的条目上
        assert!(cache.get(CacheNamespace::Raw, &key(1)).await.unwrap().is_some());
        cache.evict_to_limit(CacheNamespace::Raw, 250).await;

        assert!(cache.get(CacheNamespace::Raw, &key(1)).await.unwrap().is_some());
        assert_eq!(cache.get(CacheNamespace::Raw, &key(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_triggers_eviction_but_keeps_new_entry() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(250)).await;
        for n in 1..=3 {
            cache
                .put(CacheNamespace::Raw, &key(n), &[0u8; 100], AudioContainer::Wav)
                .await
                .unwrap();
        }
        let stats = cache.stats(CacheNamespace::Raw).await;
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_size, 200);
        assert!(cache.get(CacheNamespace::Raw, &key(3)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_single_oversized_entry_survives() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(50)).await;
        cache
            .put(CacheNamespace::Raw, &key(1), &[0u8; 40], AudioContainer::Wav)
            .await
            .unwrap();
        cache
            .put(CacheNamespace::Raw, &key(2), &[0u8; 500], AudioContainer::Wav)
            .await
            .unwrap();

        let stats = cache.stats(CacheNamespace::Raw).await;
        assert_eq!(stats.file_count, 1);
        assert_eq!(stats.total_size, 500);
        assert!(cache.get(CacheNamespace::Raw, &key(2)).await.unwrap().is_some());

        assert_eq!(cache.evict_to_limit(CacheNamespace::Raw, 10).await, 0);
        assert_eq!(cache.stats(CacheNamespace::Raw).await.file_count, 1);
    }

    #[tokio::test]
    async fn test_per_call_limit_override() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(1024 * 1024)).await;
        for n in 1..=3 {
            cache
                .put_with_limit(CacheNamespace::Raw, &key(n), &[0u8; 100], AudioContainer::Wav, 150)
                .await
                .unwrap();
        }
        assert_eq!(cache.stats(CacheNamespace::Raw).await.file_count, 1);
    }

    #[tokio::test]
    async fn test_env_limit_is_read_at_eviction_time() {
        let var = "SRT_TTS_TEST_CACHE_LIMIT_MB";
        std::env::remove_var(var);
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::env(var, 1)).await;

        for n in 1..=3 {
            cache
                .put(CacheNamespace::Raw, &key(n), &vec![0u8; 400 * 1024], AudioContainer::Wav)
                .await
                .unwrap();
        }
        // 1MB 上限下最多保留两个 400KB 条目
        assert_eq!(cache.stats(CacheNamespace::Raw).await.file_count, 2);

        std::env::set_var(var, "0");
        cache
            .put(CacheNamespace::Raw, &key(4), &[0u8; 10], AudioContainer::Wav)
            .await
            .unwrap();
        assert_eq!(cache.stats(CacheNamespace::Raw).await.file_count, 1);
        std::env::remove_var(var);
    }

    #[tokio::test]
    async fn test_clear_older_than() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(1024 * 1024)).await;
        for n in 1..=3 {
            cache
                .put(CacheNamespace::Raw, &key(n), &[0u8; 10], AudioContainer::Mp3)
                .await
                .unwrap();
        }

        let far = Duration::from_secs(100 * 365 * 24 * 3600);
        assert_eq!(cache.clear_older_than(CacheNamespace::Raw, far).await, 0);
        assert_eq!(cache.stats(CacheNamespace::Raw).await.file_count, 3);

        assert_eq!(cache.clear_older_than(CacheNamespace::Raw, Duration::ZERO).await, 3);
        assert_eq!(cache.stats(CacheNamespace::Raw).await.file_count, 0);
    }

    #[tokio::test]
    async fn test_reopen_adopts_existing_files() {
        let dir = tempdir().unwrap();
        {
            let cache = open(&dir, SizeLimit::Fixed(1024 * 1024)).await;
            cache
                .put(CacheNamespace::Raw, &key(1), &[1u8; 64], AudioContainer::Wav)
                .await
                .unwrap();
        }

        // 索引丢失，另有一个未登记的缓存文件
        let raw_dir = dir.path().join("raw");
        tokio::fs::remove_file(raw_dir.join(super::super::touch_index::INDEX_FILE_NAME))
            .await
            .unwrap();
        tokio::fs::write(raw_dir.join(format!("{}.mp3", key(2))), [2u8; 32])
            .await
            .unwrap();
        tokio::fs::write(raw_dir.join("notes.txt"), b"ignored")
            .await
            .unwrap();

        let cache = open(&dir, SizeLimit::Fixed(1024 * 1024)).await;
        let stats = cache.stats(CacheNamespace::Raw).await;
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_size, 96);
        assert_eq!(
            cache.get(CacheNamespace::Raw, &key(2)).await.unwrap(),
            Some(vec![2u8; 32])
        );
    }

    #[tokio::test]
    async fn test_externally_deleted_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(1024 * 1024)).await;
        let path = cache
            .put(CacheNamespace::Raw, &key(1), &[1u8; 64], AudioContainer::Wav)
            .await
            .unwrap()
            .unwrap();
        tokio::fs::remove_file(path).await.unwrap();

        assert_eq!(cache.get(CacheNamespace::Raw, &key(1)).await.unwrap(), None);
        assert_eq!(cache.size(CacheNamespace::Raw).await, 0);
    }

    #[test]
    fn test_size_limit_resolve() {
        assert_eq!(SizeLimit::fixed_mb(2).resolve(), 2 * 1024 * 1024);
        let limit = SizeLimit::env("SRT_TTS_TEST_UNSET_LIMIT", 512);
        assert_eq!(limit.resolve(), 512 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_undeletable_entry_does_not_expose_new_entry() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(1024 * 1024)).await;
        for n in 1..=2 {
            cache
                .put(CacheNamespace::Raw, &key(n), &[0u8; 100], AudioContainer::Wav)
                .await
                .unwrap();
        }

        // 用同名目录替换文件，remove_file 必然失败
        let stuck = dir.path().join("raw").join(format!("{}.wav", key(1)));
        tokio::fs::remove_file(&stuck).await.unwrap();
        tokio::fs::create_dir(&stuck).await.unwrap();

        let path = cache
            .put_with_limit(CacheNamespace::Raw, &key(3), &[3u8; 100], AudioContainer::Wav, 150)
            .await
            .unwrap()
            .unwrap();

        assert!(path.exists());
        assert_eq!(
            cache.get(CacheNamespace::Raw, &key(3)).await.unwrap(),
            Some(vec![3u8; 100])
        );
        assert!(!dir.path().join("raw").join(format!("{}.wav", key(2))).exists());
    }

    #[tokio::test]
    async fn test_container_change_replaces_old_file() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, SizeLimit::Fixed(1024 * 1024)).await;
        let wav = cache
            .put(CacheNamespace::Raw, &key(1), &[1u8; 100], AudioContainer::Wav)
            .await
            .unwrap()
            .unwrap();
        let mp3 = cache
            .put(CacheNamespace::Raw, &key(1), &[2u8; 80], AudioContainer::Mp3)
            .await
            .unwrap()
            .unwrap();

        assert!(!wav.exists());
        assert!(mp3.exists());
        assert_eq!(cache.size(CacheNamespace::Raw).await, 80);
    }

    #[tokio::test]
    async fn test_unusable_directory_disables_cache() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("raw"), b"not a directory")
            .await
            .unwrap();

        let config = config_in(&dir, SizeLimit::Fixed(1024));
        assert!(FileCacheStore::open(&config).await.is_err());
        assert!(FileCacheStore::open_or_disabled(&config).await.is_none());

        let healthy = tempdir().unwrap();
        let config = config_in(&healthy, SizeLimit::Fixed(1024));
        assert!(FileCacheStore::open_or_disabled(&config).await.is_some());
    }
}
