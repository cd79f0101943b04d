//! Cache Command Handlers

use std::sync::Arc;

use crate::application::commands::{ClearCache, ClearCacheResponse, NamespaceCleared};
use crate::application::error::ApplicationError;
use crate::application::ports::{CacheNamespace, CacheStorePort};

/// ClearCache Handler
pub struct ClearCacheHandler {
    cache: Arc<dyn CacheStorePort>,
}

impl ClearCacheHandler {
    pub fn new(cache: Arc<dyn CacheStorePort>) -> Self {
        Self { cache }
    }

    pub async fn handle(
        &self,
        command: ClearCache,
    ) -> Result<ClearCacheResponse, ApplicationError> {
        let mut cleared = Vec::with_capacity(CacheNamespace::ALL.len());
        for namespace in CacheNamespace::ALL {
            let removed = match command.older_than {
                Some(age) => self.cache.clear_older_than(namespace, age).await,
                None => self.cache.clear(namespace).await,
            };
            cleared.push(NamespaceCleared { namespace, removed });
        }

        let response = ClearCacheResponse { cleared };
        tracing::info!(
            removed = response.total_removed(),
            older_than_secs = ?command.older_than.map(|d| d.as_secs()),
            "Cache maintenance finished"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::AudioContainer;
    use crate::domain::ContentKey;
    use crate::infrastructure::persistence::{
        FileCacheConfig, FileCacheStore, NamespaceConfig, SizeLimit,
    };
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_clear_reports_per_namespace_counts() {
        let dir = tempdir().unwrap();
        let store = FileCacheStore::open(&FileCacheConfig {
            raw: NamespaceConfig {
                dir: dir.path().join("raw"),
                limit: SizeLimit::fixed_mb(1),
            },
            output: NamespaceConfig {
                dir: dir.path().join("output"),
                limit: SizeLimit::fixed_mb(1),
            },
        })
        .await
        .unwrap();
        let cache: Arc<dyn CacheStorePort> = Arc::new(store);

        for n in 0..3 {
            let key = ContentKey::derive("edge", &["v", "+0%", &n.to_string()]);
            cache
                .put(CacheNamespace::Raw, &key, &[1u8; 64], AudioContainer::Mp3)
                .await
                .unwrap();
        }
        let key = ContentKey::derive("rvc", &["x"]);
        cache
            .put(CacheNamespace::Output, &key, &[1u8; 64], AudioContainer::Wav)
            .await
            .unwrap();

        let handler = ClearCacheHandler::new(cache.clone());
        let kept = handler
            .handle(ClearCache {
                older_than: Some(Duration::from_secs(3600)),
            })
            .await
            .unwrap();
        assert_eq!(kept.total_removed(), 0);

        let response = handler.handle(ClearCache::default()).await.unwrap();
        assert_eq!(response.cleared[0].namespace, CacheNamespace::Raw);
        assert_eq!(response.cleared[0].removed, 3);
        assert_eq!(response.cleared[1].removed, 1);
        assert_eq!(cache.size(CacheNamespace::Raw).await, 0);
    }
}
