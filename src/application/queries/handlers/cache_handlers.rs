//! Cache Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{CacheNamespace, CacheStorePort};
use crate::application::queries::{GetCacheStats, GetCacheStatsResponse};

/// GetCacheStats Handler
pub struct GetCacheStatsHandler {
    cache: Arc<dyn CacheStorePort>,
}

impl GetCacheStatsHandler {
    pub fn new(cache: Arc<dyn CacheStorePort>) -> Self {
        Self { cache }
    }

    pub async fn handle(
        &self,
        _query: GetCacheStats,
    ) -> Result<GetCacheStatsResponse, ApplicationError> {
        let mut namespaces = Vec::with_capacity(CacheNamespace::ALL.len());
        for namespace in CacheNamespace::ALL {
            namespaces.push(self.cache.stats(namespace).await.into());
        }
        Ok(GetCacheStatsResponse { namespaces })
    }
}
