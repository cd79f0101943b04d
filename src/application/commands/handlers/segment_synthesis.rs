//! Segment Synthesis - 带缓存与重试的单段合成
//!
//! 原始缓存命中时不调用合成服务；只有通过校验的音频才会写入缓存

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{
    AudioContainer, AudioProbePort, CacheNamespace, CacheStorePort, FailureKind, SynthesisError,
    SynthesisRequest, SynthesizerPort,
};
use crate::domain::RawCacheKey;

/// 重试策略：首次尝试 + `retries` 次重试，间隔固定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// 不等待，测试用
    pub fn immediate(retries: u32) -> Self {
        Self::new(retries, Duration::ZERO)
    }
}

/// 单段合成器
#[derive(Clone)]
pub struct SegmentSynthesizer {
    synthesizer: Arc<dyn SynthesizerPort>,
    probe: Arc<dyn AudioProbePort>,
    cache: Option<Arc<dyn CacheStorePort>>,
    /// 单次调用的缓存上限（字节），覆盖命名空间配置
    cache_limit: Option<u64>,
    retry: RetryPolicy,
}

impl SegmentSynthesizer {
    pub fn new(synthesizer: Arc<dyn SynthesizerPort>, probe: Arc<dyn AudioProbePort>) -> Self {
        Self {
            synthesizer,
            probe,
            cache: None,
            cache_limit: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStorePort>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_limit(mut self, max_bytes: u64) -> Self {
        self.cache_limit = Some(max_bytes);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn synthesizer(&self) -> &Arc<dyn SynthesizerPort> {
        &self.synthesizer
    }

    pub fn probe(&self) -> &Arc<dyn AudioProbePort> {
        &self.probe
    }

    pub fn container(&self) -> AudioContainer {
        self.synthesizer.container()
    }

    /// WAV 需通过头部校验；其他容器只要求非空
    fn is_acceptable(&self, blob: &[u8]) -> bool {
        match self.synthesizer.container() {
            AudioContainer::Wav => self.probe.is_valid(blob),
            AudioContainer::Mp3 => !blob.is_empty(),
        }
    }

    async fn lookup(&self, request: &SynthesisRequest) -> Option<Vec<u8>> {
        let cache = self.cache.as_ref()?;
        let key = RawCacheKey {
            mode: self.synthesizer.mode(),
            voice: &request.voice,
            rate: &request.rate,
            text: &request.text,
        }
        .key();

        match cache.get(CacheNamespace::Raw, &key).await {
            Ok(Some(blob)) if self.is_acceptable(&blob) => Some(blob),
            Ok(Some(_)) => {
                tracing::warn!(key = %key, "Cached audio failed validation, ignoring");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    async fn store(&self, request: &SynthesisRequest, blob: &[u8]) {
        let Some(cache) = &self.cache else {
            return;
        };
        let key = RawCacheKey {
            mode: self.synthesizer.mode(),
            voice: &request.voice,
            rate: &request.rate,
            text: &request.text,
        }
        .key();

        let container = self.synthesizer.container();
        let stored = match self.cache_limit {
            Some(max_bytes) => {
                cache
                    .put_with_limit(CacheNamespace::Raw, &key, blob, container, max_bytes)
                    .await
            }
            None => cache.put(CacheNamespace::Raw, &key, blob, container).await,
        };
        if let Err(e) = stored {
            tracing::warn!(key = %key, error = %e, "Failed to save synthesized audio to cache");
        }
    }

    async fn attempt(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        let blob = self.synthesizer.synthesize(request).await?;
        if !self.is_acceptable(&blob) {
            return Err(SynthesisError::InvalidFormat(format!(
                "{} bytes not recognized as {}",
                blob.len(),
                self.synthesizer.container()
            )));
        }
        self.store(request, &blob).await;
        Ok(blob)
    }

    /// 合成一段音频，失败时按策略重试
    ///
    /// 返回最后一次失败的错误；`Unavailable` 不再重试
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
        segment: usize,
    ) -> Result<Vec<u8>, SynthesisError> {
        if let Some(blob) = self.lookup(request).await {
            tracing::debug!(segment = segment, rate = %request.rate, "Using cached audio");
            return Ok(blob);
        }

        let mut attempt = 0;
        loop {
            match self.attempt(request).await {
                Ok(blob) => return Ok(blob),
                Err(e) if e.kind() == FailureKind::Unavailable || attempt >= self.retry.retries => {
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    tracing::warn!(
                        segment = segment,
                        attempt = attempt,
                        retries = self.retry.retries,
                        rate = %request.rate,
                        error = %e,
                        "Synthesis failed, retrying"
                    );
                    if !self.retry.delay.is_zero() {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }
    }
}
