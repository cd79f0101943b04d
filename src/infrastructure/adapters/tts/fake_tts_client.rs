//! Fake TTS Client - 用于测试的 TTS 客户端
//!
//! 不调用外部服务，按文本长度与语速生成确定时长的正弦波 WAV

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{
    parse_rate, AudioContainer, SynthesisError, SynthesisRequest, SynthesizerPort,
};
use crate::domain::encode_wav;

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    pub mode: String,
    /// 每个字符在 1.0 倍速下的时长（毫秒）
    pub ms_per_char: u64,
    pub sample_rate: u32,
    pub rate_adjustable: bool,
    /// 模拟推理延迟
    pub latency: Duration,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            mode: "fake".to_string(),
            ms_per_char: 100,
            sample_rate: 16000,
            rate_adjustable: true,
            latency: Duration::ZERO,
        }
    }
}

/// Fake TTS Client
///
/// 支持故障注入：前 N 次调用失败、指定文本总是失败、返回非音频数据、整体不可用
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    fail_first: AtomicUsize,
    failing_texts: HashSet<String>,
    garbage_texts: HashSet<String>,
    available: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            mode = %config.mode,
            ms_per_char = config.ms_per_char,
            "FakeTtsClient initialized"
        );
        Self {
            config,
            fail_first: AtomicUsize::new(0),
            failing_texts: HashSet::new(),
            garbage_texts: HashSet::new(),
            available: true,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// 前 `n` 次调用返回临时错误
    pub fn fail_first(self, n: usize) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }

    /// 该文本的每次调用都返回临时错误
    pub fn fail_text(mut self, text: impl Into<String>) -> Self {
        self.failing_texts.insert(text.into());
        self
    }

    /// 该文本返回无法识别的字节
    pub fn garbage_text(mut self, text: impl Into<String>) -> Self {
        self.garbage_texts.insert(text.into());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 已收到的请求（按调用顺序）
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// 给定文本与语速下生成的音频时长
    pub fn expected_duration(&self, text: &str, rate: &str) -> Duration {
        let factor = parse_rate(rate).unwrap_or(1.0);
        let natural_ms = text.chars().count() as u64 * self.config.ms_per_char;
        Duration::from_secs_f64(natural_ms as f64 / 1000.0 / factor)
    }

    fn tone(&self, duration: Duration) -> Vec<u8> {
        let sample_rate = self.config.sample_rate;
        let frames = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
        let step = 2.0 * std::f32::consts::PI * 440.0 / sample_rate as f32;
        let samples: Vec<f32> = (0..frames).map(|i| (i as f32 * step).sin() * 0.3).collect();
        encode_wav(&samples, sample_rate)
    }

    fn take_failure(&self) -> bool {
        self.fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl SynthesizerPort for FakeTtsClient {
    fn mode(&self) -> &str {
        &self.config.mode
    }

    fn container(&self) -> AudioContainer {
        AudioContainer::Wav
    }

    fn supports_rate_adjustment(&self) -> bool {
        self.config.rate_adjustable
    }

    async fn check_available(&self) -> Result<(), SynthesisError> {
        if self.available {
            Ok(())
        } else {
            Err(SynthesisError::Unavailable("fake provider disabled".to_string()))
        }
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        if !self.available {
            return Err(SynthesisError::Unavailable("fake provider disabled".to_string()));
        }
        if self.take_failure() || self.failing_texts.contains(&request.text) {
            return Err(SynthesisError::Transient("injected failure".to_string()));
        }
        if self.garbage_texts.contains(&request.text) {
            return Ok(b"<html>rate limited</html>".to_vec());
        }

        let duration = self.expected_duration(&request.text, &request.rate);
        tracing::debug!(
            text_len = request.text.len(),
            rate = %request.rate,
            duration_ms = duration.as_millis() as u64,
            "FakeTtsClient: generated tone"
        );
        Ok(self.tone(duration))
    }
}
