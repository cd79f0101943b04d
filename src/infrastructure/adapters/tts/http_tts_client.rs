//! HTTP TTS Client - 调用外部 TTS HTTP 服务
//!
//! 外部 TTS API:
//! POST {base_url}/api/tts/synthesize
//! Request: {"text": "...", "voice": "...", "rate": "1.25", "region": "..."}  (JSON)
//! Response: 音频二进制（WAV 或 MP3，由配置声明）

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{
    AudioContainer, SynthesisError, SynthesisRequest, SynthesizerPort,
};

/// 音色名后缀，界面上用于标记云端音色
const API_VOICE_SUFFIX: &str = " [API]";

/// 合成请求体 (JSON)
#[derive(Debug, Serialize)]
struct SynthesizeHttpRequest<'a> {
    text: &'a str,
    voice: &'a str,
    rate: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<&'a str>,
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 模式标签（参与缓存 key）
    pub mode: String,
    /// 服务返回的容器格式
    pub container: AudioContainer,
    /// 服务是否接受倍率语速
    pub rate_adjustable: bool,
    pub api_key: Option<String>,
    pub region: Option<String>,
    /// 缺少 api_key / region 时视为不可用
    pub require_credentials: bool,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
            mode: "azure".to_string(),
            container: AudioContainer::Wav,
            rate_adjustable: true,
            api_key: None,
            region: None,
            require_credentials: false,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_credentials(
        mut self,
        api_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        self.api_key = Some(api_key.into());
        self.region = Some(region.into());
        self
    }
}

/// HTTP TTS 客户端
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::Unavailable(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn synthesize_url(&self) -> String {
        format!(
            "{}/api/tts/synthesize",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.config.api_key) && present(&self.config.region)
    }
}

/// 去掉界面标记后缀
pub fn normalize_voice(voice: &str) -> &str {
    voice.strip_suffix(API_VOICE_SUFFIX).unwrap_or(voice).trim()
}

fn classify_status(status: StatusCode, body: String) -> SynthesisError {
    let message = format!("HTTP {}: {}", status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SynthesisError::Unavailable(message),
        _ => SynthesisError::Transient(message),
    }
}

#[async_trait]
impl SynthesizerPort for HttpTtsClient {
    fn mode(&self) -> &str {
        &self.config.mode
    }

    fn container(&self) -> AudioContainer {
        self.config.container
    }

    fn supports_rate_adjustment(&self) -> bool {
        self.config.rate_adjustable
    }

    async fn check_available(&self) -> Result<(), SynthesisError> {
        if self.config.require_credentials && !self.has_credentials() {
            return Err(SynthesisError::Unavailable(
                "api_key and region must both be configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        let body = SynthesizeHttpRequest {
            text: &request.text,
            voice: normalize_voice(&request.voice),
            rate: &request.rate,
            region: self.config.region.as_deref(),
        };

        tracing::debug!(
            url = %self.synthesize_url(),
            text_len = request.text.len(),
            voice = %body.voice,
            rate = %request.rate,
            "Sending TTS synthesize request"
        );

        let mut builder = self.client.post(self.synthesize_url()).json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SynthesisError::Transient("request timed out".to_string())
            } else if e.is_connect() {
                SynthesisError::Transient(format!("Cannot connect to TTS service: {}", e))
            } else {
                SynthesisError::Transient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, error_text));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Transient(format!("Failed to read audio: {}", e)))?
            .to_vec();

        if audio.is_empty() {
            return Err(SynthesisError::InvalidFormat("empty response body".to_string()));
        }

        tracing::debug!(size_bytes = audio.len(), "TTS synthesis completed");
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = HttpTtsClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 120);
        assert!(config.rate_adjustable);
    }

    #[test]
    fn test_config_builder() {
        let config = HttpTtsClientConfig::new("http://example.com:9000/").with_timeout(60);
        assert_eq!(config.timeout_secs, 60);
        let client = HttpTtsClient::new(config).unwrap();
        assert_eq!(
            client.synthesize_url(),
            "http://example.com:9000/api/tts/synthesize"
        );
    }

    #[test]
    fn test_normalize_voice() {
        assert_eq!(normalize_voice("zh-CN-YunxiNeural [API]"), "zh-CN-YunxiNeural");
        assert_eq!(normalize_voice("en-US-AriaNeural"), "en-US-AriaNeural");
    }

    #[test]
    fn test_status_classification() {
        let err = classify_status(StatusCode::UNAUTHORIZED, String::new());
        assert!(matches!(err, SynthesisError::Unavailable(_)));
        let err = classify_status(StatusCode::SERVICE_UNAVAILABLE, String::new());
        assert!(matches!(err, SynthesisError::Transient(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials_unavailable() {
        let mut config = HttpTtsClientConfig::default();
        config.require_credentials = true;
        let client = HttpTtsClient::new(config.clone()).unwrap();
        assert!(client.check_available().await.is_err());

        let client = HttpTtsClient::new(config.with_credentials("key", "eastus")).unwrap();
        assert!(client.check_available().await.is_ok());
    }
}
