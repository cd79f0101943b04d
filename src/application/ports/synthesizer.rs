//! Synthesizer Port - TTS 合成引擎抽象
//!
//! 外部 TTS 服务被视为不透明的 synthesize(text, voice, rate) -> bytes

use async_trait::async_trait;
use thiserror::Error;

use super::audio_codec::AudioContainer;

/// 失败分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 网络或服务端临时错误，可重试
    Transient,
    /// 返回内容不是可识别的音频
    InvalidFormat,
    IoError,
    /// 缺少凭据等能力缺失，重试无意义
    Unavailable,
}

/// 合成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Transient provider failure: {0}")]
    Transient(String),

    #[error("Invalid audio response: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl SynthesisError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SynthesisError::Transient(_) => FailureKind::Transient,
            SynthesisError::InvalidFormat(_) => FailureKind::InvalidFormat,
            SynthesisError::Io(_) => FailureKind::IoError,
            SynthesisError::Unavailable(_) => FailureKind::Unavailable,
        }
    }
}

/// 合成请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    /// 语速：倍率（"1.0"、"1.25"）或百分比（"+10%"）
    pub rate: String,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>, rate: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            rate: rate.into(),
        }
    }
}

/// Synthesizer Port
#[async_trait]
pub trait SynthesizerPort: Send + Sync {
    /// 模式标签，参与原始缓存 key
    fn mode(&self) -> &str;

    /// 返回音频的容器格式，决定缓存文件扩展名
    fn container(&self) -> AudioContainer;

    /// 是否支持按倍率调速（决定能否走时间轴同步）
    fn supports_rate_adjustment(&self) -> bool;

    /// 运行前检查能力（凭据等），只调用一次
    async fn check_available(&self) -> Result<(), SynthesisError> {
        Ok(())
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError>;
}

/// 整数百分比 → "+10%" / "-5%"
pub fn format_percent_rate(percent: i32) -> String {
    if percent >= 0 {
        format!("+{}%", percent)
    } else {
        format!("{}%", percent)
    }
}

/// 倍率 → "1.25"
pub fn format_speed_rate(speed: f64) -> String {
    format!("{:.2}", speed)
}

/// 把 rate 字符串解析为倍率，"1.5" → 1.5，"+10%" → 1.1
pub fn parse_rate(rate: &str) -> Option<f64> {
    let rate = rate.trim();
    let factor = match rate.strip_suffix('%') {
        Some(percent) => 1.0 + percent.parse::<f64>().ok()? / 100.0,
        None => rate.parse::<f64>().ok()?,
    };
    (factor.is_finite() && factor > 0.0).then_some(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent_rate() {
        assert_eq!(format_percent_rate(10), "+10%");
        assert_eq!(format_percent_rate(0), "+0%");
        assert_eq!(format_percent_rate(-5), "-5%");
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("1.0"), Some(1.0));
        assert_eq!(parse_rate("2.00"), Some(2.0));
        assert_eq!(parse_rate("-50%"), Some(0.5));
        assert!((parse_rate("+10%").unwrap() - 1.1).abs() < 1e-9);
        assert_eq!(parse_rate("fast"), None);
        assert_eq!(parse_rate("-100%"), None);
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            SynthesisError::Unavailable("no key".into()).kind(),
            FailureKind::Unavailable
        );
        assert_eq!(
            SynthesisError::InvalidFormat("empty".into()).kind(),
            FailureKind::InvalidFormat
        );
    }
}
