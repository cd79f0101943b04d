//! Audio Codec Ports - 音频探测 / 解码 / 转码抽象

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PcmAudio;

/// 解码错误
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// 音频容器格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioContainer {
    #[default]
    Wav,
    Mp3,
}

impl AudioContainer {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioContainer::Wav => "wav",
            AudioContainer::Mp3 => "mp3",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        ext.parse().ok()
    }
}

impl std::fmt::Display for AudioContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for AudioContainer {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wav" => Ok(AudioContainer::Wav),
            "mp3" => Ok(AudioContainer::Mp3),
            _ => Err(DecodeError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Audio Probe Port
///
/// 结构校验和时长测量，任何失败都被吞掉
pub trait AudioProbePort: Send + Sync {
    /// 是否为结构完整的 WAV（至少 44 字节，RIFF/WAVE 标记）
    fn is_valid(&self, blob: &[u8]) -> bool;

    /// 时长（秒），解码失败返回 0
    fn duration(&self, blob: &[u8]) -> f64;
}

/// Audio Decoder Port
pub trait AudioDecoderPort: Send + Sync {
    /// 解码为单声道 PCM，`hint` 为容器格式提示
    fn decode(&self, blob: &[u8], hint: Option<AudioContainer>) -> Result<PcmAudio, DecodeError>;
}

/// Audio Transcoder Port
///
/// 把中间格式（如 MP3）转为交给变声模型的最终 WAV
pub trait AudioTranscoderPort: Send + Sync {
    fn to_wav(&self, blob: &[u8], source: AudioContainer) -> Result<Vec<u8>, DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_parse() {
        assert_eq!("MP3".parse::<AudioContainer>().unwrap(), AudioContainer::Mp3);
        assert_eq!(AudioContainer::from_extension("wav"), Some(AudioContainer::Wav));
        assert!(AudioContainer::from_extension("ogg").is_none());
        assert_eq!(AudioContainer::Mp3.to_string(), "mp3");
    }
}
