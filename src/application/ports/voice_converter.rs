//! Voice Converter Port - 变声模型抽象
//!
//! 变声模型是不透明的 convert(audio, model, params) -> audio

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::domain::ConversionParams;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Failed to start converter: {0}")]
    Spawn(String),

    #[error("Converter failed: {0}")]
    Failed(String),

    #[error("Converter timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(String),
}

#[async_trait]
pub trait VoiceConverterPort: Send + Sync {
    /// 读取 `input`（WAV），把变声结果写到 `output`
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        params: &ConversionParams,
    ) -> Result<(), ConvertError>;
}
