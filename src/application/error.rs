//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{CacheError, ConvertError, DecodeError, SynthesisError};
use crate::domain::SubtitleError;

/// 应用层错误
///
/// 片段级的合成失败在处理器内部降级，不会以错误形式返回
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 输入校验失败（如字幕窗口倒置）
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 合成服务不可用（凭据缺失等），调用方可换用其他服务
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// 单次合成失败（无降级路径时）
    #[error("Synthesis error: {0}")]
    SynthesisError(String),

    /// 变声或转码失败
    #[error("Conversion error: {0}")]
    ConversionError(String),

    /// 存储错误
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<SubtitleError> for ApplicationError {
    fn from(err: SubtitleError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<SynthesisError> for ApplicationError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::Unavailable(message) => Self::ProviderUnavailable(message),
            other => Self::SynthesisError(other.to_string()),
        }
    }
}

impl From<CacheError> for ApplicationError {
    fn from(err: CacheError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<ConvertError> for ApplicationError {
    fn from(err: ConvertError) -> Self {
        Self::ConversionError(err.to_string())
    }
}

impl From<DecodeError> for ApplicationError {
    fn from(err: DecodeError) -> Self {
        Self::ConversionError(err.to_string())
    }
}

impl From<std::io::Error> for ApplicationError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}
