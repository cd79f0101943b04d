//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_codec;
mod cache_store;
mod progress;
mod synthesizer;
mod voice_converter;

pub use audio_codec::{
    AudioContainer, AudioDecoderPort, AudioProbePort, AudioTranscoderPort, DecodeError,
};
pub use cache_store::{CacheError, CacheNamespace, CacheStats, CacheStorePort};
pub use progress::{NoProgress, ProgressPort, SyncEvent};
pub use synthesizer::{
    format_percent_rate, format_speed_rate, parse_rate, FailureKind, SynthesisError,
    SynthesisRequest, SynthesizerPort,
};
pub use voice_converter::{ConvertError, VoiceConverterPort};
