//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（Synthesizer、CacheStore、AudioProbe、VoiceConverter 等）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    // Synchronize commands
    SyncSummary,
    SynchronizeSubtitles,
    SynchronizeSubtitlesResponse,
    // Assemble commands
    AssembleSequential,
    AssembleSequentialResponse,
    SynthesizeSegmentFiles,
    SynthesizeSegmentFilesResponse,
    // Speech commands
    ConvertText,
    ConvertTextResponse,
    SpeechMode,
    SubtitleSpeech,
    SubtitleSpeechResponse,
    TextSource,
    // Cache commands
    ClearCache,
    ClearCacheResponse,
    NamespaceCleared,
    // Handlers
    handlers::{
        AssembleSequentialHandler, AssemblySettings, ClearCacheHandler, ConvertTextHandler,
        RetryPolicy, SegmentSynthesizer, SubtitleSpeechHandler, SyncSettings,
        SynchronizeSubtitlesHandler, SynthesizeSegmentFilesHandler,
    },
};

pub use error::ApplicationError;

pub use ports::{
    AudioContainer, AudioDecoderPort, AudioProbePort, AudioTranscoderPort, CacheError,
    CacheNamespace, CacheStats, CacheStorePort, ConvertError, DecodeError, FailureKind,
    NoProgress, ProgressPort, SyncEvent, SynthesisError, SynthesisRequest, SynthesizerPort,
    VoiceConverterPort,
};

pub use queries::{
    handlers::GetCacheStatsHandler, GetCacheStats, GetCacheStatsResponse, NamespaceStats,
};
