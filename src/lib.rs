//! srt-tts - 字幕配音与 TTS 缓存引擎
//!
//! 架构设计: CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - 字幕片段、缓存 key、音轨拼接、语言到音色的映射
//!
//! 应用层 (application/):
//! - Ports: SynthesizerPort, CacheStorePort, AudioProbePort, AudioDecoderPort, VoiceConverterPort
//! - Commands: 时间轴同步、顺序拼接、文本合成、缓存清理
//! - Queries: 缓存统计
//!
//! 基础设施层 (infrastructure/):
//! - Persistence: 双命名空间文件缓存
//! - Adapters: HTTP / Fake TTS、Symphonia 解码、外部变声程序
//! - Events: 进度事件广播

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
