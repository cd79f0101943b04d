//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::commands::handlers::{AssemblySettings, RetryPolicy, SyncSettings};
use crate::application::ports::AudioContainer;
use crate::infrastructure::persistence::{FileCacheConfig, NamespaceConfig, SizeLimit};

/// 原始缓存上限的环境变量
pub const RAW_CACHE_SIZE_ENV: &str = "SRT_TTS_CACHE_SIZE_MB";
/// 输出缓存上限的环境变量
pub const OUTPUT_CACHE_SIZE_ENV: &str = "SRT_TTS_OUTPUT_CACHE_SIZE_MB";

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 时间轴同步配置
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 顺序拼接配置
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// 主 TTS 服务
    #[serde(default)]
    pub tts: TtsConfig,

    /// 主服务不可用时用于顺序拼接的备用服务
    #[serde(default)]
    pub fallback_tts: Option<TtsConfig>,

    /// 变声程序配置
    #[serde(default)]
    pub converter: ConverterConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// 是否启用缓存
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// 原始合成缓存目录
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,

    /// 变声输出缓存目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// 原始缓存上限（MB）
    ///
    /// 未设置时每次淘汰读取 `SRT_TTS_CACHE_SIZE_MB`，默认 512
    #[serde(default)]
    pub raw_max_size_mb: Option<u64>,

    /// 输出缓存上限（MB）
    ///
    /// 未设置时每次淘汰读取 `SRT_TTS_OUTPUT_CACHE_SIZE_MB`，默认 256
    #[serde(default)]
    pub output_max_size_mb: Option<u64>,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("assets/tts_cache")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("assets/tts_output_cache")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            raw_dir: default_raw_dir(),
            output_dir: default_output_dir(),
            raw_max_size_mb: None,
            output_max_size_mb: None,
        }
    }
}

impl CacheConfig {
    pub fn file_cache_config(&self) -> FileCacheConfig {
        let limit = |fixed: Option<u64>, var: &str, default_mb: u64| match fixed {
            Some(mb) => SizeLimit::fixed_mb(mb),
            None => SizeLimit::env(var, default_mb),
        };
        FileCacheConfig {
            raw: NamespaceConfig {
                dir: self.raw_dir.clone(),
                limit: limit(self.raw_max_size_mb, RAW_CACHE_SIZE_ENV, 512),
            },
            output: NamespaceConfig {
                dir: self.output_dir.clone(),
                limit: limit(self.output_max_size_mb, OUTPUT_CACHE_SIZE_ENV, 256),
            },
        }
    }
}

/// 时间轴同步配置
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// 首次失败后的重试次数
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_min_speed")]
    pub min_speed: f64,

    #[serde(default = "default_max_speed")]
    pub max_speed: f64,

    /// 测量时长用的中性语速
    #[serde(default = "default_neutral_rate")]
    pub neutral_rate: String,

    /// 输出采样率（Hz）
    #[serde(default = "default_sync_sample_rate")]
    pub sample_rate: u32,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_min_speed() -> f64 {
    0.5
}

fn default_max_speed() -> f64 {
    3.0
}

fn default_neutral_rate() -> String {
    "1.0".to_string()
}

fn default_sync_sample_rate() -> u32 {
    16000
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            min_speed: default_min_speed(),
            max_speed: default_max_speed(),
            neutral_rate: default_neutral_rate(),
            sample_rate: default_sync_sample_rate(),
        }
    }
}

impl SynthesisConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_delay_ms),
        )
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            min_speed: self.min_speed,
            max_speed: self.max_speed,
            neutral_rate: self.neutral_rate.clone(),
            sample_rate: self.sample_rate,
        }
    }
}

/// 顺序拼接配置
#[derive(Debug, Clone, Deserialize)]
pub struct AssemblyConfig {
    /// 片段间静音（毫秒）
    #[serde(default = "default_gap_ms")]
    pub gap_ms: u64,

    /// 不超过该大小的片段文件视为无效
    #[serde(default = "default_min_file_bytes")]
    pub min_file_bytes: u64,

    /// 无有效片段时的静音长度（毫秒）
    #[serde(default = "default_empty_fallback_ms")]
    pub empty_fallback_ms: u64,

    #[serde(default = "default_assembly_sample_rate")]
    pub sample_rate: u32,
}

fn default_gap_ms() -> u64 {
    300
}

fn default_min_file_bytes() -> u64 {
    500
}

fn default_empty_fallback_ms() -> u64 {
    1000
}

fn default_assembly_sample_rate() -> u32 {
    24000
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            gap_ms: default_gap_ms(),
            min_file_bytes: default_min_file_bytes(),
            empty_fallback_ms: default_empty_fallback_ms(),
            sample_rate: default_assembly_sample_rate(),
        }
    }
}

impl AssemblyConfig {
    pub fn settings(&self) -> AssemblySettings {
        AssemblySettings {
            gap: Duration::from_millis(self.gap_ms),
            min_file_bytes: self.min_file_bytes,
            empty_fallback: Duration::from_millis(self.empty_fallback_ms),
            sample_rate: self.sample_rate,
        }
    }
}

/// TTS 服务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    #[default]
    Http,
    /// 本地生成测试音，不访问网络
    Fake,
}

/// TTS 服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub provider: TtsProvider,

    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 模式标签，参与缓存 key（如 azure / edge）
    #[serde(default = "default_tts_mode")]
    pub mode: String,

    /// 服务返回的音频格式
    #[serde(default)]
    pub container: AudioContainer,

    /// 是否接受倍率语速（决定能否走时间轴同步）
    #[serde(default = "default_rate_adjustable")]
    pub rate_adjustable: bool,

    /// 未配置时读取 `AZURE_SPEECH_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    /// 未配置时读取 `AZURE_SERVICE_REGION`
    #[serde(default)]
    pub region: Option<String>,

    /// 缺少凭据时视为不可用
    #[serde(default)]
    pub require_credentials: bool,

    /// fake 服务每个字符的时长（毫秒）
    #[serde(default = "default_fake_ms_per_char")]
    pub fake_ms_per_char: u64,
}

fn default_tts_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tts_timeout() -> u64 {
    120
}

fn default_tts_mode() -> String {
    "azure".to_string()
}

fn default_rate_adjustable() -> bool {
    true
}

fn default_fake_ms_per_char() -> u64 {
    100
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            url: default_tts_url(),
            timeout_secs: default_tts_timeout(),
            mode: default_tts_mode(),
            container: AudioContainer::default(),
            rate_adjustable: default_rate_adjustable(),
            api_key: None,
            region: None,
            require_credentials: false,
            fake_ms_per_char: default_fake_ms_per_char(),
        }
    }
}

/// 变声程序配置
#[derive(Debug, Clone, Deserialize)]
pub struct ConverterConfig {
    /// 推理程序路径，未配置时不支持变声
    #[serde(default)]
    pub command: Option<PathBuf>,

    /// 固定前置参数
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_converter_timeout")]
    pub timeout_secs: u64,
}

fn default_converter_timeout() -> u64 {
    600
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_secs: default_converter_timeout(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
