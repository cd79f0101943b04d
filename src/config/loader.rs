//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（srt-tts.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, TtsConfig, TtsProvider};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["srt-tts", "srt-tts.local"];

/// 云端凭据的环境变量
const SPEECH_KEY_ENV: &str = "AZURE_SPEECH_KEY";
const SPEECH_REGION_ENV: &str = "AZURE_SERVICE_REGION";

/// 加载应用配置
///
/// # 环境变量示例
/// - `SRT_TTS_TTS__URL=http://tts-server:8000`
/// - `SRT_TTS_TTS__PROVIDER=fake`
/// - `SRT_TTS_SYNTHESIS__MAX_SPEED=2.5`
/// - `SRT_TTS_CACHE__RAW_DIR=/data/tts_cache`
///
/// 缓存上限由 `SRT_TTS_CACHE_SIZE_MB` / `SRT_TTS_OUTPUT_CACHE_SIZE_MB`
/// 在每次淘汰时单独读取，不经过这里
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("cache.enabled", true)?
        .set_default("cache.raw_dir", "assets/tts_cache")?
        .set_default("cache.output_dir", "assets/tts_output_cache")?
        .set_default("synthesis.retry_attempts", 3)?
        .set_default("synthesis.retry_delay_ms", 2000)?
        .set_default("synthesis.min_speed", 0.5)?
        .set_default("synthesis.max_speed", 3.0)?
        .set_default("synthesis.neutral_rate", "1.0")?
        .set_default("synthesis.sample_rate", 16000)?
        .set_default("assembly.gap_ms", 300)?
        .set_default("assembly.min_file_bytes", 500)?
        .set_default("assembly.empty_fallback_ms", 1000)?
        .set_default("assembly.sample_rate", 24000)?
        .set_default("tts.provider", "http")?
        .set_default("tts.url", "http://localhost:8000")?
        .set_default("tts.timeout_secs", 120)?
        .set_default("tts.mode", "azure")?
        .set_default("converter.timeout_secs", 600)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 前缀: SRT_TTS_
    // 层级分隔符: __ (双下划线)
    builder = builder.add_source(
        Environment::with_prefix("SRT_TTS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let mut app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    apply_credential_env(&mut app_config.tts);
    if let Some(fallback) = app_config.fallback_tts.as_mut() {
        apply_credential_env(fallback);
    }

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 未配置凭据时从环境变量补全
fn apply_credential_env(tts: &mut TtsConfig) {
    if tts.api_key.is_none() {
        tts.api_key = std::env::var(SPEECH_KEY_ENV).ok().filter(|v| !v.is_empty());
    }
    if tts.region.is_none() {
        tts.region = std::env::var(SPEECH_REGION_ENV).ok().filter(|v| !v.is_empty());
    }
}

fn validate_tts(name: &str, tts: &TtsConfig) -> Result<(), ConfigError> {
    if tts.provider == TtsProvider::Http && tts.url.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{} URL cannot be empty",
            name
        )));
    }
    if tts.mode.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{} mode cannot be empty",
            name
        )));
    }
    Ok(())
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let synthesis = &config.synthesis;
    if synthesis.min_speed <= 0.0 {
        return Err(ConfigError::ValidationError(
            "Minimum speed must be positive".to_string(),
        ));
    }
    if synthesis.min_speed > synthesis.max_speed {
        return Err(ConfigError::ValidationError(format!(
            "Minimum speed {} exceeds maximum speed {}",
            synthesis.min_speed, synthesis.max_speed
        )));
    }
    if synthesis.sample_rate == 0 || config.assembly.sample_rate == 0 {
        return Err(ConfigError::ValidationError(
            "Sample rate cannot be 0".to_string(),
        ));
    }

    validate_tts("TTS", &config.tts)?;
    if let Some(fallback) = &config.fallback_tts {
        validate_tts("Fallback TTS", fallback)?;
    }

    if config.cache.enabled && config.cache.raw_dir == config.cache.output_dir {
        return Err(ConfigError::ValidationError(
            "Raw and output cache directories must differ".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("TTS Provider: {:?}", config.tts.provider);
    tracing::info!("TTS URL: {}", config.tts.url);
    tracing::info!("TTS Mode: {}", config.tts.mode);
    tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
    tracing::info!("TTS Credentials: {}", config.tts.api_key.is_some());
    if let Some(fallback) = &config.fallback_tts {
        tracing::info!("Fallback TTS: {:?} {}", fallback.provider, fallback.url);
    }
    tracing::info!("Cache Enabled: {}", config.cache.enabled);
    if config.cache.enabled {
        tracing::info!("Raw Cache Directory: {:?}", config.cache.raw_dir);
        tracing::info!("Output Cache Directory: {:?}", config.cache.output_dir);
    }
    tracing::info!(
        "Speed Range: {} - {}",
        config.synthesis.min_speed,
        config.synthesis.max_speed
    );
    tracing::info!(
        "Retries: {} x {}ms",
        config.synthesis.retry_attempts,
        config.synthesis.retry_delay_ms
    );
    match &config.converter.command {
        Some(command) => tracing::info!("Converter: {:?}", command),
        None => tracing::info!("Converter: disabled"),
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_load_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tts.url, "http://localhost:8000");
        assert_eq!(config.synthesis.max_speed, 3.0);
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_bad_speed_range() {
        let mut config = AppConfig::default();
        config.synthesis.min_speed = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.synthesis.min_speed = 4.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_tts_url() {
        let mut config = AppConfig::default();
        config.tts.url = String::new();
        assert!(validate_config(&config).is_err());

        // fake 不需要 URL
        config.tts.provider = TtsProvider::Fake;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_shared_cache_dir() {
        let mut config = AppConfig::default();
        config.cache.output_dir = config.cache.raw_dir.clone();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("srt-tts.toml");
        std::fs::write(
            &path,
            r#"
[tts]
provider = "fake"
mode = "edge"
container = "mp3"

[fallback_tts]
provider = "fake"
rate_adjustable = false

[synthesis]
max_speed = 2.5

[cache]
raw_dir = "/tmp/raw"
raw_max_size_mb = 64
"#,
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.tts.provider, TtsProvider::Fake);
        assert_eq!(config.tts.mode, "edge");
        assert_eq!(config.tts.container, crate::application::ports::AudioContainer::Mp3);
        assert_eq!(config.synthesis.max_speed, 2.5);
        assert_eq!(config.synthesis.min_speed, 0.5);
        assert_eq!(config.cache.raw_dir, PathBuf::from("/tmp/raw"));
        assert_eq!(config.cache.raw_max_size_mb, Some(64));
        assert_eq!(config.cache.output_max_size_mb, None);

        let fallback = config.fallback_tts.unwrap();
        assert!(!fallback.rate_adjustable);
        assert_eq!(fallback.mode, "azure");
    }
}
