//! srt-tts - 字幕配音与 TTS 缓存工具
//!
//! 子命令：
//! - speak: 文本合成（可选变声）
//! - srt: 字幕记录按时间轴配音
//! - cache: 缓存统计与清理

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use srt_tts::application::commands::handlers::{
    AssembleSequentialHandler, ClearCacheHandler, ConvertTextHandler, SegmentSynthesizer,
    SubtitleSpeechHandler, SynchronizeSubtitlesHandler, SynthesizeSegmentFilesHandler,
};
use srt_tts::application::commands::{ClearCache, ConvertText, SubtitleSpeech, TextSource};
use srt_tts::application::ports::{
    AudioDecoderPort, AudioProbePort, CacheStorePort, SynthesizerPort,
};
use srt_tts::application::queries::handlers::GetCacheStatsHandler;
use srt_tts::application::queries::GetCacheStats;
use srt_tts::config::{
    load_config, load_config_from_path, print_config, AppConfig, TtsConfig, TtsProvider,
};
use srt_tts::domain::{ConversionParams, SubtitleRecord};
use srt_tts::infrastructure::adapters::{
    FakeTtsClient, FakeTtsClientConfig, HttpTtsClient, HttpTtsClientConfig,
    ProcessConverterConfig, ProcessVoiceConverter, SymphoniaAudio, WavTranscoder,
};
use srt_tts::infrastructure::{EventPublisher, FileCacheStore};

#[derive(Parser, Debug)]
#[command(name = "srt-tts")]
#[command(about = "Subtitle-timed speech synthesis with on-disk audio caching")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to srt-tts.toml / srt-tts.local.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize text to a WAV file, optionally converting the voice
    Speak(SpeakArgs),
    /// Voice a list of subtitle records aligned to their timings
    Srt(SrtArgs),
    /// Inspect or clear the audio caches
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(clap::Args, Debug)]
struct SpeakArgs {
    /// Text to synthesize
    #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
    text: Option<String>,

    /// UTF-8 text file to synthesize
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Voice identifier
    #[arg(short, long)]
    voice: String,

    /// Rate adjustment in percent (e.g. 10 or -5)
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    rate: i32,

    /// Output WAV path
    #[arg(short, long)]
    output: PathBuf,

    /// Raw synthesis cache limit for this run, in MB
    #[arg(long)]
    cache_size_mb: Option<u64>,

    /// Converted output cache limit for this run, in MB
    #[arg(long)]
    output_cache_size_mb: Option<u64>,

    #[command(flatten)]
    conversion: ConversionArgs,
}

#[derive(clap::Args, Debug)]
struct ConversionArgs {
    /// Voice conversion model; enables conversion
    #[arg(long)]
    model: Option<PathBuf>,

    /// Retrieval index for the conversion model
    #[arg(long, requires = "model")]
    index: Option<PathBuf>,

    /// Pitch shift in semitones
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pitch: i32,

    /// Pitch extraction method
    #[arg(long, default_value = "rmvpe")]
    f0_method: String,

    #[arg(long, default_value_t = 0.75)]
    index_rate: f64,

    #[arg(long, default_value_t = 0.5)]
    protect: f64,

    /// Speaker id
    #[arg(long, default_value_t = 0)]
    sid: u32,
}

impl ConversionArgs {
    fn params(&self) -> Option<ConversionParams> {
        let model = self.model.as_ref()?;
        let mut params = ConversionParams::new(model);
        params.index_path = self.index.clone();
        params.pitch = self.pitch;
        params.f0_method = self.f0_method.clone();
        params.index_rate = self.index_rate;
        params.protect = self.protect;
        params.sid = self.sid;
        Some(params)
    }
}

#[derive(clap::Args, Debug)]
struct SrtArgs {
    /// JSON file with [{"start_ms", "end_ms", "text", "lang"?}, ...]
    records: PathBuf,

    /// Output WAV path
    #[arg(short, long)]
    output: PathBuf,

    /// Voice identifier (defaults to the majority subtitle language)
    #[arg(short, long)]
    voice: Option<String>,

    /// Rate adjustment in percent for sequential assembly
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    rate: i32,

    /// Raw synthesis cache limit for this run, in MB
    #[arg(long)]
    cache_size_mb: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show per-namespace cache usage
    Stats,
    /// Remove cached entries
    Clear {
        /// Only remove entries not touched within this many hours
        #[arg(long)]
        older_than_hours: Option<u64>,
    },
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},srt_tts={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_synthesizer(tts: &TtsConfig) -> Result<Arc<dyn SynthesizerPort>> {
    match tts.provider {
        TtsProvider::Http => {
            let client = HttpTtsClient::new(HttpTtsClientConfig {
                base_url: tts.url.clone(),
                timeout_secs: tts.timeout_secs,
                mode: tts.mode.clone(),
                container: tts.container,
                rate_adjustable: tts.rate_adjustable,
                api_key: tts.api_key.clone(),
                region: tts.region.clone(),
                require_credentials: tts.require_credentials,
            })
            .context("Failed to create TTS client")?;
            Ok(Arc::new(client))
        }
        TtsProvider::Fake => Ok(Arc::new(FakeTtsClient::new(FakeTtsClientConfig {
            ms_per_char: tts.fake_ms_per_char,
            rate_adjustable: tts.rate_adjustable,
            ..Default::default()
        }))),
    }
}

/// 合成流程使用：缓存打不开时不带缓存继续
async fn open_cache(config: &AppConfig) -> Option<Arc<dyn CacheStorePort>> {
    if !config.cache.enabled {
        return None;
    }
    let store = FileCacheStore::open_or_disabled(&config.cache.file_cache_config()).await?;
    Some(Arc::new(store))
}

/// 缓存子命令使用：打不开直接报错
async fn open_cache_strict(config: &AppConfig) -> Result<Option<Arc<dyn CacheStorePort>>> {
    if !config.cache.enabled {
        return Ok(None);
    }
    let store = FileCacheStore::open(&config.cache.file_cache_config())
        .await
        .context("Failed to open audio cache")?;
    Ok(Some(Arc::new(store)))
}

fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

fn hours_to_duration(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

/// 进度事件输出到日志
fn spawn_progress_logger(publisher: &EventPublisher) {
    let mut rx = publisher.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => tracing::debug!(event = ?event, "Progress"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped = skipped, "Progress events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

struct Runtime {
    config: AppConfig,
    audio: Arc<SymphoniaAudio>,
    cache: Option<Arc<dyn CacheStorePort>>,
    publisher: Arc<EventPublisher>,
}

impl Runtime {
    fn segment_synth(
        &self,
        synthesizer: Arc<dyn SynthesizerPort>,
        cache_size_mb: Option<u64>,
    ) -> SegmentSynthesizer {
        let probe: Arc<dyn AudioProbePort> = self.audio.clone();
        let mut segment_synth = SegmentSynthesizer::new(synthesizer, probe)
            .with_retry(self.config.synthesis.retry_policy());
        if let Some(cache) = &self.cache {
            segment_synth = segment_synth.with_cache(cache.clone());
        }
        match cache_size_mb {
            Some(mb) => segment_synth.with_cache_limit(mb_to_bytes(mb)),
            None => segment_synth,
        }
    }

    fn decoder(&self) -> Arc<dyn AudioDecoderPort> {
        self.audio.clone()
    }

    async fn speak(&self, args: SpeakArgs) -> Result<()> {
        let synthesizer = build_synthesizer(&self.config.tts)?;
        let transcoder = Arc::new(WavTranscoder::new(self.decoder()));
        let mut handler = ConvertTextHandler::new(
            self.segment_synth(synthesizer, args.cache_size_mb),
            transcoder,
        );
        if let Some(command) = &self.config.converter.command {
            handler = handler.with_converter(Arc::new(ProcessVoiceConverter::new(
                ProcessConverterConfig {
                    command: command.clone(),
                    leading_args: self.config.converter.args.clone(),
                    timeout_secs: self.config.converter.timeout_secs,
                },
            )));
        }
        if let Some(cache) = &self.cache {
            handler = handler.with_cache(cache.clone());
        }
        if let Some(mb) = args.output_cache_size_mb {
            handler = handler.with_output_cache_limit(mb_to_bytes(mb));
        }

        let source = match (args.text, args.file) {
            (Some(text), _) => TextSource::Literal(text),
            (None, Some(file)) => TextSource::File(file),
            (None, None) => anyhow::bail!("Either --text or --file is required"),
        };

        let response = handler
            .handle(ConvertText {
                source,
                voice: args.voice,
                rate_percent: args.rate,
                output_path: args.output,
                conversion: args.conversion.params(),
            })
            .await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }

    async fn srt(&self, args: SrtArgs) -> Result<()> {
        let raw = tokio::fs::read_to_string(&args.records)
            .await
            .with_context(|| format!("Failed to read {}", args.records.display()))?;
        let records: Vec<SubtitleRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid subtitle records in {}", args.records.display()))?;

        let primary = build_synthesizer(&self.config.tts)?;
        let assembler =
            AssembleSequentialHandler::new(self.decoder(), self.config.assembly.settings());
        let mut handler = SubtitleSpeechHandler::new(assembler);

        let sequential = if primary.supports_rate_adjustment() {
            handler = handler.with_synchronizer(
                SynchronizeSubtitlesHandler::new(
                    self.segment_synth(primary.clone(), args.cache_size_mb),
                    self.decoder(),
                    self.config.synthesis.sync_settings(),
                )
                .with_progress(self.publisher.clone()),
            );
            match &self.config.fallback_tts {
                Some(fallback) => build_synthesizer(fallback)?,
                None => primary,
            }
        } else {
            primary
        };
        handler = handler.with_segment_files(
            SynthesizeSegmentFilesHandler::new(self.segment_synth(sequential, args.cache_size_mb))
                .with_progress(self.publisher.clone()),
        );

        let response = handler
            .handle(SubtitleSpeech {
                records,
                voice: args.voice,
                rate_percent: args.rate,
                output_path: args.output,
            })
            .await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }

    async fn cache(&self, action: CacheAction) -> Result<()> {
        let cache = self
            .cache
            .clone()
            .context("Cache is disabled in configuration")?;
        match action {
            CacheAction::Stats => {
                let response = GetCacheStatsHandler::new(cache)
                    .handle(GetCacheStats)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            CacheAction::Clear { older_than_hours } => {
                let response = ClearCacheHandler::new(cache)
                    .handle(ClearCache {
                        older_than: older_than_hours.map(hours_to_duration),
                    })
                    .await?;
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = match &args.config {
        Some(path) => load_config_from_path(Some(path)),
        None => load_config(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    print_config(&config);

    let publisher = EventPublisher::new().arc();
    spawn_progress_logger(&publisher);

    let cache = match &args.command {
        Commands::Cache { .. } => open_cache_strict(&config).await?,
        _ => open_cache(&config).await,
    };

    let runtime = Runtime {
        cache,
        audio: Arc::new(SymphoniaAudio::new()),
        publisher,
        config,
    };

    match args.command {
        Commands::Speak(speak) => runtime.speak(speak).await,
        Commands::Srt(srt) => runtime.srt(srt).await,
        Commands::Cache { action } => runtime.cache(action).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_units_saturate() {
        assert_eq!(hours_to_duration(2), Duration::from_secs(7200));
        assert_eq!(hours_to_duration(u64::MAX), Duration::from_secs(u64::MAX));
        assert_eq!(mb_to_bytes(1), 1024 * 1024);
        assert_eq!(mb_to_bytes(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_cache_limit_flags_parse() {
        let args = Args::try_parse_from([
            "srt-tts",
            "speak",
            "--text",
            "hi",
            "--voice",
            "v",
            "--output",
            "out.wav",
            "--cache-size-mb",
            "8",
            "--output-cache-size-mb",
            "4",
        ])
        .unwrap();
        match args.command {
            Commands::Speak(speak) => {
                assert_eq!(speak.cache_size_mb, Some(8));
                assert_eq!(speak.output_cache_size_mb, Some(4));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let args = Args::try_parse_from([
            "srt-tts",
            "srt",
            "records.json",
            "--output",
            "out.wav",
            "--cache-size-mb",
            "16",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Commands::Srt(SrtArgs { cache_size_mb: Some(16), .. })
        ));
    }

    #[tokio::test]
    async fn test_synthesis_continues_when_cache_cannot_open() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("raw");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut config = AppConfig::default();
        config.cache.raw_dir = blocker;
        config.cache.output_dir = dir.path().join("output");

        assert!(open_cache(&config).await.is_none());
        assert!(open_cache_strict(&config).await.is_err());
    }
}
