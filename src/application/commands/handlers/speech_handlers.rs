//! Speech Handlers - 文本配音与字幕配音流程

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::assemble_handlers::{AssembleSequentialHandler, SynthesizeSegmentFilesHandler};
use super::segment_synthesis::SegmentSynthesizer;
use super::synchronize_handlers::SynchronizeSubtitlesHandler;
use crate::application::commands::{
    AssembleSequential, ConvertText, ConvertTextResponse, SpeechMode, SubtitleSpeech,
    SubtitleSpeechResponse, SynchronizeSubtitles, SynthesizeSegmentFiles, TextSource,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    format_percent_rate, AudioContainer, AudioTranscoderPort, CacheNamespace, CacheStorePort,
    SynthesisRequest, VoiceConverterPort,
};
use crate::domain::{
    default_voice_for_language, majority_language, AssembledTrack, OutputCacheKey, RawCacheKey,
    SubtitleSegment,
};

async fn read_text(source: &TextSource) -> Result<String, ApplicationError> {
    match source {
        TextSource::Literal(text) => Ok(text.clone()),
        TextSource::File(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                ApplicationError::validation(format!("Cannot read {}: {}", path.display(), e))
            })?;
            Ok(match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        "Input is not valid UTF-8, replacing invalid bytes"
                    );
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            })
        }
    }
}

async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), ApplicationError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

// ============================================================================
// ConvertText
// ============================================================================

/// ConvertText Handler
///
/// 合成 → 转为 WAV →（可选）变声，变声结果经输出缓存
pub struct ConvertTextHandler {
    segment_synth: SegmentSynthesizer,
    transcoder: Arc<dyn AudioTranscoderPort>,
    converter: Option<Arc<dyn VoiceConverterPort>>,
    cache: Option<Arc<dyn CacheStorePort>>,
    output_cache_limit: Option<u64>,
}

impl ConvertTextHandler {
    pub fn new(
        segment_synth: SegmentSynthesizer,
        transcoder: Arc<dyn AudioTranscoderPort>,
    ) -> Self {
        Self {
            segment_synth,
            transcoder,
            converter: None,
            cache: None,
            output_cache_limit: None,
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn VoiceConverterPort>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// 输出缓存
    pub fn with_cache(mut self, cache: Arc<dyn CacheStorePort>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_output_cache_limit(mut self, max_bytes: u64) -> Self {
        self.output_cache_limit = Some(max_bytes);
        self
    }

    pub async fn handle(
        &self,
        command: ConvertText,
    ) -> Result<ConvertTextResponse, ApplicationError> {
        let text = read_text(&command.source).await?;
        if text.trim().is_empty() {
            return Err(ApplicationError::validation("Input text is empty"));
        }

        let synthesizer = self.segment_synth.synthesizer();
        synthesizer.check_available().await?;

        let converter = match (&command.conversion, &self.converter) {
            (Some(_), None) => {
                return Err(ApplicationError::validation(
                    "Voice conversion requested but no converter is configured",
                ))
            }
            (Some(_), Some(converter)) => Some(converter),
            (None, _) => None,
        };

        let rate = format_percent_rate(command.rate_percent);
        let raw_key = RawCacheKey {
            mode: synthesizer.mode(),
            voice: &command.voice,
            rate: &rate,
            text: &text,
        };
        let output_key = command.conversion.as_ref().map(|conversion| {
            OutputCacheKey {
                raw: raw_key,
                conversion,
            }
            .key()
        });

        if let (Some(cache), Some(key)) = (&self.cache, &output_key) {
            match cache.get(CacheNamespace::Output, key).await {
                Ok(Some(blob)) => {
                    write_output(&command.output_path, &blob).await?;
                    tracing::info!(
                        output = %command.output_path.display(),
                        key = %key,
                        "Converted audio served from cache"
                    );
                    return Ok(ConvertTextResponse {
                        output_path: command.output_path,
                        size_bytes: blob.len() as u64,
                        from_cache: true,
                        converted: true,
                    });
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "Output cache lookup failed"),
            }
        }

        let request = SynthesisRequest::new(&text, &command.voice, &rate);
        let blob = self.segment_synth.synthesize(&request, 0).await?;
        let wav = self.transcoder.to_wav(&blob, self.segment_synth.container())?;

        let (Some(conversion), Some(converter)) = (&command.conversion, converter) else {
            write_output(&command.output_path, &wav).await?;
            tracing::info!(
                output = %command.output_path.display(),
                size_bytes = wav.len(),
                "Speech written"
            );
            return Ok(ConvertTextResponse {
                output_path: command.output_path,
                size_bytes: wav.len() as u64,
                from_cache: false,
                converted: false,
            });
        };

        let intermediate = intermediate_path(&command.output_path);
        write_output(&intermediate, &wav).await?;
        let converted = converter
            .convert(&intermediate, &command.output_path, conversion)
            .await;
        let _ = tokio::fs::remove_file(&intermediate).await;
        converted?;

        let output = tokio::fs::read(&command.output_path).await?;
        if let (Some(cache), Some(key)) = (&self.cache, &output_key) {
            let stored = match self.output_cache_limit {
                Some(max_bytes) => {
                    cache
                        .put_with_limit(
                            CacheNamespace::Output,
                            key,
                            &output,
                            AudioContainer::Wav,
                            max_bytes,
                        )
                        .await
                }
                None => cache.put(CacheNamespace::Output, key, &output, AudioContainer::Wav).await,
            };
            if let Err(e) = stored {
                tracing::warn!(key = %key, error = %e, "Failed to save converted audio to cache");
            }
        }

        tracing::info!(
            output = %command.output_path.display(),
            size_bytes = output.len(),
            "Converted speech written"
        );
        Ok(ConvertTextResponse {
            output_path: command.output_path,
            size_bytes: output.len() as u64,
            from_cache: false,
            converted: true,
        })
    }
}

/// `out.wav` → `out_tts.wav`
fn intermediate_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}_tts.wav", stem))
}

// ============================================================================
// SubtitleSpeech
// ============================================================================

/// SubtitleSpeech Handler
///
/// 可调速的服务走时间轴同步；不可用或不可调速时退回逐段合成 + 顺序拼接
pub struct SubtitleSpeechHandler {
    synchronizer: Option<SynchronizeSubtitlesHandler>,
    segment_files: Option<SynthesizeSegmentFilesHandler>,
    assembler: AssembleSequentialHandler,
}

impl SubtitleSpeechHandler {
    pub fn new(assembler: AssembleSequentialHandler) -> Self {
        Self {
            synchronizer: None,
            segment_files: None,
            assembler,
        }
    }

    pub fn with_synchronizer(mut self, synchronizer: SynchronizeSubtitlesHandler) -> Self {
        self.synchronizer = Some(synchronizer);
        self
    }

    pub fn with_segment_files(mut self, segment_files: SynthesizeSegmentFilesHandler) -> Self {
        self.segment_files = Some(segment_files);
        self
    }

    pub async fn handle(
        &self,
        command: SubtitleSpeech,
    ) -> Result<SubtitleSpeechResponse, ApplicationError> {
        let segments: Vec<SubtitleSegment> = command.records.iter().map(Into::into).collect();
        let voice = match &command.voice {
            Some(voice) => voice.clone(),
            None => {
                let language =
                    majority_language(command.records.iter().map(|r| r.lang.as_deref()));
                let voice = default_voice_for_language(&language).to_string();
                tracing::info!(language = %language, voice = %voice, "Selected default voice");
                voice
            }
        };

        if let Some(synchronizer) = &self.synchronizer {
            let result = synchronizer
                .handle(SynchronizeSubtitles {
                    segments: segments.clone(),
                    voice: voice.clone(),
                })
                .await;
            match result {
                Ok(response) => {
                    return self
                        .finish(
                            &command.output_path,
                            SpeechMode::Synchronized,
                            voice,
                            response.track,
                            response.summary.succeeded,
                            response.summary.total,
                        )
                        .await;
                }
                Err(ApplicationError::ProviderUnavailable(reason))
                    if self.segment_files.is_some() =>
                {
                    tracing::warn!(
                        reason = %reason,
                        "Timed synthesis unavailable, falling back to sequential assembly"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let segment_files = self.segment_files.as_ref().ok_or_else(|| {
            ApplicationError::ProviderUnavailable(
                "no sequential synthesizer configured".to_string(),
            )
        })?;

        let work_dir = command.output_path.with_extension("segments");
        let files = segment_files
            .handle(SynthesizeSegmentFiles {
                segments,
                voice: voice.clone(),
                rate_percent: command.rate_percent,
                work_dir: work_dir.clone(),
            })
            .await?;
        let assembled = self
            .assembler
            .handle(AssembleSequential { files: files.files })
            .await;
        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            tracing::debug!(
                dir = %work_dir.display(),
                error = %e,
                "Failed to remove segment directory"
            );
        }
        let assembled = assembled?;

        self.finish(
            &command.output_path,
            SpeechMode::Sequential,
            voice,
            assembled.track,
            assembled.valid,
            assembled.total,
        )
        .await
    }

    async fn finish(
        &self,
        output_path: &Path,
        mode: SpeechMode,
        voice: String,
        track: AssembledTrack,
        succeeded: usize,
        total: usize,
    ) -> Result<SubtitleSpeechResponse, ApplicationError> {
        write_output(output_path, &track.encode_wav()).await?;
        tracing::info!(
            output = %output_path.display(),
            mode = ?mode,
            succeeded = succeeded,
            total = total,
            duration_ms = track.duration_ms(),
            "Subtitle speech written"
        );
        Ok(SubtitleSpeechResponse {
            output_path: output_path.to_path_buf(),
            mode,
            voice,
            succeeded,
            total,
            duration_ms: track.duration_ms(),
        })
    }
}
