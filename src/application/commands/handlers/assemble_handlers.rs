//! Assemble Handlers - 逐段合成到文件与顺序拼接

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::segment_synthesis::SegmentSynthesizer;
use crate::application::commands::{
    AssembleSequential, AssembleSequentialResponse, SynthesizeSegmentFiles,
    SynthesizeSegmentFilesResponse,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    format_percent_rate, AudioContainer, AudioDecoderPort, NoProgress, ProgressPort, SyncEvent,
    SynthesisRequest,
};
use crate::domain::{validate_segments, AssembledTrack, PcmAudio};

/// 顺序拼接参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblySettings {
    /// 相邻有效片段之间的静音
    pub gap: Duration,
    /// 不超过该大小的文件视为无效
    pub min_file_bytes: u64,
    /// 没有任何有效片段时返回的静音长度
    pub empty_fallback: Duration,
    pub sample_rate: u32,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            gap: Duration::from_millis(300),
            min_file_bytes: 500,
            empty_fallback: Duration::from_millis(1000),
            sample_rate: 24000,
        }
    }
}

// ============================================================================
// SynthesizeSegmentFiles
// ============================================================================

/// SynthesizeSegmentFiles Handler
pub struct SynthesizeSegmentFilesHandler {
    segment_synth: SegmentSynthesizer,
    progress: Arc<dyn ProgressPort>,
}

impl SynthesizeSegmentFilesHandler {
    pub fn new(segment_synth: SegmentSynthesizer) -> Self {
        Self {
            segment_synth,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressPort>) -> Self {
        self.progress = progress;
        self
    }

    pub async fn handle(
        &self,
        command: SynthesizeSegmentFiles,
    ) -> Result<SynthesizeSegmentFilesResponse, ApplicationError> {
        validate_segments(&command.segments)?;
        self.segment_synth.synthesizer().check_available().await?;
        tokio::fs::create_dir_all(&command.work_dir).await?;

        let rate = format_percent_rate(command.rate_percent);
        let extension = self.segment_synth.container().extension();
        let total = command.segments.len();
        let mut files = Vec::with_capacity(total);
        let mut succeeded = 0;

        for (index, segment) in command.segments.iter().enumerate() {
            self.progress.publish(SyncEvent::SegmentStarted {
                current: index + 1,
                total,
            });

            let path = command
                .work_dir
                .join(format!("segment_{:04}.{}", index, extension));
            // 清掉上次运行遗留的文件，失败的片段必须表现为缺失
            let _ = tokio::fs::remove_file(&path).await;

            let request = SynthesisRequest::new(&segment.text, &command.voice, &rate);
            match self.segment_synth.synthesize(&request, index).await {
                Ok(blob) => match tokio::fs::write(&path, &blob).await {
                    Ok(()) => {
                        succeeded += 1;
                        self.progress.publish(SyncEvent::SegmentSynthesized {
                            index,
                            duration_ms: (self.segment_synth.probe().duration(&blob) * 1000.0)
                                as u64,
                            speed_factor: None,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            segment = index,
                            path = %path.display(),
                            error = %e,
                            "Failed to write segment file"
                        );
                        self.progress.publish(SyncEvent::SegmentFellBack {
                            index,
                            reason: e.to_string(),
                        });
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        segment = index,
                        error = %e,
                        "Segment synthesis failed, skipping"
                    );
                    self.progress.publish(SyncEvent::SegmentFellBack {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
            files.push(path);
        }

        tracing::info!(succeeded = succeeded, total = total, "Segment files synthesized");
        Ok(SynthesizeSegmentFilesResponse { files, succeeded })
    }
}

// ============================================================================
// AssembleSequential
// ============================================================================

/// AssembleSequential Handler
pub struct AssembleSequentialHandler {
    decoder: Arc<dyn AudioDecoderPort>,
    settings: AssemblySettings,
}

impl AssembleSequentialHandler {
    pub fn new(decoder: Arc<dyn AudioDecoderPort>, settings: AssemblySettings) -> Self {
        Self { decoder, settings }
    }

    /// 读取并解码单个文件；无效时返回 None
    async fn load(&self, index: usize, path: &Path) -> Option<PcmAudio> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(_) => {
                tracing::debug!(segment = index, path = %path.display(), "Segment file not found");
                return None;
            }
        };
        if metadata.len() <= self.settings.min_file_bytes {
            tracing::debug!(
                segment = index,
                size_bytes = metadata.len(),
                "Segment file too small, skipping"
            );
            return None;
        }

        let blob = match tokio::fs::read(path).await {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(
                    segment = index,
                    path = %path.display(),
                    error = %e,
                    "Failed to read segment file"
                );
                return None;
            }
        };

        let hint = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(AudioContainer::from_extension);
        match self.decoder.decode(&blob, hint) {
            Ok(audio) if !audio.is_empty() => Some(audio),
            Ok(_) => {
                tracing::debug!(segment = index, "Segment file decoded to no samples, skipping");
                None
            }
            Err(e) => {
                tracing::warn!(
                    segment = index,
                    path = %path.display(),
                    error = %e,
                    "Failed to decode segment file"
                );
                None
            }
        }
    }

    pub async fn handle(
        &self,
        command: AssembleSequential,
    ) -> Result<AssembleSequentialResponse, ApplicationError> {
        let total = command.files.len();
        let mut track = AssembledTrack::new(self.settings.sample_rate);
        let mut valid = 0;

        for (index, path) in command.files.iter().enumerate() {
            let Some(audio) = self.load(index, path).await else {
                continue;
            };
            if valid > 0 {
                track.append_silence(self.settings.gap);
            }
            track.append(&audio);
            valid += 1;
        }

        if valid == 0 {
            tracing::warn!(total = total, "No segments loaded, returning silence");
            track.append_silence(self.settings.empty_fallback);
        }

        tracing::info!(
            valid = valid,
            total = total,
            duration_ms = track.duration_ms(),
            "Sequential assembly finished"
        );
        Ok(AssembleSequentialResponse {
            track,
            valid,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::RetryPolicy;
    use crate::domain::{encode_wav, SubtitleSegment};
    use crate::infrastructure::adapters::{FakeTtsClient, SymphoniaAudio};
    use tempfile::tempdir;

    fn assembler() -> AssembleSequentialHandler {
        AssembleSequentialHandler::new(Arc::new(SymphoniaAudio::new()), AssemblySettings::default())
    }

    fn tone_wav(secs: f64, sample_rate: u32) -> Vec<u8> {
        let frames = (secs * sample_rate as f64) as usize;
        encode_wav(&vec![0.25; frames], sample_rate)
    }

    #[tokio::test]
    async fn test_missing_file_contributes_no_gap() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("0.wav");
        let missing = dir.path().join("1.wav");
        let third = dir.path().join("2.wav");
        tokio::fs::write(&first, tone_wav(1.0, 24000)).await.unwrap();
        tokio::fs::write(&third, tone_wav(0.5, 24000)).await.unwrap();

        let response = assembler()
            .handle(AssembleSequential {
                files: vec![first, missing, third],
            })
            .await
            .unwrap();

        assert_eq!(response.valid, 2);
        assert_eq!(response.total, 3);
        // 1s + 300ms + 0.5s
        assert_eq!(response.track.samples().len(), 24000 + 7200 + 12000);
        assert!(response.track.samples()[24000..31200].iter().all(|s| *s == 0.0));
    }

    #[tokio::test]
    async fn test_small_and_corrupt_files_are_skipped() {
        let dir = tempdir().unwrap();
        let tiny = dir.path().join("tiny.wav");
        let corrupt = dir.path().join("corrupt.mp3");
        let good = dir.path().join("good.wav");
        tokio::fs::write(&tiny, tone_wav(0.005, 24000)).await.unwrap();
        tokio::fs::write(&corrupt, vec![0u8; 2048]).await.unwrap();
        tokio::fs::write(&good, tone_wav(1.0, 16000)).await.unwrap();

        let response = assembler()
            .handle(AssembleSequential {
                files: vec![tiny, corrupt, good],
            })
            .await
            .unwrap();

        assert_eq!(response.valid, 1);
        // 重采样到 24kHz，无间隔
        assert_eq!(response.track.samples().len(), 24000);
    }

    #[tokio::test]
    async fn test_zero_valid_files_yield_one_second_silence() {
        let dir = tempdir().unwrap();
        let response = assembler()
            .handle(AssembleSequential {
                files: vec![dir.path().join("a.mp3"), dir.path().join("b.mp3")],
            })
            .await
            .unwrap();

        assert_eq!(response.valid, 0);
        assert_eq!(response.total, 2);
        assert_eq!(response.track.duration_ms(), 1000);
        assert!(response.track.samples().iter().all(|s| *s == 0.0));
    }

    #[tokio::test]
    async fn test_segment_files_then_assemble() {
        let dir = tempdir().unwrap();
        let fake = Arc::new(FakeTtsClient::with_defaults().fail_text("skip me"));
        let segment_synth = SegmentSynthesizer::new(fake.clone(), Arc::new(SymphoniaAudio::new()))
            .with_retry(RetryPolicy::immediate(1));
        let files_handler = SynthesizeSegmentFilesHandler::new(segment_synth);

        let files = files_handler
            .handle(SynthesizeSegmentFiles {
                segments: vec![
                    SubtitleSegment::from_millis(0, 1000, "0123456789"),
                    SubtitleSegment::from_millis(1000, 2000, "skip me"),
                    SubtitleSegment::from_millis(2000, 3000, "01234"),
                ],
                voice: "en-US-AriaNeural".to_string(),
                rate_percent: 0,
                work_dir: dir.path().join("segments"),
            })
            .await
            .unwrap();

        assert_eq!(files.files.len(), 3);
        assert_eq!(files.succeeded, 2);
        assert!(!files.files[1].exists());
        assert!(fake.requests().iter().all(|r| r.rate == "+0%"));

        let response = assembler()
            .handle(AssembleSequential { files: files.files })
            .await
            .unwrap();
        assert_eq!(response.valid, 2);
        // 1s + 300ms + 0.5s
        assert_eq!(response.track.duration_ms(), 1800);
    }
}
