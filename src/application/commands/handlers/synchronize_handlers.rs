//! Synchronize Handlers - 字幕时间轴同步
//!
//! 每段先以中性语速合成并测量时长，按窗口长度求倍率后重新合成，
//! 再按字幕起点补静音拼接。单段失败退化为窗口长度的静音，不中断整体运行。

use std::sync::Arc;
use std::time::Duration;

use super::segment_synthesis::SegmentSynthesizer;
use crate::application::commands::{SyncSummary, SynchronizeSubtitles, SynchronizeSubtitlesResponse};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    format_speed_rate, AudioDecoderPort, NoProgress, ProgressPort, SyncEvent, SynthesisRequest,
};
use crate::domain::{validate_segments, AssembledTrack, PcmAudio, SubtitleSegment};

/// 同步参数
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub min_speed: f64,
    pub max_speed: f64,
    /// 测量时长用的语速
    pub neutral_rate: String,
    /// 输出音轨采样率
    pub sample_rate: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            min_speed: 0.5,
            max_speed: 3.0,
            neutral_rate: "1.0".to_string(),
            sample_rate: 16000,
        }
    }
}

impl SyncSettings {
    /// measured / target，限制在 [min_speed, max_speed]
    ///
    /// 零长度窗口视为需要无限加速，取上限
    pub fn speed_factor(&self, measured: Duration, target: Duration) -> f64 {
        if target.is_zero() {
            return self.max_speed;
        }
        let factor = measured.as_secs_f64() / target.as_secs_f64();
        factor.clamp(self.min_speed, self.max_speed)
    }
}

/// 单段处理结果
enum SegmentOutcome {
    Synthesized { audio: PcmAudio, speed_factor: f64 },
    Silence { reason: String },
}

/// SynchronizeSubtitles Handler
pub struct SynchronizeSubtitlesHandler {
    segment_synth: SegmentSynthesizer,
    decoder: Arc<dyn AudioDecoderPort>,
    progress: Arc<dyn ProgressPort>,
    settings: SyncSettings,
}

impl SynchronizeSubtitlesHandler {
    pub fn new(
        segment_synth: SegmentSynthesizer,
        decoder: Arc<dyn AudioDecoderPort>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            segment_synth,
            decoder,
            progress: Arc::new(NoProgress),
            settings,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressPort>) -> Self {
        self.progress = progress;
        self
    }

    pub async fn handle(
        &self,
        command: SynchronizeSubtitles,
    ) -> Result<SynchronizeSubtitlesResponse, ApplicationError> {
        validate_segments(&command.segments)?;
        self.segment_synth.synthesizer().check_available().await?;

        let total = command.segments.len();
        let mut track = AssembledTrack::new(self.settings.sample_rate);
        let mut summary = SyncSummary {
            total,
            succeeded: 0,
        };

        tracing::info!(
            segments = total,
            voice = %command.voice,
            mode = %self.segment_synth.synthesizer().mode(),
            "Starting subtitle synchronization"
        );

        for (index, segment) in command.segments.iter().enumerate() {
            self.progress.publish(SyncEvent::SegmentStarted {
                current: index + 1,
                total,
            });

            let audio = match self.synthesize_segment(index, segment, &command.voice).await {
                SegmentOutcome::Synthesized {
                    audio,
                    speed_factor,
                } => {
                    summary.succeeded += 1;
                    self.progress.publish(SyncEvent::SegmentSynthesized {
                        index,
                        duration_ms: audio.duration().as_millis() as u64,
                        speed_factor: Some(speed_factor),
                    });
                    audio
                }
                SegmentOutcome::Silence { reason } => {
                    tracing::warn!(
                        segment = index,
                        reason = %reason,
                        "Segment failed, using silence"
                    );
                    self.progress.publish(SyncEvent::SegmentFellBack { index, reason });
                    PcmAudio::silence(segment.target_duration(), self.settings.sample_rate)
                }
            };

            // 只补不截：前一段超长时后续整体顺延
            track.pad_to(segment.start);
            track.append(&audio);
        }

        self.progress.publish(SyncEvent::Finished {
            succeeded: summary.succeeded,
            total,
        });
        tracing::info!(
            succeeded = summary.succeeded,
            total = total,
            duration_ms = track.duration_ms(),
            "{}",
            summary
        );

        Ok(SynchronizeSubtitlesResponse { track, summary })
    }

    async fn synthesize_segment(
        &self,
        index: usize,
        segment: &SubtitleSegment,
        voice: &str,
    ) -> SegmentOutcome {
        let target = segment.target_duration();

        let neutral = SynthesisRequest::new(&segment.text, voice, &self.settings.neutral_rate);
        let measured_blob = match self.segment_synth.synthesize(&neutral, index).await {
            Ok(blob) => blob,
            Err(e) => {
                return SegmentOutcome::Silence {
                    reason: e.to_string(),
                }
            }
        };

        let measured_secs = self.segment_synth.probe().duration(&measured_blob);
        if !(measured_secs.is_finite() && measured_secs > 0.0) {
            return SegmentOutcome::Silence {
                reason: "synthesized audio has no measurable duration".to_string(),
            };
        }
        let measured = Duration::from_secs_f64(measured_secs);

        let speed_factor = self.settings.speed_factor(measured, target);
        let adjusted = SynthesisRequest::new(&segment.text, voice, format_speed_rate(speed_factor));

        tracing::debug!(
            segment = index,
            measured_ms = measured.as_millis() as u64,
            target_ms = target.as_millis() as u64,
            speed_factor = speed_factor,
            "Re-synthesizing at adjusted rate"
        );

        let final_blob = match self.segment_synth.synthesize(&adjusted, index).await {
            Ok(blob) => blob,
            Err(e) => {
                return SegmentOutcome::Silence {
                    reason: e.to_string(),
                }
            }
        };

        match self
            .decoder
            .decode(&final_blob, Some(self.segment_synth.container()))
        {
            Ok(audio) if !audio.is_empty() => SegmentOutcome::Synthesized {
                audio,
                speed_factor,
            },
            Ok(_) => SegmentOutcome::Silence {
                reason: "adjusted audio decoded to no samples".to_string(),
            },
            Err(e) => SegmentOutcome::Silence {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::RetryPolicy;
    use crate::infrastructure::adapters::{FakeTtsClient, FakeTtsClientConfig, SymphoniaAudio};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectProgress(Mutex<Vec<SyncEvent>>);

    impl ProgressPort for CollectProgress {
        fn publish(&self, event: SyncEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn fake(ms_per_char: u64) -> FakeTtsClient {
        FakeTtsClient::new(FakeTtsClientConfig {
            ms_per_char,
            ..Default::default()
        })
    }

    fn handler(fake: Arc<FakeTtsClient>) -> SynchronizeSubtitlesHandler {
        let audio = Arc::new(SymphoniaAudio::new());
        let segment_synth =
            SegmentSynthesizer::new(fake, audio.clone()).with_retry(RetryPolicy::immediate(3));
        SynchronizeSubtitlesHandler::new(segment_synth, audio, SyncSettings::default())
    }

    fn command(segments: Vec<SubtitleSegment>) -> SynchronizeSubtitles {
        SynchronizeSubtitles {
            segments,
            voice: "en-US-AriaNeural".to_string(),
        }
    }

    #[test]
    fn test_speed_factor_clamp() {
        let settings = SyncSettings::default();
        let secs = Duration::from_secs_f64;
        assert_eq!(settings.speed_factor(secs(4.0), secs(2.0)), 2.0);
        assert_eq!(settings.speed_factor(secs(4.0), secs(0.4)), 3.0);
        assert_eq!(settings.speed_factor(secs(0.5), secs(2.0)), 0.5);
        assert_eq!(settings.speed_factor(secs(1.0), Duration::ZERO), 3.0);
    }

    #[tokio::test]
    async fn test_two_segment_alignment() {
        let fake = Arc::new(fake(1000));
        let progress = Arc::new(CollectProgress::default());
        let handler = handler(fake.clone()).with_progress(progress.clone());

        let response = handler
            .handle(command(vec![
                SubtitleSegment::from_millis(0, 2000, "abcd"),
                SubtitleSegment::from_millis(3000, 5000, "ab"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.summary, SyncSummary { total: 2, succeeded: 2 });
        // 2s 语音 + 1s 补齐 + 2s 语音
        assert_eq!(response.track.samples().len(), 5 * 16000);
        assert_eq!(response.track.duration_ms(), 5000);
        // 补齐区间为静音
        assert!(response.track.samples()[32000..48000].iter().all(|s| *s == 0.0));

        let rates: Vec<String> = fake.requests().into_iter().map(|r| r.rate).collect();
        assert_eq!(rates, vec!["1.0", "2.00", "1.0", "1.00"]);

        let events = progress.0.lock().unwrap().clone();
        assert_eq!(events[0], SyncEvent::SegmentStarted { current: 1, total: 2 });
        assert_eq!(
            events[1],
            SyncEvent::SegmentSynthesized {
                index: 0,
                duration_ms: 2000,
                speed_factor: Some(2.0)
            }
        );
        assert_eq!(
            events.last().unwrap(),
            &SyncEvent::Finished { succeeded: 2, total: 2 }
        );
    }

    #[tokio::test]
    async fn test_speed_factor_clamped_to_max() {
        let fake = Arc::new(fake(1000));
        let handler = handler(fake.clone());

        let response = handler
            .handle(command(vec![SubtitleSegment::from_millis(0, 400, "abcd")]))
            .await
            .unwrap();

        assert_eq!(response.summary.succeeded, 1);
        assert_eq!(fake.requests()[1].rate, "3.00");
        // 4s / 3.0，超出窗口但不截断
        let expected = (4.0 / 3.0 * 16000.0_f64).round() as usize;
        assert_eq!(response.track.samples().len(), expected);
    }

    #[tokio::test]
    async fn test_failed_segment_becomes_window_silence() {
        let fake = Arc::new(fake(500).fail_text("bad"));
        let progress = Arc::new(CollectProgress::default());
        let handler = handler(fake.clone()).with_progress(progress.clone());

        let response = handler
            .handle(command(vec![
                SubtitleSegment::from_millis(0, 1000, "a"),
                SubtitleSegment::from_millis(1000, 2500, "bad"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.summary, SyncSummary { total: 2, succeeded: 1 });
        assert_eq!(response.summary.fallbacks(), 1);
        assert_eq!(response.track.duration_ms(), 2500);
        // 第一段两次调用，第二段一次首试加三次重试
        assert_eq!(fake.call_count(), 6);

        let events = progress.0.lock().unwrap().clone();
        assert!(events
            .iter()
            .any(|e| matches!(e, SyncEvent::SegmentFellBack { index: 1, .. })));
    }

    #[tokio::test]
    async fn test_all_segments_failing_still_returns_track() {
        let fake = Arc::new(fake(100).fail_first(usize::MAX));
        let handler = handler(fake);

        let response = handler
            .handle(command(vec![
                SubtitleSegment::from_millis(500, 1500, "one"),
                SubtitleSegment::from_millis(1500, 3000, "two"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.summary.succeeded, 0);
        assert_eq!(response.track.duration_ms(), 3000);
        assert!(response.track.samples().iter().all(|s| *s == 0.0));
    }

    #[tokio::test]
    async fn test_overrun_pushes_next_segment_later() {
        let fake = Arc::new(fake(1000));
        let handler = handler(fake);

        // 第一段 4s 文本只有 0.5s 窗口，3 倍速后仍有 1.333s
        let response = handler
            .handle(command(vec![
                SubtitleSegment::from_millis(0, 500, "abcd"),
                SubtitleSegment::from_millis(1000, 2000, "a"),
            ]))
            .await
            .unwrap();

        let first = (4.0 / 3.0 * 16000.0_f64).round() as usize;
        assert_eq!(response.track.samples().len(), first + 16000);
    }

    #[tokio::test]
    async fn test_empty_segment_list() {
        let fake = Arc::new(fake(100));
        let response = handler(fake.clone()).handle(command(vec![])).await.unwrap();
        assert_eq!(response.summary, SyncSummary::default());
        assert!(response.track.is_empty());
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn test_inverted_window_is_rejected() {
        let fake = Arc::new(fake(100));
        let result = handler(fake.clone())
            .handle(command(vec![SubtitleSegment::from_millis(2000, 1000, "x")]))
            .await;
        assert!(matches!(result, Err(ApplicationError::ValidationError(_))));
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_provider_reported_upfront() {
        let fake = Arc::new(fake(100).unavailable());
        let result = handler(fake.clone())
            .handle(command(vec![SubtitleSegment::from_millis(0, 1000, "x")]))
            .await;
        assert!(matches!(result, Err(ApplicationError::ProviderUnavailable(_))));
        assert_eq!(fake.call_count(), 0);
    }
}
