//! Subtitle - 字幕片段
//!
//! 字幕解析由外部完成，这里只接收 (start, end, text) 记录

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubtitleError {
    #[error("Segment {index}: end ({end_ms}ms) is before start ({start_ms}ms)")]
    InvertedWindow {
        index: usize,
        start_ms: u128,
        end_ms: u128,
    },
}

/// 字幕片段，时间窗口为 [start, end)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleSegment {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

impl SubtitleSegment {
    pub fn new(start: Duration, end: Duration, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn from_millis(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self::new(
            Duration::from_millis(start_ms),
            Duration::from_millis(end_ms),
            text,
        )
    }

    /// 目标时长 end - start（窗口倒置时为 0）
    pub fn target_duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// 校验字幕序列
///
/// end < start 视为输入损坏，直接报错；start 非递减只记录告警
pub fn validate_segments(segments: &[SubtitleSegment]) -> Result<(), SubtitleError> {
    for (index, segment) in segments.iter().enumerate() {
        if segment.end < segment.start {
            return Err(SubtitleError::InvertedWindow {
                index,
                start_ms: segment.start.as_millis(),
                end_ms: segment.end.as_millis(),
            });
        }
    }

    if segments.windows(2).any(|w| w[1].start < w[0].start) {
        tracing::warn!("Subtitle segments are not ordered by start time");
    }

    Ok(())
}

/// 外部字幕解析器输出的 JSON 记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleRecord {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
    /// 外部语言检测结果
    #[serde(default)]
    pub lang: Option<String>,
}

impl From<&SubtitleRecord> for SubtitleSegment {
    fn from(record: &SubtitleRecord) -> Self {
        SubtitleSegment::from_millis(record.start_ms, record.end_ms, record.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_duration() {
        let segment = SubtitleSegment::from_millis(3000, 5000, "hi");
        assert_eq!(segment.target_duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let segments = vec![
            SubtitleSegment::from_millis(0, 1000, "a"),
            SubtitleSegment::from_millis(2000, 1500, "b"),
        ];
        let err = validate_segments(&segments).unwrap_err();
        assert_eq!(
            err,
            SubtitleError::InvertedWindow {
                index: 1,
                start_ms: 2000,
                end_ms: 1500
            }
        );
    }

    #[test]
    fn test_validate_accepts_zero_length_and_unordered() {
        let segments = vec![
            SubtitleSegment::from_millis(2000, 2000, "a"),
            SubtitleSegment::from_millis(1000, 1500, "b"),
        ];
        assert!(validate_segments(&segments).is_ok());
    }

    #[test]
    fn test_record_deserialize() {
        let json = r#"[{"start_ms": 0, "end_ms": 1200, "text": "Hello", "lang": "en"},
                       {"start_ms": 1500, "end_ms": 2000, "text": "World"}]"#;
        let records: Vec<SubtitleRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].lang.as_deref(), Some("en"));
        assert!(records[1].lang.is_none());

        let segment = SubtitleSegment::from(&records[1]);
        assert_eq!(segment.start, Duration::from_millis(1500));
        assert_eq!(segment.text, "World");
    }
}
