//! Synchronize Commands - 字幕时间轴同步

use crate::domain::{AssembledTrack, SubtitleSegment};

/// 按字幕时间轴合成整条音轨
#[derive(Debug, Clone)]
pub struct SynchronizeSubtitles {
    pub segments: Vec<SubtitleSegment>,
    pub voice: String,
}

/// 运行汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncSummary {
    pub total: usize,
    pub succeeded: usize,
}

impl SyncSummary {
    /// 退化为静音的片段数
    pub fn fallbacks(&self) -> usize {
        self.total - self.succeeded
    }
}

impl std::fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Generated {}/{} segments successfully",
            self.succeeded, self.total
        )
    }
}

/// 同步结果
#[derive(Debug, Clone)]
pub struct SynchronizeSubtitlesResponse {
    pub track: AssembledTrack,
    pub summary: SyncSummary,
}
