//! Progress Port - 进度事件

use serde::{Deserialize, Serialize};

/// 同步进度事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum SyncEvent {
    /// 开始处理第 `current` 段（从 1 计）
    SegmentStarted { current: usize, total: usize },
    SegmentSynthesized {
        index: usize,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed_factor: Option<f64>,
    },
    /// 片段退化为静音或被跳过
    SegmentFellBack { index: usize, reason: String },
    Finished { succeeded: usize, total: usize },
}

pub trait ProgressPort: Send + Sync {
    fn publish(&self, event: SyncEvent);
}

/// 丢弃所有事件
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressPort for NoProgress {
    fn publish(&self, _event: SyncEvent) {}
}
