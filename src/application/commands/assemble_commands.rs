//! Assemble Commands - 顺序拼接

use std::path::PathBuf;

use crate::domain::{AssembledTrack, SubtitleSegment};

/// 按顺序拼接独立合成的音频文件，忽略字幕时间
#[derive(Debug, Clone)]
pub struct AssembleSequential {
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AssembleSequentialResponse {
    pub track: AssembledTrack,
    /// 成功解码并拼入的文件数
    pub valid: usize,
    pub total: usize,
}

/// 逐段合成到文件（不可调速的合成服务）
#[derive(Debug, Clone)]
pub struct SynthesizeSegmentFiles {
    pub segments: Vec<SubtitleSegment>,
    pub voice: String,
    /// 百分比语速调整
    pub rate_percent: i32,
    /// 片段文件的输出目录
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SynthesizeSegmentFilesResponse {
    /// 与片段一一对应；失败的片段对应的文件不存在
    pub files: Vec<PathBuf>,
    pub succeeded: usize,
}
