//! Speech Commands - 文本/字幕到语音的完整流程

use serde::Serialize;
use std::path::PathBuf;

use crate::domain::{ConversionParams, SubtitleRecord};

/// 文本来源
#[derive(Debug, Clone)]
pub enum TextSource {
    Literal(String),
    /// UTF-8 文本文件，非法字节按替换字符处理
    File(PathBuf),
}

/// 合成一段文本并（可选）变声，写入输出文件
#[derive(Debug, Clone)]
pub struct ConvertText {
    pub source: TextSource,
    pub voice: String,
    pub rate_percent: i32,
    pub output_path: PathBuf,
    pub conversion: Option<ConversionParams>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertTextResponse {
    pub output_path: PathBuf,
    pub size_bytes: u64,
    /// 变声结果来自输出缓存
    pub from_cache: bool,
    pub converted: bool,
}

/// 字幕配音
#[derive(Debug, Clone)]
pub struct SubtitleSpeech {
    pub records: Vec<SubtitleRecord>,
    /// 为空时按字幕的主要语言选择默认音色
    pub voice: Option<String>,
    /// 顺序拼接路径使用的百分比语速
    pub rate_percent: i32,
    pub output_path: PathBuf,
}

/// 实际采用的拼接方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechMode {
    Synchronized,
    Sequential,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubtitleSpeechResponse {
    pub output_path: PathBuf,
    pub mode: SpeechMode,
    pub voice: String,
    pub succeeded: usize,
    pub total: usize,
    pub duration_ms: u64,
}
