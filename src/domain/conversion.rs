//! 变声参数
//!
//! 变声模型本身是外部协作者，这里只描述传给它的参数

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionParams {
    /// 模型文件（模型身份）
    pub model_path: PathBuf,
    /// 检索索引文件
    pub index_path: Option<PathBuf>,
    /// 音高偏移（半音）
    pub pitch: i32,
    pub index_rate: f64,
    pub rms_mix_rate: f64,
    pub protect: f64,
    /// 音高提取方法，如 rmvpe / crepe / fcpe
    pub f0_method: String,
    pub split_audio: bool,
    pub autotune: bool,
    pub autotune_strength: f64,
    pub clean_audio: bool,
    pub clean_strength: f64,
    /// 说话人 ID
    pub sid: u32,
}

impl ConversionParams {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            index_path: None,
            pitch: 0,
            index_rate: 0.75,
            rms_mix_rate: 1.0,
            protect: 0.5,
            f0_method: "rmvpe".to_string(),
            split_audio: false,
            autotune: false,
            autotune_strength: 1.0,
            clean_audio: false,
            clean_strength: 0.5,
            sid: 0,
        }
    }
}
