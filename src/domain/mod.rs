//! 领域层
//!
//! 纯数据与纯函数：字幕片段、缓存 key、音轨、语言映射

pub mod content_key;
pub mod conversion;
pub mod language;
pub mod subtitle;
pub mod track;

pub use content_key::{ContentKey, OutputCacheKey, RawCacheKey, KEY_SEPARATOR};
pub use conversion::ConversionParams;
pub use language::{default_voice_for_language, majority_language, DEFAULT_LANGUAGE};
pub use subtitle::{validate_segments, SubtitleError, SubtitleRecord, SubtitleSegment};
pub use track::{encode_wav, resample_linear, AssembledTrack, PcmAudio};
