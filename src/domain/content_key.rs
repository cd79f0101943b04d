//! Content Key - 合成参数指纹
//!
//! 对所有影响音频内容的参数做确定性 md5 摘要，作为缓存文件名

use serde::{Deserialize, Serialize};

use super::conversion::ConversionParams;

/// 字段分隔符
pub const KEY_SEPARATOR: char = ':';

/// 输出缓存 key 的标签
const OUTPUT_KEY_TAG: &str = "rvc";

/// 缓存 key（32 位小写十六进制 md5）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentKey(String);

impl ContentKey {
    /// 计算 key: md5("{tag}:{field_1}:...:{field_n}")
    ///
    /// 字段直接用 `:` 拼接，不做转义。音色或文本中含 `:` 时，
    /// 不同的字段切分可能得到同一个 key。
    pub fn derive(tag: &str, fields: &[&str]) -> Self {
        let mut canonical = String::from(tag);
        for field in fields {
            canonical.push(KEY_SEPARATOR);
            canonical.push_str(field);
        }
        Self(format!("{:x}", md5::compute(canonical.as_bytes())))
    }

    /// 从文件名 stem 还原 key，格式不符返回 None
    pub fn from_hex(hex: &str) -> Option<Self> {
        let valid = hex.len() == 32
            && hex
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(hex.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 原始合成缓存的参数元组
#[derive(Debug, Clone, Copy)]
pub struct RawCacheKey<'a> {
    /// 合成模式（provider 标签，如 "azure" / "edge"）
    pub mode: &'a str,
    pub voice: &'a str,
    pub rate: &'a str,
    pub text: &'a str,
}

impl RawCacheKey<'_> {
    pub fn key(&self) -> ContentKey {
        ContentKey::derive(self.mode, &[self.voice, self.rate, self.text])
    }
}

/// 变声后输出缓存的参数元组
///
/// 在原始合成参数之外，还包含模型身份和全部变声参数
#[derive(Debug, Clone, Copy)]
pub struct OutputCacheKey<'a> {
    pub raw: RawCacheKey<'a>,
    pub conversion: &'a ConversionParams,
}

impl OutputCacheKey<'_> {
    pub fn key(&self) -> ContentKey {
        let c = self.conversion;
        let model = c.model_path.to_string_lossy();
        let index = c
            .index_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let numeric = [
            c.pitch.to_string(),
            c.index_rate.to_string(),
            c.rms_mix_rate.to_string(),
            c.protect.to_string(),
            c.split_audio.to_string(),
            c.autotune.to_string(),
            c.autotune_strength.to_string(),
            c.clean_audio.to_string(),
            c.clean_strength.to_string(),
            c.sid.to_string(),
        ];

        let mut fields: Vec<&str> = vec![
            self.raw.mode,
            self.raw.voice,
            self.raw.rate,
            model.as_ref(),
            index.as_str(),
            c.f0_method.as_str(),
        ];
        fields.extend(numeric.iter().map(String::as_str));
        fields.push(self.raw.text);

        ContentKey::derive(OUTPUT_KEY_TAG, &fields)
    }
}
