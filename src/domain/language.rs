//! 语言 → 默认音色
//!
//! 语言检测本身由外部完成，这里只做多数表决和音色映射

use std::collections::HashMap;

/// 检测不到任何语言时的默认值
pub const DEFAULT_LANGUAGE: &str = "en";

const DEFAULT_VOICE: &str = "en-US-AriaNeural";

const VOICE_TABLE: &[(&str, &str)] = &[
    ("en", "en-US-AriaNeural"),
    ("es", "es-ES-ArnauNeural"),
    ("zh-cn", "zh-CN-YunjieNeural"),
    ("zh-tw", "zh-TW-HsiaoChenNeural"),
    ("fr", "fr-FR-DeniseNeural"),
    ("de", "de-DE-KatjaNeural"),
    ("it", "it-IT-ElsaNeural"),
    ("ja", "ja-JP-NanamiNeural"),
    ("ko", "ko-KR-SunHiNeural"),
    ("pt", "pt-BR-FranciscaNeural"),
    ("ru", "ru-RU-DariyaNeural"),
    ("hi", "hi-IN-MadhurNeural"),
];

/// 选出出现次数最多的语言标签
///
/// 检测失败的片段（None）不参与计票；票数相同取最先出现者
pub fn majority_language<'a, I>(tags: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (order, tag) in tags.into_iter().flatten().enumerate() {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            continue;
        }
        counts.entry(tag).or_insert((0, order)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (ca, oa)), (_, (cb, ob))| ca.cmp(cb).then(ob.cmp(oa)))
        .map(|(tag, _)| tag)
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

/// 语言对应的默认音色，未知语言回落到英文
pub fn default_voice_for_language(language: &str) -> &'static str {
    let language = language.to_lowercase();
    VOICE_TABLE
        .iter()
        .find(|(lang, _)| *lang == language)
        .map(|(_, voice)| *voice)
        .unwrap_or(DEFAULT_VOICE)
}
