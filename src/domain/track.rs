//! Assembled Track - 拼接中的音轨
//!
//! 单声道 f32 PCM 累加器，只允许在尾部追加

use std::time::Duration;

/// 解码后的单声道 PCM 音频
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn silence(duration: Duration, sample_rate: u32) -> Self {
        Self::new(vec![0.0; frames_for(duration, sample_rate)], sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        duration_for(self.samples.len(), self.sample_rate)
    }
}

/// 拼接音轨
///
/// 一次运行内由拼接方独占；时长只增不减
#[derive(Debug, Clone)]
pub struct AssembledTrack {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AssembledTrack {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        duration_for(self.samples.len(), self.sample_rate)
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration().as_millis() as u64
    }

    pub fn append_silence(&mut self, duration: Duration) {
        let frames = frames_for(duration, self.sample_rate);
        self.samples.resize(self.samples.len() + frames, 0.0);
    }

    /// 用静音把音轨补齐到 `position`
    ///
    /// 音轨已经更长时不截断，返回实际补齐的时长
    pub fn pad_to(&mut self, position: Duration) -> Duration {
        let target = frames_for(position, self.sample_rate);
        let current = self.samples.len();
        if target <= current {
            return Duration::ZERO;
        }
        self.samples.resize(target, 0.0);
        duration_for(target - current, self.sample_rate)
    }

    /// 追加音频，采样率不同时先重采样
    pub fn append(&mut self, audio: &PcmAudio) {
        if audio.sample_rate == self.sample_rate {
            self.samples.extend_from_slice(&audio.samples);
        } else {
            let resampled = resample_linear(&audio.samples, audio.sample_rate, self.sample_rate);
            self.samples.extend(resampled);
        }
    }

    /// 编码为 16 位 PCM WAV
    pub fn encode_wav(&self) -> Vec<u8> {
        encode_wav(&self.samples, self.sample_rate)
    }
}

fn frames_for(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64).round() as usize
}

fn duration_for(frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(frames as f64 / sample_rate as f64)
}

/// 将单声道 f32 样本编码为 WAV
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let num_channels: u16 = 1;
    let byte_rate = sample_rate * num_channels as u32 * (bits_per_sample / 8) as u32;
    let block_align = num_channels * (bits_per_sample / 8);

    let data_size = samples.len() * 2;
    let file_size = 36 + data_size;

    let mut wav = Vec::with_capacity(44 + data_size);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(file_size as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    wav.extend_from_slice(&num_channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());

    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        wav.extend_from_slice(&((clamped * 32767.0) as i16).to_le_bytes());
    }

    wav
}

/// 简单线性重采样（单声道）
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let frame_count = samples.len();
    let new_frame_count = (frame_count as f64 * ratio).round() as usize;
    let mut resampled = Vec::with_capacity(new_frame_count);

    for i in 0..new_frame_count {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f64;

        let s0 = samples.get(src_idx).copied().unwrap_or(0.0);
        let s1 = samples
            .get((src_idx + 1).min(frame_count - 1))
            .copied()
            .unwrap_or(s0);

        resampled.push(s0 + (s1 - s0) * frac as f32);
    }

    resampled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_then_append() {
        let mut track = AssembledTrack::new(16000);
        let padded = track.pad_to(Duration::from_millis(500));
        assert_eq!(padded, Duration::from_millis(500));
        track.append(&PcmAudio::silence(Duration::from_secs(1), 16000));
        assert_eq!(track.duration_ms(), 1500);
    }

    #[test]
    fn test_pad_never_truncates() {
        let mut track = AssembledTrack::new(16000);
        track.append_silence(Duration::from_secs(3));
        assert_eq!(track.pad_to(Duration::from_secs(2)), Duration::ZERO);
        assert_eq!(track.duration_ms(), 3000);
    }

    #[test]
    fn test_append_resamples() {
        let mut track = AssembledTrack::new(16000);
        track.append(&PcmAudio::silence(Duration::from_secs(1), 24000));
        assert_eq!(track.samples().len(), 16000);
        assert_eq!(track.duration_ms(), 1000);
    }

    #[test]
    fn test_encode_wav_header() {
        let mut track = AssembledTrack::new(16000);
        track.append_silence(Duration::from_millis(250));
        let wav = track.encode_wav();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 4000 * 2);
    }

    #[test]
    fn test_resample_linear_length() {
        let samples = vec![0.5f32; 22050];
        let out = resample_linear(&samples, 22050, 16000);
        assert_eq!(out.len(), 16000);
        assert!(out.iter().all(|s| (*s - 0.5).abs() < 1e-6));
    }
}
