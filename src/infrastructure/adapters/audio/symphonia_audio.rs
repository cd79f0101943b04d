//! Symphonia Audio - 基于 symphonia 的音频探测与解码
//!
//! 支持 WAV / MP3，解码结果统一下混为单声道

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioContainer, AudioDecoderPort, AudioProbePort, DecodeError};
use crate::domain::PcmAudio;

/// 最小 WAV 头长度
pub const WAV_HEADER_LEN: usize = 44;

/// WAV 结构校验：长度与 RIFF/WAVE 标记
pub fn is_wav(blob: &[u8]) -> bool {
    blob.len() >= WAV_HEADER_LEN && &blob[0..4] == b"RIFF" && &blob[8..12] == b"WAVE"
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaAudio;

impl SymphoniaAudio {
    pub fn new() -> Self {
        Self
    }

    fn decode_to_pcm(
        &self,
        data: &[u8],
        hint_container: Option<AudioContainer>,
    ) -> Result<PcmAudio, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::InvalidInput("empty audio data".to_string()));
        }

        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        if let Some(container) = hint_container {
            hint.with_extension(container.extension());
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::UnsupportedFormat(format!("Probe failed: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| DecodeError::DecodingError("No audio track found".to_string()))?;
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::DecodingError(format!("Decoder creation failed: {}", e)))?;

        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    return Err(DecodeError::DecodingError(format!(
                        "Packet read error: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(error = %e, "Decode error (skipping packet)");
                    continue;
                }
            };

            let spec = *decoded.spec();
            sample_rate = spec.rate;
            let channels = spec.channels.count().max(1);
            let num_frames = decoded.frames();
            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            let interleaved = &sample_buf.samples()[..num_frames * channels];
            if channels == 1 {
                samples.extend_from_slice(interleaved);
            } else {
                samples.extend(
                    interleaved
                        .chunks_exact(channels)
                        .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                );
            }
        }

        if sample_rate == 0 {
            return Err(DecodeError::DecodingError("Unknown sample rate".to_string()));
        }

        Ok(PcmAudio::new(samples, sample_rate))
    }
}

impl AudioProbePort for SymphoniaAudio {
    fn is_valid(&self, blob: &[u8]) -> bool {
        is_wav(blob)
    }

    fn duration(&self, blob: &[u8]) -> f64 {
        match self.decode_to_pcm(blob, None) {
            Ok(pcm) => pcm.duration().as_secs_f64(),
            Err(e) => {
                tracing::debug!(error = %e, size_bytes = blob.len(), "Duration probe failed");
                0.0
            }
        }
    }
}

impl AudioDecoderPort for SymphoniaAudio {
    fn decode(&self, blob: &[u8], hint: Option<AudioContainer>) -> Result<PcmAudio, DecodeError> {
        self.decode_to_pcm(blob, hint)
    }
}
