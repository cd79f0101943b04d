//! WAV Transcoder - 中间格式 → WAV
//!
//! WAV 原样返回，其他格式解码后重新编码为 16 位单声道 WAV

use std::sync::Arc;

use super::symphonia_audio::is_wav;
use crate::application::ports::{AudioContainer, AudioDecoderPort, AudioTranscoderPort, DecodeError};
use crate::domain::encode_wav;

pub struct WavTranscoder {
    decoder: Arc<dyn AudioDecoderPort>,
}

impl WavTranscoder {
    pub fn new(decoder: Arc<dyn AudioDecoderPort>) -> Self {
        Self { decoder }
    }
}

impl AudioTranscoderPort for WavTranscoder {
    fn to_wav(&self, blob: &[u8], source: AudioContainer) -> Result<Vec<u8>, DecodeError> {
        if source == AudioContainer::Wav && is_wav(blob) {
            return Ok(blob.to_vec());
        }

        let pcm = self.decoder.decode(blob, Some(source))?;
        if pcm.is_empty() {
            return Err(DecodeError::InvalidInput(format!(
                "{} payload decoded to no samples",
                source
            )));
        }

        tracing::debug!(
            source = %source,
            input_bytes = blob.len(),
            sample_rate = pcm.sample_rate,
            duration_ms = pcm.duration().as_millis() as u64,
            "Transcoded to WAV"
        );
        Ok(encode_wav(&pcm.samples, pcm.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::audio::SymphoniaAudio;

    fn transcoder() -> WavTranscoder {
        WavTranscoder::new(Arc::new(SymphoniaAudio::new()))
    }

    #[test]
    fn test_wav_passes_through() {
        let wav = encode_wav(&vec![0.2; 1600], 16000);
        let out = transcoder().to_wav(&wav, AudioContainer::Wav).unwrap();
        assert_eq!(out, wav);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result = transcoder().to_wav(&[0u8; 600], AudioContainer::Mp3);
        assert!(result.is_err());
    }
}
