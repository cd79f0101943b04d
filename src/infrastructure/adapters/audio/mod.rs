//! Audio Adapter - 音频探测、解码与转码

mod symphonia_audio;
mod wav_transcoder;

pub use symphonia_audio::{is_wav, SymphoniaAudio, WAV_HEADER_LEN};
pub use wav_transcoder::WavTranscoder;
