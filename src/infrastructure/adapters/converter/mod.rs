//! Voice Converter Adapter

mod process_converter;

pub use process_converter::{ProcessConverterConfig, ProcessVoiceConverter};
