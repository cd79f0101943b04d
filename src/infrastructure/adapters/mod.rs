//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod audio;
pub mod converter;
pub mod tts;

pub use audio::*;
pub use converter::*;
pub use tts::*;
