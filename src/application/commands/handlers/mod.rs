//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod assemble_handlers;
mod cache_handlers;
mod segment_synthesis;
mod speech_handlers;
mod synchronize_handlers;

pub use assemble_handlers::*;
pub use cache_handlers::*;
pub use segment_synthesis::*;
pub use speech_handlers::*;
pub use synchronize_handlers::*;
