//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：合成、拼接、缓存维护

mod assemble_commands;
mod cache_commands;
mod speech_commands;
mod synchronize_commands;

pub mod handlers;

pub use assemble_commands::*;
pub use cache_commands::*;
pub use speech_commands::*;
pub use synchronize_commands::*;
