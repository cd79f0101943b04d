//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod events;
pub mod persistence;

pub use events::EventPublisher;
pub use persistence::FileCacheStore;
