//! 记忆层：精确匹配记忆与 JSON 文件持久化

pub mod persistence;
pub mod store;

pub use persistence::RecordPersistence;
pub use store::{MemoryRecord, MemoryStore, SharedMemoryStore};
