// src/database/mod.rs
pub mod pool;
pub mod record_store;

pub use pool::{create_pool, DbPool};
pub use record_store::{MemoryRecordStore, PgRecordStore, RecordStore};
