//! Storage backends for the investment portfolio

pub mod file_store;
pub mod lock;
pub mod memory_store;
pub mod store;
