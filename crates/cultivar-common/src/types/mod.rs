//! Core data types for Cultivar

pub mod event;
pub mod investment;
pub mod learning;
pub mod level;
pub mod snapshot;
