//! Tracker domain logic
//!
//! Scoring, recording, decay, ranking and expertise queries over the
//! investment store.

pub mod category;
pub mod decay;
pub mod query;
pub mod ranking;
pub mod recorder;
pub mod scoring;
