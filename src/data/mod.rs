//! Session data
//!
//! Session sources (OpenF1 over HTTP, in-memory), the SQLite session cache
//! and the training/target tables built from them.

pub mod cache;
pub mod dataset;
pub mod openf1;
pub mod source;

pub use cache::{CacheStats, SessionCache};
pub use dataset::{Dataset, DatasetBuilder};
pub use openf1::OpenF1Source;
pub use source::{Classification, Lap, LapTable, MemorySource, Session, SessionSource};
