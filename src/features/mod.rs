//! Feature extraction
//!
//! Turns the sessions of a Grand Prix weekend into one row per driver.

pub mod extractor;
pub mod pace;
pub mod roster;

pub use extractor::{EventFeatureRow, EventRole, SessionFeatureExtractor, FEATURE_NAMES};
pub use pace::LapUnavailable;
pub use roster::Roster;
