//! Session data as exposed by a timing provider
//!
//! The prediction pipeline only sees sessions through [`SessionSource`]:
//! a classification (driver -> position) and a lap table per session.

use crate::{DriverCode, PodiumError, Result, SessionKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single timed lap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub driver: DriverCode,
    pub lap_number: u32,
    /// Lap time in seconds, absent when the lap was not timed
    pub time: Option<f64>,
    /// Lap started from the pit lane
    pub pit_out: bool,
    /// Lap ended in the pit lane
    pub pit_in: bool,
    /// Lap time removed by the stewards (track limits etc.)
    pub deleted: bool,
}

impl Lap {
    /// Lap has a usable time at all
    pub fn is_valid(&self) -> bool {
        !self.deleted && self.time.map(|t| t.is_finite() && t > 0.0).unwrap_or(false)
    }

    /// Representative racing lap: timed, not deleted, not an out/in lap
    /// and not the opening lap of a stint from the grid or garage
    pub fn is_accurate(&self) -> bool {
        self.is_valid() && !self.pit_out && !self.pit_in && self.lap_number > 1
    }

    pub fn seconds(&self) -> Option<f64> {
        if self.is_valid() {
            self.time
        } else {
            None
        }
    }
}

/// All laps of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LapTable {
    pub laps: Vec<Lap>,
}

impl LapTable {
    pub fn new(laps: Vec<Lap>) -> Self {
        LapTable { laps }
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lap> {
        self.laps.iter()
    }

    /// Laps driven by one driver
    pub fn pick_driver(&self, driver: &DriverCode) -> LapTable {
        LapTable::new(
            self.laps
                .iter()
                .filter(|lap| &lap.driver == driver)
                .cloned()
                .collect(),
        )
    }

    /// Laps passing the accuracy filter
    pub fn pick_accurate(&self) -> LapTable {
        LapTable::new(self.laps.iter().filter(|lap| lap.is_accurate()).cloned().collect())
    }

    /// Fastest valid lap, ties resolved by first occurrence
    pub fn pick_fastest(&self) -> Option<&Lap> {
        self.laps
            .iter()
            .filter(|lap| lap.is_valid())
            .fold(None, |best: Option<&Lap>, lap| match best {
                Some(b) if b.time <= lap.time => Some(b),
                _ => Some(lap),
            })
    }
}

/// One classified finisher or qualifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedEntry {
    pub driver: DriverCode,
    pub position: u32,
}

/// Session classification in finishing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub entries: Vec<ClassifiedEntry>,
}

impl Classification {
    pub fn new(mut entries: Vec<ClassifiedEntry>) -> Self {
        entries.sort_by_key(|e| e.position);
        Classification { entries }
    }

    /// Build from drivers listed in finishing order (P1 first)
    pub fn from_order(drivers: &[&str]) -> Self {
        Classification {
            entries: drivers
                .iter()
                .enumerate()
                .map(|(i, code)| ClassifiedEntry {
                    driver: DriverCode::new(code),
                    position: i as u32 + 1,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedEntry> {
        self.entries.iter()
    }

    pub fn position_of(&self, driver: &DriverCode) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| &e.driver == driver)
            .map(|e| e.position)
    }
}

/// A loaded session: classification plus laps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,
    pub classification: Classification,
    pub laps: LapTable,
}

impl Session {
    pub fn new(key: SessionKey, classification: Classification, laps: LapTable) -> Self {
        Session {
            key,
            classification,
            laps,
        }
    }
}

/// Trait for all timing data providers
pub trait SessionSource {
    /// Human readable provider name for logs
    fn name(&self) -> &str;

    /// Load one session; any retrieval or parsing failure is an error
    fn load_session(&self, key: SessionKey) -> Result<Session>;
}

/// Sessions held in memory, keyed by (event, kind)
#[derive(Debug, Default)]
pub struct MemorySource {
    sessions: HashMap<SessionKey, Session>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.key, session);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn load_session(&self, key: SessionKey) -> Result<Session> {
        self.sessions
            .get(&key)
            .cloned()
            .ok_or_else(|| PodiumError::unavailable(key, "no such session"))
    }
}
