//! Per-event feature extraction
//!
//! Reduces the qualifying, practice and race sessions of one Grand Prix to a
//! row per driver: grid slot, qualifying deficit, practice pace deficit and
//! team strength, plus the finishing position when the race has been run.

use crate::data::source::{Classification, LapTable, SessionSource};
use crate::features::pace::{self, LapUnavailable};
use crate::features::roster::Roster;
use crate::{DriverCode, EventId, Fallbacks, PodiumError, Result, SessionKey, SessionKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column order of [`EventFeatureRow::features`]
pub const FEATURE_NAMES: [&str; 4] = ["GridPosition", "QualyDelta", "PracticePaceDelta", "TeamScore"];

/// One driver at one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFeatureRow {
    pub event: EventId,
    pub driver: DriverCode,
    pub team: String,
    /// Qualifying classification, 1 = pole
    pub grid_position: u32,
    /// Seconds behind the pole lap
    pub qualy_delta: f64,
    /// Seconds behind the best median practice pace
    pub practice_delta: f64,
    /// Normalized team strength in (0, 1]
    pub team_score: f64,
    /// Classified race finish, unknown for an unraced event
    pub actual_position: Option<u32>,
}

impl EventFeatureRow {
    pub const DIM: usize = FEATURE_NAMES.len();

    pub fn features(&self) -> [f64; Self::DIM] {
        [
            self.grid_position as f64,
            self.qualy_delta,
            self.practice_delta,
            self.team_score,
        ]
    }
}

/// Whether an event is used for training or is the one being predicted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRole {
    /// Race result required; events without one are unavailable
    Historical,
    /// Race result optional; an unraced event keeps every qualifier
    Target,
}

/// Qualifying-derived part of a row
struct GridEntry {
    driver: DriverCode,
    grid_position: u32,
    qualy_delta: f64,
}

/// Builds [`EventFeatureRow`]s from a session source
pub struct SessionFeatureExtractor<'a> {
    source: &'a dyn SessionSource,
    roster: &'a Roster,
    fallbacks: Fallbacks,
}

impl<'a> SessionFeatureExtractor<'a> {
    pub fn new(source: &'a dyn SessionSource, roster: &'a Roster, fallbacks: Fallbacks) -> Self {
        SessionFeatureExtractor {
            source,
            roster,
            fallbacks,
        }
    }

    /// Extract all rows for one event.
    ///
    /// Errors mean the whole event is unavailable: qualifying could not be
    /// loaded, or (for historical events) the race could not. Missing laps
    /// for individual drivers are imputed and never fail the event.
    pub fn extract(&self, event: EventId, role: EventRole) -> Result<Vec<EventFeatureRow>> {
        let grid = self.grid(event)?;
        let practice = self.practice(event);
        let race = match role {
            EventRole::Historical => Some(self.classification(event, SessionKind::Race)?),
            EventRole::Target => match self.classification(event, SessionKind::Race) {
                Ok(c) => Some(c),
                Err(e @ PodiumError::SessionUnavailable { .. }) => {
                    log::info!("{} has no race result yet ({}), predicting blind", event, e);
                    None
                }
                Err(e) => return Err(e),
            },
        };

        let mut rows = Vec::with_capacity(grid.len());
        for entry in grid {
            let actual_position = match &race {
                Some(classification) => match classification.position_of(&entry.driver) {
                    Some(p) => Some(p),
                    None => {
                        log::debug!("{}: {} not classified in the race, dropped", event, entry.driver);
                        continue;
                    }
                },
                None => None,
            };

            let Some((team, team_score)) = self.roster.lookup(&entry.driver) else {
                log::warn!("{}: {} is not on the roster, dropped", event, entry.driver);
                continue;
            };

            let practice_delta = match &practice {
                Some(deltas) => deltas.get(&entry.driver).copied(),
                None => Some(self.fallbacks.practice_delta_event),
            };

            rows.push(EventFeatureRow {
                event,
                driver: entry.driver,
                team: team.to_string(),
                grid_position: entry.grid_position,
                qualy_delta: entry.qualy_delta,
                practice_delta: practice_delta.unwrap_or(self.fallbacks.practice_delta),
                team_score,
                actual_position,
            });
        }

        log::info!("{}: {} driver rows", event, rows.len());
        Ok(rows)
    }

    fn classification(&self, event: EventId, kind: SessionKind) -> Result<Classification> {
        let key = SessionKey::new(event, kind);
        let session = self.source.load_session(key)?;
        if session.classification.is_empty() {
            return Err(PodiumError::unavailable(key, "empty classification"));
        }
        Ok(session.classification)
    }

    /// Grid slots and qualifying deficits
    fn grid(&self, event: EventId) -> Result<Vec<GridEntry>> {
        let key = SessionKey::new(event, SessionKind::Qualifying);
        let session = self.source.load_session(key)?;
        if session.classification.is_empty() {
            return Err(PodiumError::unavailable(key, "empty classification"));
        }

        let pole = pace::pole_time(&session.laps).unwrap_or_else(|| {
            log::warn!("{}: no valid qualifying lap, using reference {:.1}s", event, self.fallbacks.pole_time);
            self.fallbacks.pole_time
        });

        Ok(session
            .classification
            .iter()
            .map(|entry| {
                let qualy_delta = pace::qualy_delta(&session.laps, &entry.driver, pole)
                    .unwrap_or_else(|gap: LapUnavailable| {
                        log::debug!("{}: {} qualifying {}, imputed", event, entry.driver, gap);
                        self.fallbacks.qualy_delta
                    });
                GridEntry {
                    driver: entry.driver.clone(),
                    grid_position: entry.position,
                    qualy_delta,
                }
            })
            .collect())
    }

    /// Practice deltas, or `None` when the event has no usable practice data
    fn practice(&self, event: EventId) -> Option<HashMap<DriverCode, f64>> {
        let sessions: Vec<LapTable> = SessionKind::PRACTICE
            .iter()
            .filter_map(|&kind| {
                let key = SessionKey::new(event, kind);
                match self.source.load_session(key) {
                    Ok(session) if !session.laps.pick_accurate().is_empty() => Some(session.laps),
                    Ok(_) => {
                        log::debug!("{}: no accurate laps, skipped", key);
                        None
                    }
                    Err(e) => {
                        log::debug!("{}: skipped ({})", key, e);
                        None
                    }
                }
            })
            .collect();

        let deltas = pace::practice_deltas(&sessions);
        if deltas.is_none() {
            log::warn!("{}: no practice data, using event fallback", event);
        }
        deltas
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built sessions shared by the pipeline tests

    use crate::data::source::{Classification, Lap, LapTable, MemorySource, Session};
    use crate::{DriverCode, EventId, SessionKey, SessionKind};
    use std::collections::BTreeMap;

    pub fn lap(driver: &str, lap_number: u32, time: f64) -> Lap {
        Lap {
            driver: DriverCode::new(driver),
            lap_number,
            time: Some(time),
            pit_out: false,
            pit_in: false,
            deleted: false,
        }
    }

    pub fn session(event: EventId, kind: SessionKind, order: &[&str], laps: Vec<Lap>) -> Session {
        Session::new(
            SessionKey::new(event, kind),
            Classification::from_order(order),
            LapTable::new(laps),
        )
    }

    /// Qualifying where each driver's single lap is `base + 0.3 * slot`
    pub fn qualifying(event: EventId, order: &[&str], base: f64) -> Session {
        let laps = order
            .iter()
            .enumerate()
            .map(|(i, d)| lap(d, 2, base + 0.3 * i as f64))
            .collect();
        session(event, SessionKind::Qualifying, order, laps)
    }

    pub fn race(event: EventId, order: &[&str]) -> Session {
        session(event, SessionKind::Race, order, Vec::new())
    }

    pub fn practice(event: EventId, kind: SessionKind, laps: Vec<Lap>) -> Session {
        session(event, kind, &[], laps)
    }

    /// Add a full weekend: qualifying, FP1 with two laps per driver, race
    pub fn weekend(source: &mut MemorySource, event: EventId, grid: &[&str], finish: &[&str]) {
        source.insert(qualifying(event, grid, 80.0));
        let fp1 = grid
            .iter()
            .enumerate()
            .flat_map(|(i, d)| {
                let t = 90.0 + 0.2 * i as f64;
                [lap(d, 2, t), lap(d, 3, t + 0.4)]
            })
            .collect();
        source.insert(practice(event, SessionKind::Practice1, fp1));
        source.insert(race(event, finish));
    }

    pub fn roster_tables(drivers: &[(&str, &str)], points: &[(&str, f64)]) -> crate::features::Roster {
        let drivers: BTreeMap<String, String> = drivers
            .iter()
            .map(|(d, t)| (d.to_string(), t.to_string()))
            .collect();
        let points: BTreeMap<String, f64> = points.iter().map(|(t, p)| (t.to_string(), *p)).collect();
        crate::features::Roster::new(&points, &drivers).unwrap()
    }

    pub fn three_driver_roster() -> crate::features::Roster {
        roster_tables(
            &[("AAA", "Alpha"), ("BBB", "Bravo"), ("CCC", "Charlie")],
            &[("Alpha", 300.0), ("Bravo", 200.0), ("Charlie", 100.0)],
        )
    }
}
