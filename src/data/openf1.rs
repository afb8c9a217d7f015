//! OpenF1 timing provider
//!
//! Resolves a (year, round, session) triple against the public OpenF1 REST
//! API and converts its classification and lap tables into [`Session`]s.
//! Supports a SQLite read-through cache and an offline mode.

use crate::data::cache::SessionCache;
use crate::data::source::{ClassifiedEntry, Classification, Lap, LapTable, Session, SessionSource};
use crate::{DataConfig, DriverCode, PodiumError, Result, SessionKey};
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Deserialize)]
struct MeetingRow {
    meeting_key: i64,
    #[serde(default)]
    meeting_name: String,
    date_start: DateTime<FixedOffset>,
}

#[derive(Debug, Deserialize)]
struct SessionRow {
    session_key: i64,
}

#[derive(Debug, Deserialize)]
struct DriverRow {
    driver_number: u32,
    name_acronym: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultRow {
    driver_number: u32,
    position: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RaceControlRow {
    driver_number: Option<u32>,
    lap_number: Option<u32>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct LapRow {
    driver_number: u32,
    lap_number: u32,
    lap_duration: Option<f64>,
    is_pit_out_lap: Option<bool>,
}

/// Client for api.openf1.org
pub struct OpenF1Source {
    client: reqwest::blocking::Client,
    base_url: String,
    /// Optional read-through session cache
    cache: Option<SessionCache>,
    /// If true, only use cache (no network requests)
    offline_only: bool,
}

impl OpenF1Source {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("podium-predictor/0.1")
            .timeout(timeout)
            .build()?;

        Ok(OpenF1Source {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: None,
            offline_only: false,
        })
    }

    /// Build from the `[data]` section of the config, opening the cache
    pub fn from_config(config: &DataConfig) -> Result<Self> {
        let cache = SessionCache::open(&config.cache_path)?;
        Ok(Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))?
            .with_cache(cache)
            .offline_only(config.offline))
    }

    pub fn with_cache(mut self, cache: SessionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set offline-only mode (no network requests, cache must exist)
    pub fn offline_only(mut self, offline: bool) -> Self {
        self.offline_only = offline;
        self
    }

    fn get_rows<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.base_url, endpoint);
        with_retry(
            || {
                log::debug!("GET {} {:?}", url, query);
                let resp = self.client.get(&url).query(query).send()?;
                if resp.status() == reqwest::StatusCode::NOT_FOUND {
                    // OpenF1 answers 404 for an empty result set
                    return Ok(Vec::new());
                }
                Ok(resp.error_for_status()?.json::<Vec<T>>()?)
            },
            MAX_ATTEMPTS,
        )
    }

    /// Meeting key of the N-th Grand Prix of a season (testing excluded)
    fn meeting_key(&self, key: SessionKey) -> Result<i64> {
        let event = key.event;
        let mut meetings: Vec<MeetingRow> = self
            .get_rows::<MeetingRow>("meetings", &[("year", event.year.to_string())])?
            .into_iter()
            .filter(|m| !m.meeting_name.to_lowercase().contains("testing"))
            .collect();
        meetings.sort_by_key(|m| m.date_start);

        let index = (event.round as usize).checked_sub(1);
        index
            .and_then(|i| meetings.get(i))
            .map(|m| m.meeting_key)
            .ok_or_else(|| {
                PodiumError::unavailable(
                    key,
                    format!("meeting not listed, season has {} Grands Prix", meetings.len()),
                )
            })
    }

    fn session_key(&self, key: SessionKey) -> Result<i64> {
        let meeting = self.meeting_key(key)?;
        let sessions: Vec<SessionRow> = self.get_rows(
            "sessions",
            &[
                ("meeting_key", meeting.to_string()),
                ("session_name", key.kind.display_name().to_string()),
            ],
        )?;
        sessions
            .first()
            .map(|s| s.session_key)
            .ok_or_else(|| PodiumError::unavailable(key, "session not held"))
    }

    fn fetch(&self, key: SessionKey) -> Result<Session> {
        let session_key = self.session_key(key)?;
        let query = [("session_key", session_key.to_string())];

        let acronyms: HashMap<u32, DriverCode> = self
            .get_rows::<DriverRow>("drivers", &query)?
            .into_iter()
            .filter_map(|d| d.name_acronym.map(|a| (d.driver_number, DriverCode::new(&a))))
            .collect();
        if acronyms.is_empty() {
            return Err(PodiumError::unavailable(key, "no driver list"));
        }

        let results: Vec<ResultRow> = self.get_rows("session_result", &query)?;
        let entries: Vec<ClassifiedEntry> = results
            .into_iter()
            .filter_map(|r| {
                let driver = acronyms.get(&r.driver_number)?.clone();
                let position = r.position.filter(|&p| p >= 1)?;
                Some(ClassifiedEntry { driver, position })
            })
            .collect();

        let lap_rows: Vec<LapRow> = self.get_rows("laps", &query)?;
        let deleted = self.deleted_laps(key, &query);
        let laps = convert_laps(lap_rows, &acronyms, &deleted);

        ensure_published(key, &entries, &laps)?;

        log::info!(
            "Fetched {} ({} classified, {} laps)",
            key,
            entries.len(),
            laps.len()
        );
        Ok(Session::new(key, Classification::new(entries), laps))
    }
}

impl OpenF1Source {
    /// Laps deleted by race control; a failed lookup only loses the flags
    fn deleted_laps(&self, key: SessionKey, query: &[(&str, String)]) -> HashSet<(u32, u32)> {
        match self.get_rows::<RaceControlRow>("race_control", query) {
            Ok(rows) => deleted_from_messages(&rows),
            Err(e) => {
                log::warn!("{}: race control unavailable ({}), lap deletions ignored", key, e);
                HashSet::new()
            }
        }
    }
}

/// Reject a session that is not yet usable so it never reaches the cache.
///
/// Qualifying and race need a classification; practice needs laps.
fn ensure_published(key: SessionKey, entries: &[ClassifiedEntry], laps: &LapTable) -> Result<()> {
    if !key.kind.is_practice() && entries.is_empty() {
        return Err(PodiumError::unavailable(key, "classification not published"));
    }
    if entries.is_empty() && laps.is_empty() {
        return Err(PodiumError::unavailable(key, "no classification or laps published"));
    }
    Ok(())
}

/// (driver number, lap) pairs whose time was deleted and not reinstated.
///
/// Messages read like `CAR 44 (HAM) TIME 1:29.484 DELETED - TRACK LIMITS AT
/// TURN 6 LAP 12 14:23:07`; the lap comes from the row when present.
fn deleted_from_messages(rows: &[RaceControlRow]) -> HashSet<(u32, u32)> {
    let mut deleted = HashSet::new();
    let Ok(car_pattern) = Regex::new(r"^CAR (\d+)\b") else {
        return deleted;
    };
    let Ok(lap_pattern) = Regex::new(r"\bLAP (\d+)\b") else {
        return deleted;
    };

    for row in rows {
        let message = row.message.to_uppercase();
        let reinstated = message.contains("REINSTATED");
        if !reinstated && !message.contains("DELETED") {
            continue;
        }

        let driver = row.driver_number.or_else(|| {
            car_pattern
                .captures(&message)
                .and_then(|c| c[1].parse().ok())
        });
        let lap = row.lap_number.or_else(|| {
            lap_pattern
                .captures(&message)
                .and_then(|c| c[1].parse().ok())
        });
        let (Some(driver), Some(lap)) = (driver, lap) else {
            continue;
        };

        if reinstated {
            deleted.remove(&(driver, lap));
        } else {
            deleted.insert((driver, lap));
        }
    }
    deleted
}

/// Convert raw lap rows, marking in-laps from the following pit-out lap
fn convert_laps(
    rows: Vec<LapRow>,
    acronyms: &HashMap<u32, DriverCode>,
    deleted: &HashSet<(u32, u32)>,
) -> LapTable {
    let pit_out: HashSet<(u32, u32)> = rows
        .iter()
        .filter(|r| r.is_pit_out_lap.unwrap_or(false))
        .map(|r| (r.driver_number, r.lap_number))
        .collect();

    let laps = rows
        .into_iter()
        .filter_map(|r| {
            let driver = acronyms.get(&r.driver_number)?.clone();
            Some(Lap {
                driver,
                lap_number: r.lap_number,
                time: r.lap_duration,
                pit_out: r.is_pit_out_lap.unwrap_or(false),
                pit_in: pit_out.contains(&(r.driver_number, r.lap_number + 1)),
                deleted: deleted.contains(&(r.driver_number, r.lap_number)),
            })
        })
        .collect();

    LapTable::new(laps)
}

impl SessionSource for OpenF1Source {
    fn name(&self) -> &str {
        "openf1"
    }

    fn load_session(&self, key: SessionKey) -> Result<Session> {
        if let Some(cache) = &self.cache {
            if let Some(session) = cache.get(key)? {
                return Ok(session);
            }
        }

        if self.offline_only {
            return Err(PodiumError::unavailable(key, "offline mode and not cached"));
        }

        let session = self.fetch(key)?;
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&session) {
                log::warn!("Failed to cache {}: {}", key, e);
            }
        }
        Ok(session)
    }
}

/// Retry a request with exponential backoff
fn with_retry<T, F>(mut operation: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 < max_attempts && is_transient(&e) => {
                log::warn!("Attempt {} failed: {}", attempt + 1, e);
                std::thread::sleep(Duration::from_millis(250 * 2u64.pow(attempt)));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_transient(error: &PodiumError) -> bool {
    match error {
        PodiumError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status()
                    .map(|s| s.is_server_error() || s == reqwest::StatusCode::TOO_MANY_REQUESTS)
                    .unwrap_or(false)
        }
        _ => false,
    }
}
