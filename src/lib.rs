//! Formula 1 finishing-order prediction
//!
//! Learns from recent Grands Prix of a season and ranks the drivers of a
//! target Grand Prix from qualifying, practice pace and team strength.

pub mod data;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod predict;
pub mod report;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Three-letter driver abbreviation (e.g. "VER")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverCode(pub String);

impl DriverCode {
    pub fn new(code: &str) -> Self {
        DriverCode(code.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// A Grand Prix within a season, addressed by its round number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub year: u16,
    pub round: u8,
}

impl EventId {
    pub fn new(year: u16, round: u8) -> Self {
        EventId { year, round }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} GP #{}", self.year, self.round)
    }
}

/// Timed sessions of a race weekend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    Practice1,
    Practice2,
    Practice3,
    Qualifying,
    Race,
}

impl SessionKind {
    /// Practice segments in the order they are run
    pub const PRACTICE: [SessionKind; 3] = [
        SessionKind::Practice1,
        SessionKind::Practice2,
        SessionKind::Practice3,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            SessionKind::Practice1 => "FP1",
            SessionKind::Practice2 => "FP2",
            SessionKind::Practice3 => "FP3",
            SessionKind::Qualifying => "Q",
            SessionKind::Race => "R",
        }
    }

    /// Session name as published by the timing provider
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionKind::Practice1 => "Practice 1",
            SessionKind::Practice2 => "Practice 2",
            SessionKind::Practice3 => "Practice 3",
            SessionKind::Qualifying => "Qualifying",
            SessionKind::Race => "Race",
        }
    }

    pub fn is_practice(&self) -> bool {
        Self::PRACTICE.contains(self)
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Address of one session: (year, round, kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub event: EventId,
    pub kind: SessionKind,
}

impl SessionKey {
    pub fn new(event: EventId, kind: SessionKind) -> Self {
        SessionKey { event, kind }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.event, self.kind)
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum PodiumError {
    #[error("Session {key} unavailable: {reason}")]
    SessionUnavailable { key: SessionKey, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("No historical event produced training data")]
    NoTrainingData,

    #[error("Target event {0} is unavailable")]
    TargetUnavailable(EventId),

    #[error("Model not fitted - call fit() before predicting")]
    NotFitted,

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PodiumError {
    pub fn unavailable(key: SessionKey, reason: impl Into<String>) -> Self {
        PodiumError::SessionUnavailable {
            key,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PodiumError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub season: SeasonConfig,
    pub fallbacks: Fallbacks,
    pub model: ModelConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    pub year: u16,
    /// Round to predict
    pub target_round: u8,
    /// Rounds used for training
    pub history_rounds: Vec<u8>,
    /// Championship points per team
    pub team_points: BTreeMap<String, f64>,
    /// Driver abbreviation -> team name
    pub drivers: BTreeMap<String, String>,
}

impl SeasonConfig {
    pub fn target_event(&self) -> EventId {
        EventId::new(self.year, self.target_round)
    }

    pub fn history_events(&self) -> Vec<EventId> {
        self.history_rounds
            .iter()
            .map(|&round| EventId::new(self.year, round))
            .collect()
    }
}

/// Constants substituted for missing timing data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fallbacks {
    /// Reference lap (seconds) when qualifying has no valid fastest lap
    pub pole_time: f64,
    /// Qualifying deficit for a driver without a valid lap
    pub qualy_delta: f64,
    /// Practice deficit for a driver without accurate practice laps
    pub practice_delta: f64,
    /// Practice deficit for every driver when the event has no practice data
    pub practice_delta_event: f64,
}

impl Default for Fallbacks {
    fn default() -> Self {
        Fallbacks {
            pole_time: 80.0,
            qualy_delta: 4.0,
            practice_delta: 2.0,
            practice_delta_event: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    BoostedTrees,
    Linear,
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boosted_trees" | "trees" | "gbt" => Ok(ModelKind::BoostedTrees),
            "linear" => Ok(ModelKind::Linear),
            _ => Err(format!("Unknown model: {}. Use trees or linear.", s)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::BoostedTrees => write!(f, "boosted trees"),
            ModelKind::Linear => write!(f, "linear"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub kind: ModelKind,
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows sampled per tree (1.0 = all rows)
    pub subsample: f64,
    pub seed: u64,
    pub linear_epochs: usize,
    pub linear_learning_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub cache_path: String,
    pub base_url: String,
    pub offline: bool,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let team_points = [
            ("McLaren", 800.0),
            ("Ferrari", 382.0),
            ("Red Bull", 426.0),
            ("Mercedes", 459.0),
            ("Aston Martin", 80.0),
            ("Alpine", 22.0),
            ("Haas", 73.0),
            ("Racing Bulls", 92.0),
            ("Williams", 137.0),
            ("Sauber", 68.0),
        ]
        .into_iter()
        .map(|(team, points)| (team.to_string(), points))
        .collect();

        let drivers = [
            ("VER", "Red Bull"),
            ("TSU", "Red Bull"),
            ("LAW", "Racing Bulls"),
            ("HAD", "Racing Bulls"),
            ("NOR", "McLaren"),
            ("PIA", "McLaren"),
            ("LEC", "Ferrari"),
            ("HAM", "Ferrari"),
            ("RUS", "Mercedes"),
            ("ANT", "Mercedes"),
            ("SAI", "Williams"),
            ("ALB", "Williams"),
            ("GAS", "Alpine"),
            ("COL", "Alpine"),
            ("ALO", "Aston Martin"),
            ("STR", "Aston Martin"),
            ("HUL", "Sauber"),
            ("BOR", "Sauber"),
            ("OCO", "Haas"),
            ("BEA", "Haas"),
        ]
        .into_iter()
        .map(|(driver, team)| (driver.to_string(), team.to_string()))
        .collect();

        Config {
            season: SeasonConfig {
                year: 2025,
                target_round: 23,
                history_rounds: vec![20, 21, 22],
                team_points,
                drivers,
            },
            fallbacks: Fallbacks::default(),
            model: ModelConfig {
                kind: ModelKind::BoostedTrees,
                n_estimators: 150,
                learning_rate: 0.05,
                max_depth: 3,
                min_samples_leaf: 1,
                subsample: 1.0,
                seed: 42,
                linear_epochs: 500,
                linear_learning_rate: 0.05,
            },
            data: DataConfig {
                cache_path: "cache/sessions.db".to_string(),
                base_url: "https://api.openf1.org/v1".to_string(),
                offline: false,
                timeout_secs: 30,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PodiumError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| PodiumError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PodiumError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the static season tables and numeric settings
    pub fn validate(&self) -> Result<()> {
        if self.season.history_rounds.is_empty() {
            return Err(PodiumError::Config(
                "season.history_rounds must list at least one round".to_string(),
            ));
        }
        if self.season.history_rounds.contains(&self.season.target_round) {
            return Err(PodiumError::Config(format!(
                "target round {} is also listed as a history round",
                self.season.target_round
            )));
        }
        if self.model.n_estimators == 0 || self.model.max_depth == 0 {
            return Err(PodiumError::Config(
                "model.n_estimators and model.max_depth must be positive".to_string(),
            ));
        }
        if !(self.model.subsample > 0.0 && self.model.subsample <= 1.0) {
            return Err(PodiumError::Config(format!(
                "model.subsample must be in (0, 1], got {}",
                self.model.subsample
            )));
        }
        // Roster construction checks points and driver -> team totality
        features::Roster::from_config(&self.season).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.season.target_event(), EventId::new(2025, 23));
        assert_eq!(config.season.history_events().len(), 3);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.season.drivers, config.season.drivers);
        assert_eq!(parsed.fallbacks, config.fallbacks);
        assert_eq!(parsed.model.kind, ModelKind::BoostedTrees);
    }

    #[test]
    fn test_target_in_history_is_rejected() {
        let mut config = Config::default();
        config.season.history_rounds.push(23);
        assert!(matches!(config.validate(), Err(PodiumError::Config(_))));
    }

    #[test]
    fn test_session_kind_codes() {
        for kind in [
            SessionKind::Practice1,
            SessionKind::Practice2,
            SessionKind::Practice3,
            SessionKind::Qualifying,
            SessionKind::Race,
        ] {
            assert_eq!(kind.to_string(), kind.code());
            assert_eq!(kind.is_practice(), SessionKind::PRACTICE.contains(&kind));
        }
        assert!(SessionKind::Practice2.is_practice());
        assert!(!SessionKind::Race.is_practice());
    }

    #[test]
    fn test_driver_code_normalizes() {
        assert_eq!(DriverCode::new(" ver "), DriverCode("VER".to_string()));
    }
}
