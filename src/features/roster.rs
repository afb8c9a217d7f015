//! Season roster: driver -> team and team strength
//!
//! Team strength is championship points normalized by the leading team, so
//! the leader always scores exactly 1.0.

use crate::{DriverCode, PodiumError, Result, SeasonConfig};
use std::collections::{BTreeMap, HashMap};

/// Immutable driver/team tables for one run
#[derive(Debug, Clone)]
pub struct Roster {
    driver_teams: HashMap<DriverCode, String>,
    team_scores: HashMap<String, f64>,
}

impl Roster {
    pub fn new(
        team_points: &BTreeMap<String, f64>,
        drivers: &BTreeMap<String, String>,
    ) -> Result<Self> {
        if team_points.is_empty() {
            return Err(PodiumError::Config("no team points configured".to_string()));
        }
        if let Some((team, points)) = team_points
            .iter()
            .find(|(_, p)| !(p.is_finite() && **p > 0.0))
        {
            return Err(PodiumError::Config(format!(
                "team {} has non-positive strength {}",
                team, points
            )));
        }

        let max_points = team_points.values().copied().fold(f64::MIN, f64::max);
        let team_scores = team_points
            .iter()
            .map(|(team, points)| (team.clone(), points / max_points))
            .collect();

        let mut driver_teams = HashMap::with_capacity(drivers.len());
        for (driver, team) in drivers {
            if !team_points.contains_key(team) {
                return Err(PodiumError::UnknownTeam(format!("{} (driver {})", team, driver)));
            }
            driver_teams.insert(DriverCode::new(driver), team.clone());
        }

        Ok(Roster {
            driver_teams,
            team_scores,
        })
    }

    pub fn from_config(season: &SeasonConfig) -> Result<Self> {
        Self::new(&season.team_points, &season.drivers)
    }

    pub fn team_of(&self, driver: &DriverCode) -> Option<&str> {
        self.driver_teams.get(driver).map(String::as_str)
    }

    /// Normalized strength in (0, 1]
    pub fn team_score(&self, team: &str) -> Option<f64> {
        self.team_scores.get(team).copied()
    }

    /// Team name and normalized strength for a driver
    pub fn lookup(&self, driver: &DriverCode) -> Option<(&str, f64)> {
        let team = self.team_of(driver)?;
        Some((team, self.team_score(team)?))
    }
}
