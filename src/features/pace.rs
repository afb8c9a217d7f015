//! Lap-time reductions: pole time, qualifying deficit and practice pace
//!
//! Per-driver lookups return `Result<_, LapUnavailable>` so a single driver
//! without data never aborts an event; callers fold the error into a
//! fallback constant.

use crate::data::source::LapTable;
use crate::DriverCode;
use std::collections::HashMap;
use std::fmt;

/// Why a driver has no usable lap time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LapUnavailable {
    /// Driver set no laps in the session
    NoLaps,
    /// Driver's laps were all untimed or deleted
    NoValidTime,
}

impl fmt::Display for LapUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LapUnavailable::NoLaps => write!(f, "no laps"),
            LapUnavailable::NoValidTime => write!(f, "no valid lap time"),
        }
    }
}

/// Fastest valid lap of the session
pub fn pole_time(laps: &LapTable) -> Option<f64> {
    laps.pick_fastest().and_then(|lap| lap.seconds())
}

/// A driver's fastest valid lap
pub fn best_lap(laps: &LapTable, driver: &DriverCode) -> Result<f64, LapUnavailable> {
    let own = laps.pick_driver(driver);
    if own.is_empty() {
        return Err(LapUnavailable::NoLaps);
    }
    own.pick_fastest()
        .and_then(|lap| lap.seconds())
        .ok_or(LapUnavailable::NoValidTime)
}

/// Gap from a driver's best lap to the reference lap
pub fn qualy_delta(laps: &LapTable, driver: &DriverCode, pole: f64) -> Result<f64, LapUnavailable> {
    best_lap(laps, driver).map(|best| best - pole)
}

/// Median of a sample; mean of the two central values for even sizes
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Practice pace deficit per driver across all practice sessions.
///
/// Pools the accurate laps of every session, takes each driver's median and
/// subtracts the best median in the field. Returns `None` when no session
/// contributed a single accurate lap.
pub fn practice_deltas(sessions: &[LapTable]) -> Option<HashMap<DriverCode, f64>> {
    let mut times: HashMap<DriverCode, Vec<f64>> = HashMap::new();
    for laps in sessions {
        for lap in laps.iter().filter(|lap| lap.is_accurate()) {
            if let Some(t) = lap.seconds() {
                times.entry(lap.driver.clone()).or_default().push(t);
            }
        }
    }

    let medians: HashMap<DriverCode, f64> = times
        .into_iter()
        .filter_map(|(driver, mut t)| median(&mut t).map(|m| (driver, m)))
        .collect();

    let best = medians.values().copied().reduce(f64::min)?;
    Some(
        medians
            .into_iter()
            .map(|(driver, m)| (driver, m - best))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::Lap;

    fn lap(driver: &str, lap_number: u32, time: Option<f64>) -> Lap {
        Lap {
            driver: DriverCode::new(driver),
            lap_number,
            time,
            pit_out: false,
            pit_in: false,
            deleted: false,
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0]), Some(3.0));
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_qualy_delta_and_gaps() {
        let laps = LapTable::new(vec![
            lap("VER", 2, Some(82.0)),
            lap("VER", 4, Some(80.0)),
            lap("NOR", 3, Some(80.4)),
            lap("HAM", 2, None),
        ]);
        let pole = pole_time(&laps).unwrap();
        assert_eq!(pole, 80.0);

        assert_eq!(qualy_delta(&laps, &DriverCode::new("VER"), pole), Ok(0.0));
        let nor = qualy_delta(&laps, &DriverCode::new("NOR"), pole).unwrap();
        assert!((nor - 0.4).abs() < 1e-9);
        assert_eq!(
            qualy_delta(&laps, &DriverCode::new("HAM"), pole),
            Err(LapUnavailable::NoValidTime)
        );
        assert_eq!(
            qualy_delta(&laps, &DriverCode::new("ALO"), pole),
            Err(LapUnavailable::NoLaps)
        );
    }

    #[test]
    fn test_practice_deltas_pool_sessions() {
        let fp1 = LapTable::new(vec![
            lap("VER", 2, Some(90.0)),
            lap("VER", 3, Some(92.0)),
            lap("NOR", 2, Some(91.0)),
        ]);
        let fp2 = LapTable::new(vec![
            lap("VER", 2, Some(94.0)),
            lap("NOR", 2, Some(91.5)),
            // opening lap, not accurate
            lap("LEC", 1, Some(85.0)),
        ]);

        let deltas = practice_deltas(&[fp1, fp2]).unwrap();
        // VER median of [90, 92, 94] = 92, NOR median of [91, 91.5] = 91.25
        assert!((deltas[&DriverCode::new("NOR")] - 0.0).abs() < 1e-9);
        assert!((deltas[&DriverCode::new("VER")] - 0.75).abs() < 1e-9);
        assert!(!deltas.contains_key(&DriverCode::new("LEC")));
        assert!(deltas.values().all(|d| *d >= 0.0));
    }

    #[test]
    fn test_practice_deltas_without_data() {
        assert!(practice_deltas(&[]).is_none());
        let untimed = LapTable::new(vec![lap("VER", 2, None)]);
        assert!(practice_deltas(&[untimed]).is_none());
    }
}
