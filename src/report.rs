//! Rendering of prediction reports

use crate::pipeline::PredictionReport;
use crate::Result;

/// Output format for `podium predict`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

pub fn render(report: &PredictionReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(format_table(report)),
        OutputFormat::Json => format_json(report),
        OutputFormat::Csv => Ok(format_csv(report)),
    }
}

fn or_dash(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Box-drawn table of the predicted order
pub fn format_table(report: &PredictionReport) -> String {
    let mut out = String::new();
    out.push_str("┌──────────────────────────────────────────────────────────────┐\n");
    out.push_str(&format!(
        "│  {} predicted order ({}, {} training rows)\n",
        report.target, report.model, report.training_rows
    ));
    out.push_str("├──────────────────────────────────────────────────────────────┤\n");
    out.push_str(&format!(
        "│  {:>4}  {:<6} {:<16} {:>4}  {:>7}  {:>6}  {:>5}\n",
        "Pos", "Driver", "Team", "Grid", "Score", "Actual", "Error"
    ));
    for entry in &report.ranking {
        out.push_str(&format!(
            "│  {:>4}  {:<6} {:<16} {:>4}  {:>7.3}  {:>6}  {:>5}\n",
            entry.predicted_position,
            entry.driver,
            entry.team,
            entry.grid_position,
            entry.score,
            or_dash(entry.actual_position),
            or_dash(entry.error)
        ));
    }
    out.push_str("├──────────────────────────────────────────────────────────────┤\n");
    out.push_str(&format!("│  {}\n", report.metrics));
    out.push_str("└──────────────────────────────────────────────────────────────┘\n");
    out
}

pub fn format_json(report: &PredictionReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn format_csv(report: &PredictionReport) -> String {
    let mut out = String::from("predicted_position,driver,team,grid_position,score,actual_position,error\n");
    for entry in &report.ranking {
        out.push_str(&format!(
            "{},{},{},{},{:.4},{},{}\n",
            entry.predicted_position,
            entry.driver,
            entry.team,
            entry.grid_position,
            entry.score,
            entry.actual_position.map(|p| p.to_string()).unwrap_or_default(),
            entry.error.map(|e| e.to_string()).unwrap_or_default()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::{RankedEntry, RankingMetrics};
    use crate::{DriverCode, EventId};

    fn report(actual: [Option<u32>; 2]) -> PredictionReport {
        let ranking: Vec<RankedEntry> = [("VER", "Red Bull"), ("NOR", "McLaren")]
            .iter()
            .zip(actual)
            .enumerate()
            .map(|(i, ((driver, team), actual_position))| {
                let predicted_position = i as u32 + 1;
                RankedEntry {
                    driver: DriverCode::new(driver),
                    team: team.to_string(),
                    grid_position: 2 - i as u32,
                    score: 1.5 + i as f64,
                    predicted_position,
                    actual_position,
                    error: actual_position.map(|a| a.abs_diff(predicted_position)),
                }
            })
            .collect();
        let metrics = RankingMetrics::from_ranking(&ranking);
        PredictionReport {
            target: EventId::new(2025, 23),
            model: "boosted-trees".to_string(),
            training_rows: 60,
            training_events: vec![EventId::new(2025, 20), EventId::new(2025, 21)],
            ranking,
            metrics,
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_table_lists_drivers_and_mae() {
        let table = format_table(&report([Some(2), Some(1)]));
        assert!(table.contains("2025 GP #23"));
        assert!(table.contains("VER"));
        assert!(table.contains("McLaren"));
        assert!(table.contains("MAE: 1.00"));
    }

    #[test]
    fn test_table_without_result() {
        let table = format_table(&report([None, None]));
        assert!(table.contains("MAE: n/a"));
    }

    #[test]
    fn test_csv_rows() {
        let csv = format_csv(&report([Some(1), None]));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "1,VER,Red Bull,2,1.5000,1,0");
        assert_eq!(lines[2], "2,NOR,McLaren,1,2.5000,,");
    }

    #[test]
    fn test_json_shape() {
        let json = format_json(&report([Some(1), Some(2)])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["model"], "boosted-trees");
        assert_eq!(value["ranking"][0]["driver"], "VER");
        assert_eq!(value["metrics"]["mae"], 0.0);
        assert_eq!(value["target"]["round"], 23);
    }
}
