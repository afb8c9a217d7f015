//! Training and target tables
//!
//! Collects extracted rows over the configured history and the target event.

use crate::features::{EventFeatureRow, EventRole, SessionFeatureExtractor};
use crate::{EventId, PodiumError, Result};

/// Ordered rows over one or more events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<EventFeatureRow>,
}

impl Dataset {
    pub fn new(rows: Vec<EventFeatureRow>) -> Self {
        Dataset { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[EventFeatureRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&EventFeatureRow> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventFeatureRow> {
        self.rows.iter()
    }

    /// Feature matrix in [`crate::features::FEATURE_NAMES`] order
    pub fn features(&self) -> Vec<[f64; EventFeatureRow::DIM]> {
        self.rows.iter().map(EventFeatureRow::features).collect()
    }

    /// Finishing positions; rows without one are skipped
    pub fn targets(&self) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.actual_position.map(|p| p as f64))
            .collect()
    }

    /// Rows with a known finishing position only
    pub fn labelled(self) -> Dataset {
        Dataset {
            rows: self
                .rows
                .into_iter()
                .filter(|r| r.actual_position.is_some())
                .collect(),
        }
    }

    /// Distinct events in row order
    pub fn events(&self) -> Vec<EventId> {
        let mut events: Vec<EventId> = Vec::new();
        for row in &self.rows {
            if !events.contains(&row.event) {
                events.push(row.event);
            }
        }
        events
    }

    pub fn extend(&mut self, rows: Vec<EventFeatureRow>) {
        self.rows.extend(rows);
    }
}

/// Runs the extractor over history and target events
pub struct DatasetBuilder<'a> {
    extractor: &'a SessionFeatureExtractor<'a>,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(extractor: &'a SessionFeatureExtractor<'a>) -> Self {
        DatasetBuilder { extractor }
    }

    /// Training table over the historical events.
    ///
    /// Unavailable events are skipped with a warning; it is an error only
    /// when no event contributes a labelled row.
    pub fn build_training(&self, history: &[EventId]) -> Result<Dataset> {
        let mut dataset = Dataset::default();
        for &event in history {
            match self.extractor.extract(event, EventRole::Historical) {
                Ok(rows) if rows.is_empty() => {
                    log::warn!("Skipping {}: no usable driver rows", event);
                }
                Ok(rows) => dataset.extend(rows),
                Err(e) => log::warn!("Skipping {}: {}", event, e),
            }
        }

        let dataset = dataset.labelled();
        if dataset.is_empty() {
            return Err(PodiumError::NoTrainingData);
        }
        log::info!(
            "Training table: {} rows from {} of {} events",
            dataset.len(),
            dataset.events().len(),
            history.len()
        );
        Ok(dataset)
    }

    /// Rows for the event being predicted
    pub fn build_target(&self, target: EventId) -> Result<Dataset> {
        let rows = self.extractor.extract(target, EventRole::Target).map_err(|e| {
            log::warn!("Target {} unavailable: {}", target, e);
            PodiumError::TargetUnavailable(target)
        })?;
        if rows.is_empty() {
            return Err(PodiumError::TargetUnavailable(target));
        }
        Ok(Dataset::new(rows))
    }

    /// Training and target tables for one run
    pub fn build(&self, history: &[EventId], target: EventId) -> Result<(Dataset, Dataset)> {
        let training = self.build_training(history)?;
        let target = self.build_target(target)?;
        Ok((training, target))
    }
}
