//! Training run metrics.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Metrics for one completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number
    pub epoch: usize,
    /// Mean cross-entropy loss over training batches
    pub train_loss: f64,
    /// Fraction of training samples classified correctly
    pub train_accuracy: f64,
    /// Fraction of validation samples classified correctly
    pub val_accuracy: f64,
}

/// Accumulated results of a training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs: Vec<EpochMetrics>,
    /// Highest validation accuracy seen so far
    pub best_val_accuracy: f64,
    /// Epoch that produced the best validation accuracy
    pub best_epoch: Option<usize>,
}

impl TrainingReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one epoch; returns true when it strictly improved the best
    /// validation accuracy.
    pub fn record(&mut self, metrics: EpochMetrics) -> bool {
        let improved = metrics.val_accuracy > self.best_val_accuracy;
        if improved {
            self.best_val_accuracy = metrics.val_accuracy;
            self.best_epoch = Some(metrics.epoch);
        }
        self.epochs.push(metrics);
        improved
    }

    /// Write the report as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(n: usize, val: f64) -> EpochMetrics {
        EpochMetrics {
            epoch: n,
            train_loss: 1.0,
            train_accuracy: 0.5,
            val_accuracy: val,
        }
    }

    #[test]
    fn test_best_tracks_maximum() {
        let mut report = TrainingReport::new();
        assert!(report.record(epoch(1, 0.4)));
        assert!(report.record(epoch(2, 0.7)));
        assert!(!report.record(epoch(3, 0.6)));

        assert_eq!(report.best_epoch, Some(2));
        assert_eq!(report.best_val_accuracy, 0.7);
        assert_eq!(report.epochs.len(), 3);
    }

    #[test]
    fn test_equal_accuracy_keeps_earlier_best() {
        let mut report = TrainingReport::new();
        report.record(epoch(1, 0.5));
        assert!(!report.record(epoch(2, 0.5)));
        assert_eq!(report.best_epoch, Some(1));
    }
}
