//! Training configuration.

use serde::{Deserialize, Serialize};

use crate::dataset::DatasetVariant;
use crate::error::{Error, Result};

/// Hyperparameters and run settings for one training run.
///
/// Defaults: Adam at 1e-3, batch-norm momentum 0.9, batch size 64, 40
/// epochs, progress reported every 20 training batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Step size for gradient updates
    pub learning_rate: f64,

    /// Batch-norm running-stat decay
    pub bn_momentum: f64,

    /// Samples per optimizer step
    pub batch_size: usize,

    /// Number of epochs to run; the only terminal condition of the loop
    pub epochs: usize,

    /// Seed for weight init, shuffling and augmentation
    pub seed: u64,

    /// Log training progress every N batches
    pub log_every: usize,

    /// Which named dataset roots to resolve at startup
    pub variant: DatasetVariant,

    /// Apply augmentation to training images
    pub augment: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            bn_momentum: 0.9,
            batch_size: 64,
            epochs: 40,
            seed: 42,
            log_every: 20,
            variant: DatasetVariant::Full,
            augment: true,
        }
    }
}

impl TrainConfig {
    /// A fast configuration for smoke-testing against the mini dataset.
    pub fn smoke() -> Self {
        Self {
            epochs: 1,
            batch_size: 2,
            variant: DatasetVariant::Mini,
            ..Default::default()
        }
    }

    /// Validate the configuration before the loop starts.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size < 2 {
            return Err(Error::Config(
                "batch_size must be at least 2: batch normalization needs more \
                 than one sample per training batch"
                    .to_string(),
            ));
        }
        if self.epochs == 0 {
            return Err(Error::Config("epochs must be at least 1".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::Config(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if !(self.bn_momentum > 0.0 && self.bn_momentum < 1.0) {
            return Err(Error::Config(format!(
                "bn_momentum must be in (0, 1), got {}",
                self.bn_momentum
            )));
        }
        if self.log_every == 0 {
            return Err(Error::Config("log_every must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hyperparameters() {
        let config = TrainConfig::default();
        assert_eq!(config.learning_rate, 1e-3);
        assert_eq!(config.bn_momentum, 0.9);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.epochs, 40);
        assert_eq!(config.log_every, 20);
        assert_eq!(config.variant, DatasetVariant::Full);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_size_one_rejected() {
        let config = TrainConfig {
            batch_size: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_learning_rate_rejected() {
        for lr in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = TrainConfig {
                learning_rate: lr,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "lr {lr} should be rejected");
        }
    }

    #[test]
    fn test_smoke_preset_uses_mini_set() {
        let config = TrainConfig::smoke();
        assert_eq!(config.variant, DatasetVariant::Mini);
        assert_eq!(config.epochs, 1);
        assert!(config.validate().is_ok());
    }
}
