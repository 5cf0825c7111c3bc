//! Training harness for a CNN classifier of breast-cancer histology images.
//!
//! The dataset follows the torchvision image-folder layout (one directory
//! per class) with `Train_set/`, `Val_set/` and `Mini_set/` roots. Training
//! runs on the Burn framework; the CPU backend is always available and the
//! `wgpu` feature adds a GPU backend the harness uses when an accelerator
//! is detected.

pub mod backend;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod model;
pub mod training;

pub use config::TrainConfig;
pub use dataset::{DatasetVariant, HistologyDataset, ImageFolder};
pub use error::{Error, Result};
pub use model::{Network, NetworkConfig};
pub use training::{fit, EpochMetrics, TrainingReport};

/// Number of histology classes: Normal, Benign, InSitu, Invasive.
pub const NUM_CLASSES: usize = 4;

/// Square side length images are resized to before entering the network.
pub const IMAGE_SIZE: usize = 512;
