//! Dataset discovery, transforms and batching.

pub mod batcher;
pub mod loader;
pub mod transform;

pub use batcher::{CachedImage, HistologyDataset, ImageBatch, ImageBatcher, ImageItem};
pub use loader::{DatasetRoots, DatasetStats, DatasetVariant, ImageFolder, ImageSample};
pub use transform::{to_tensor_data, Augmentation};
