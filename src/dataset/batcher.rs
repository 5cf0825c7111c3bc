//! Burn dataset integration and batching.
//!
//! Images are decoded and resized once up front and held in memory;
//! augmentation is applied per item when a training batch is materialized,
//! so every epoch sees fresh draws. The [`ImageBatcher`] is the single point
//! where data moves to the compute device.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};
use rand_chacha::ChaCha8Rng;

use crate::dataset::loader::ImageFolder;
use crate::dataset::transform::{to_tensor_data, Augmentation};
use crate::error::{Error, Result};

/// A decoded, resized sample held in memory.
#[derive(Debug, Clone)]
pub struct CachedImage {
    pub rgb: RgbImage,
    pub label: usize,
}

/// One sample ready for batching: CHW float data plus its label.
#[derive(Debug, Clone)]
pub struct ImageItem {
    pub image: Vec<f32>,
    pub label: usize,
}

/// In-memory dataset of decoded histology images.
#[derive(Debug, Clone)]
pub struct HistologyDataset {
    items: Vec<CachedImage>,
    image_size: usize,
}

impl HistologyDataset {
    /// An empty dataset with the given target image size.
    pub fn empty(image_size: usize) -> Self {
        Self {
            items: Vec::new(),
            image_size,
        }
    }

    /// Decode and resize every sample of a discovered split.
    pub fn from_folder(folder: &ImageFolder, image_size: usize) -> Result<Self> {
        let mut items = Vec::with_capacity(folder.len());
        for sample in &folder.samples {
            let rgb = load_rgb(&sample.path, image_size)?;
            items.push(CachedImage {
                rgb,
                label: sample.label,
            });
        }
        Ok(Self { items, image_size })
    }

    /// Target square image size.
    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// Number of samples, without needing the `Dataset` trait in scope.
    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// Materialize one item with the validation transform only.
    pub fn item(&self, index: usize) -> Option<ImageItem> {
        let cached = self.items.get(index)?;
        let img = DynamicImage::ImageRgb8(cached.rgb.clone());
        Some(ImageItem {
            image: to_tensor_data(&img),
            label: cached.label,
        })
    }

    /// Materialize one training item, drawing augmentations from `rng`.
    pub fn augmented_item(
        &self,
        index: usize,
        augmentation: &Augmentation,
        rng: &mut ChaCha8Rng,
    ) -> Option<ImageItem> {
        let cached = self.items.get(index)?;
        let img = augmentation.apply(DynamicImage::ImageRgb8(cached.rgb.clone()), rng);
        Some(ImageItem {
            image: to_tensor_data(&img),
            label: cached.label,
        })
    }
}

impl Dataset<CachedImage> for HistologyDataset {
    fn get(&self, index: usize) -> Option<CachedImage> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

fn load_rgb(path: &std::path::Path, image_size: usize) -> Result<RgbImage> {
    let img = ImageReader::open(path)
        .map_err(|e| Error::ImageLoad(path.to_path_buf(), e.to_string()))?
        .decode()
        .map_err(|e| Error::ImageLoad(path.to_path_buf(), e.to_string()))?;

    Ok(img
        .resize_exact(image_size as u32, image_size as u32, FilterType::Triangle)
        .to_rgb8())
}

/// A batch of images with shape `[N, 3, H, W]` and labels with shape `[N]`.
#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

/// Stacks items into device tensors. Owns the target device, so batching is
/// the single device-transfer point of the harness.
///
/// Pixel data stays in `[0, 1]`; input normalization is the network's own
/// leading batch-norm layer.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    device: B::Device,
    image_size: usize,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, image_size: usize) -> Self {
        Self { device, image_size }
    }
}

impl<B: Backend> Batcher<ImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>) -> ImageBatch<B> {
        let batch_size = items.len();
        let channels = 3;
        let height = self.image_size;
        let width = self.image_size;

        let images_data: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().copied())
            .collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, height, width]),
            &self.device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(targets_data, [batch_size]),
            &self.device,
        );

        ImageBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::Rgb;
    use rand::SeedableRng;

    type TestBackend = NdArray<f32>;

    fn toy_dataset() -> HistologyDataset {
        let items = (0..4)
            .map(|i| CachedImage {
                rgb: RgbImage::from_pixel(8, 8, Rgb([i as u8 * 40, 128, 200])),
                label: (i % 2) as usize,
            })
            .collect();
        HistologyDataset {
            items,
            image_size: 8,
        }
    }

    #[test]
    fn test_dataset_len_and_get() {
        let dataset = toy_dataset();
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.get(1).unwrap().label, 1);
        assert!(dataset.get(4).is_none());
    }

    #[test]
    fn test_item_shapes_and_labels() {
        let dataset = toy_dataset();
        let item = dataset.item(2).unwrap();
        assert_eq!(item.image.len(), 3 * 8 * 8);
        assert_eq!(item.label, 0);
        assert!(dataset.item(9).is_none());
    }

    #[test]
    fn test_augmented_item_is_seed_deterministic() {
        let dataset = toy_dataset();
        let augmentation = Augmentation::default();

        let mut rng_a = ChaCha8Rng::seed_from_u64(11);
        let mut rng_b = ChaCha8Rng::seed_from_u64(11);

        let a = dataset.augmented_item(0, &augmentation, &mut rng_a).unwrap();
        let b = dataset.augmented_item(0, &augmentation, &mut rng_b).unwrap();
        assert_eq!(a.image, b.image);
        assert_eq!(a.label, b.label);
    }

    #[test]
    fn test_batcher_stacks_on_device() {
        let dataset = toy_dataset();
        let batcher = ImageBatcher::<TestBackend>::new(Default::default(), 8);

        let items: Vec<ImageItem> = (0..3).map(|i| dataset.item(i).unwrap()).collect();
        let batch = batcher.batch(items);

        assert_eq!(batch.images.dims(), [3, 3, 8, 8]);
        assert_eq!(batch.targets.dims(), [3]);

        let targets: Vec<i64> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![0, 1, 0]);
    }
}
