//! The supervised training loop.
//!
//! Each epoch runs a training phase over a freshly shuffled, augmented view
//! of the training set, then an evaluation phase over the validation set in
//! eval mode. The loop runs for the configured number of epochs and nothing
//! else ends it early.

use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::module::{AutodiffModule, Module};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::record::CompactRecorder;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Int, Tensor};
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::TrainConfig;
use crate::dataset::{Augmentation, HistologyDataset, ImageBatch, ImageBatcher, ImageItem};
use crate::error::{Error, Result};
use crate::model::{Network, NetworkConfig};
use crate::training::report::{EpochMetrics, TrainingReport};

fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> i64 {
    logits
        .argmax(1)
        .squeeze::<1>(1)
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>()
}

/// Run the validation set through `model` and return its accuracy.
///
/// The caller is expected to hand over a model already in eval form
/// (`model.valid()` on the training model).
pub fn evaluate<B: Backend>(
    model: &Network<B>,
    dataset: &HistologyDataset,
    batcher: &ImageBatcher<B>,
    batch_size: usize,
) -> f64 {
    let total = dataset.num_items();
    if total == 0 {
        return 0.0;
    }

    let mut correct = 0i64;
    for start in (0..total).step_by(batch_size) {
        let end = (start + batch_size).min(total);
        let items: Vec<ImageItem> = (start..end)
            .filter_map(|idx| dataset.item(idx))
            .collect();
        if items.is_empty() {
            continue;
        }

        let batch: ImageBatch<B> = batcher.batch(items);
        let logits = model.forward(batch.images);
        correct += count_correct(logits, batch.targets);
    }

    correct as f64 / total as f64
}

/// Train a network from scratch and report per-epoch metrics.
///
/// When `checkpoint_dir` is given, the model weights are saved every time an
/// epoch improves the best validation accuracy.
pub fn fit<B: AutodiffBackend>(
    network_config: &NetworkConfig,
    train_config: &TrainConfig,
    train_set: &HistologyDataset,
    val_set: &HistologyDataset,
    device: &B::Device,
    checkpoint_dir: Option<&Path>,
) -> Result<TrainingReport> {
    train_config.validate()?;
    if train_set.num_items() == 0 {
        return Err(Error::Training("training set is empty".to_string()));
    }
    if val_set.num_items() == 0 {
        return Err(Error::Training("validation set is empty".to_string()));
    }

    B::seed(train_config.seed);
    let mut rng = ChaCha8Rng::seed_from_u64(train_config.seed);

    let mut model = Network::<B>::new(network_config, device)?;
    let mut optimizer = AdamConfig::new().init();
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let augmentation = if train_config.augment {
        Augmentation::default()
    } else {
        Augmentation::none()
    };

    let batcher = ImageBatcher::<B>::new(device.clone(), train_set.image_size());
    let eval_batcher =
        ImageBatcher::<B::InnerBackend>::new(device.clone(), val_set.image_size());
    let num_train = train_set.num_items();
    let num_batches = num_train.div_ceil(train_config.batch_size);

    info!(
        "Training on {} samples, validating on {} samples",
        num_train,
        val_set.num_items()
    );

    let mut report = TrainingReport::new();

    for epoch in 1..=train_config.epochs {
        println!(
            "{}",
            format!("Epoch {}/{}", epoch, train_config.epochs)
                .yellow()
                .bold()
        );

        let mut indices: Vec<usize> = (0..num_train).collect();
        indices.shuffle(&mut rng);

        let mut loss_sum = 0.0;
        let mut correct = 0i64;

        for (batch_idx, chunk) in indices.chunks(train_config.batch_size).enumerate() {
            let items: Vec<ImageItem> = chunk
                .iter()
                .filter_map(|&idx| train_set.augmented_item(idx, &augmentation, &mut rng))
                .collect();

            let batch: ImageBatch<B> = batcher.batch(items);
            let logits = model.forward(batch.images);
            let loss = loss_fn.forward(logits.clone(), batch.targets.clone());

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            correct += count_correct(logits, batch.targets);

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(train_config.learning_rate, model, grads);

            if batch_idx % train_config.log_every == 0 {
                info!("Training batch {} of {}", batch_idx + 1, num_batches);
            }
        }

        let train_loss = loss_sum / num_batches as f64;
        let train_accuracy = correct as f64 / num_train as f64;

        let val_accuracy = evaluate(
            &model.valid(),
            val_set,
            &eval_batcher,
            train_config.batch_size,
        );

        let metrics = EpochMetrics {
            epoch,
            train_loss,
            train_accuracy,
            val_accuracy,
        };
        let improved = report.record(metrics);

        info!("Mean train loss over epoch = {:.4}", train_loss);
        info!("Mean train acc over epoch = {:.4}", train_accuracy);
        info!("Mean val acc over epoch = {:.4}", val_accuracy);
        info!("Best val acc = {:.4}", report.best_val_accuracy);

        if improved {
            if let Some(dir) = checkpoint_dir {
                save_checkpoint(&model, dir, epoch)?;
            }
        }
    }

    Ok(report)
}

fn save_checkpoint<B: AutodiffBackend>(
    model: &Network<B>,
    dir: &Path,
    epoch: usize,
) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("model_epoch{epoch}_{stamp}"));

    model
        .clone()
        .save_file(&path, &CompactRecorder::new())
        .map_err(|e| Error::Training(format!("checkpoint save failed: {e}")))?;

    info!("Saved checkpoint to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_count_correct_matches_argmax() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats(
            TensorData::new(vec![2.0f32, 0.1, 0.3, 5.0, 1.0, 0.0], [3, 2]),
            &device,
        );
        let targets = Tensor::<TestBackend, 1, Int>::from_data(
            TensorData::new(vec![0i64, 1, 1], [3]),
            &device,
        );

        assert_eq!(count_correct(logits, targets), 2);
    }
}
