use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

#[cfg(feature = "wgpu")]
use bach_cnn::backend::GpuTrainingBackend;
use bach_cnn::backend::{accelerator_available, CpuTrainingBackend};
use bach_cnn::config::TrainConfig;
use bach_cnn::dataset::{DatasetVariant, HistologyDataset, ImageFolder};
use bach_cnn::logging::init_logging;
use bach_cnn::model::NetworkConfig;
use bach_cnn::training::{fit, TrainingReport};

#[derive(Parser)]
#[command(name = "bach-cnn")]
#[command(about = "CNN classifier for breast-cancer histology images")]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the classifier from scratch
    Train {
        /// Base directory holding the Train_set/Val_set/Mini_set roots
        #[arg(long, default_value = "data/bach")]
        data_dir: PathBuf,

        /// Dataset variant to train against
        #[arg(long, default_value = "full", value_parser = ["full", "mini"])]
        variant: String,

        #[arg(long, default_value_t = 40)]
        epochs: usize,

        #[arg(long, default_value_t = 64)]
        batch_size: usize,

        #[arg(long, default_value_t = 1e-3)]
        learning_rate: f64,

        /// Batch-norm running-stat decay
        #[arg(long, default_value_t = 0.9)]
        bn_momentum: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Square side length images are resized to
        #[arg(long, default_value_t = 512)]
        image_size: usize,

        /// Log training progress every N batches
        #[arg(long, default_value_t = 20)]
        log_every: usize,

        /// Disable training-time augmentation
        #[arg(long)]
        no_augment: bool,

        /// Save best-model checkpoints into this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Write the per-epoch metrics as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print per-class statistics for a dataset variant
    Stats {
        #[arg(long, default_value = "data/bach")]
        data_dir: PathBuf,

        #[arg(long, default_value = "full", value_parser = ["full", "mini"])]
        variant: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Train {
            data_dir,
            variant,
            epochs,
            batch_size,
            learning_rate,
            bn_momentum,
            seed,
            image_size,
            log_every,
            no_augment,
            output_dir,
            report,
        } => {
            let variant: DatasetVariant = variant.parse()?;
            let train_config = TrainConfig {
                learning_rate,
                bn_momentum,
                batch_size,
                epochs,
                seed,
                log_every,
                variant,
                augment: !no_augment,
            };
            cmd_train(&data_dir, train_config, image_size, output_dir, report)
        }
        Commands::Stats { data_dir, variant } => {
            let variant: DatasetVariant = variant.parse()?;
            cmd_stats(&data_dir, variant)
        }
    }
}

fn cmd_train(
    data_dir: &std::path::Path,
    train_config: TrainConfig,
    image_size: usize,
    output_dir: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let roots = train_config.variant.roots(data_dir);

    let train_folder = ImageFolder::open(&roots.train)
        .with_context(|| format!("opening training split at {:?}", roots.train))?;
    let val_folder = ImageFolder::open(&roots.val)
        .with_context(|| format!("opening validation split at {:?}", roots.val))?;

    if train_folder.classes != val_folder.classes {
        anyhow::bail!(
            "training and validation splits disagree on classes: {:?} vs {:?}",
            train_folder.classes,
            val_folder.classes
        );
    }

    train_folder.stats().print();

    let network_config = NetworkConfig {
        num_classes: train_folder.num_classes(),
        input_size: image_size,
        bn_momentum: train_config.bn_momentum,
        ..Default::default()
    };

    info!("Decoding {} training images", train_folder.len());
    let train_set = HistologyDataset::from_folder(&train_folder, image_size)?;
    info!("Decoding {} validation images", val_folder.len());
    let val_set = HistologyDataset::from_folder(&val_folder, image_size)?;

    let checkpoint_dir = output_dir.as_deref();

    #[cfg(feature = "wgpu")]
    {
        if accelerator_available() {
            info!("Accelerator detected, training on the GPU backend");
            let device = Default::default();
            let report = fit::<GpuTrainingBackend>(
                &network_config,
                &train_config,
                &train_set,
                &val_set,
                &device,
                checkpoint_dir,
            )?;
            return finish(&report, report_path.as_deref());
        }
        warn!("No accelerator detected, falling back to the CPU backend");
    }

    #[cfg(not(feature = "wgpu"))]
    if accelerator_available() {
        warn!("Accelerator detected but this build has no GPU backend; rebuild with --features wgpu");
    }

    info!("Training on the CPU backend");
    let device = Default::default();
    let report = fit::<CpuTrainingBackend>(
        &network_config,
        &train_config,
        &train_set,
        &val_set,
        &device,
        checkpoint_dir,
    )?;
    finish(&report, report_path.as_deref())
}

fn finish(report: &TrainingReport, report_path: Option<&std::path::Path>) -> anyhow::Result<()> {
    println!("{}", "Training complete".green().bold());
    println!(
        "Best validation accuracy: {:.2}%{}",
        report.best_val_accuracy * 100.0,
        report
            .best_epoch
            .map(|e| format!(" (epoch {e})"))
            .unwrap_or_default()
    );

    if let Some(path) = report_path {
        report
            .save(path)
            .with_context(|| format!("writing training report to {path:?}"))?;
        println!("Report written to {path:?}");
    }

    Ok(())
}

fn cmd_stats(data_dir: &std::path::Path, variant: DatasetVariant) -> anyhow::Result<()> {
    let roots = variant.roots(data_dir);

    println!("{}", format!("Train split ({:?})", roots.train).cyan().bold());
    ImageFolder::open(&roots.train)?.stats().print();

    if roots.val != roots.train {
        println!("{}", format!("Val split ({:?})", roots.val).cyan().bold());
        ImageFolder::open(&roots.val)?.stats().print();
    }

    Ok(())
}
