//! Dino Classifier CLI
//!
//! End-to-end pipeline driver: prepare a raw dataset, train the
//! classifier, run inference on images, or show split statistics.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use dino_classifier::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use dino_classifier::utils::logging::{init_logging, LogConfig};
use dino_classifier::training::run_training;
use dino_classifier::{
    prepare_dataset, DinoClassifierConfig, ImageFolder, Predictor, PreprocessConfig,
    TrainingConfig,
};

/// Is it a dinosaur? Binary image classification with Burn.
#[derive(Parser, Debug)]
#[command(name = "dino_classifier")]
#[command(version)]
#[command(about = "Train and run a binary dinosaur image classifier", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Log errors only
    #[arg(short, long, default_value = "false")]
    quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clean raw class directories and split them into train/test
    Prepare {
        /// Root with one subdirectory of raw images per class
        #[arg(short, long, default_value = "data/raw")]
        raw_dir: String,

        /// Output root for the processed split tree
        #[arg(short, long, default_value = "data/processed")]
        output_dir: String,

        /// Edge length of cleaned images
        #[arg(long, default_value = "224")]
        image_size: u32,

        /// Fraction of each class held out for testing
        #[arg(long, default_value = "0.2")]
        test_ratio: f64,

        /// Cap on cleaned images per class
        #[arg(long)]
        max_per_class: Option<usize>,

        /// Random seed for the split shuffle
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Train the classifier on a processed split tree
    Train {
        /// Processed data root (contains train/ and test/)
        #[arg(short, long, default_value = "data/processed")]
        data_dir: String,

        /// Artifact output stem (writes <stem>.json and <stem>.mpk)
        #[arg(short, long, default_value = "models/dinosaur_classifier")]
        model: String,

        /// Epoch ceiling
        #[arg(short, long, default_value = "30")]
        epochs: usize,

        /// Batch size
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Learning rate
        #[arg(short, long, default_value = "0.001")]
        learning_rate: f64,

        /// Early-stopping patience in epochs
        #[arg(long, default_value = "2")]
        patience: usize,

        /// Input image size (must match the prepared data)
        #[arg(long, default_value = "224")]
        image_size: usize,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Disable training-time augmentation
        #[arg(long, default_value = "false")]
        no_augment: bool,
    },

    /// Classify an image (or every image in a directory)
    Infer {
        /// Path to an image or a directory of images
        #[arg(short, long)]
        input: String,

        /// Artifact stem of the trained model
        #[arg(short, long, default_value = "models/dinosaur_classifier")]
        model: String,
    },

    /// Show statistics for a processed split tree
    Stats {
        /// Processed data root
        #[arg(short, long, default_value = "data/processed")]
        data_dir: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    println!("{}", "🦖 dino_classifier".green().bold());
    println!();

    match cli.command {
        Commands::Prepare {
            raw_dir,
            output_dir,
            image_size,
            test_ratio,
            max_per_class,
            seed,
        } => cmd_prepare(
            &raw_dir,
            &output_dir,
            image_size,
            test_ratio,
            max_per_class,
            seed,
        ),

        Commands::Train {
            data_dir,
            model,
            epochs,
            batch_size,
            learning_rate,
            patience,
            image_size,
            seed,
            no_augment,
        } => cmd_train(
            &data_dir,
            &model,
            epochs,
            batch_size,
            learning_rate,
            patience,
            image_size,
            seed,
            no_augment,
        ),

        Commands::Infer { input, model } => cmd_infer(&input, &model),

        Commands::Stats { data_dir } => cmd_stats(&data_dir),
    }
}

fn cmd_prepare(
    raw_dir: &str,
    output_dir: &str,
    image_size: u32,
    test_ratio: f64,
    max_per_class: Option<usize>,
    seed: u64,
) -> Result<()> {
    info!("preparing dataset from {} into {}", raw_dir, output_dir);

    let config = PreprocessConfig {
        image_size,
        test_ratio,
        max_images_per_class: max_per_class,
        ..Default::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let summary = prepare_dataset(
        Path::new(raw_dir),
        Path::new(output_dir),
        &config,
        &mut rng,
    )?;

    println!("{}", "Preprocessing complete!".green().bold());
    for class in &summary.classes {
        println!(
            "  {:16} {} cleaned ({} skipped) -> {} train / {} test",
            class.class, class.cleaned, class.skipped, class.train, class.test
        );
    }
    println!("  Total: {} images", summary.total_cleaned());

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_train(
    data_dir: &str,
    model: &str,
    epochs: usize,
    batch_size: usize,
    learning_rate: f64,
    patience: usize,
    image_size: usize,
    seed: u64,
    no_augment: bool,
) -> Result<()> {
    println!("{}", "Training configuration:".cyan().bold());
    println!("  Data:    {}", data_dir);
    println!("  Model:   {}", model);
    println!("  Backend: {}", backend_name());
    println!();

    let model_config = DinoClassifierConfig::new().with_input_size(image_size);
    let config = TrainingConfig {
        epochs,
        batch_size,
        learning_rate,
        patience,
        seed,
        augment: !no_augment,
    };

    run_training::<TrainingBackend>(
        Path::new(data_dir),
        Path::new(model),
        model_config,
        config,
        default_device(),
    )?;

    println!();
    println!("{}", "Next steps:".cyan().bold());
    println!("  dino_classifier infer --input <image> --model {}", model);

    Ok(())
}

fn cmd_infer(input: &str, model: &str) -> Result<()> {
    println!("{}", "Loading model...".cyan());
    let predictor = Predictor::<DefaultBackend>::load(Path::new(model), default_device())?;

    let input_path = Path::new(input);
    let files: Vec<PathBuf> = if input_path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(input_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| dino_classifier::dataset::has_image_extension(p))
            .collect();
        files.sort();
        files
    } else {
        vec![input_path.to_path_buf()]
    };

    if files.is_empty() {
        anyhow::bail!("no images found at {}", input);
    }

    println!("{}", "Classifying...".cyan());
    println!();

    for path in &files {
        let prediction = predictor.predict_file(path)?;
        let verdict = if prediction.is_dinosaur {
            "🦖 dinosaur".green().bold()
        } else {
            "not a dinosaur".blue().bold()
        };
        println!(
            "{:40} {} (P = {:.1}%, {:.1} ms)",
            path.file_name().unwrap_or_default().to_string_lossy(),
            verdict,
            prediction.probability * 100.0,
            prediction.inference_time_ms
        );
    }

    Ok(())
}

fn cmd_stats(data_dir: &str) -> Result<()> {
    let root = Path::new(data_dir);

    for split in ["train", "test"] {
        let folder = ImageFolder::open(root.join(split))?;
        println!("{}", format!("{} split:", split).cyan().bold());
        folder.stats().print();
        println!();
    }

    Ok(())
}
