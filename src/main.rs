//! Trains a small dense classifier on procedurally drawn patterns.
//!
//! Run with:
//!   cargo run --release -- --epochs 30 --preview outputs/batch.png

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use ferrite_fit::data::synthetic;
use ferrite_fit::optim::{OptimizerKind, SchedulerKind};
use ferrite_fit::train::evaluate;
use ferrite_fit::{
    class_names_from_map, load_model, show_batch_images, train, DataLoader, Device, LossType,
    NetworkSpec, TrainConfig,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchedulerArg {
    Plateau,
    Step,
    Constant,
}

#[derive(Debug, Parser)]
#[command(name = "ferrite-fit", version, about = "Epoch training loop for a dense image classifier")]
struct Cli {
    /// JSON file with TrainConfig fields; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    epochs: Option<usize>,

    /// Stale epochs tolerated before stopping early.
    #[arg(long)]
    patience: Option<usize>,

    #[arg(long)]
    save_path: Option<PathBuf>,

    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    #[arg(long, default_value_t = 0.05)]
    lr: f64,

    #[arg(long, default_value_t = 0.0)]
    weight_decay: f64,

    #[arg(long, value_enum, default_value_t = OptimizerKind::Sgd)]
    optimizer: OptimizerKind,

    #[arg(long, value_enum, default_value_t = LossType::CrossEntropy)]
    loss: LossType,

    #[arg(long, value_enum, default_value_t = SchedulerArg::Plateau)]
    scheduler: SchedulerArg,

    /// Plateau: epochs without improvement before the LR is cut.
    /// Step: epochs between cuts.
    #[arg(long, default_value_t = 3)]
    scheduler_patience: usize,

    #[arg(long, default_value_t = 0.1)]
    scheduler_factor: f64,

    /// cpu, auto, or cuda[:N]
    #[arg(long, default_value = "auto")]
    device: String,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Hidden layer widths, comma separated.
    #[arg(long, value_delimiter = ',', default_value = "32")]
    hidden: Vec<usize>,

    #[arg(long, default_value_t = 200)]
    per_class: usize,

    /// Side length of the square images.
    #[arg(long, default_value_t = 8)]
    side: usize,

    #[arg(long, default_value_t = 0.3)]
    noise: f64,

    #[arg(long, default_value_t = 0.2)]
    val_fraction: f64,

    /// Write a 3×3 preview of one training batch to this PNG before training.
    #[arg(long)]
    preview: Option<PathBuf>,
}

impl Cli {
    fn train_config(&self) -> anyhow::Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::load_json(path)
                .with_context(|| format!("cannot read config '{}'", path.display()))?,
            None => TrainConfig::default(),
        };
        if let Some(epochs) = self.epochs {
            config.num_epochs = epochs;
        }
        if let Some(patience) = self.patience {
            config.patience = patience;
        }
        if let Some(path) = &self.save_path {
            config.save_path = path.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        config.validate()?;
        Ok(config)
    }

    fn scheduler_kind(&self) -> SchedulerKind {
        match self.scheduler {
            SchedulerArg::Plateau => SchedulerKind::Plateau {
                factor: self.scheduler_factor,
                patience: self.scheduler_patience,
            },
            SchedulerArg::Step => SchedulerKind::Step {
                step_size: self.scheduler_patience,
                gamma: self.scheduler_factor,
            },
            SchedulerArg::Constant => SchedulerKind::Constant,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.train_config()?;
    let device: Device = cli.device.parse()?;
    let mut rng = StdRng::seed_from_u64(cli.seed);

    // --- Data ---
    let patterns = synthetic::patterns(cli.per_class, cli.side, cli.noise, &mut rng)?;
    let class_names = class_names_from_map(&patterns.class_map);
    let shape = patterns.dataset.shape();
    let (train_set, val_set) = patterns.dataset.split(cli.val_fraction, &mut rng)?;
    let mut train_loader = DataLoader::new(train_set, cli.batch_size)?.shuffled(cli.seed);
    let mut val_loader = DataLoader::new(val_set, cli.batch_size)?;
    tracing::info!(
        train = train_loader.dataset().len(),
        val = val_loader.dataset().len(),
        classes = class_names.len(),
        batch_size = train_loader.batch_size(),
        train_batches = train_loader.len(),
        val_batches = val_loader.len(),
        "loaders ready"
    );

    if let Some(preview) = &cli.preview {
        show_batch_images(&mut train_loader, &class_names, preview)
            .with_context(|| format!("cannot write preview '{}'", preview.display()))?;
    }

    // --- Model ---
    let spec = NetworkSpec::mlp(shape.numel(), &cli.hidden, class_names.len());
    let mut network = spec.build(&mut rng)?;
    tracing::info!(
        inputs = network.input_size(),
        outputs = network.output_size(),
        layers = network.layers.len(),
        "network built"
    );
    let criterion = cli.loss.build();
    let mut optimizer = cli.optimizer.build(cli.lr, cli.weight_decay);
    let mut scheduler = cli.scheduler_kind().build();

    if let Some(parent) = config.save_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let spec_path = config.save_path.with_extension("arch.json");
    spec.save_json(&spec_path)
        .with_context(|| format!("cannot write architecture '{}'", spec_path.display()))?;

    // --- Train ---
    let summary = train(
        &mut network,
        &mut train_loader,
        &mut val_loader,
        &*criterion,
        &mut optimizer,
        &mut *scheduler,
        device,
        &config,
    )?;

    let Some(best_epoch) = summary.best_epoch else {
        println!("No epochs completed; nothing was saved.");
        return Ok(());
    };

    // --- Reload the best checkpoint and re-score it ---
    load_model(&mut network, &config.save_path)
        .with_context(|| format!("cannot reload '{}'", config.save_path.display()))?;
    let (val_loss, val_acc) = evaluate(&mut network, &mut val_loader, &*criterion, device)?;
    println!(
        "\nBest model: epoch {} | Val Loss: {:.4} | Val Acc: {:.4} | saved to {}",
        best_epoch,
        val_loss,
        val_acc,
        config.save_path.display()
    );
    Ok(())
}
