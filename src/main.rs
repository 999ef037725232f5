use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use ferrite_engine::augment::{Augment, Mixup};
use ferrite_engine::config::RunConfig;
use ferrite_engine::convert::{convert, DecoderOptions, ImageJob};
use ferrite_engine::data::{builtin_blobs, load_csv, DataLoader};
use ferrite_engine::ema::{EmaTracker, ModelEma};
use ferrite_engine::engine::{evaluate, train_one_epoch, Cpu, TopK, TrainHooks, TrainOptions};
use ferrite_engine::labels::{write_label_file, LabelScheme};
use ferrite_engine::metrics::{JsonlSink, ScalarSink};
use ferrite_engine::network::{Network, NetworkSpec};
use ferrite_engine::{logging, CrossEntropyLoss, Sgd};

#[derive(Parser)]
#[command(name = "ferrite-engine", version, about = "Image batch conversion and classifier training loops")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a PNG file or a directory of PNGs to resized JPEGs.
    Convert(ConvertArgs),
    /// Write a `name,label` file for a folder of dog/cat images.
    Labels(LabelArgs),
    /// Train a classifier on a CSV dataset (or built-in blobs) and evaluate each epoch.
    Train(TrainArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Source file or directory.
    src: PathBuf,
    /// Destination directory (created if missing).
    dest: PathBuf,
    #[arg(long, default_value_t = 960)]
    width: u32,
    #[arg(long, default_value_t = 540)]
    height: u32,
    #[arg(long, default_value_t = 75)]
    quality: u8,
    /// Decode and resize, but do not write any file.
    #[arg(long)]
    dry_run: bool,
    /// Do not retry failed decodes with an appended end-of-image marker.
    #[arg(long)]
    no_repair: bool,
}

#[derive(Args)]
struct LabelArgs {
    /// Folder of images whose names contain "dog" or "cat".
    root: PathBuf,
    /// Label file to write.
    out: PathBuf,
}

#[derive(Args)]
struct TrainArgs {
    /// JSON run config; defaults are used for anything it leaves out.
    #[arg(long)]
    config: Option<PathBuf>,
    /// CSV dataset (features..., class index). Uses 400 built-in blob samples when absent.
    #[arg(long)]
    data: Option<PathBuf>,
    /// Override the configured number of epochs.
    #[arg(long)]
    epochs: Option<usize>,
    /// Write per-step scalars as JSON lines.
    #[arg(long)]
    scalars: Option<PathBuf>,
    /// Save the trained network weights as JSON.
    #[arg(long)]
    save: Option<PathBuf>,
    /// Start from weights written by `--save` instead of a fresh network.
    #[arg(long)]
    resume: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Convert(args) => run_convert(args),
        Command::Labels(args) => run_labels(args),
        Command::Train(args) => run_train(args),
    }
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let job = ImageJob::new(&args.src, &args.dest)
        .with_size(args.width, args.height)
        .with_quality(args.quality)
        .with_decoder(DecoderOptions { repair_truncated: !args.no_repair })
        .dry_run(args.dry_run);
    let report = convert(&job).with_context(|| format!("converting {}", args.src.display()))?;
    info!(
        "{} written, {} planned, {} skipped",
        report.written.len(),
        report.planned.len(),
        report.skipped
    );
    Ok(())
}

fn run_labels(args: LabelArgs) -> Result<()> {
    let n = write_label_file(&args.root, &args.out, &LabelScheme::default())
        .with_context(|| format!("labelling {}", args.root.display()))?;
    info!("{} labels written", n);
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load_json(&path.to_string_lossy())
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    config.validate()?;

    let dataset = match &args.data {
        Some(path) => load_csv(path).with_context(|| format!("loading dataset {}", path.display()))?,
        None => builtin_blobs(400),
    };
    let num_features = dataset.num_features();
    let num_classes = dataset.num_classes;
    let (train_set, val_set) = dataset.split(config.val_split);
    info!("{} training / {} validation samples, {} classes", train_set.len(), val_set.len(), num_classes);

    let spec = config
        .network
        .clone()
        .unwrap_or_else(|| NetworkSpec::classifier("classifier", num_features, config.hidden, num_classes));
    if spec.input_size() != num_features || spec.output_size() != num_classes {
        bail!(
            "network '{}' maps {} → {} but the data has {} features and {} classes",
            spec.name,
            spec.input_size(),
            spec.output_size(),
            num_features,
            num_classes
        );
    }
    let mut model: Network = match &args.resume {
        Some(path) => {
            let net = Network::load_json(&path.to_string_lossy())
                .with_context(|| format!("loading weights {}", path.display()))?;
            if net.input_size() != num_features || net.output_size() != num_classes {
                bail!(
                    "weights in {} map {} → {} but the data has {} features and {} classes",
                    path.display(),
                    net.input_size(),
                    net.output_size(),
                    num_features,
                    num_classes
                );
            }
            info!("resuming from {}", path.display());
            net
        }
        None => spec.build()?,
    };

    let train_loader = DataLoader::new(train_set.inputs, train_set.classes, num_classes, config.batch_size)
        .shuffled(config.seed);
    let val_loader = DataLoader::new(val_set.inputs, val_set.classes, num_classes, config.batch_size);

    let criterion = CrossEntropyLoss::new();
    let mut optimizer = Sgd::new(config.lr)
        .with_momentum(config.momentum)
        .with_weight_decay(config.weight_decay);
    let mut scheduler = config.scheduler.build(config.lr, config.epochs);
    let device = Cpu::with_precision(config.precision);
    let options = TrainOptions {
        max_norm: config.max_norm,
        print_freq: config.print_freq,
        set_training_mode: true,
    };
    let topk = TopK::from(config.topk.clone());

    let mut mixup = config.mixup.clone().map(Mixup::new);
    let mut ema = config.ema_decay.map(|decay| ModelEma::new(&model, decay));
    let mut sink = args.scalars.as_ref().map(JsonlSink::create).transpose()
        .context("creating scalar log")?;

    let mut max_accuracy = 0.0f64;
    for epoch in 0..config.epochs {
        let hooks = TrainHooks {
            ema: ema.as_mut().map(|e| e as &mut dyn EmaTracker<Network>),
            augment: mixup.as_mut().map(|m| m as &mut dyn Augment),
            sink: sink.as_mut().map(|s| s as &mut dyn ScalarSink),
        };
        let train_stats = train_one_epoch(
            &mut model,
            &criterion,
            train_loader.iter(epoch),
            &mut optimizer,
            scheduler.as_mut(),
            &device,
            epoch,
            &options,
            hooks,
        )?;

        let val_stats = evaluate(
            val_loader.iter(epoch),
            &mut model,
            &device,
            epoch,
            topk.clone(),
            sink.as_mut().map(|s| s as &mut dyn ScalarSink),
        )?;
        if let Some(ema) = ema.as_mut() {
            let ema_stats = evaluate(val_loader.iter(epoch), ema.shadow_network_mut(), &device, epoch, topk.clone(), None)?;
            info!("EMA accuracy: {:.2}%", ema_stats.get("acc1").copied().unwrap_or(0.0));
        }

        let acc1 = val_stats.get("acc1").copied().unwrap_or(0.0);
        max_accuracy = max_accuracy.max(acc1);
        info!(
            epoch,
            train_loss = train_stats.get("loss").copied().unwrap_or(f64::NAN),
            "Accuracy of the network on {} validation samples: {:.1}%. Max accuracy: {:.2}%",
            val_loader.num_samples(),
            acc1,
            max_accuracy
        );
    }

    if let Some(sink) = sink.as_mut() {
        sink.flush().context("flushing scalar log")?;
    }
    if let Some(path) = &args.save {
        model.save_json(&path.to_string_lossy())
            .with_context(|| format!("saving model to {}", path.display()))?;
        info!("model saved to {}", path.display());
    }
    Ok(())
}
