//! Command-line front end: export, inspect and synthesize TNT weights.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tnt_export::export::{run_export, write_synthetic_checkpoint, ConfigOverrides, ExportOptions};
use tnt_export::model::{TntConfig, DEFAULT_SEED};
use tnt_export::serialization::{read_weights, NonFinitePolicy, WriteOptions};
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "TNT checkpoint to TensorRT .wts exporter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remap a training checkpoint and write the .wts weight file
    Export(ExportArgs),
    /// Parse a .wts file and list its tensors
    Inspect {
        /// Weight file to read
        weights: PathBuf,
    },
    /// Write a randomly initialized checkpoint in the training layout
    Synth(SynthArgs),
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// SafeTensors checkpoint file or checkpoint directory
    #[arg(short, long, default_value = "weights/sg_best_TNT.safetensors")]
    checkpoint: PathBuf,

    /// Output weight file (overwritten)
    #[arg(short, long, default_value = "tensorrt_deploy/tnt_trt/tnt.wts")]
    output: PathBuf,

    /// Model config JSON; defaults to the checkpoint's config.json, then built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the polyline feature width
    #[arg(long)]
    num_features: Option<usize>,

    /// Override the prediction horizon
    #[arg(long)]
    horizon: Option<usize>,

    /// Seed for parameter initialization before the checkpoint is loaded
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Fail instead of writing NaN or infinite values
    #[arg(long)]
    reject_non_finite: bool,
}

#[derive(Args, Debug)]
struct SynthArgs {
    /// Checkpoint directory to create
    #[arg(short, long)]
    output: PathBuf,

    /// Model config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Leave out the auxiliary head
    #[arg(long)]
    no_aux: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Export(args) => {
            let write = WriteOptions {
                non_finite: if args.reject_non_finite {
                    NonFinitePolicy::Reject
                } else {
                    NonFinitePolicy::PassThrough
                },
            };
            let mut options = ExportOptions::new(&args.checkpoint, &args.output)
                .with_overrides(ConfigOverrides {
                    in_channels: args.num_features,
                    horizon: args.horizon,
                })
                .with_seed(args.seed)
                .with_write_options(write);
            if let Some(path) = args.config {
                options = options.with_config(TntConfig::from_json_file(path)?);
            }

            let summary = run_export(&options)?;
            println!(
                "{} tensors, {} values, {} bytes -> {}",
                summary.written.entries,
                summary.written.elements,
                summary.written.bytes,
                args.output.display()
            );
        }
        Command::Inspect { weights } => {
            let params = read_weights(&weights)?;
            for (name, tensor) in &params {
                println!("{:<60} {:>8}", name, tensor.len());
            }
            println!("{} tensors, {} values", params.len(), params.total_elements());
        }
        Command::Synth(args) => {
            let config = match args.config {
                Some(path) => TntConfig::from_json_file(path)?,
                None => TntConfig::default(),
            };
            let checkpoint = write_synthetic_checkpoint(&args.output, config, args.seed, !args.no_aux)?;
            println!(
                "{} tensors, {} values -> {}",
                checkpoint.weights.len(),
                checkpoint.weights.total_elements(),
                args.output.display()
            );
        }
    }
    Ok(())
}
