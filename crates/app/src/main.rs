use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cpal::traits::{DeviceTrait, HostTrait};
use log::info;
use renooice_core::{Parameters, Pipeline, TransformKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod config;
mod engine;
mod offline;

use config::AppConfig;
use engine::{AudioEngine, EngineOptions};
use offline::ChunkPlan;

#[derive(Parser)]
#[command(name = "renooice")]
#[command(about = "Renooice: fixed-frame denoise for any host block size", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the stored control values.
#[derive(Args)]
struct Controls {
    /// Processing primitive: denoise, echo-cancel or passthrough
    #[arg(short, long)]
    transform: Option<TransformKind>,
    /// Voice activity threshold (0..1)
    #[arg(long)]
    threshold: Option<f32>,
    /// Grace period before muting, in milliseconds
    #[arg(long)]
    grace: Option<f32>,
    /// Dry/wet amount (0 = processed, 1 = dry)
    #[arg(long)]
    bypass: Option<f32>,
    /// Collect voice activity statistics
    #[arg(long)]
    stats: bool,
}

impl Controls {
    fn merge_into(&self, cfg: &mut AppConfig) {
        if let Some(transform) = self.transform {
            cfg.transform = transform;
        }
        if let Some(threshold) = self.threshold {
            cfg.threshold = threshold;
        }
        if let Some(grace) = self.grace {
            cfg.grace_period_ms = grace;
        }
        if let Some(bypass) = self.bypass {
            cfg.bypass = bypass;
        }
        if self.stats {
            cfg.enable_stats = true;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List available audio devices
    List,
    /// Process live audio in the foreground (press Ctrl+C to stop)
    Run {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
        /// Far-end capture device for echo cancellation
        #[arg(short, long)]
        reference: Option<String>,
        #[arg(long)]
        sample_rate: Option<u32>,
        #[command(flatten)]
        controls: Controls,
        /// Store the resulting settings as the new defaults
        #[arg(long)]
        save: bool,
    },
    /// Process a WAV file offline
    File {
        input: PathBuf,
        output: PathBuf,
        /// Fixed host chunk size in samples
        #[arg(long, default_value_t = 512)]
        chunk: usize,
        /// Use random chunk sizes up to this many samples instead
        #[arg(long)]
        jitter: Option<usize>,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Keep the leading latency instead of aligning output to input
        #[arg(long)]
        keep_latency: bool,
        #[command(flatten)]
        controls: Controls,
    },
    /// Show or reset the stored configuration
    Config {
        #[arg(long)]
        reset: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => list_devices()?,
        Commands::Run {
            input,
            output,
            reference,
            sample_rate,
            controls,
            save,
        } => {
            let mut cfg = AppConfig::load();
            if let Some(input) = input {
                cfg.last_input = input;
            }
            if let Some(output) = output {
                cfg.last_output = output;
            }
            if reference.is_some() {
                cfg.reference_device = reference;
            }
            if let Some(rate) = sample_rate {
                cfg.sample_rate = rate;
            }
            controls.merge_into(&mut cfg);
            if save {
                let path = cfg.save()?;
                println!("Saved settings to {}", path.display());
            }
            run_live(cfg)?;
        }
        Commands::File {
            input,
            output,
            chunk,
            jitter,
            seed,
            keep_latency,
            controls,
        } => {
            let mut cfg = AppConfig::load();
            controls.merge_into(&mut cfg);

            let plan = match jitter {
                Some(max) => ChunkPlan::Jitter { max, seed },
                None => ChunkPlan::Fixed(chunk),
            };

            let params = Arc::new(Parameters::new());
            cfg.apply(&params);
            let transform = cfg
                .transform
                .build()
                .with_context(|| format!("Failed to build {} transform", cfg.transform))?;
            let mut pipeline = Pipeline::new(transform, cfg.pipeline.clone(), cfg.sample_rate as f64)
                .with_parameters(params.clone());

            let report = offline::process_file(&mut pipeline, &input, &output, plan, !keep_latency)?;
            println!(
                "Wrote {} ({} samples at {}Hz, {} cycles, latency {} samples{})",
                output.display(),
                report.output_samples,
                report.sample_rate,
                report.cycles,
                report.latency,
                if keep_latency { "" } else { ", trimmed" }
            );
            if cfg.enable_stats {
                print_stats(&params);
            }
        }
        Commands::Config { reset } => {
            let cfg = if reset {
                let cfg = AppConfig::default();
                cfg.save()?;
                cfg
            } else {
                AppConfig::load()
            };
            match config::config_path() {
                Some(path) => println!("# {}", path.display()),
                None => println!("# no config directory"),
            }
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
    }

    Ok(())
}

fn run_live(cfg: AppConfig) -> Result<()> {
    let params = Arc::new(Parameters::new());
    cfg.apply(&params);

    let engine = AudioEngine::start(
        EngineOptions {
            input: cfg.last_input.clone(),
            output: cfg.last_output.clone(),
            reference: cfg.reference_device.clone(),
            transform: cfg.transform,
            pipeline: cfg.pipeline.clone(),
            sample_rate: cfg.sample_rate,
        },
        params,
    )?;
    println!(
        "Renooice active ({}, latency {} samples). Press Ctrl+C to stop.",
        cfg.transform,
        engine.latency_samples()
    );

    // Graceful shutdown handling
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\nShutting down gracefully...");
        r.store(false, Ordering::Relaxed);
    })?;

    let interval = Duration::from_secs(cfg.stats_interval_secs.max(1));
    let mut last_report = Instant::now();
    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));

        // Drain every tick so the queue never fills; only the newest is reported
        let latest = engine.stats.try_iter().last();
        if let Some(snapshot) = latest {
            if last_report.elapsed() >= interval {
                info!(
                    "VAD now {:.0}% avg {:.0}% min {:.0}% max {:.0}%",
                    snapshot.current, snapshot.average, snapshot.minimum, snapshot.maximum
                );
                last_report = Instant::now();
            }
        }
    }

    drop(engine);
    println!("Renooice stopped.");
    Ok(())
}

fn print_stats(params: &Parameters) {
    let stats = params.stats();
    println!(
        "VAD last {:.0}% avg {:.0}% min {:.0}% max {:.0}%",
        stats.current, stats.average, stats.minimum, stats.maximum
    );
}

fn list_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Audio Host: {}", host.id().name());
    println!("\nInput Devices:");
    for device in host.input_devices()? {
        println!("  - {}", device.name().unwrap_or("Unknown".to_string()));
    }
    println!("\nOutput Devices:");
    for device in host.output_devices()? {
        println!("  - {}", device.name().unwrap_or("Unknown".to_string()));
    }
    Ok(())
}
