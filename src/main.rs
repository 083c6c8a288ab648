// src/main.rs
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use neurofocus::drivers::{JsonLinesSource, SimulatedSource};
use neurofocus::{
    spawn_worker, stream_analyses, Band, EngineCommand, EngineConfig, FocusPipeline, SampleSource,
};

/// Batches read ahead of the worker before input blocks.
const COMMAND_QUEUE: usize = 64;

/// Replays raw EEG uploads through the focus pipeline and prints one JSON
/// analysis per batch.
#[derive(Parser, Debug)]
#[command(name = "neurofocus", version, about)]
struct Args {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON-lines file of {"device_id", "samples"} batches; stdin when omitted
    #[arg(long, conflicts_with = "simulate")]
    input: Option<PathBuf>,
    /// Generate a synthetic headset dominated by this band instead of reading input
    #[arg(long)]
    simulate: Option<Band>,
    /// Number of simulated batches
    #[arg(long, default_value_t = 8)]
    batches: usize,
    /// Samples per simulated batch
    #[arg(long, default_value_t = 125)]
    batch_len: usize,
    /// Seed for the simulated noise
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Device id used for simulated batches
    #[arg(long, default_value = "sim-device")]
    device: String,
}

fn open_source(args: &Args, config: &EngineConfig) -> Result<Box<dyn SampleSource>> {
    if let Some(band) = args.simulate {
        return Ok(Box::new(SimulatedSource::new(
            args.device.clone(),
            band,
            config.sample_rate_hz,
            args.batch_len,
            args.batches,
            args.seed,
        )));
    }
    match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input {}", path.display()))?;
            Ok(Box::new(JsonLinesSource::new(BufReader::new(file))))
        }
        None => Ok(Box::new(JsonLinesSource::new(io::stdin().lock()))),
    }
}

// 入口函数
fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    info!(
        "sample rate {} Hz, buffer {} samples",
        config.sample_rate_hz, config.buffer_capacity
    );

    let mut source = open_source(&args, &config)?;
    let pipeline = Arc::new(FocusPipeline::new(&config, None));
    // 有界命令队列: 读取速度不会超过处理速度
    let (tx_cmd, rx_cmd) = mpsc::sync_channel(COMMAND_QUEUE);
    let (tx, rx) = mpsc::channel();
    let worker = spawn_worker(pipeline, rx_cmd, tx);
    let printer = thread::spawn(move || stream_analyses(rx, io::stdout().lock()));

    let mut sent = 0usize;
    while let Some(batch) = source.next_batch().context("failed to read sample batch")? {
        if tx_cmd.send(EngineCommand::Ingest(batch)).is_err() {
            warn!("processing worker exited early, stopping input");
            break;
        }
        sent += 1;
    }
    tx_cmd.send(EngineCommand::Shutdown).ok();
    drop(tx_cmd);

    worker
        .join()
        .map_err(|_| anyhow::anyhow!("processing worker panicked"))?;
    let printed = printer
        .join()
        .map_err(|_| anyhow::anyhow!("output thread panicked"))??;
    if printed < sent {
        anyhow::bail!("only {printed} of {sent} batches were written");
    }
    info!("processed {sent} batches");
    Ok(())
}
