// src/engine.rs
use std::io::{self, Write};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info};

use crate::drivers::FocusPipeline;
use crate::types::{EngineCommand, EngineMessage};

/// Runs a pipeline on its own thread, fed by `EngineCommand`s.
///
/// The loop ends on `Shutdown`, when the command channel closes, or when
/// nobody is listening for results any more.
pub fn spawn_worker(
    pipeline: Arc<FocusPipeline>,
    rx_cmd: Receiver<EngineCommand>,
    tx: Sender<EngineMessage>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        info!("processing worker ready");
        while let Ok(cmd) = rx_cmd.recv() {
            let reply = match cmd {
                EngineCommand::Ingest(batch) => {
                    debug!("ingest {} samples for {}", batch.len(), batch.device_id);
                    EngineMessage::Analysis(pipeline.process_batch(&batch))
                }
                EngineCommand::Reset(device_id) => {
                    let existed = pipeline.reset(&device_id);
                    EngineMessage::DeviceReset { device_id, existed }
                }
                EngineCommand::Shutdown => break,
            };
            if tx.send(reply).is_err() {
                return;
            }
        }
        tx.send(EngineMessage::Stopped).ok();
        info!("processing worker stopped");
    })
}

/// Writes each analysis as one JSON line and flushes it straight away, so a
/// live input stream sees results without waiting for end of input. Returns
/// the number of analyses written once `Stopped` arrives or the channel closes.
pub fn stream_analyses<W: Write>(rx: Receiver<EngineMessage>, mut out: W) -> io::Result<usize> {
    let mut written = 0usize;
    for message in rx {
        match message {
            EngineMessage::Analysis(analysis) => {
                serde_json::to_writer(&mut out, &analysis)?;
                writeln!(out)?;
                out.flush()?;
                written += 1;
            }
            EngineMessage::DeviceReset { device_id, existed } => {
                debug!("reset {device_id} (existed: {existed})");
            }
            EngineMessage::Stopped => break,
        }
    }
    Ok(written)
}
