// fuzzy-pid: A self-tuning fuzzy PID controller library written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::FuzzyPidController;

/// Configuration for tuning traces
#[derive(Debug, Clone)]
pub struct DebugConfig {
    /// File the JSON lines are appended to
    pub log_path: PathBuf,
    /// Unique ID for this controller instance
    pub controller_id: String,
    /// Optional sampling rate (in Hz) for trace records
    pub sample_rate_hz: Option<f64>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("fuzzy_pid_debug.jsonl"),
            controller_id: "fuzzy_pid".to_string(),
            sample_rate_hz: None,
        }
    }
}

/// State of the controller after one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningSnapshot {
    /// Timestamp in milliseconds since UNIX epoch
    pub timestamp: u128,
    pub controller_id: String,
    pub target: f64,
    pub actual: f64,
    /// Scaled error
    pub error: f64,
    /// Scaled error rate
    pub error_rate: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub output: f64,
}

impl TuningSnapshot {
    fn capture(controller_id: &str, controller: &FuzzyPidController) -> Self {
        let gains = controller.gains();
        let coefficients = controller.coefficients();
        TuningSnapshot {
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis())
                .unwrap_or(0),
            controller_id: controller_id.to_string(),
            target: controller.target(),
            actual: controller.actual(),
            error: controller.error(),
            error_rate: controller.error_rate(),
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
            a: coefficients.a,
            b: coefficients.b,
            c: coefficients.c,
            output: controller.last_output(),
        }
    }
}

/// Records tuning snapshots on a background writer thread.
///
/// Dropping the debugger flushes every queued snapshot before returning.
pub struct ControllerDebugger {
    config: DebugConfig,
    tx: Option<Sender<TuningSnapshot>>,
    writer: Option<JoinHandle<()>>,
    last_sample: Option<Instant>,
    sample_interval: Option<Duration>,
}

impl ControllerDebugger {
    /// Create a new controller debugger with the given configuration
    pub fn new(config: DebugConfig) -> Self {
        let (tx, rx) = channel::<TuningSnapshot>();

        let sample_interval = config
            .sample_rate_hz
            .filter(|hz| hz.is_finite() && *hz > 0.0)
            .map(|hz| Duration::from_secs_f64(1.0 / hz));

        let path = config.log_path.clone();
        let controller_id = config.controller_id.clone();

        let writer = thread::spawn(move || {
            let file = match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => file,
                Err(e) => {
                    error!("cannot open tuning trace {}: {}", path.display(), e);
                    // Drain so senders never block on a dead receiver
                    for _ in rx {}
                    return;
                }
            };
            info!(
                "tuning trace for '{}' is written to {}",
                controller_id,
                path.display()
            );

            let mut out = BufWriter::new(file);
            for snapshot in rx {
                let result = serde_json::to_string(&snapshot)
                    .map_err(std::io::Error::from)
                    .and_then(|json| writeln!(out, "{}", json));
                if let Err(e) = result {
                    warn!("dropping tuning snapshot: {}", e);
                }
            }
            if let Err(e) = out.flush() {
                warn!("failed to flush tuning trace: {}", e);
            }
            debug!("tuning trace for '{}' closed", controller_id);
        });

        Self {
            config,
            tx: Some(tx),
            writer: Some(writer),
            last_sample: None,
            sample_interval,
        }
    }

    pub fn config(&self) -> &DebugConfig {
        &self.config
    }

    /// Queue a snapshot of `controller`, honouring the sampling rate.
    pub fn log_cycle(&mut self, controller: &FuzzyPidController) {
        if let Some(interval) = self.sample_interval {
            let now = Instant::now();
            if let Some(last) = self.last_sample {
                if now.duration_since(last) < interval {
                    return;
                }
            }
            self.last_sample = Some(now);
        }

        let snapshot = TuningSnapshot::capture(&self.config.controller_id, controller);
        if let Some(tx) = &self.tx {
            if let Err(e) = tx.send(snapshot) {
                warn!("tuning trace writer is gone: {}", e);
            }
        }
    }
}

impl Drop for ControllerDebugger {
    fn drop(&mut self) {
        // Closing the channel ends the writer loop
        self.tx.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                error!("tuning trace writer panicked");
            }
        }
    }
}
