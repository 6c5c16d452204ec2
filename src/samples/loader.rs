// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Background sample loading.
//!
//! Files are decoded entirely into memory on a dedicated worker thread, converted
//! to the engine's sample rate and then published through the sample exchange.
//! The audio thread never waits on any of this.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use super::buffer::SourceBuffer;
use super::decode::{decode_file, transcode};
use super::disposal::DisposalQueue;
use super::error::LoadError;
use super::exchange::SamplePublisher;

/// How often the worker checks whether retired buffers can be freed.
const DISPOSAL_INTERVAL: Duration = Duration::from_millis(50);

/// Status reports held for a reader. Later reports are dropped while it is full.
const STATUS_CAPACITY: usize = 16;

/// Decodes a file and converts it to the target sample rate.
pub fn load_file(path: &Path, target_sample_rate: u32) -> Result<SourceBuffer, LoadError> {
    let started = Instant::now();
    info!(path = ?path, "Loading sample into memory");

    let decoded = decode_file(path)?;
    let buffer = if decoded.sample_rate() != target_sample_rate {
        info!(
            source_rate = decoded.sample_rate(),
            target_rate = target_sample_rate,
            "Transcoding sample"
        );
        transcode(&decoded, target_sample_rate)?
    } else {
        decoded
    };

    info!(
        path = ?path,
        channels = buffer.channel_count(),
        frames = buffer.frame_count(),
        sample_rate = buffer.sample_rate(),
        duration_ms = buffer.duration().as_millis(),
        memory_kb = buffer.memory_size() / 1024,
        elapsed_ms = started.elapsed().as_millis(),
        "Sample loaded"
    );

    Ok(buffer)
}

/// Summary of a loaded sample, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleInfo {
    /// The file the sample was loaded from.
    pub path: PathBuf,
    /// Number of channels.
    pub channels: u16,
    /// Number of frames after conversion.
    pub frames: usize,
    /// Sample rate after conversion.
    pub sample_rate: u32,
}

impl SampleInfo {
    fn new(path: &Path, buffer: &SourceBuffer) -> Self {
        Self {
            path: path.to_path_buf(),
            channels: buffer.channel_count(),
            frames: buffer.frame_count(),
            sample_rate: buffer.sample_rate(),
        }
    }

    /// Returns the duration of the sample.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
    }
}

/// The outcome of a load request. Sent to whoever is showing status to the user;
/// the engine itself never sees failures.
#[derive(Debug, Clone)]
pub enum LoadStatus {
    /// The sample was published and will be heard from the next block.
    Loaded(SampleInfo),
    /// The sample could not be loaded. The previous sample stays in effect.
    Failed { path: PathBuf, reason: String },
}

enum Request {
    Load(PathBuf),
    Shutdown,
}

/// Handle to the background loader thread.
pub struct SampleLoader {
    requests: Sender<Request>,
    status: Receiver<LoadStatus>,
    current: Arc<Mutex<Option<SampleInfo>>>,
    worker: Option<JoinHandle<()>>,
}

impl SampleLoader {
    /// Starts the loader thread. It owns the publisher for the lifetime of the loader.
    pub fn spawn(publisher: SamplePublisher, target_sample_rate: u32) -> Result<Self, LoadError> {
        let (requests, request_rx) = crossbeam_channel::unbounded();
        let (status_tx, status) = crossbeam_channel::bounded(STATUS_CAPACITY);
        let current = Arc::new(Mutex::new(None));

        let worker = {
            let current = current.clone();
            thread::Builder::new()
                .name("sample-loader".to_string())
                .spawn(move || {
                    let mut worker = Worker {
                        publisher,
                        disposal: DisposalQueue::new(),
                        target_sample_rate,
                        status: status_tx,
                        current,
                    };
                    worker.run(request_rx);
                })
                .map_err(LoadError::Spawn)?
        };

        Ok(Self {
            requests,
            status,
            current,
            worker: Some(worker),
        })
    }

    /// Asks the loader to load a file. Never blocks; completion is reported on the
    /// status channel.
    pub fn request_load<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        self.requests
            .send(Request::Load(path.as_ref().to_path_buf()))
            .map_err(|_| LoadError::Disconnected)
    }

    /// Returns the status channel.
    pub fn status(&self) -> &Receiver<LoadStatus> {
        &self.status
    }

    /// Waits up to `timeout` for the next status report.
    pub fn wait_for_status(&self, timeout: Duration) -> Option<LoadStatus> {
        self.status.recv_timeout(timeout).ok()
    }

    /// Returns information about the most recently published sample.
    pub fn current_sample(&self) -> Option<SampleInfo> {
        self.current.lock().clone()
    }

    /// Stops the worker thread and waits for it to exit.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.requests.send(Request::Shutdown);
            if worker.join().is_err() {
                error!("Sample loader thread panicked");
            }
        }
    }
}

impl Drop for SampleLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("current", &self.current_sample())
            .field("running", &self.worker.is_some())
            .finish()
    }
}

/// State owned by the loader thread.
struct Worker {
    publisher: SamplePublisher,
    disposal: DisposalQueue,
    target_sample_rate: u32,
    status: Sender<LoadStatus>,
    current: Arc<Mutex<Option<SampleInfo>>>,
}

impl Worker {
    fn run(&mut self, requests: Receiver<Request>) {
        loop {
            match requests.recv_timeout(DISPOSAL_INTERVAL) {
                Ok(Request::Load(path)) => self.load(&path),
                Ok(Request::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
            self.disposal.collect();
        }

        self.disposal.collect();
        if self.disposal.pending() > 0 {
            info!(
                pending = self.disposal.pending(),
                "Sample loader stopping with buffers still in use"
            );
        }
    }

    fn load(&mut self, path: &Path) {
        match load_file(path, self.target_sample_rate) {
            Ok(buffer) => {
                let info = SampleInfo::new(path, &buffer);
                if let Some(retired) = self.publisher.publish(buffer) {
                    self.disposal.defer(retired);
                }
                *self.current.lock() = Some(info.clone());
                self.report(LoadStatus::Loaded(info));
            }
            Err(e) => {
                error!(path = ?path, err = %e, "Failed to load sample");
                self.report(LoadStatus::Failed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn report(&self, status: LoadStatus) {
        if let Err(TrySendError::Full(status)) = self.status.try_send(status) {
            warn!(?status, "Status channel full, dropping report");
        }
    }
}
