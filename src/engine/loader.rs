//! Background asset loading
//!
//! Choosing a file for a cue decodes it off the polling thread. Results are
//! collected on the next drain and applied to the timeline by block id, so a
//! block that moved in the meantime still gets its asset. A block that was
//! removed, or that asked for another file since, drops the stale result.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use hound::{SampleFormat, WavReader};
use log::{debug, warn};

use crate::error::{CuetimeError, Result};
use crate::timeline::{AssetInfo, BlockId, LoadedAsset, Timeline};

/// Artist reported for assets without embedded tags
pub const UNKNOWN_ARTIST: &str = "unknown";

/// Turns an audio file into cue metadata
pub trait AssetDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<LoadedAsset>;
}

/// WAV decoder backed by hound
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl AssetDecoder for WavDecoder {
    fn decode(&self, path: &Path) -> Result<LoadedAsset> {
        if !path.is_file() {
            return Err(CuetimeError::AssetNotFound {
                path: path.to_path_buf(),
            });
        }

        let mut reader = WavReader::open(path).map_err(|e| CuetimeError::AssetDecode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(CuetimeError::AssetDecode {
                path: path.to_path_buf(),
                reason: "sample rate is zero".to_string(),
            });
        }

        // duration() counts frames, not interleaved samples
        let frames = reader.duration();
        let duration = Duration::from_secs_f64(frames as f64 / spec.sample_rate as f64);

        let peak = sample_peak(&mut reader).map_err(|e| CuetimeError::AssetDecode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(LoadedAsset {
            path: path.to_path_buf(),
            duration,
            info: AssetInfo {
                title,
                artist: UNKNOWN_ARTIST.to_string(),
            },
            peak,
        })
    }
}

/// Loudest absolute sample across all channels, scaled to 0.0 - 1.0
fn sample_peak<R: Read>(reader: &mut WavReader<R>) -> hound::Result<f32> {
    let spec = reader.spec();
    match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .try_fold(0.0_f32, |peak, s| s.map(|v| peak.max(v.abs()))),
        SampleFormat::Int => {
            let full_scale = (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .try_fold(0.0_f32, |peak, s| {
                    s.map(|v| peak.max(v.unsigned_abs() as f32 / full_scale))
                })
                .map(|peak| peak.min(1.0))
        }
    }
}

/// Outcome of one finished load, as seen by the timeline
#[derive(Debug)]
pub enum LoadCompletion {
    /// The asset is now attached to the cue
    Applied { block: BlockId, asset: LoadedAsset },
    /// Decoding failed; the cue is unchanged
    Failed { block: BlockId, error: CuetimeError },
    /// The result arrived for a block that no longer wants it
    Discarded { block: BlockId, path: PathBuf },
}

impl LoadCompletion {
    pub fn block(&self) -> BlockId {
        match self {
            LoadCompletion::Applied { block, .. }
            | LoadCompletion::Failed { block, .. }
            | LoadCompletion::Discarded { block, .. } => *block,
        }
    }
}

/// Decode workers started by [`AssetLoader::new`]
pub const DEFAULT_WORKERS: usize = 4;

struct LoadJob {
    block: BlockId,
    ticket: u64,
    path: PathBuf,
}

struct LoadResult {
    block: BlockId,
    ticket: u64,
    path: PathBuf,
    result: Result<LoadedAsset>,
}

/// Runs decodes on a fixed set of worker threads and hands results back by block id
pub struct AssetLoader {
    jobs: Sender<LoadJob>,
    rx: Receiver<LoadResult>,
    workers: usize,
    /// Latest ticket per block; anything older is stale
    tickets: HashMap<BlockId, u64>,
    next_ticket: u64,
}

impl fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetLoader")
            .field("workers", &self.workers)
            .field("pending", &self.tickets.len())
            .finish()
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new(Arc::new(WavDecoder))
    }
}

impl AssetLoader {
    pub fn new(decoder: Arc<dyn AssetDecoder>) -> Self {
        Self::with_workers(decoder, DEFAULT_WORKERS)
    }

    /// Start `workers` decode threads (at least one). They exit when the loader is dropped.
    pub fn with_workers(decoder: Arc<dyn AssetDecoder>, workers: usize) -> Self {
        let workers = workers.max(1);
        let (jobs, job_rx) = mpsc::channel::<LoadJob>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (tx, rx) = mpsc::channel();

        for _ in 0..workers {
            let decoder = Arc::clone(&decoder);
            let job_rx = Arc::clone(&job_rx);
            let tx = tx.clone();
            thread::spawn(move || decode_jobs(decoder.as_ref(), &job_rx, &tx));
        }

        Self {
            jobs,
            rx,
            workers,
            tickets: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// Queue `path` for decoding for `block`, superseding any earlier request
    pub fn request(&mut self, block: BlockId, path: impl Into<PathBuf>) {
        let path = path.into();
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.tickets.insert(block, ticket);

        debug!("[LOADER] request {} for block {}", path.display(), block);

        if self.jobs.send(LoadJob { block, ticket, path }).is_err() {
            warn!("Asset workers have exited; dropping request for block {}", block);
            self.tickets.remove(&block);
        }
    }

    /// Forget any outstanding request for `block`
    pub fn cancel(&mut self, block: BlockId) -> bool {
        self.tickets.remove(&block).is_some()
    }

    /// Number of blocks still waiting for a result
    pub fn pending(&self) -> usize {
        self.tickets.len()
    }

    /// Apply every result that has arrived so far
    pub fn drain_into(&mut self, timeline: &mut Timeline) -> Vec<LoadCompletion> {
        let mut completions = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            completions.push(self.complete(result, timeline));
        }
        completions
    }

    /// Block until nothing is pending or `timeout` passes
    pub fn wait_for(&mut self, timeline: &mut Timeline, timeout: Duration) -> Vec<LoadCompletion> {
        let deadline = Instant::now() + timeout;
        let mut completions = Vec::new();

        while self.pending() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(result) => completions.push(self.complete(result, timeline)),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    warn!("Timed out with {} asset loads pending", self.pending());
                    break;
                }
            }
        }

        completions
    }

    fn complete(&mut self, result: LoadResult, timeline: &mut Timeline) -> LoadCompletion {
        let LoadResult {
            block,
            ticket,
            path,
            result,
        } = result;

        if self.tickets.get(&block) != Some(&ticket) {
            debug!("[LOADER] stale result for block {}", block);
            return LoadCompletion::Discarded { block, path };
        }
        self.tickets.remove(&block);

        match result {
            Ok(asset) => {
                if timeline.apply_asset(block, asset.clone()) {
                    LoadCompletion::Applied { block, asset }
                } else {
                    LoadCompletion::Discarded { block, path }
                }
            }
            Err(error) => {
                warn!("Failed to load {}: {}", path.display(), error);
                LoadCompletion::Failed { block, error }
            }
        }
    }
}

/// Worker loop: decode queued jobs until the loader goes away
fn decode_jobs(
    decoder: &dyn AssetDecoder,
    jobs: &Mutex<Receiver<LoadJob>>,
    results: &Sender<LoadResult>,
) {
    loop {
        // The guard is released before decoding so other workers can dequeue
        let job = match jobs.lock() {
            Ok(queue) => queue.recv(),
            Err(_) => return,
        };
        let Ok(LoadJob { block, ticket, path }) = job else {
            return;
        };

        let result = decoder.decode(&path);
        let sent = results.send(LoadResult {
            block,
            ticket,
            path,
            result,
        });
        if sent.is_err() {
            return;
        }
    }
}
