//! Queued file writer with rotation.
//!
//! [`DataHandler`] drains a thread-safe FIFO queue of samples into plain-text
//! log files on its own thread. Producers push through cloneable
//! [`QueueSink`] handles and never block on I/O; the writer loop pops one
//! sample at a time and appends it with a scoped open-append-close, so every
//! line reaches the OS before the next dequeue. After `max_log_size` written
//! lines the handler rotates to a new file named from the current local time.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::error::{DaqLogError, Result};
use crate::sample::Sample;
use crate::worker::{RunFlag, Worker};

/// Overflow policy for the sample queue.
///
/// The default preserves the engine's original trade-off: never block or drop
/// on the producer side, at the cost of unbounded memory if the writer falls
/// behind. The bounded variants make the overflow behavior explicit; drops
/// are counted and visible via [`QueueSink::dropped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueBound {
    /// No bound; `enqueue` always succeeds.
    #[default]
    Unbounded,
    /// Keep at most this many samples, discarding the oldest to make room.
    DropOldest(usize),
    /// Keep at most this many samples, discarding new arrivals when full.
    DropNewest(usize),
}

/// Cloneable producer handle onto a handler's queue.
///
/// `enqueue` is O(1), never performs I/O, and may be called from any number
/// of threads. FIFO order is preserved per producer; across concurrent
/// producers the log reflects enqueue-completion order.
#[derive(Clone)]
pub struct QueueSink {
    queue: Arc<Mutex<VecDeque<Sample>>>,
    bound: QueueBound,
    dropped: Arc<AtomicU64>,
}

impl QueueSink {
    /// Append a sample to the tail of the queue.
    pub fn enqueue(&self, sample: impl Into<Sample>) {
        let sample = sample.into();
        let mut queue = self.queue.lock();
        match self.bound {
            QueueBound::Unbounded => queue.push_back(sample),
            QueueBound::DropOldest(cap) => {
                if queue.len() >= cap {
                    queue.pop_front();
                    self.dropped.fetch_add(1, Ordering::SeqCst);
                    trace!("queue full, dropped oldest sample");
                }
                queue.push_back(sample);
            }
            QueueBound::DropNewest(cap) => {
                if queue.len() >= cap {
                    self.dropped.fetch_add(1, Ordering::SeqCst);
                    trace!("queue full, dropped incoming sample");
                } else {
                    queue.push_back(sample);
                }
            }
        }
    }

    /// Samples currently waiting to be written.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// True when no samples are queued.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Total samples discarded by a bounded queue since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }
}

/// Configuration for a [`DataHandler`].
///
/// Construct through [`DataHandler::builder`]; `build()` validates the
/// combination.
#[derive(Debug, Clone)]
pub struct DataHandlerConfig {
    /// Column headings written once at the top of every rotation file.
    pub headings: Option<Vec<String>>,
    /// Columns retained per sample. Extra values are truncated, fewer than
    /// this many is a fatal error.
    pub cols: usize,
    /// strftime pattern for rotation file names, evaluated against local
    /// wall-clock time at each rotation boundary.
    pub filename_pattern: String,
    /// Lines written per file before rotating.
    pub max_log_size: usize,
    /// Directory the rotation files are created in. Created if missing.
    pub base_dir: PathBuf,
    /// Column separator.
    pub delimiter: char,
    /// Fractional digits per value (`6` matches `%f`).
    pub precision: usize,
    /// Sleep between queue polls while idle.
    pub idle_poll: Duration,
    /// Queue overflow policy.
    pub queue_bound: QueueBound,
}

impl Default for DataHandlerConfig {
    fn default() -> Self {
        Self {
            headings: None,
            cols: 2,
            filename_pattern: "%Y%m%d-%H%M%S.txt".to_string(),
            max_log_size: 10_000,
            base_dir: PathBuf::from("."),
            delimiter: '\t',
            precision: 6,
            idle_poll: Duration::from_secs(1),
            queue_bound: QueueBound::Unbounded,
        }
    }
}

/// Builder for [`DataHandler`].
#[derive(Debug, Default)]
pub struct DataHandlerBuilder {
    config: DataHandlerConfig,
}

impl DataHandlerBuilder {
    /// Column headings for the top of every rotation file.
    pub fn headings<I, S>(mut self, headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.headings = Some(headings.into_iter().map(Into::into).collect());
        self
    }

    /// Columns retained per sample.
    pub fn cols(mut self, cols: usize) -> Self {
        self.config.cols = cols;
        self
    }

    /// strftime pattern for rotation file names.
    pub fn filename_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.filename_pattern = pattern.into();
        self
    }

    /// Lines written per file before rotating.
    pub fn max_log_size(mut self, lines: usize) -> Self {
        self.config.max_log_size = lines;
        self
    }

    /// Directory for the rotation files.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = dir.into();
        self
    }

    /// Column separator.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    /// Fractional digits per value.
    pub fn precision(mut self, precision: usize) -> Self {
        self.config.precision = precision;
        self
    }

    /// Sleep between queue polls while idle.
    pub fn idle_poll(mut self, idle_poll: Duration) -> Self {
        self.config.idle_poll = idle_poll;
        self
    }

    /// Queue overflow policy.
    pub fn queue_bound(mut self, bound: QueueBound) -> Self {
        self.config.queue_bound = bound;
        self
    }

    /// Validate the configuration and create the handler.
    pub fn build(self) -> Result<DataHandler> {
        DataHandler::with_config(self.config)
    }
}

/// Consumes queued samples and serializes them to rotating log files.
///
/// Failure is fail-fast: an I/O error or a sample shorter than `cols`
/// terminates the writer loop. The error surfaces through
/// [`last_error()`](Self::last_error) and
/// [`stop_and_join()`](Self::stop_and_join); there is no retry or
/// partial-write recovery.
pub struct DataHandler {
    config: DataHandlerConfig,
    sink: QueueSink,
    worker: Worker,
}

impl DataHandler {
    /// Start building a handler from the default configuration.
    pub fn builder() -> DataHandlerBuilder {
        DataHandlerBuilder::default()
    }

    /// Create a handler from an explicit configuration.
    pub fn with_config(config: DataHandlerConfig) -> Result<Self> {
        if config.cols == 0 {
            return Err(DaqLogError::InvalidConfig(
                "cols must be at least 1".into(),
            ));
        }
        if config.max_log_size == 0 {
            return Err(DaqLogError::InvalidConfig(
                "max_log_size must be at least 1".into(),
            ));
        }
        if matches!(
            config.queue_bound,
            QueueBound::DropOldest(0) | QueueBound::DropNewest(0)
        ) {
            return Err(DaqLogError::InvalidConfig(
                "bounded queue capacity must be at least 1".into(),
            ));
        }
        if StrftimeItems::new(&config.filename_pattern).any(|item| matches!(item, Item::Error)) {
            return Err(DaqLogError::InvalidConfig(format!(
                "invalid strftime filename pattern '{}'",
                config.filename_pattern
            )));
        }

        let sink = QueueSink {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            bound: config.queue_bound,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        Ok(Self {
            config,
            sink,
            worker: Worker::new("data-handler"),
        })
    }

    /// A cloneable producer handle onto this handler's queue.
    pub fn sink(&self) -> QueueSink {
        self.sink.clone()
    }

    /// Append a sample to the queue. Shorthand for `sink().enqueue(..)`.
    pub fn enqueue(&self, sample: impl Into<Sample>) {
        self.sink.enqueue(sample);
    }

    /// Samples currently waiting to be written.
    pub fn queue_len(&self) -> usize {
        self.sink.len()
    }

    /// Samples discarded by a bounded queue.
    pub fn dropped(&self) -> u64 {
        self.sink.dropped()
    }

    /// The active configuration.
    pub fn config(&self) -> &DataHandlerConfig {
        &self.config
    }

    /// Spawn the writer loop. Single-use; a second call fails.
    ///
    /// Any backlog queued before this call is discarded: a freshly started
    /// handler never flushes stale data from a previous run.
    pub fn start(&self) -> Result<()> {
        let stale = {
            let mut queue = self.sink.queue.lock();
            let n = queue.len();
            queue.clear();
            n
        };
        if stale > 0 {
            debug!(stale, "discarded stale queue backlog at startup");
        }

        let config = self.config.clone();
        let queue = Arc::clone(&self.sink.queue);
        self.worker
            .start(move |flag| write_loop(&config, &queue, &flag))
    }

    /// Request stop and block until the writer loop has exited.
    ///
    /// Samples still queued at that point stay queued; they are not flushed.
    pub fn stop_and_join(&self) -> Result<()> {
        self.worker.stop_and_join()
    }

    /// True while the writer loop is alive.
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Terminal error of a dead writer loop, if any.
    pub fn last_error(&self) -> Option<String> {
        self.worker.last_error()
    }
}

/// Writer main loop: one iteration of the outer loop is one rotation window.
fn write_loop(
    config: &DataHandlerConfig,
    queue: &Mutex<VecDeque<Sample>>,
    flag: &RunFlag,
) -> Result<()> {
    fs::create_dir_all(&config.base_dir)?;

    while flag.is_set() {
        // One path rule for the whole window: headings and data lines go to
        // the same file, resolved against base_dir exactly once.
        let path = rotation_path(config);
        info!(path = %path.display(), "starting rotation window");

        if let Some(headings) = &config.headings {
            write_headings(&path, headings, config.delimiter)?;
        }

        // The budget counts written lines only; idle polls don't consume it,
        // so an idle handler never rotates through empty files.
        let mut lines = 0;
        while lines < config.max_log_size {
            if !flag.is_set() {
                return Ok(());
            }
            // Mutex is held for the pop only, never across the write.
            let next = queue.lock().pop_front();
            match next {
                None => thread::sleep(config.idle_poll),
                Some(sample) => {
                    let line = format_line(&sample, config)?;
                    append_line(&path, &line)?;
                    lines += 1;
                }
            }
        }
        debug!(path = %path.display(), lines, "rotation budget exhausted");
    }
    Ok(())
}

fn rotation_path(config: &DataHandlerConfig) -> PathBuf {
    let name = Local::now().format(&config.filename_pattern).to_string();
    config.base_dir.join(name)
}

fn write_headings(path: &Path, headings: &[String], delimiter: char) -> Result<()> {
    let mut line = String::new();
    for heading in headings {
        line.push_str(heading);
        line.push(delimiter);
    }
    line.push('\n');
    let mut file = File::create(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Render the first `cols` values of a sample as one log line.
///
/// Extra values are dropped; fewer than `cols` is a [`DaqLogError::ShortSample`].
fn format_line(sample: &Sample, config: &DataHandlerConfig) -> Result<String> {
    let values = sample.values();
    if values.len() < config.cols {
        return Err(DaqLogError::ShortSample {
            expected: config.cols,
            got: values.len(),
        });
    }
    let mut line = String::new();
    for value in &values[..config.cols] {
        line.push_str(&format!("{value:.precision$}", precision = config.precision));
        line.push(config.delimiter);
    }
    line.push('\n');
    Ok(line)
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}
