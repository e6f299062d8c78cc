//! Fixed-period sample acquisition.

use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

use crate::error::{DaqLogError, Result};
use crate::sample::{Sample, TimestampedSample};
use crate::source::SampleSource;
use crate::worker::Worker;

/// Poll interval of the acquisition loop. Bounds busy-polling CPU usage and
/// therefore also the sampling jitter: ticks land within one poll interval
/// after their nominal time. Periods below this are not meaningfully
/// supported.
const POLL: Duration = Duration::from_millis(10);

type Callback = Box<dyn FnMut(f64, &Sample) + Send>;

struct Pipeline {
    source: Box<dyn SampleSource>,
    callback: Callback,
}

/// Drives periodic sampling on its own thread.
///
/// Every `period`, the injected [`SampleSource`] is called and the result is
/// handed to the callback together with the acquisition time in unix
/// seconds. The callback decides what happens to the data (typically
/// [`QueueSink::enqueue`](crate::QueueSink::enqueue)); the acquirer itself
/// stores nothing beyond a best-effort [`last()`](Self::last) snapshot.
///
/// Timing is soft real-time: the loop wakes every 10 ms, so consecutive
/// samples are spaced at least `period` apart but may lag it by up to one
/// poll interval. A slow source call delays subsequent ticks; there is no
/// catch-up.
///
/// Failure is fail-fast: a source error terminates the loop. It surfaces
/// through [`last_error()`](Self::last_error) and
/// [`stop_and_join()`](Self::stop_and_join). Retry policy belongs to the
/// source (see [`RetryOnce`](crate::RetryOnce)).
pub struct Acquirer {
    period: Duration,
    pipeline: Mutex<Option<Pipeline>>,
    last: Arc<Mutex<Option<TimestampedSample>>>,
    worker: Worker,
}

impl Acquirer {
    /// Create an acquirer sampling `source` every `period`.
    ///
    /// Returns [`DaqLogError::InvalidConfig`] for a zero period. Periods
    /// under 10 ms are accepted with a warning but degrade to polling rate.
    pub fn new<S, C>(period: Duration, source: S, callback: C) -> Result<Self>
    where
        S: SampleSource + 'static,
        C: FnMut(f64, &Sample) + Send + 'static,
    {
        if period.is_zero() {
            return Err(DaqLogError::InvalidConfig(
                "acquisition period must be non-zero".into(),
            ));
        }
        if period < POLL {
            warn!(
                period_ms = period.as_millis() as u64,
                "period is below the 10 ms poll interval; sampling will run at poll rate"
            );
        }
        Ok(Self {
            period,
            pipeline: Mutex::new(Some(Pipeline {
                source: Box::new(source),
                callback: Box::new(callback),
            })),
            last: Arc::new(Mutex::new(None)),
            worker: Worker::new("acquirer"),
        })
    }

    /// Spawn the acquisition loop. Single-use; a second call fails.
    pub fn start(&self) -> Result<()> {
        let pipeline = self
            .pipeline
            .lock()
            .take()
            .ok_or(DaqLogError::AlreadyStarted("acquirer"))?;
        let period = self.period;
        let last = Arc::clone(&self.last);

        self.worker.start(move |flag| {
            let Pipeline {
                mut source,
                mut callback,
            } = pipeline;
            let mut last_tick: Option<Instant> = None;

            while flag.is_set() {
                let now = Instant::now();
                let due = last_tick.map_or(true, |t| now.duration_since(t) >= period);
                if due {
                    let sample = source.sample()?;
                    last_tick = Some(now);
                    let timestamp = unix_seconds();
                    *last.lock() = Some(TimestampedSample {
                        timestamp,
                        sample: sample.clone(),
                    });
                    callback(timestamp, &sample);
                }
                thread::sleep(POLL);
            }
            Ok(())
        })
    }

    /// Request stop and block until the loop has exited. After this returns,
    /// no further source or callback calls are issued.
    pub fn stop_and_join(&self) -> Result<()> {
        self.worker.stop_and_join()
    }

    /// True while the acquisition loop is alive.
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Terminal error of a dead acquisition loop, if any.
    pub fn last_error(&self) -> Option<String> {
        self.worker.last_error()
    }

    /// Best-effort snapshot of the most recent acquisition.
    ///
    /// Informational only; do not use for control decisions.
    pub fn last(&self) -> Option<TimestampedSample> {
        self.last.lock().clone()
    }

    /// Configured sampling period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Wall-clock time as unix seconds; 0.0 if the clock is before the epoch.
fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn zero_period_is_rejected() {
        let err = Acquirer::new(Duration::ZERO, source::from_fn(|| Ok(0.0)), |_, _| {});
        assert!(matches!(err, Err(DaqLogError::InvalidConfig(_))));
    }

    #[test]
    fn samples_are_spaced_by_period() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls2 = Arc::clone(&calls);
        let src = source::from_fn(move || {
            calls2.lock().push(Instant::now());
            Ok(1.0)
        });

        let acq = Acquirer::new(Duration::from_millis(50), src, |_, _| {}).unwrap();
        acq.start().unwrap();
        thread::sleep(Duration::from_millis(240));
        acq.stop_and_join().unwrap();

        let calls = calls.lock();
        assert!(calls.len() >= 3, "expected >= 3 samples, got {}", calls.len());
        for pair in calls.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap >= Duration::from_millis(50), "gap {gap:?} below period");
            assert!(gap < Duration::from_millis(80), "gap {gap:?} way over period");
        }
    }

    #[test]
    fn scalar_result_reaches_callback_as_one_column() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let acq = Acquirer::new(
            Duration::from_millis(20),
            source::from_fn(|| Ok(42.0)),
            move |ts, sample| {
                seen2.lock().push((ts, sample.clone()));
            },
        )
        .unwrap();
        acq.start().unwrap();
        thread::sleep(Duration::from_millis(60));
        acq.stop_and_join().unwrap();

        let seen = seen.lock();
        assert!(!seen.is_empty());
        assert_eq!(seen[0].1.values(), &[42.0]);
        assert!(seen[0].0 > 0.0);
        assert_eq!(acq.last().unwrap().sample.values(), &[42.0]);
    }

    #[test]
    fn stop_quiesces_sampling() {
        let count = Arc::new(AtomicU64::new(0));
        let count2 = Arc::clone(&count);
        let src = source::from_fn(move || {
            count2.fetch_add(1, Ordering::SeqCst);
            Ok(0.0)
        });
        let acq = Acquirer::new(Duration::from_millis(10), src, |_, _| {}).unwrap();
        acq.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        acq.stop_and_join().unwrap();

        let at_stop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), at_stop);
    }

    #[test]
    fn source_error_terminates_loop() {
        let acq = Acquirer::new(
            Duration::from_millis(10),
            source::from_fn(|| -> anyhow::Result<f64> { Err(anyhow::anyhow!("dead probe")) }),
            |_, _| {},
        )
        .unwrap();
        acq.start().unwrap();
        thread::sleep(Duration::from_millis(50));

        assert!(!acq.is_running());
        assert!(acq.last_error().unwrap().contains("dead probe"));
        assert!(matches!(
            acq.stop_and_join(),
            Err(DaqLogError::Source(_))
        ));
    }
}
