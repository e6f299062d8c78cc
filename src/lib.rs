//! Periodic data acquisition with queued, rotating text-file logging.
//!
//! This crate decouples acquisition timing from file I/O using a
//! producer-consumer pattern:
//!
//! 1. An [`Acquirer`] thread calls a [`SampleSource`] at a fixed period
//! 2. A callback hands each sample to a [`DataHandler`] queue
//! 3. The handler's writer thread drains the queue into rotating text files
//!
//! ```text
//!   ┌────────────────┐        ┌─────────────────┐
//!   │  SampleSource  │        │   QueueSink     │
//!   │  (hardware,    │───────▶│   (FIFO queue,  │
//!   │   closure, …)  │ tick   │    any thread)  │
//!   └────────────────┘        └────────┬────────┘
//!         Acquirer                     │
//!                              ┌───────▼────────┐
//!                              │  DataHandler   │
//!                              │  writer loop   │
//!                              └───────┬────────┘
//!                                      │ append, rotate
//!                              ┌───────▼────────┐
//!                              │ 20260827-….txt │
//!                              └────────────────┘
//! ```
//!
//! Both workers run on their own thread and share the same cooperative
//! start/stop lifecycle: `start()` spawns the loop, `stop_and_join()` clears
//! the run flag and blocks until the loop has observed it and returned.
//! Cancellation is checked at iteration boundaries only, so shutdown latency
//! is bounded by the longest single blocking operation in flight.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use daqlog::{source, Acquirer, DataHandler};
//!
//! fn main() -> daqlog::Result<()> {
//!     let handler = DataHandler::builder()
//!         .headings(["time/s", "temp/C"])
//!         .cols(2)
//!         .base_dir("/var/lib/templog")
//!         .build()?;
//!     handler.start()?;
//!
//!     let sink = handler.sink();
//!     let mut t = 0.0_f64;
//!     let probe = source::from_fn(move || {
//!         t += 1.0;
//!         Ok([t, 21.5 + t.sin()])
//!     });
//!
//!     let acquirer = Acquirer::new(Duration::from_secs(10), probe, move |_ts, sample| {
//!         sink.enqueue(sample.clone());
//!     })?;
//!     acquirer.start()?;
//!
//!     std::thread::sleep(Duration::from_secs(60));
//!
//!     acquirer.stop_and_join()?;
//!     handler.stop_and_join()?;
//!     Ok(())
//! }
//! ```

pub mod acquirer;
pub mod error;
pub mod handler;
pub mod sample;
pub mod source;
pub mod worker;

pub use acquirer::Acquirer;
pub use error::{DaqLogError, Result};
pub use handler::{DataHandler, DataHandlerBuilder, DataHandlerConfig, QueueBound, QueueSink};
pub use sample::{Sample, TimestampedSample};
pub use source::{FnSource, RetryOnce, SampleSource};
pub use worker::Worker;
