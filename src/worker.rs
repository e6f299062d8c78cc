//! Cooperative worker lifecycle shared by the acquirer and the data handler.
//!
//! A [`Worker`] owns the run flag and join handle for one background thread.
//! `start()` sets the flag and spawns the loop; `stop_and_join()` clears the
//! flag and blocks until the loop has observed it and returned. The flag is
//! the sole cancellation signal: loops check it at iteration boundaries, so a
//! blocking operation in flight delays shutdown until it completes. That
//! latency bound is part of the contract, not a bug.
//!
//! Workers are single-use. A second `start()` is rejected, and a stopped
//! worker cannot be restarted.
//!
//! State machine: `Unstarted → Running → Stopping → Stopped`. A loop that
//! returns early with an error also lands in `Stopped`; the error is kept in
//! a last-error slot and returned from `stop_and_join()`, so a dead worker is
//! observable rather than silent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::error::{DaqLogError, Result};

/// Cloneable view of a worker's run flag, handed to the loop body.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    /// True while the worker should keep looping. Check once per iteration.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Start/stop lifecycle for one background thread.
pub struct Worker {
    name: &'static str,
    running: Arc<AtomicBool>,
    spawned: AtomicBool,
    handle: Mutex<Option<JoinHandle<Result<()>>>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl Worker {
    /// Create an unstarted worker. `name` labels the thread and log events.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: Arc::new(AtomicBool::new(false)),
            spawned: AtomicBool::new(false),
            handle: Mutex::new(None),
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Set the run flag and spawn `body` on a named thread.
    ///
    /// The body receives the [`RunFlag`] and must return when the flag
    /// clears. Returns [`DaqLogError::AlreadyStarted`] on any call after the
    /// first.
    pub fn start<F>(&self, body: F) -> Result<()>
    where
        F: FnOnce(RunFlag) -> Result<()> + Send + 'static,
    {
        if self.spawned.swap(true, Ordering::SeqCst) {
            return Err(DaqLogError::AlreadyStarted(self.name));
        }
        self.running.store(true, Ordering::SeqCst);

        let name = self.name;
        let running = Arc::clone(&self.running);
        let last_error = Arc::clone(&self.last_error);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let result = body(RunFlag(Arc::clone(&running)));
                match &result {
                    Ok(()) => debug!(worker = name, "worker loop exited"),
                    Err(e) => {
                        error!(worker = name, error = %e, "worker terminated with error");
                        *last_error.lock() = Some(e.to_string());
                    }
                }
                running.store(false, Ordering::SeqCst);
                result
            })?;

        *self.handle.lock() = Some(handle);
        debug!(worker = name, "worker started");
        Ok(())
    }

    /// Clear the run flag and block until the worker thread has returned.
    ///
    /// Returns the loop's terminal result: `Ok(())` after a clean stop (or if
    /// the worker was never started), otherwise the error that killed the
    /// loop. Always returns once any in-flight blocking operation completes.
    pub fn stop_and_join(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.handle.lock().take();
        match handle {
            None => Ok(()),
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => {
                    error!(worker = self.name, "worker thread panicked");
                    Err(DaqLogError::WorkerPanicked(self.name))
                }
            },
        }
    }

    /// True between `start()` and the loop's exit (clean or otherwise).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Rendered terminal error of a dead worker, if it died with one.
    ///
    /// Lets a supervisor notice a failed worker without joining it.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Name given at construction.
    pub fn name(&self) -> &'static str {
        self.name
    }
}
