//! Sample sources and source combinators.
//!
//! A [`SampleSource`] is the acquisition-side collaborator: anything that can
//! produce one [`Sample`] on demand. Hardware wrappers, closures, and replay
//! buffers all fit. Sources signal transient failure by returning an error;
//! the acquirer does not retry — recovery policy belongs to the source, e.g.
//! via [`RetryOnce`].

use anyhow::Result;
use tracing::warn;

use crate::sample::Sample;

/// Something that can yield one sample per acquisition tick.
pub trait SampleSource: Send {
    /// Produce the next sample. An error terminates the acquisition loop
    /// unless a wrapping combinator handles it first.
    fn sample(&mut self) -> Result<Sample>;
}

/// Adapts a closure returning a scalar or tuple into a [`SampleSource`].
///
/// Built with [`from_fn`].
pub struct FnSource<F>(F);

impl<F, S> SampleSource for FnSource<F>
where
    F: FnMut() -> Result<S> + Send,
    S: Into<Sample>,
{
    fn sample(&mut self) -> Result<Sample> {
        (self.0)().map(Into::into)
    }
}

/// Wrap a closure as a sample source.
///
/// The closure may return any value that coerces into a [`Sample`], so a
/// bare `f64` reading becomes a one-column sample:
///
/// ```
/// let mut n = 0.0_f64;
/// let mut src = daqlog::source::from_fn(move || {
///     n += 1.0;
///     Ok(n)
/// });
/// # use daqlog::SampleSource;
/// assert_eq!(src.sample().unwrap().values(), &[1.0]);
/// ```
pub fn from_fn<F, S>(f: F) -> FnSource<F>
where
    F: FnMut() -> Result<S> + Send,
    S: Into<Sample>,
{
    FnSource(f)
}

/// Reconnect-and-retry-once wrapper around a fallible source.
///
/// On a failed read, runs the reconnect action against the inner source and
/// retries the read exactly once. A second failure propagates. This is the
/// whole retry budget; anything fancier lives outside this crate.
pub struct RetryOnce<S, R> {
    inner: S,
    reconnect: R,
}

impl<S, R> RetryOnce<S, R>
where
    S: SampleSource,
    R: FnMut(&mut S) -> Result<()> + Send,
{
    /// Wrap `inner`, running `reconnect` before the single retry.
    pub fn new(inner: S, reconnect: R) -> Self {
        Self { inner, reconnect }
    }
}

impl<S, R> SampleSource for RetryOnce<S, R>
where
    S: SampleSource,
    R: FnMut(&mut S) -> Result<()> + Send,
{
    fn sample(&mut self) -> Result<Sample> {
        match self.inner.sample() {
            Ok(sample) => Ok(sample),
            Err(e) => {
                warn!(error = %e, "sample read failed, reconnecting for one retry");
                (self.reconnect)(&mut self.inner)?;
                self.inner.sample()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    /// Fails the first `failures` reads, then succeeds with `value`.
    struct Flaky {
        failures: u32,
        reconnects: u32,
        value: f64,
    }

    impl SampleSource for Flaky {
        fn sample(&mut self) -> Result<Sample> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(anyhow!("read failed"));
            }
            Ok(self.value.into())
        }
    }

    #[test]
    fn closure_scalar_becomes_one_column() {
        let mut src = from_fn(|| Ok(3.25));
        assert_eq!(src.sample().unwrap().values(), &[3.25]);
    }

    #[test]
    fn closure_tuple_keeps_arity() {
        let mut src = from_fn(|| Ok([1.0, 2.0]));
        assert_eq!(src.sample().unwrap().len(), 2);
    }

    #[test]
    fn retry_once_recovers_single_failure() {
        let flaky = Flaky {
            failures: 1,
            reconnects: 0,
            value: 7.0,
        };
        let mut src = RetryOnce::new(flaky, |s: &mut Flaky| {
            s.reconnects += 1;
            Ok(())
        });
        assert_eq!(src.sample().unwrap().values(), &[7.0]);
        assert_eq!(src.inner.reconnects, 1);
    }

    #[test]
    fn retry_once_gives_up_after_second_failure() {
        let flaky = Flaky {
            failures: 2,
            reconnects: 0,
            value: 7.0,
        };
        let mut src = RetryOnce::new(flaky, |_: &mut Flaky| Ok(()));
        assert!(src.sample().is_err());
        // Next read succeeds: both failures are spent.
        assert_eq!(src.sample().unwrap().values(), &[7.0]);
    }

    #[test]
    fn failed_reconnect_propagates() {
        let flaky = Flaky {
            failures: 1,
            reconnects: 0,
            value: 7.0,
        };
        let mut src = RetryOnce::new(flaky, |_: &mut Flaky| Err(anyhow!("no device")));
        assert!(src.sample().is_err());
    }
}
