//! Sample value types.

/// One acquisition result: an ordered tuple of numeric values.
///
/// Sources may return a scalar or a fixed-arity tuple per tick; both coerce
/// into a `Sample` (`From<f64>`, `From<[f64; N]>`, `From<Vec<f64>>`). The
/// handler retains only the first `cols` values when writing; extras are
/// dropped, missing values are never padded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sample(Vec<f64>);

impl Sample {
    /// Values in acquisition order.
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Number of values in this sample.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the sample carries no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<f64> for Sample {
    fn from(value: f64) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<f64>> for Sample {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl From<&[f64]> for Sample {
    fn from(values: &[f64]) -> Self {
        Self(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Sample {
    fn from(values: [f64; N]) -> Self {
        Self(values.to_vec())
    }
}

impl FromIterator<f64> for Sample {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A sample together with the wall-clock time it was acquired.
///
/// Produced by the acquirer for introspection via `Acquirer::last()`. The
/// snapshot is informational only and must not drive control decisions; it
/// reflects whatever the acquisition thread most recently stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedSample {
    /// Acquisition time as unix seconds.
    pub timestamp: f64,
    /// The acquired values.
    pub sample: Sample,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_coerces_to_single_column() {
        let s: Sample = 42.5.into();
        assert_eq!(s.values(), &[42.5]);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn array_and_vec_coerce() {
        let a: Sample = [1.0, 2.0, 3.0].into();
        let v: Sample = vec![1.0, 2.0, 3.0].into();
        assert_eq!(a, v);
        assert_eq!(a.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn collects_from_iterator() {
        let s: Sample = (0..4).map(f64::from).collect();
        assert_eq!(s.values(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn empty_sample() {
        let s = Sample::default();
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
    }
}
