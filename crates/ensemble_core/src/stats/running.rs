//! Welford running mean/variance accumulator.

use serde::{Deserialize, Serialize};

/// Running count, mean and sum of squared deviations (`M2`).
///
/// `RunningStats` is a plain `Copy` value. [`RunningStats::update`] returns
/// the next state without mutating the receiver; [`RunningStats::push`] is
/// the in-place form for a single owner.
///
/// # Examples
///
/// ```rust
/// use ensemble_core::stats::RunningStats;
///
/// let stats = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
///     .into_iter()
///     .fold(RunningStats::new(), RunningStats::update);
///
/// assert_eq!(stats.count(), 8);
/// assert!((stats.mean() - 5.0).abs() < 1e-12);
/// assert!((stats.population_variance().unwrap() - 4.0).abs() < 1e-12);
/// assert!((stats.variance().unwrap() - 32.0 / 7.0).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    /// Empty accumulator.
    #[inline]
    pub const fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Returns the state after observing `value`.
    #[inline]
    #[must_use]
    pub fn update(self, value: f64) -> Self {
        let count = self.count + 1;
        let delta = value - self.mean;
        let mean = self.mean + delta / count as f64;
        let m2 = self.m2 + delta * (value - mean);
        Self { count, mean, m2 }
    }

    /// Observes `value` in place.
    #[inline]
    pub fn push(&mut self, value: f64) {
        *self = self.update(value);
    }

    /// Combines two disjoint partial accumulators.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        if self.count == 0 {
            return *other;
        }
        if other.count == 0 {
            return *self;
        }

        let count = self.count + other.count;
        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let n = count as f64;
        let delta = other.mean - self.mean;

        Self {
            count,
            mean: self.mean + delta * n_b / n,
            m2: self.m2 + other.m2 + delta * delta * n_a * n_b / n,
        }
    }

    /// Number of observed values.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns `true` if nothing has been observed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Running mean (0 when empty).
    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sum of squared deviations from the mean.
    #[inline]
    pub fn m2(&self) -> f64 {
        self.m2
    }

    /// Unbiased sample variance `M2 / (n - 1)`; `None` for fewer than two values.
    #[inline]
    pub fn variance(&self) -> Option<f64> {
        (self.count > 1).then(|| self.m2 / (self.count - 1) as f64)
    }

    /// Population variance `M2 / n`; `None` when empty.
    #[inline]
    pub fn population_variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    /// Sample standard deviation.
    #[inline]
    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Standard error of the mean, `s / sqrt(n)`.
    #[inline]
    pub fn std_error(&self) -> Option<f64> {
        self.std_dev().map(|s| s / (self.count as f64).sqrt())
    }
}

impl Extend<f64> for RunningStats {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::new();
        stats.extend(iter);
        stats
    }
}
