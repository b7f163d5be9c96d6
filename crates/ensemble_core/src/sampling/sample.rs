//! The immutable sample tuple handed to each trial.

use serde::Serialize;
use std::fmt;

/// Ordered tuple of stochastic inputs for one trial.
///
/// A `Sample` can only be obtained from a
/// [`SampleGenerator`](super::SampleGenerator), which validates every
/// component against its domain first. Holding a `Sample` therefore means
/// every component is physically valid.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sample {
    names: Vec<String>,
    values: Vec<f64>,
}

impl Sample {
    pub(crate) fn new(names: Vec<String>, values: Vec<f64>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    /// Number of components.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the sample has no components.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Component values in configuration order.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Component names in configuration order.
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Value at position `index`.
    #[inline]
    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Value of the component called `name`.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}
