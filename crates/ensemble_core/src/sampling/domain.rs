//! Physical validity domains for sampled parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Interval a sampled value must lie in.
///
/// The default is the open interval (-inf, +inf), which admits every finite
/// value. NaN is never contained in any domain.
///
/// # Examples
///
/// ```rust
/// use ensemble_core::sampling::Domain;
///
/// let mach = Domain::open(0.0, 1.0);
/// assert!(mach.contains(0.69));
/// assert!(!mach.contains(0.0));
/// assert!(!mach.contains(1.0));
/// assert!(!mach.contains(1.2));
///
/// let closed = Domain::closed(0.0, 1.0);
/// assert!(closed.contains(1.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Domain {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
    /// Whether the bounds themselves belong to the domain.
    pub inclusive: bool,
}

impl Default for Domain {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Domain {
    /// Open interval (lower, upper).
    #[inline]
    pub fn open(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            inclusive: false,
        }
    }

    /// Closed interval [lower, upper].
    #[inline]
    pub fn closed(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            inclusive: true,
        }
    }

    /// The whole real line.
    #[inline]
    pub fn unbounded() -> Self {
        Self::open(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Returns `true` if `value` lies in the domain.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        if self.inclusive {
            value >= self.lower && value <= self.upper
        } else {
            value > self.lower && value < self.upper
        }
    }

    /// Returns `true` if the domain can contain at least one value.
    pub fn is_valid(&self) -> bool {
        if self.lower.is_nan() || self.upper.is_nan() {
            return false;
        }
        if self.inclusive {
            self.lower <= self.upper
        } else {
            self.lower < self.upper
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inclusive {
            write!(f, "[{}, {}]", self.lower, self.upper)
        } else {
            write!(f, "({}, {})", self.lower, self.upper)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_open_interval_rejects_bounds() {
        let d = Domain::open(0.0, 1.0);
        assert!(!d.contains(0.0));
        assert!(!d.contains(1.0));
        assert!(d.contains(0.5));
        assert!(d.contains(f64::EPSILON));
    }

    #[test]
    fn test_angle_domain() {
        let d = Domain::open(-FRAC_PI_2, FRAC_PI_2);
        assert!(d.contains(0.0));
        assert!(d.contains(-0.01));
        assert!(!d.contains(FRAC_PI_2));
        assert!(!d.contains(-2.0));
    }

    #[test]
    fn test_nan_never_contained() {
        assert!(!Domain::unbounded().contains(f64::NAN));
        assert!(!Domain::closed(0.0, 1.0).contains(f64::NAN));
    }

    #[test]
    fn test_unbounded_excludes_infinities() {
        let d = Domain::unbounded();
        assert!(d.contains(1e300));
        assert!(!d.contains(f64::INFINITY));
    }

    #[test]
    fn test_is_valid() {
        assert!(Domain::open(0.0, 1.0).is_valid());
        assert!(!Domain::open(1.0, 1.0).is_valid());
        assert!(Domain::closed(1.0, 1.0).is_valid());
        assert!(!Domain::open(f64::NAN, 1.0).is_valid());
    }

    #[test]
    fn test_display() {
        assert_eq!(Domain::open(0.0, 1.0).to_string(), "(0, 1)");
        assert_eq!(Domain::closed(-1.5, 2.0).to_string(), "[-1.5, 2]");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let d: Domain = toml::from_str("lower = 0.0").unwrap();
        assert_eq!(d.lower, 0.0);
        assert_eq!(d.upper, f64::INFINITY);
        assert!(!d.inclusive);
    }
}
