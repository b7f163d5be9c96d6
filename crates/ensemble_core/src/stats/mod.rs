//! # Online Statistics
//!
//! One-pass mean and variance of a stream of quantities of interest, without
//! retaining the stream. See [`RunningStats`].
//!
//! ## Algorithm
//!
//! Welford's update for a new value `x` with prior `(n, mean, M2)`:
//!
//! ```text
//! n'    = n + 1
//! delta = x - mean
//! mean' = mean + delta / n'
//! M2'   = M2 + delta * (x - mean')
//! ```
//!
//! The sample variance is `M2 / (n - 1)` for `n > 1`. Partial accumulators
//! built on different workers combine exactly with [`RunningStats::merge`]
//! (Chan, Golub & LeVeque, 1979), so a rayon `fold`/`reduce` gives the same
//! result as a sequential pass up to rounding.
//!
//! ## References
//!
//! - Welford, B. P. (1962). "Note on a Method for Calculating Corrected Sums
//!   of Squares and Products". Technometrics 4(3).
//! - Chan, T. F., Golub, G. H. & LeVeque, R. J. (1979). "Updating Formulae
//!   and a Pairwise Algorithm for Computing Sample Variances".

mod running;

pub use running::RunningStats;
