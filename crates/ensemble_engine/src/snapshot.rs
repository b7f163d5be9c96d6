//! Immutable state snapshots.
//!
//! The heavy baseline state of a simulation (model topology plus baseline
//! parameters) is captured **once**, before any trial is dispatched, as a
//! serialised byte blob. Each trial then materialises its own independent
//! copy from that blob, injects its sample, and hands the copy to the
//! runner. No two trials ever share an in-memory state.
//!
//! ```text
//! baseline ──capture──► Snapshot (bytes, read-only, shared via Arc)
//!                          │
//!            ┌─────────────┼─────────────┐
//!       materialise   materialise   materialise
//!            │             │             │
//!        state #0      state #1      state #N
//!      apply_override apply_override apply_override
//! ```

use crate::error::{OverrideError, SnapshotError, TrialError};
use ensemble_core::Sample;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A simulation state that can be snapshotted and specialised per trial.
pub trait TrialState: Serialize + DeserializeOwned + Send + 'static {
    /// Confirms the state is fully initialised (resources loaded).
    ///
    /// Returns a description of what is missing otherwise.
    fn check_initialised(&self) -> Result<(), String>;

    /// Injects the sampled parameters into this (trial-owned) state.
    fn apply_override(&mut self, sample: &Sample) -> Result<(), OverrideError>;
}

/// Serialised, read-only capture of a baseline [`TrialState`].
///
/// Cloning a `Snapshot` is cheap: the bytes are reference-counted and never
/// mutated after capture.
///
/// # Examples
///
/// ```rust
/// use ensemble_engine::flow_case::FlowCase;
/// use ensemble_engine::snapshot::Snapshot;
///
/// let mut baseline = FlowCase::airfoil_example();
/// baseline.initialise(1_024, 2_000);
///
/// let snapshot = Snapshot::capture(&baseline).unwrap();
/// let copy_a = snapshot.materialise().unwrap();
/// let copy_b = snapshot.materialise().unwrap();
/// assert_eq!(copy_a, copy_b);
/// ```
pub struct Snapshot<S> {
    bytes: Arc<[u8]>,
    _state: PhantomData<fn() -> S>,
}

impl<S: TrialState> Snapshot<S> {
    /// Serialises `baseline`.
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::NotInitialised`] if the baseline is not ready
    /// - [`SnapshotError::Serialise`] if serialisation fails
    /// - [`SnapshotError::NotRestorable`] if the bytes do not deserialise
    ///   back to the same state (NaN or infinite floats, lossy `Serialize`
    ///   impls)
    pub fn capture(baseline: &S) -> Result<Self, SnapshotError> {
        baseline
            .check_initialised()
            .map_err(SnapshotError::NotInitialised)?;

        let bytes = serde_json::to_vec(baseline).map_err(SnapshotError::Serialise)?;
        verify_restorable(baseline, &bytes)?;
        Ok(Self {
            bytes: bytes.into(),
            _state: PhantomData,
        })
    }

    /// Deserialises a fresh, independent copy for one trial's exclusive use.
    ///
    /// Safe to call concurrently from many workers.
    pub fn materialise(&self) -> Result<S, SnapshotError> {
        serde_json::from_slice(&self.bytes).map_err(SnapshotError::Deserialise)
    }

    /// Materialises a copy and applies `sample` to it.
    ///
    /// Failures are reported as trial-local errors.
    pub fn materialise_with(&self, sample: &Sample) -> Result<S, TrialError> {
        let mut state = self
            .materialise()
            .map_err(|e| TrialError::Snapshot(e.to_string()))?;
        state
            .apply_override(sample)
            .map_err(|e| TrialError::Override(e.to_string()))?;
        Ok(state)
    }
}

/// Checks that `bytes` materialise to a state equal to `baseline`.
///
/// States are compared through their `serde_json::Value` form, so map
/// ordering does not matter but every float must come back bit for bit.
fn verify_restorable<S: TrialState>(baseline: &S, bytes: &[u8]) -> Result<(), SnapshotError> {
    let expected = serde_json::to_value(baseline).map_err(SnapshotError::Serialise)?;
    let restored: S = serde_json::from_slice(bytes)
        .map_err(|e| SnapshotError::NotRestorable(e.to_string()))?;
    let restored = serde_json::to_value(&restored).map_err(SnapshotError::Serialise)?;

    if restored != expected {
        return Err(SnapshotError::NotRestorable(
            "restored state differs from the baseline".to_string(),
        ));
    }
    Ok(())
}

impl<S> Snapshot<S> {
    /// Size of the serialised state in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the serialised state is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The serialised bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl<S> Clone for Snapshot<S> {
    fn clone(&self) -> Self {
        Self {
            bytes: Arc::clone(&self.bytes),
            _state: PhantomData,
        }
    }
}

impl<S> fmt::Debug for Snapshot<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("len", &self.bytes.len())
            .finish()
    }
}
