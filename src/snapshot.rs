//! Checkpointing of the adaptive detector state.

use crate::rr::HISTORY;

/// A copy of everything the detector has learned: threshold estimates, RR
/// histories and the beat-tracking scalars. The stage ring buffers are
/// transient and not part of a snapshot.
///
/// A snapshot lets an owner park the detector across a bad-data interval and
/// resume without relearning, or seed a fresh instance with a previous
/// calibration. Contents are not validated on load; only feed back snapshots
/// captured from a detector with the same configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Last recorded RR intervals, oldest first, zero = empty slot.
    pub rr1: [u32; HISTORY],
    /// RR intervals classified normal, oldest first, zero = empty slot.
    pub rr2: [u32; HISTORY],
    pub rravg1: u32,
    pub rravg2: u32,
    pub rrlow: u32,
    pub rrhigh: u32,
    pub rrmiss: u32,
    pub peak_i: f32,
    pub peak_f: f32,
    pub threshold_i1: f32,
    pub threshold_i2: f32,
    pub threshold_f1: f32,
    pub threshold_f2: f32,
    pub spk_i: f32,
    pub spk_f: f32,
    pub npk_i: f32,
    pub npk_f: f32,
    /// Stream position of the last confirmed beat (1-based sample count).
    pub last_qrs: u32,
    /// Squared-slope reference from the last confirmed beat.
    pub last_slope: f32,
    pub regular: bool,
    pub prev_regular: bool,
    /// Samples processed so far; restored so relative timing gates line up.
    pub total_samples: u32,
}
