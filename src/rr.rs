//! RR-interval history and rhythm regularity tracking.

use crate::ring::Ring;

/// Number of intervals kept in each history.
pub(crate) const HISTORY: usize = 8;

/// Tracks the last eight RR intervals, the subset of them considered normal,
/// and the adaptive bounds derived from the normal average.
///
/// Intervals are sample counts, kept in integer arithmetic throughout so the
/// `rravg1 == rravg2` regularity comparison and the `rrmiss` gate are exact.
#[derive(Debug)]
pub(crate) struct RrTracker {
    rr1: Ring<u32, [u32; HISTORY]>,
    rr2: Ring<u32, [u32; HISTORY]>,
    pub rravg1: u32,
    pub rravg2: u32,
    pub rrlow: u32,
    pub rrhigh: u32,
    pub rrmiss: u32,
    pub regular: bool,
    pub prev_regular: bool,
}

impl RrTracker {
    pub fn new() -> Self {
        Self {
            rr1: Ring::default(),
            rr2: Ring::default(),
            rravg1: 0,
            rravg2: 0,
            rrlow: 0,
            rrhigh: 0,
            rrmiss: 0,
            regular: true,
            prev_regular: false,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Records the interval between the two most recent confirmed beats.
    /// Returns `true` when a previously regular rhythm just turned irregular,
    /// in which case the caller relaxes the detection thresholds.
    pub fn record(&mut self, interval: u32) -> bool {
        self.rr1.push(interval);
        self.rravg1 = mean(&self.rr1);

        // Until the normal range has been learned every interval seeds it;
        // afterwards only intervals inside [rrlow, rrhigh] count as normal.
        let normal = self.rrhigh == 0 || (interval >= self.rrlow && interval <= self.rrhigh);
        if normal {
            self.rr2.push(interval);
            self.rravg2 = mean(&self.rr2);
            self.rrlow = (0.92 * self.rravg2 as f32) as u32;
            self.rrhigh = (1.16 * self.rravg2 as f32) as u32;
            self.rrmiss = (1.66 * self.rravg2 as f32) as u32;
        }

        self.prev_regular = self.regular;
        if self.rravg1 == self.rravg2 {
            self.regular = true;
            false
        } else {
            self.regular = false;
            self.prev_regular
        }
    }

    /// True once the elapsed time since the last beat exceeds the longest
    /// interval still considered plausible.
    pub fn overdue(&self, elapsed: u32) -> bool {
        elapsed > self.rrmiss
    }

    /// Interval histories flattened oldest-first into fixed arrays, unused
    /// slots zeroed. Intervals are never zero, so zero marks an empty slot.
    pub fn history(&self) -> ([u32; HISTORY], [u32; HISTORY]) {
        let mut rr1 = [0; HISTORY];
        let mut rr2 = [0; HISTORY];
        for (slot, v) in rr1.iter_mut().zip(self.rr1.iter()) {
            *slot = v;
        }
        for (slot, v) in rr2.iter_mut().zip(self.rr2.iter()) {
            *slot = v;
        }
        (rr1, rr2)
    }

    /// Rebuilds the interval histories from flattened arrays produced by
    /// [`history`](Self::history).
    pub fn restore_history(&mut self, rr1: &[u32; HISTORY], rr2: &[u32; HISTORY]) {
        self.rr1.clear();
        self.rr2.clear();
        for &v in rr1.iter().filter(|&&v| v != 0) {
            self.rr1.push(v);
        }
        for &v in rr2.iter().filter(|&&v| v != 0) {
            self.rr2.push(v);
        }
    }
}

fn mean(history: &Ring<u32, [u32; HISTORY]>) -> u32 {
    if history.is_empty() {
        0
    } else {
        history.iter().sum::<u32>() / history.len() as u32
    }
}
