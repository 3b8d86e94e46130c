//! This crate provides a realtime single-lead ECG R-peak detector.
//!
//! The implementation follows the Pan-Tompkins algorithm: a cascade of causal
//! digital filters (baseline removal, DC block, low pass, high pass,
//! derivative, squaring, moving-window integration) feeds an adaptive
//! dual-threshold classifier with an RR-interval regularity tracker and a
//! bounded retrospective back-search for overdue beats.
//!
//! The detector processes one sample per [`step`](PanTompkins::step) call and
//! keeps all adaptive state per instance, so multiple channels run
//! independently. Memory is fixed at construction; nothing allocates on the
//! hot path.
//!
//! ```rust
//! use pan_tompkins::sampling::*;
//! use pan_tompkins::{Config, PanTompkins};
//!
//! // Assuming 250 samples per second; buffer type parameters are the
//! // configured ring capacity and detrend window length.
//! let config = Config::new(250.sps());
//! let mut detector = PanTompkins::new::<416, 5>(config).unwrap();
//!
//! let beat_here = detector.step(0.0);
//! assert!(!beat_here);
//! ```

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

mod filter;
mod ring;
mod rr;
pub mod sampling;
mod snapshot;
mod thresholds;

pub use snapshot::Snapshot;

use filter::FilterChain;
use ring::Ring;
use rr::RrTracker;
use sampling::SamplingFrequency;
use thresholds::ThresholdEngine;

/// Default end-of-stream sentinel: a value no physical sample can take.
pub const NO_SAMPLE: f32 = -32_000.0;

/// Construction-time parameters of the detector.
///
/// [`Config::new`] derives everything from the sampling frequency; individual
/// fields can be overridden before constructing the detector. The
/// configuration is validated at construction time.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Sampling frequency of the processed signal.
    pub fs: SamplingFrequency,
    /// Moving-window integration length in samples, ~150ms.
    pub integration_window: usize,
    /// Baseline-removal window length in samples.
    pub detrend_window: usize,
    /// Capacity of the per-stage history rings. Must exceed 1.66 times the
    /// longest expected RR interval so a full back-search stays in-buffer.
    pub capacity: usize,
    /// Longest expected RR interval in samples.
    pub max_rr: usize,
    /// Reserved input value signalling end-of-stream.
    pub end_of_stream: f32,
    /// Aggregate causal delay of the filter cascade, in samples. Reported
    /// beat indices in the batch wrapper are shifted back by this amount.
    pub delay: usize,
}

impl Config {
    /// A configuration for signals sampled at `fs`, with the integration
    /// window at 150ms, a five-sample detrend window, one second as the
    /// longest expected RR interval, and the smallest ring capacity the
    /// back-search invariant permits.
    pub fn new(fs: SamplingFrequency) -> Self {
        let integration_window = fs.ms_to_samples(150.0);
        let max_rr = fs.s_to_samples(1.0);
        Self {
            fs,
            integration_window,
            detrend_window: 5,
            capacity: required_capacity(max_rr, integration_window),
            max_rr,
            end_of_stream: NO_SAMPLE,
            delay: 14,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.detrend_window == 0 {
            return Err(ConfigError::InvalidDetrend);
        }
        if self.integration_window == 0 || self.integration_window > self.capacity {
            return Err(ConfigError::InvalidWindow {
                window: self.integration_window,
                capacity: self.capacity,
            });
        }
        let required = required_capacity(self.max_rr, self.integration_window);
        if self.capacity < required {
            return Err(ConfigError::BufferTooSmall {
                required,
                actual: self.capacity,
            });
        }
        Ok(())
    }
}

/// Smallest ring capacity that keeps a full back-search window in-buffer:
/// strictly more than 1.66 times the longest expected RR interval, and never
/// less than the filter history and slope window need.
fn required_capacity(max_rr: usize, integration_window: usize) -> usize {
    let back_search = max_rr * 166 / 100 + 1;
    back_search.max(integration_window + 11).max(33)
}

/// Configuration rejected at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The ring capacity cannot hold a full back-search window.
    BufferTooSmall { required: usize, actual: usize },
    /// The stage buffer length does not match the configured capacity.
    BufferMismatch { expected: usize, actual: usize },
    /// The detrend buffer length does not match the configured window.
    DetrendMismatch { expected: usize, actual: usize },
    /// The integration window is empty or longer than the ring capacity.
    InvalidWindow { window: usize, capacity: usize },
    /// The detrend window is empty.
    InvalidDetrend,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            ConfigError::BufferTooSmall { required, actual } => write!(
                f,
                "ring capacity {actual} cannot hold a back-search window, need at least {required}"
            ),
            ConfigError::BufferMismatch { expected, actual } => write!(
                f,
                "stage buffers hold {actual} samples, the configuration needs {expected}"
            ),
            ConfigError::DetrendMismatch { expected, actual } => write!(
                f,
                "detrend buffer holds {actual} samples, the configuration needs {expected}"
            ),
            ConfigError::InvalidWindow { window, capacity } => write!(
                f,
                "integration window of {window} samples does not fit the ring capacity {capacity}"
            ),
            ConfigError::InvalidDetrend => write!(f, "detrend window must not be empty"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// The primary and secondary detection thresholds for both signal paths.
///
/// `i` values gate the moving-window integrator output, `f` values the
/// bandpass-filtered signal. Secondary thresholds are half the primary ones
/// and are only consulted by the back-search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub i1: f32,
    pub i2: f32,
    pub f1: f32,
    pub f2: f32,
}

/// Finds R peaks in a realtime sampled ECG signal.
///
/// # Type parameters:
///
/// - `S` - a buffer type backing each filter-stage history ring
/// - `W` - a buffer type holding the detrend window
/// - `D` - a buffer type backing the per-position decision ring
///
/// Buffer lengths are checked against the [`Config`] at construction and, if
/// incorrect, the error carries the correct sizes.
pub struct PanTompkins<S, W, D> {
    config: Config,
    /// 200ms in samples; no second beat can occur inside this gate.
    refractory: u32,
    /// 360ms in samples; inside this gate a candidate must pass the slope test.
    soft_limit: u32,
    total_samples: u32,
    last_qrs: u32,
    last_slope: f32,
    chain: FilterChain<S, W>,
    decision: Ring<bool, D>,
    thresholds: ThresholdEngine,
    rr: RrTracker,
}

impl PanTompkins<(), (), ()> {
    /// Creates a detector with stack-allocated buffers.
    ///
    /// `N` must equal `config.capacity` and `DETREND` must equal
    /// `config.detrend_window`; mismatches are rejected with the correct
    /// sizes in the error.
    ///
    /// # Example
    /// ```rust
    /// use pan_tompkins::sampling::*;
    /// use pan_tompkins::{Config, PanTompkins};
    ///
    /// // 250 samples per second: default capacity 416, detrend window 5
    /// let detector = PanTompkins::new::<416, 5>(Config::new(250.sps())).unwrap();
    /// ```
    pub fn new<const N: usize, const DETREND: usize>(
        config: Config,
    ) -> Result<PanTompkins<[f32; N], [f32; DETREND], [bool; N]>, ConfigError> {
        config.validate()?;
        if N != config.capacity {
            return Err(ConfigError::BufferMismatch {
                expected: config.capacity,
                actual: N,
            });
        }
        if DETREND != config.detrend_window {
            return Err(ConfigError::DetrendMismatch {
                expected: config.detrend_window,
                actual: DETREND,
            });
        }
        let chain = FilterChain::new(config.integration_window, Ring::default(), Ring::default);
        Ok(PanTompkins::build(config, chain, Ring::default()))
    }

    /// Creates a detector with heap-allocated buffers sized directly from the
    /// configuration.
    #[cfg(feature = "alloc")]
    pub fn new_alloc(
        config: Config,
    ) -> Result<
        PanTompkins<alloc::boxed::Box<[f32]>, alloc::boxed::Box<[f32]>, alloc::boxed::Box<[bool]>>,
        ConfigError,
    > {
        use alloc::vec;
        config.validate()?;
        let chain = FilterChain::new(
            config.integration_window,
            Ring::new(vec![0.0; config.detrend_window].into_boxed_slice()),
            || Ring::new(vec![0.0; config.capacity].into_boxed_slice()),
        );
        let decision = Ring::new(vec![false; config.capacity].into_boxed_slice());
        Ok(PanTompkins::build(config, chain, decision))
    }
}

impl<S, W, D> PanTompkins<S, W, D>
where
    S: AsRef<[f32]> + AsMut<[f32]>,
    W: AsRef<[f32]> + AsMut<[f32]>,
    D: AsRef<[bool]> + AsMut<[bool]>,
{
    fn build(config: Config, chain: FilterChain<S, W>, decision: Ring<bool, D>) -> Self {
        Self {
            refractory: config.fs.ms_to_samples(200.0) as u32,
            soft_limit: config.fs.ms_to_samples(360.0) as u32,
            config,
            total_samples: 0,
            last_qrs: 0,
            last_slope: 0.0,
            chain,
            decision,
            thresholds: ThresholdEngine::new(),
            rr: RrTracker::new(),
        }
    }

    /// Resets all adaptive state and history, keeping the configuration.
    pub fn clear(&mut self) {
        self.chain.clear();
        self.decision.clear();
        self.thresholds = ThresholdEngine::new();
        self.rr.clear();
        self.total_samples = 0;
        self.last_qrs = 0;
        self.last_slope = 0.0;
    }

    /// Processes one sample. Returns `true` when a beat was confirmed during
    /// this call, either at the current position or retroactively through
    /// the back-search; [`last_beat`](Self::last_beat) reports where.
    ///
    /// Receiving the end-of-stream sentinel mutates nothing and returns
    /// `false`.
    pub fn step(&mut self, sample: f32) -> bool {
        if sample == self.config.end_of_stream {
            return false;
        }
        self.total_samples += 1;
        let out = self.chain.process(sample);
        self.decision.push(false);

        // Anything over either primary threshold is a peak candidate; its
        // value feeds the noise estimates even when it is rejected below.
        if self.thresholds.above_either(out.integral, out.bandpass) {
            self.thresholds.note_peak(out.integral, out.bandpass);
        }

        let mut confirmed: Option<usize> = None;
        if self.thresholds.above_both(out.integral, out.bandpass) {
            if self.total_samples > self.last_qrs + self.refractory {
                let slope = self.chain.slope_at(0);
                if self.slope_accepts(self.total_samples, slope) {
                    self.thresholds.accept_signal();
                    self.last_slope = slope;
                    confirmed = Some(0);
                }
            } else {
                // a peak this close to the last beat is a T wave at best
                self.thresholds.reject_noise(out.integral, out.bandpass);
            }
        }

        if confirmed.is_none() {
            confirmed = self.back_search();
        }

        match confirmed {
            Some(back) => {
                self.record_beat(back);
                true
            }
            None => {
                if self.thresholds.above_either(out.integral, out.bandpass) {
                    self.thresholds.reject_noise(out.integral, out.bandpass);
                }
                false
            }
        }
    }

    /// Drives [`step`](Self::step) over a pre-recorded signal, collecting
    /// detected beat indices (shifted back by the configured output delay)
    /// into `beats`. Returns the total number of beats detected; when the
    /// output buffer overflows, later indices are dropped, or overwrite the
    /// oldest entries when `wrap_on_overflow` is set. Processing stops at the
    /// end-of-stream sentinel.
    pub fn process_signal(
        &mut self,
        samples: &[f32],
        beats: &mut [u32],
        wrap_on_overflow: bool,
    ) -> usize {
        let mut count = 0;
        for &sample in samples {
            if sample == self.config.end_of_stream {
                break;
            }
            if self.step(sample) {
                if let Some(beat) = self.last_beat() {
                    let index = beat.saturating_sub(self.config.delay as u32);
                    if count < beats.len() {
                        beats[count] = index;
                    } else if wrap_on_overflow && !beats.is_empty() {
                        beats[count % beats.len()] = index;
                    }
                    count += 1;
                }
            }
        }
        count
    }

    /// The current detection thresholds.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            i1: self.thresholds.threshold_i1,
            i2: self.thresholds.threshold_i2,
            f1: self.thresholds.threshold_f1,
            f2: self.thresholds.threshold_f2,
        }
    }

    /// Zero-based sample index of the most recently confirmed beat.
    pub fn last_beat(&self) -> Option<u32> {
        (self.last_qrs > 0).then(|| self.last_qrs - 1)
    }

    /// The beat decision recorded for the position `back` samples before the
    /// current one, while it remains in history.
    ///
    /// Because the back-search can flag a position retroactively, a decision
    /// is only final once the position is at least the configured output
    /// delay behind the stream head.
    pub fn decision_at(&self, back: usize) -> Option<bool> {
        self.decision.get_back(back)
    }

    /// Average of the recent RR intervals, in samples. Zero until two beats
    /// have been confirmed.
    pub fn rr_average(&self) -> u32 {
        self.rr.rravg1
    }

    /// True while the two RR averages agree, i.e. the rhythm is steady.
    pub fn is_regular(&self) -> bool {
        self.rr.regular
    }

    /// Heart rate estimate in beats per minute, once RR intervals exist.
    pub fn heart_rate(&self) -> Option<f32> {
        if self.rr.rravg1 == 0 {
            None
        } else {
            Some(60.0 / self.config.fs.samples_to_s(self.rr.rravg1 as usize))
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Copies out all adaptive state. See [`Snapshot`].
    pub fn export(&self) -> Snapshot {
        let (rr1, rr2) = self.rr.history();
        Snapshot {
            rr1,
            rr2,
            rravg1: self.rr.rravg1,
            rravg2: self.rr.rravg2,
            rrlow: self.rr.rrlow,
            rrhigh: self.rr.rrhigh,
            rrmiss: self.rr.rrmiss,
            peak_i: self.thresholds.peak_i,
            peak_f: self.thresholds.peak_f,
            threshold_i1: self.thresholds.threshold_i1,
            threshold_i2: self.thresholds.threshold_i2,
            threshold_f1: self.thresholds.threshold_f1,
            threshold_f2: self.thresholds.threshold_f2,
            spk_i: self.thresholds.spk_i,
            spk_f: self.thresholds.spk_f,
            npk_i: self.thresholds.npk_i,
            npk_f: self.thresholds.npk_f,
            last_qrs: self.last_qrs,
            last_slope: self.last_slope,
            regular: self.rr.regular,
            prev_regular: self.rr.prev_regular,
            total_samples: self.total_samples,
        }
    }

    /// Restores adaptive state captured by [`export`](Self::export). The
    /// stage rings are not part of the snapshot and keep their contents;
    /// the snapshot contents are not validated.
    pub fn load(&mut self, snapshot: &Snapshot) {
        self.rr.restore_history(&snapshot.rr1, &snapshot.rr2);
        self.rr.rravg1 = snapshot.rravg1;
        self.rr.rravg2 = snapshot.rravg2;
        self.rr.rrlow = snapshot.rrlow;
        self.rr.rrhigh = snapshot.rrhigh;
        self.rr.rrmiss = snapshot.rrmiss;
        self.rr.regular = snapshot.regular;
        self.rr.prev_regular = snapshot.prev_regular;
        self.thresholds.peak_i = snapshot.peak_i;
        self.thresholds.peak_f = snapshot.peak_f;
        self.thresholds.threshold_i1 = snapshot.threshold_i1;
        self.thresholds.threshold_i2 = snapshot.threshold_i2;
        self.thresholds.threshold_f1 = snapshot.threshold_f1;
        self.thresholds.threshold_f2 = snapshot.threshold_f2;
        self.thresholds.spk_i = snapshot.spk_i;
        self.thresholds.spk_f = snapshot.spk_f;
        self.thresholds.npk_i = snapshot.npk_i;
        self.thresholds.npk_f = snapshot.npk_f;
        self.last_qrs = snapshot.last_qrs;
        self.last_slope = snapshot.last_slope;
        self.total_samples = snapshot.total_samples;
    }

    /// The T-wave discrimination test. Within 360ms of the last beat a
    /// candidate must show a squared slope comparable to the last R peak's;
    /// beyond it the thresholds alone decide, except that a flat segment
    /// (which ties zero-valued thresholds) never counts as a beat.
    fn slope_accepts(&self, position: u32, slope: f32) -> bool {
        if position <= self.last_qrs + self.soft_limit {
            slope > self.last_slope / 2.0
        } else {
            slope > 0.0
        }
    }

    /// Rescans buffered history with the relaxed secondary thresholds once a
    /// beat is overdue. Returns the look-back offset of the recovered beat.
    fn back_search(&mut self) -> Option<usize> {
        let elapsed = self.total_samples - self.last_qrs;
        if !self.rr.overdue(elapsed) || elapsed <= self.refractory {
            return None;
        }
        // candidates start one refractory period after the last beat; the
        // scan never leaves retained history
        let span = (elapsed - self.refractory) as usize;
        let start = span.min(self.chain.history_len().saturating_sub(1));
        for back in (1..=start).rev() {
            let (Some(integral), Some(bandpass)) =
                (self.chain.integral_at(back), self.chain.bandpass_at(back))
            else {
                continue;
            };
            if !self.thresholds.above_secondary(integral, bandpass) {
                continue;
            }
            let slope = self.chain.slope_at(back);
            let position = self.total_samples - back as u32;
            if !self.slope_accepts(position, slope) {
                continue;
            }
            self.thresholds.note_peak(integral, bandpass);
            self.thresholds.accept_recovered();
            self.last_slope = slope;
            return Some(back);
        }
        None
    }

    /// Books a confirmed beat `back` samples before the current position:
    /// records the RR interval, relaxes the thresholds on a rhythm break,
    /// and flags the position in the decision ring.
    fn record_beat(&mut self, back: usize) {
        let beat = self.total_samples - back as u32;
        // the first beat starts the clock but has no interval to record
        if self.last_qrs != 0 {
            let interval = beat - self.last_qrs;
            if self.rr.record(interval) {
                self.thresholds.relax();
            }
        }
        self.last_qrs = beat;
        self.decision.set_back(back, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::SamplingFrequencyExt;

    fn detector() -> PanTompkins<[f32; 416], [f32; 5], [bool; 416]> {
        PanTompkins::new::<416, 5>(Config::new(250.sps())).unwrap()
    }

    #[test]
    fn undersized_capacity_is_rejected() {
        let mut config = Config::new(250.sps());
        config.capacity = 100;
        assert_eq!(
            PanTompkins::new::<100, 5>(config).err(),
            Some(ConfigError::BufferTooSmall {
                required: 416,
                actual: 100
            })
        );
    }

    #[test]
    fn buffer_length_mismatches_are_rejected() {
        let config = Config::new(250.sps());
        assert_eq!(
            PanTompkins::new::<417, 5>(config).err(),
            Some(ConfigError::BufferMismatch {
                expected: 416,
                actual: 417
            })
        );
        assert_eq!(
            PanTompkins::new::<416, 6>(config).err(),
            Some(ConfigError::DetrendMismatch {
                expected: 5,
                actual: 6
            })
        );
    }

    #[test]
    fn oversized_integration_window_is_rejected() {
        let mut config = Config::new(250.sps());
        config.integration_window = config.capacity + 1;
        assert!(matches!(
            PanTompkins::new::<416, 5>(config).err(),
            Some(ConfigError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn sentinel_mutates_nothing() {
        let mut d = detector();
        for i in 0..200 {
            d.step((i % 50) as f32);
        }
        let before = d.export();
        assert!(!d.step(NO_SAMPLE));
        assert_eq!(d.export(), before);
    }

    #[test]
    fn back_search_recovers_the_true_position() {
        let mut d = detector();
        // fabricate 300 quiet positions with one candidate the primary pass
        // missed: stage value 100 at push index 180, squared plateau around it
        for i in 0..300u32 {
            let spike = if i == 180 { 100.0 } else { 0.0 };
            let hump = if (178..=182).contains(&i) { 70.0 } else { 0.0 };
            d.chain.signal.push(0.0);
            d.chain.dcblock.push(0.0);
            d.chain.lowpass.push(0.0);
            d.chain.highpass.push(spike);
            d.chain.derivative.push(0.0);
            d.chain.squared.push(hump);
            d.chain.integral.push(spike);
            d.decision.push(false);
        }
        d.total_samples = 300;
        d.last_qrs = 100;
        d.last_slope = 60.0;
        d.thresholds.spk_i = 200.0;
        d.thresholds.spk_f = 200.0;
        d.thresholds.threshold_i1 = 150.0;
        d.thresholds.threshold_f1 = 150.0;
        d.thresholds.threshold_i2 = 75.0;
        d.thresholds.threshold_f2 = 75.0;
        d.rr.rrmiss = 150;

        // the quiet current sample triggers the overdue rescan
        assert!(d.step(0.0));

        // recovered at its true position, not at the scan's end
        assert_eq!(d.last_beat(), Some(180));
        assert_eq!(d.decision_at(120), Some(true));
        assert_eq!(d.decision_at(0), Some(false));
        // faster blend for recovered beats: 0.25*100 + 0.75*200
        assert!((d.thresholds.spk_i - 175.0).abs() < 1e-3);
        let t = d.thresholds();
        assert_eq!(t.i2, 0.5 * t.i1);
        assert_eq!(t.f2, 0.5 * t.f1);
        // the recovered interval entered the RR history
        assert_eq!(d.rr_average(), 81);
    }

    #[test]
    fn back_search_needs_an_overdue_beat() {
        let mut d = detector();
        for _ in 0..300 {
            d.chain.signal.push(0.0);
            d.chain.dcblock.push(0.0);
            d.chain.lowpass.push(0.0);
            d.chain.highpass.push(100.0);
            d.chain.derivative.push(0.0);
            d.chain.squared.push(100.0);
            d.chain.integral.push(100.0);
            d.decision.push(false);
        }
        d.total_samples = 300;
        d.last_qrs = 280;
        d.rr.rrmiss = 400;

        // not overdue yet, and still inside the refractory gate
        assert!(d.back_search().is_none());
    }
}
