//! Adaptive dual-threshold peak classification state.

/// Running peak estimates and the thresholds derived from them.
///
/// Two parallel sets of estimates are kept: `_i` values follow the
/// moving-window integrator output, `_f` values the bandpass-filtered signal.
/// For each path, `spk` tracks recent signal-peak magnitude and `npk` recent
/// noise-peak magnitude as exponentially weighted averages; the primary
/// threshold sits a quarter of the way up from the noise estimate towards the
/// signal estimate, and the secondary (back-search) threshold is always half
/// the primary.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct ThresholdEngine {
    pub peak_i: f32,
    pub peak_f: f32,
    pub spk_i: f32,
    pub spk_f: f32,
    pub npk_i: f32,
    pub npk_f: f32,
    pub threshold_i1: f32,
    pub threshold_i2: f32,
    pub threshold_f1: f32,
    pub threshold_f2: f32,
}

impl ThresholdEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if either path exceeds its primary threshold. Such a sample is a
    /// peak candidate: even when rejected, its value feeds the noise
    /// estimates.
    pub fn above_either(&self, integral: f32, bandpass: f32) -> bool {
        integral >= self.threshold_i1 || bandpass >= self.threshold_f1
    }

    /// True if both paths exceed their primary thresholds.
    pub fn above_both(&self, integral: f32, bandpass: f32) -> bool {
        integral >= self.threshold_i1 && bandpass >= self.threshold_f1
    }

    /// True if both paths exceed the relaxed secondary thresholds, strictly.
    /// Used by the back-search rescan.
    pub fn above_secondary(&self, integral: f32, bandpass: f32) -> bool {
        integral > self.threshold_i2 && bandpass > self.threshold_f2
    }

    /// Records the current stage outputs as the candidate peak values.
    pub fn note_peak(&mut self, integral: f32, bandpass: f32) {
        self.peak_i = integral;
        self.peak_f = bandpass;
    }

    /// Blends the candidate peaks into the signal estimates after a confirmed
    /// beat.
    pub fn accept_signal(&mut self) {
        self.spk_i = 0.125 * self.peak_i + 0.875 * self.spk_i;
        self.spk_f = 0.125 * self.peak_f + 0.875 * self.spk_f;
        self.rederive();
    }

    /// Like [`accept_signal`](Self::accept_signal), but with the faster blend
    /// used when a beat is recovered retrospectively.
    pub fn accept_recovered(&mut self) {
        self.spk_i = 0.25 * self.peak_i + 0.75 * self.spk_i;
        self.spk_f = 0.25 * self.peak_f + 0.75 * self.spk_f;
        self.rederive();
    }

    /// Blends the given stage outputs into the noise estimates. Applied to
    /// candidates rejected by the refractory gate and to candidates that
    /// never confirmed.
    pub fn reject_noise(&mut self, integral: f32, bandpass: f32) {
        self.peak_i = integral;
        self.npk_i = 0.125 * self.peak_i + 0.875 * self.npk_i;
        self.peak_f = bandpass;
        self.npk_f = 0.125 * self.peak_f + 0.875 * self.npk_f;
        self.rederive();
    }

    /// Halves the primary thresholds after a regular rhythm turns irregular,
    /// so a weaker beat under the rhythm shift can still be captured. The
    /// secondary thresholds are re-derived immediately to keep the 2:1 ratio.
    pub fn relax(&mut self) {
        self.threshold_i1 /= 2.0;
        self.threshold_f1 /= 2.0;
        self.threshold_i2 = 0.5 * self.threshold_i1;
        self.threshold_f2 = 0.5 * self.threshold_f1;
    }

    fn rederive(&mut self) {
        self.threshold_i1 = self.npk_i + 0.25 * (self.spk_i - self.npk_i);
        self.threshold_i2 = 0.5 * self.threshold_i1;
        self.threshold_f1 = self.npk_f + 0.25 * (self.spk_f - self.npk_f);
        self.threshold_f2 = 0.5 * self.threshold_f1;
    }
}
