//! The causal filter cascade feeding the peak classifier.
//!
//! Every stage output is retained in a full-capacity ring so the back-search
//! can re-examine any position still in history. All stages are strictly
//! causal: each output uses only values already computed.

use crate::ring::Ring;

/// Stage outputs for the sample just processed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FilterOutput {
    /// Bandpass-filtered amplitude (after the high-pass stage).
    pub bandpass: f32,
    /// Moving-window integral of the squared derivative.
    pub integral: f32,
}

pub(crate) struct FilterChain<S, W> {
    /// Moving-window integration length, ~150ms of samples.
    window: usize,
    /// Short FIFO of raw samples for baseline removal.
    detrend: Ring<f32, W>,
    pub signal: Ring<f32, S>,
    pub dcblock: Ring<f32, S>,
    pub lowpass: Ring<f32, S>,
    pub highpass: Ring<f32, S>,
    pub derivative: Ring<f32, S>,
    pub squared: Ring<f32, S>,
    pub integral: Ring<f32, S>,
}

impl<S, W> FilterChain<S, W>
where
    S: AsRef<[f32]> + AsMut<[f32]>,
    W: AsRef<[f32]> + AsMut<[f32]>,
{
    pub fn new(
        window: usize,
        detrend: Ring<f32, W>,
        mut stage: impl FnMut() -> Ring<f32, S>,
    ) -> Self {
        Self {
            window,
            detrend,
            signal: stage(),
            dcblock: stage(),
            lowpass: stage(),
            highpass: stage(),
            derivative: stage(),
            squared: stage(),
            integral: stage(),
        }
    }

    pub fn clear(&mut self) {
        self.detrend.clear();
        self.signal.clear();
        self.dcblock.clear();
        self.lowpass.clear();
        self.highpass.clear();
        self.derivative.clear();
        self.squared.clear();
        self.integral.clear();
    }

    /// Number of positions retained for look-back.
    pub fn history_len(&self) -> usize {
        self.integral.len()
    }

    /// Runs one raw sample through every stage. Each ring is pushed exactly
    /// once, so look-back index `k` addresses the same sample position in
    /// every stage.
    pub fn process(&mut self, raw: f32) -> FilterOutput {
        // Baseline removal: once a full window preceded this sample, subtract
        // the mean of the last few raw samples (including this one).
        let settled = self.detrend.is_full();
        self.detrend.push(raw);
        let x = if settled { raw - self.detrend_mean() } else { raw };
        self.signal.push(x);

        // DC block: y[n] = x[n] - x[n-1] + 0.995 y[n-1]
        let dc = match self.signal.get_back(1) {
            Some(prev_x) => x - prev_x + 0.995 * self.dcblock.last().unwrap_or(0.0),
            None => 0.0,
        };
        self.dcblock.push(dc);

        // Low pass (~15 Hz): y[n] = 2y[n-1] - y[n-2] + x[n] - 2x[n-6] + x[n-12]
        let lp = dc + 2.0 * self.lowpass.last().unwrap_or(0.0)
            - self.lowpass.get_back(1).unwrap_or(0.0)
            - 2.0 * self.dcblock.get_back(6).unwrap_or(0.0)
            + self.dcblock.get_back(12).unwrap_or(0.0);
        self.lowpass.push(lp);

        // High pass (~5 Hz): y[n] = -x[n] - y[n-1] + 32x[n-16] + x[n-32]
        let hp = -lp - self.highpass.last().unwrap_or(0.0)
            + 32.0 * self.lowpass.get_back(16).unwrap_or(0.0)
            + self.lowpass.get_back(32).unwrap_or(0.0);
        self.highpass.push(hp);

        // Two-point derivative, then squaring to emphasize steep slopes.
        let de = hp - self.highpass.get_back(1).unwrap_or(0.0);
        self.derivative.push(de);
        let sq = de * de;
        self.squared.push(sq);

        // Moving-window integral; the window shrinks at stream start.
        let k = self.window.min(self.squared.len());
        let mut sum = 0.0;
        for m in 0..k {
            sum += self.squared.get_back(m).unwrap_or(0.0);
        }
        let integ = sum / k as f32;
        self.integral.push(integ);

        FilterOutput {
            bandpass: hp,
            integral: integ,
        }
    }

    /// Maximum of the squared derivative over the eleven positions ending
    /// `back` samples ago. The squared output is "M"-shaped around a true
    /// R peak, so a lone sample could land in the dip between the humps.
    pub fn slope_at(&self, back: usize) -> f32 {
        let mut max = 0.0;
        for j in back..=back + 10 {
            if let Some(v) = self.squared.get_back(j) {
                if v > max {
                    max = v;
                }
            }
        }
        max
    }

    pub fn integral_at(&self, back: usize) -> Option<f32> {
        self.integral.get_back(back)
    }

    pub fn bandpass_at(&self, back: usize) -> Option<f32> {
        self.highpass.get_back(back)
    }

    fn detrend_mean(&self) -> f32 {
        self.detrend.iter().sum::<f32>() / self.detrend.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> FilterChain<[f32; 64], [f32; 5]> {
        FilterChain::new(10, Ring::default(), Ring::default)
    }

    #[test]
    fn zero_input_stays_zero() {
        let mut c = chain();
        for _ in 0..64 {
            let out = c.process(0.0);
            assert_eq!(out.bandpass, 0.0);
            assert_eq!(out.integral, 0.0);
        }
        assert_eq!(c.slope_at(0), 0.0);
    }

    #[test]
    fn constant_input_detrends_to_zero() {
        let mut c = chain();
        for _ in 0..64 {
            c.process(100.0);
        }
        // after the detrend window settles the chain sees a flat signal
        assert_eq!(c.signal.last(), Some(0.0));
    }

    #[test]
    fn stages_stay_aligned() {
        let mut c = chain();
        for i in 0..40 {
            c.process(i as f32);
        }
        assert_eq!(c.history_len(), 40);
        assert_eq!(c.signal.len(), c.integral.len());
        assert_eq!(c.highpass.len(), c.squared.len());
    }

    #[test]
    fn integration_window_shrinks_at_start() {
        let mut c = chain();
        let out = c.process(1.0);
        // single-sample window: integral equals the squared derivative
        assert_eq!(out.integral, c.squared.last().unwrap());
    }
}
