//! Conversions between wall-clock durations and sample counts.
//!
//! The detector's timing gates (refractory period, T-wave window, integration
//! window) are specified in milliseconds but applied in samples. Keeping the
//! sampling frequency as its own type makes those conversions explicit and
//! keeps sample-count arithmetic out of the amplitude domain.

/// A sampling frequency in samples per second.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplingFrequency(f32);

/// Extension functions for numeric types used to create [`SamplingFrequency`]
/// values.
///
/// # Usage
/// ```rust
/// use pan_tompkins::sampling::*;
///
/// // Both values represent 250 samples per second
/// let fs = 250.sps();
/// let fs2 = 0.25.ksps();
///
/// assert_eq!(fs, fs2);
/// ```
pub trait SamplingFrequencyExt {
    fn sps(self) -> SamplingFrequency;
    fn ksps(self) -> SamplingFrequency;
}

impl SamplingFrequencyExt for f32 {
    fn sps(self) -> SamplingFrequency {
        SamplingFrequency(self)
    }

    fn ksps(self) -> SamplingFrequency {
        (self * 1000.0).sps()
    }
}

impl SamplingFrequencyExt for usize {
    fn sps(self) -> SamplingFrequency {
        SamplingFrequency(self as f32)
    }

    fn ksps(self) -> SamplingFrequency {
        (self * 1000).sps()
    }
}

impl SamplingFrequency {
    /// The sampling frequency in samples per second.
    pub fn raw(self) -> f32 {
        self.0
    }

    /// Converts `ms` milliseconds to a number of samples.
    /// ```rust
    /// # use pan_tompkins::sampling::*;
    /// #
    /// // the 200ms hard refractory period at 250 sps
    /// assert_eq!(250.sps().ms_to_samples(200.0), 50);
    /// ```
    pub fn ms_to_samples(self, ms: f32) -> usize {
        ((ms * self.0) as usize) / 1000
    }

    /// Converts `s` seconds to a number of samples.
    /// ```rust
    /// # use pan_tompkins::sampling::*;
    /// #
    /// assert_eq!(250.sps().s_to_samples(1.0), 250);
    /// ```
    pub fn s_to_samples(self, s: f32) -> usize {
        self.ms_to_samples(s * 1000.0)
    }

    /// Converts a sample count to seconds.
    /// ```rust
    /// # use pan_tompkins::sampling::*;
    /// #
    /// assert_eq!(250.sps().samples_to_s(125), 0.5);
    /// ```
    pub fn samples_to_s(self, samples: usize) -> f32 {
        (samples as f32) / self.0
    }

    /// Converts a sample count to milliseconds.
    /// ```rust
    /// # use pan_tompkins::sampling::*;
    /// #
    /// assert_eq!(250.sps().samples_to_ms(125), 500.0);
    /// ```
    pub fn samples_to_ms(self, samples: usize) -> f32 {
        self.samples_to_s(samples) * 1000.0
    }
}
