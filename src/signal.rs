//! In-memory decoded audio.
//!
//! A [`Signal`] is what the decoder hands to the analysis core: interleaved `f32` PCM in
//! `[-1.0, 1.0]`, plus the channel count and sample rate needed to map milliseconds onto
//! frames. It is immutable once built and cheap to slice.

/// Decoded, interleaved PCM audio with a known duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl Signal {
    /// Build a signal from interleaved samples.
    ///
    /// `channels` and `sample_rate` are raised to at least 1 so duration math never divides
    /// by zero. A trailing partial frame is dropped.
    pub fn new(mut samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);

        Self {
            samples,
            channels,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.channels as usize) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in milliseconds, rounded to the nearest millisecond.
    pub fn len_ms(&self) -> u64 {
        let rate = u64::from(self.sample_rate);
        (self.frames() * 1000 + rate / 2) / rate
    }

    /// The frame index at `ms`, clamped to the end of the signal.
    pub fn frame_at_ms(&self, ms: u64) -> u64 {
        let frame = ms.saturating_mul(u64::from(self.sample_rate)) / 1000;
        frame.min(self.frames())
    }

    /// Interleaved samples covering `[start_ms, end_ms)`.
    ///
    /// Both bounds are clamped into the signal; an inverted range yields an empty slice.
    pub fn window(&self, start_ms: u64, end_ms: u64) -> &[f32] {
        let ch = self.channels as usize;
        let start = self.frame_at_ms(start_ms) as usize * ch;
        let end = self.frame_at_ms(end_ms) as usize * ch;
        if end <= start {
            return &[];
        }
        &self.samples[start..end]
    }

    /// Copy `[start_ms, end_ms)` into a new signal with the same layout.
    pub fn slice(&self, start_ms: u64, end_ms: u64) -> Signal {
        Signal {
            samples: self.window(start_ms, end_ms).to_vec(),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Loudness of the whole signal in dBFS.
    ///
    /// Returns `f64::NEG_INFINITY` for digital silence or an empty signal.
    pub fn dbfs(&self) -> f64 {
        dbfs(&self.samples)
    }
}

/// RMS loudness of `samples` in dBFS (0.0 = full scale).
///
/// Returns `f64::NEG_INFINITY` when the RMS is zero, which every finite silence threshold
/// treats as "below floor".
pub fn dbfs(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return f64::NEG_INFINITY;
    }

    let sum_sq: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    let rms = (sum_sq / samples.len() as f64).sqrt();
    if rms == 0.0 {
        return f64::NEG_INFINITY;
    }

    20.0 * rms.log10()
}
