//! Per-window loudness sampling.
//!
//! The sampler walks a [`Signal`] in consecutive, non-overlapping windows and reports the
//! loudness of each one. It is lazy and borrows the signal, so walking it again is just a
//! matter of cloning the iterator (or calling [`sample`] again).

use crate::signal::Signal;

/// Window size used by the analysis (milliseconds).
pub const ANALYSIS_STEP_MS: u64 = 1000;

/// Loudness of one analysis window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessSample {
    /// Window index; the window starts at `index * step_ms`.
    pub index: usize,

    /// Window loudness in dBFS. `f64::NEG_INFINITY` for digital silence.
    pub loudness: f64,
}

impl From<(usize, f64)> for LoudnessSample {
    fn from((index, loudness): (usize, f64)) -> Self {
        Self { index, loudness }
    }
}

/// Lazily sample `signal` in windows of `step_ms`.
///
/// Windows cover `0..signal.len_ms()`; the final one may be shorter than `step_ms`.
/// A `step_ms` of zero yields nothing.
pub fn sample(signal: &Signal, step_ms: u64) -> LoudnessSamples<'_> {
    LoudnessSamples {
        signal,
        step_ms,
        len_ms: signal.len_ms(),
        next: 0,
    }
}

/// Iterator returned by [`sample`].
#[derive(Debug, Clone)]
pub struct LoudnessSamples<'a> {
    signal: &'a Signal,
    step_ms: u64,
    len_ms: u64,
    next: usize,
}

impl LoudnessSamples<'_> {
    fn window_count(&self) -> usize {
        if self.step_ms == 0 {
            return 0;
        }
        self.len_ms.div_ceil(self.step_ms) as usize
    }
}

impl Iterator for LoudnessSamples<'_> {
    type Item = LoudnessSample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.window_count() {
            return None;
        }

        let index = self.next;
        self.next += 1;

        let start = index as u64 * self.step_ms;
        let end = (start + self.step_ms).min(self.len_ms);
        let loudness = crate::signal::dbfs(self.signal.window(start, end));

        Some(LoudnessSample { index, loudness })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.window_count().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for LoudnessSamples<'_> {}
