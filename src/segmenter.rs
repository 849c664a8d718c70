//! Edge-detecting chunk segmenter.
//!
//! The segmenter makes a single forward pass over per-window loudness readings and turns
//! loudness transitions into chunk boundaries:
//!
//! ```text
//!   reading < silence_threshold       →  clamp to SILENCE_FLOOR_DB
//!   | |curr| - |prev| | > loudness_peak
//!       prev < curr                   →  rising edge:  chunk_start = i * step
//!       otherwise                     →  falling edge: chunk_end   = i * step
//!   chunk_end > chunk_start
//!   && chunk_end - chunk_start > min  →  emit Chunk
//! ```
//!
//! Boundaries are not reset after a chunk is emitted. A later falling edge that is not
//! preceded by a new rising edge pairs with the previous `chunk_start` and can emit again.

use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::sampler::{ANALYSIS_STEP_MS, LoudnessSample};

/// Loudness assigned to windows below the silence threshold, and the initial scan state.
pub const SILENCE_FLOOR_DB: f64 = -100.0;

/// Thresholds that control segmentation.
///
/// None of these are validated. Odd values (negative lengths, a positive threshold) degrade
/// to "every edge pair is a chunk" or "nothing is a chunk", never to a panic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmenterOpts {
    /// Readings strictly below this (dBFS) count as silence.
    pub silence_threshold: f64,

    /// A chunk must span strictly more than this many milliseconds.
    pub chunk_min_length_ms: f64,

    /// Minimum change between consecutive readings, compared on absolute values, that counts
    /// as an edge.
    pub loudness_peak: f64,

    /// Padding added to both ends of every chunk, clamped to the signal.
    pub fade_in_out_ms: u64,

    /// Window size the readings were taken at.
    pub analysis_step_ms: u64,
}

/// Defaults tuned for live recordings with a noisy floor and minute-plus tracks.
pub const DEFAULT_SEGMENTER_OPTS: SegmenterOpts = SegmenterOpts {
    silence_threshold: -40.0,
    chunk_min_length_ms: 60_000.0,
    loudness_peak: 20.0,
    fade_in_out_ms: 2000,
    analysis_step_ms: ANALYSIS_STEP_MS,
};

impl Default for SegmenterOpts {
    fn default() -> Self {
        DEFAULT_SEGMENTER_OPTS
    }
}

/// Scan state for one analysis run.
///
/// Each run owns its own `Segmenter`; nothing is shared between runs.
#[derive(Debug, Clone)]
pub struct Segmenter {
    opts: SegmenterOpts,
    signal_len_ms: u64,
    prev_loudness: f64,
    curr_loudness: f64,
    chunk_start_ms: u64,
    chunk_end_ms: u64,
    emitted: usize,
}

impl Segmenter {
    /// Start a fresh scan over a signal of `signal_len_ms`.
    pub fn new(opts: SegmenterOpts, signal_len_ms: u64) -> Self {
        Self {
            opts,
            signal_len_ms,
            prev_loudness: SILENCE_FLOOR_DB,
            curr_loudness: SILENCE_FLOOR_DB,
            chunk_start_ms: 0,
            chunk_end_ms: 0,
            emitted: 0,
        }
    }

    pub fn opts(&self) -> &SegmenterOpts {
        &self.opts
    }

    /// Number of chunks emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Feed the next reading. Returns a chunk when this reading closes one.
    ///
    /// Readings must arrive in increasing index order.
    pub fn push(&mut self, sample: LoudnessSample) -> Option<Chunk> {
        self.prev_loudness = self.curr_loudness;
        self.curr_loudness = self.clamp(sample.loudness);

        let prev = self.prev_loudness;
        let curr = self.curr_loudness;
        if !is_edge(prev, curr, self.opts.loudness_peak) {
            return None;
        }

        let offset_ms = (sample.index as u64).saturating_mul(self.opts.analysis_step_ms);
        if prev < curr {
            tracing::debug!(index = sample.index, prev, curr, "rising edge");
            self.chunk_start_ms = offset_ms;
        } else {
            tracing::debug!(index = sample.index, prev, curr, "falling edge");
            self.chunk_end_ms = offset_ms;
        }

        if !self.candidate_is_long_enough() {
            return None;
        }

        self.emitted += 1;
        let chunk = Chunk::new(
            self.emitted,
            self.chunk_start_ms,
            self.chunk_end_ms,
            self.opts.fade_in_out_ms,
            self.signal_len_ms,
        );
        tracing::info!(
            sequence = chunk.sequence,
            start_ms = chunk.start_ms,
            end_ms = chunk.end_ms,
            "chunk found"
        );
        Some(chunk)
    }

    fn clamp(&self, loudness: f64) -> f64 {
        if loudness < self.opts.silence_threshold {
            SILENCE_FLOOR_DB
        } else {
            loudness
        }
    }

    fn candidate_is_long_enough(&self) -> bool {
        self.chunk_end_ms > self.chunk_start_ms
            && (self.chunk_end_ms - self.chunk_start_ms) as f64 > self.opts.chunk_min_length_ms
    }
}

/// Whether two clamped readings form an edge.
///
/// NaN never forms an edge since every comparison against it is false.
fn is_edge(prev: f64, curr: f64, loudness_peak: f64) -> bool {
    let delta = (curr.abs() - prev.abs()).abs();
    delta > loudness_peak
}

/// Run a full scan and collect every chunk in emission order.
pub fn build_chunks<I>(samples: I, signal_len_ms: u64, opts: &SegmenterOpts) -> Vec<Chunk>
where
    I: IntoIterator,
    I::Item: Into<LoudnessSample>,
{
    let mut segmenter = Segmenter::new(*opts, signal_len_ms);
    samples
        .into_iter()
        .filter_map(|s| segmenter.push(s.into()))
        .collect()
}
