//! Finalized chunks and their human-readable labels.

use serde::Serialize;

/// An audible segment that passed the minimum-length filter.
///
/// `start_ms`/`end_ms` are the detected boundaries. The padded range is what gets exported;
/// it is clamped to the signal and may overlap a neighbor's padded range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// 1-based position in emission order.
    pub sequence: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub padded_start_ms: u64,
    pub padded_end_ms: u64,
    pub label: String,
}

impl Chunk {
    /// Build a chunk, applying `fade_ms` on both sides and clamping to `[0, signal_len_ms]`.
    ///
    /// The padded end never falls below `end_ms`, even if the caller's boundaries run past
    /// `signal_len_ms`.
    pub fn new(sequence: usize, start_ms: u64, end_ms: u64, fade_ms: u64, signal_len_ms: u64) -> Self {
        let padded_start_ms = start_ms.saturating_sub(fade_ms);
        let padded_end_ms = end_ms
            .saturating_add(fade_ms)
            .min(signal_len_ms)
            .max(end_ms);

        Self {
            sequence,
            start_ms,
            end_ms,
            padded_start_ms,
            padded_end_ms,
            label: format_label(sequence, start_ms, end_ms),
        }
    }

    /// Detected duration, without padding.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Exported duration, padding included.
    pub fn padded_duration_ms(&self) -> u64 {
        self.padded_end_ms.saturating_sub(self.padded_start_ms)
    }

    /// File name for this chunk, e.g. `03_chunk.wav`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{:02}_chunk.{extension}", self.sequence)
    }
}

/// Split milliseconds into `(hours, minutes, seconds)`.
///
/// Hours wrap at 24, the same way a wall clock does.
pub fn convert_ms(ms: u64) -> (u64, u64, u64) {
    let ss = (ms / 1000) % 60;
    let mm = (ms / 60_000) % 60;
    let hh = (ms / 3_600_000) % 24;
    (hh, mm, ss)
}

/// `HH:MM:SS` for `ms`.
pub fn format_hms(ms: u64) -> String {
    let (hh, mm, ss) = convert_ms(ms);
    format!("{hh:02}:{mm:02}:{ss:02}")
}

/// `"NN_chunk: HH:MM:SS-HH:MM:SS (MM:SS)"`.
///
/// The duration only shows minutes and seconds; a chunk longer than an hour loses its hours
/// in the label.
pub fn format_label(sequence: usize, start_ms: u64, end_ms: u64) -> String {
    let (_, dur_mm, dur_ss) = convert_ms(end_ms.saturating_sub(start_ms));
    format!(
        "{sequence:02}_chunk: {}-{} ({dur_mm:02}:{dur_ss:02})",
        format_hms(start_ms),
        format_hms(end_ms),
    )
}
