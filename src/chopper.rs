//! High-level API for chopping recordings.
//!
//! `Chopper` wires the pieces together:
//!
//! ```text
//! bytes ─ decoder ─▶ Signal ─ sampler ─▶ (index, dBFS) ─ segmenter ─▶ Vec<Chunk>
//!                                                                       │
//!                                           list (text / JSON / CUE) ◀──┤
//!                                                 export (WAV + log) ◀──┘
//! ```
//!
//! A `Chopper` holds only options. Every analysis builds its own segmenter state, so one
//! instance can be shared across threads and reused for any number of files.

use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::Result;
use crate::chunk::Chunk;
use crate::chunk_encoder::{ChunkEncoder, LabelEncoder};
use crate::cue_encoder::CueEncoder;
use crate::decoder::{StreamDecodeOpts, decode_signal_from_path, decode_signal_from_read};
use crate::export::{ExportOpts, ExportSummary, export_chunks};
use crate::json_array_encoder::JsonArrayEncoder;
use crate::opts::ChopOpts;
use crate::output_type::OutputType;
use crate::sampler::sample;
use crate::segmenter::build_chunks;
use crate::signal::Signal;

/// A decoded recording and the chunks found in it.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub signal: Signal,
    pub chunks: Vec<Chunk>,
}

impl Analysis {
    pub fn len_ms(&self) -> u64 {
        self.signal.len_ms()
    }

    /// Loudness of the whole recording in dBFS.
    pub fn average_dbfs(&self) -> f64 {
        self.signal.dbfs()
    }
}

/// The main high-level entry point.
#[derive(Debug, Clone, Default)]
pub struct Chopper {
    opts: ChopOpts,
}

impl Chopper {
    pub fn new(opts: ChopOpts) -> Self {
        Self { opts }
    }

    pub fn opts(&self) -> &ChopOpts {
        &self.opts
    }

    /// Decode and analyze the file at `path`.
    pub fn analyze_path(&self, path: impl AsRef<Path>) -> Result<Analysis> {
        let path = path.as_ref();
        let _span = tracing::info_span!("analyze", path = %path.display()).entered();
        let signal = decode_signal_from_path(path)?;
        Ok(self.analyze_signal(signal))
    }

    /// Decode and analyze an unseekable stream.
    pub fn analyze_read<R>(&self, r: R, decode_opts: &StreamDecodeOpts) -> Result<Analysis>
    where
        R: Read + Send + 'static,
    {
        let signal = decode_signal_from_read(r, decode_opts)?;
        Ok(self.analyze_signal(signal))
    }

    /// Analyze an already-decoded signal. Never fails.
    pub fn analyze_signal(&self, signal: Signal) -> Analysis {
        let seg = &self.opts.segmenter;
        tracing::info!(
            len_ms = signal.len_ms(),
            silence_threshold = seg.silence_threshold,
            chunk_min_length_ms = seg.chunk_min_length_ms,
            loudness_peak = seg.loudness_peak,
            "building chunks"
        );

        let chunks = build_chunks(
            sample(&signal, seg.analysis_step_ms),
            signal.len_ms(),
            seg,
        );
        Analysis { signal, chunks }
    }

    /// Write the chunk list of `analysis` to `w` in the configured output format.
    ///
    /// `source_file_name` is referenced by formats that point back at the recording (CUE).
    pub fn list<W: Write>(&self, analysis: &Analysis, w: W, source_file_name: &str) -> Result<()> {
        let writer = BufWriter::new(w);

        match self.opts.output_type {
            OutputType::Text => {
                let mut encoder = LabelEncoder::new(writer);
                let run_res = write_all(&mut encoder, &analysis.chunks);
                merge_run_and_close(run_res, encoder.close())
            }
            OutputType::Json => {
                let mut encoder = JsonArrayEncoder::new(writer);
                let run_res = write_all(&mut encoder, &analysis.chunks);
                merge_run_and_close(run_res, encoder.close())
            }
            OutputType::Cue => {
                let mut encoder = CueEncoder::new(writer, source_file_name);
                let run_res = write_all(&mut encoder, &analysis.chunks);
                merge_run_and_close(run_res, encoder.close())
            }
        }
    }

    /// Export the chunks of `analysis` to disk.
    pub fn export(&self, analysis: &Analysis, export_opts: &ExportOpts) -> Result<ExportSummary> {
        export_chunks(&analysis.signal, &analysis.chunks, export_opts)
    }
}

fn write_all(encoder: &mut impl ChunkEncoder, chunks: &[Chunk]) -> Result<()> {
    for chunk in chunks {
        encoder.write_chunk(chunk)?;
    }
    Ok(())
}

fn merge_run_and_close(run_res: Result<()>, close_res: Result<()>) -> Result<()> {
    match (run_res, close_res) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(close_err)) => Err(close_err),
        (Err(err), _) => Err(err),
    }
}
