//! Writing chunks to disk.
//!
//! For a source named `gig` exported as `wav` under `chopped/`, the layout is:
//!
//! ```text
//! chopped/gig/wav/
//!   chop.log        source name, parameters, one label per exported chunk
//!   chunks.json     manifest: tags, bitrate, chunk boundaries
//!   01_chunk.wav
//!   02_chunk.wav
//! ```
//!
//! Clips are cut from the padded range of each chunk and keep the source's channel layout
//! and sample rate. Only WAV (16-bit PCM via `hound`) can be encoded.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use serde::Serialize;

use crate::chunk::Chunk;
use crate::segmenter::SegmenterOpts;
use crate::signal::Signal;
use crate::{Error, Result};

/// Name of the run log written next to the clips.
pub const LOG_FILE_NAME: &str = "chop.log";

/// Name of the JSON manifest written next to the clips.
pub const MANIFEST_FILE_NAME: &str = "chunks.json";

/// Formats this crate can encode.
pub const SUPPORTED_FORMATS: &[&str] = &["wav"];

const LOG_RULE: &str = "=======================================";

/// Where and how to export.
#[derive(Debug, Clone)]
pub struct ExportOpts {
    /// Base output directory; clips land in `<target_dir>/<source_name>/<format>/`.
    pub target_dir: PathBuf,

    /// Source file name without extension.
    pub source_name: String,

    /// Container to write. Only `"wav"` is supported.
    pub format: String,

    /// Requested bitrate. WAV is uncompressed, so this is recorded in the manifest only.
    pub bitrate: String,

    /// Free-form tags (artist, album, ...) recorded in the manifest.
    pub tags: BTreeMap<String, String>,

    /// 1-based chunk to export, or 0 for all of them.
    pub chunk_nr: usize,

    /// Parameter block written into the log header (see [`params_log`]).
    pub params_log: String,
}

/// What an export run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub log_path: PathBuf,
    pub manifest_path: PathBuf,
}

#[derive(Serialize)]
struct Manifest<'a> {
    source: &'a str,
    format: &'a str,
    bitrate: &'a str,
    sample_rate: u32,
    channels: u16,
    tags: &'a BTreeMap<String, String>,
    chunks: Vec<ManifestEntry<'a>>,
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    file: String,
    #[serde(flatten)]
    chunk: &'a Chunk,
}

/// The three tunable parameters as they appear in the log header.
pub fn params_log(opts: &SegmenterOpts) -> String {
    format!(
        "Silence Threshold: {}\nMinimal Chunk Length: {}\nLoudness Peak: {}",
        opts.silence_threshold, opts.chunk_min_length_ms, opts.loudness_peak
    )
}

/// Directory the chunks of `opts` are written into.
pub fn export_dir(opts: &ExportOpts) -> PathBuf {
    opts.target_dir.join(&opts.source_name).join(&opts.format)
}

/// Write the selected chunks of `signal`, plus the log and manifest.
///
/// Everything is validated before the first file is created.
pub fn export_chunks(signal: &Signal, chunks: &[Chunk], opts: &ExportOpts) -> Result<ExportSummary> {
    let format = opts.format.to_ascii_lowercase();
    if !SUPPORTED_FORMATS.contains(&format.as_str()) {
        return Err(Error::UnsupportedFormat(opts.format.clone()));
    }

    let selected = select_chunks(chunks, opts.chunk_nr)?;

    let dir = export_dir(opts);
    fs::create_dir_all(&dir)?;
    tracing::info!(dir = %dir.display(), chunks = selected.len(), "exporting");

    let log_path = dir.join(LOG_FILE_NAME);
    let mut log = BufWriter::new(File::create(&log_path)?);
    write_log_header(&mut log, &opts.source_name, &opts.params_log)?;

    let mut files = Vec::with_capacity(selected.len());
    let mut entries = Vec::with_capacity(selected.len());
    for chunk in selected {
        writeln!(log, "{}", chunk.label)?;

        let name = chunk.file_name(&format);
        let path = dir.join(&name);
        let clip = signal.slice(chunk.padded_start_ms, chunk.padded_end_ms);
        write_wav(&path, &clip)?;
        tracing::debug!(path = %path.display(), frames = clip.frames(), "wrote chunk");

        files.push(path);
        entries.push(ManifestEntry { file: name, chunk });
    }
    log.flush()?;

    let manifest = Manifest {
        source: &opts.source_name,
        format: &format,
        bitrate: &opts.bitrate,
        sample_rate: signal.sample_rate(),
        channels: signal.channels(),
        tags: &opts.tags,
        chunks: entries,
    };
    let manifest_path = dir.join(MANIFEST_FILE_NAME);
    let mut w = BufWriter::new(File::create(&manifest_path)?);
    serde_json::to_writer_pretty(&mut w, &manifest)?;
    w.flush()?;

    Ok(ExportSummary {
        dir,
        files,
        log_path,
        manifest_path,
    })
}

fn select_chunks(chunks: &[Chunk], chunk_nr: usize) -> Result<Vec<&Chunk>> {
    if chunk_nr == 0 {
        return Ok(chunks.iter().collect());
    }

    match chunks.get(chunk_nr - 1) {
        Some(chunk) => Ok(vec![chunk]),
        None => Err(Error::ChunkOutOfRange {
            requested: chunk_nr,
            available: chunks.len(),
        }),
    }
}

fn write_log_header(w: &mut impl Write, source_name: &str, params: &str) -> Result<()> {
    writeln!(w, "Chopping Source File {source_name}")?;
    writeln!(w, "{LOG_RULE}")?;
    writeln!(w, "{params}")?;
    writeln!(w, "{LOG_RULE}")?;
    Ok(())
}

/// Write `signal` as 16-bit PCM WAV.
pub fn write_wav(path: &Path, signal: &Signal) -> Result<()> {
    let spec = WavSpec {
        channels: signal.channels(),
        sample_rate: signal.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &s in signal.samples() {
        writer.write_sample(to_i16(s))?;
    }
    writer.finalize()?;
    Ok(())
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<Chunk> {
        vec![Chunk::new(1, 1000, 2000, 500, 4000), Chunk::new(2, 3000, 3500, 500, 4000)]
    }

    fn opts(dir: &Path, chunk_nr: usize) -> ExportOpts {
        ExportOpts {
            target_dir: dir.to_path_buf(),
            source_name: "gig".into(),
            format: "wav".into(),
            bitrate: "192k".into(),
            tags: BTreeMap::from([("artist".into(), "Band".into())]),
            chunk_nr,
            params_log: params_log(&SegmenterOpts::default()),
        }
    }

    #[test]
    fn params_log_lists_the_three_knobs() {
        assert_eq!(
            params_log(&SegmenterOpts::default()),
            "Silence Threshold: -40\nMinimal Chunk Length: 60000\nLoudness Peak: 20"
        );
    }

    #[test]
    fn select_all_or_one() -> anyhow::Result<()> {
        let c = chunks();
        assert_eq!(select_chunks(&c, 0)?.len(), 2);
        assert_eq!(select_chunks(&c, 2)?[0].sequence, 2);
        assert!(matches!(
            select_chunks(&c, 3),
            Err(Error::ChunkOutOfRange {
                requested: 3,
                available: 2
            })
        ));
        Ok(())
    }

    #[test]
    fn to_i16_clamps_and_rounds() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), i16::MAX);
        assert_eq!(to_i16(2.0), i16::MAX);
        assert_eq!(to_i16(-2.0), -i16::MAX);
    }

    #[test]
    fn unsupported_format_writes_nothing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut o = opts(dir.path(), 0);
        o.format = "mp3".into();

        let signal = Signal::new(vec![0.0; 4000], 1, 1000);
        let err = export_chunks(&signal, &chunks(), &o).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(f) if f == "mp3"));
        assert!(!dir.path().join("gig").exists());
        Ok(())
    }

    #[test]
    fn exports_clips_log_and_manifest() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let signal = Signal::new(vec![0.25; 4000 * 2], 2, 1000);

        let summary = export_chunks(&signal, &chunks(), &opts(dir.path(), 0))?;
        assert_eq!(summary.dir, dir.path().join("gig").join("wav"));
        assert_eq!(summary.files.len(), 2);

        // 01: padded 500..2500 => 2000 frames of stereo.
        let reader = hound::WavReader::open(&summary.files[0])?;
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 1000);
        assert_eq!(reader.duration(), 2000);

        let log = fs::read_to_string(&summary.log_path)?;
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines[0], "Chopping Source File gig");
        assert_eq!(lines[1], LOG_RULE);
        assert_eq!(lines[2], "Silence Threshold: -40");
        assert_eq!(lines[5], LOG_RULE);
        assert_eq!(lines[6], "01_chunk: 00:00:01-00:00:02 (00:01)");
        assert_eq!(lines.len(), 8);

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&summary.manifest_path)?)?;
        assert_eq!(manifest["tags"]["artist"], "Band");
        assert_eq!(manifest["chunks"][1]["file"], "02_chunk.wav");
        assert_eq!(manifest["chunks"][1]["padded_end_ms"], 4000);
        Ok(())
    }

    #[test]
    fn single_chunk_export_logs_only_that_chunk() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let signal = Signal::new(vec![0.1; 4000], 1, 1000);

        let summary = export_chunks(&signal, &chunks(), &opts(dir.path(), 2))?;
        assert_eq!(summary.files, vec![summary.dir.join("02_chunk.wav")]);

        let log = fs::read_to_string(&summary.log_path)?;
        assert!(!log.contains("01_chunk"));
        assert!(log.contains("02_chunk: 00:00:03-00:00:03 (00:00)"));
        Ok(())
    }
}
