use std::io::Write;

use crate::Result;
use crate::chunk::Chunk;
use crate::chunk_encoder::ChunkEncoder;

/// CUE sheets address time in frames of 1/75 s.
const CUE_FRAMES_PER_SECOND: u64 = 75;

/// A `ChunkEncoder` that writes a CUE sheet indexing chunks inside the source file.
///
/// Each chunk becomes a `TRACK` whose `INDEX 01` is the detected (unpadded) start, so a
/// player or burner can split the original recording without re-encoding it.
///
/// The `FILE` header is written lazily on the first chunk.
pub struct CueEncoder<W: Write> {
    w: W,
    file_name: String,
    performer: Option<String>,
    title: Option<String>,
    started: bool,
    closed: bool,
}

impl<W: Write> CueEncoder<W> {
    /// Create a CUE encoder for chunks of `file_name` (e.g. `gig.wav`).
    pub fn new(w: W, file_name: impl Into<String>) -> Self {
        Self {
            w,
            file_name: file_name.into(),
            performer: None,
            title: None,
            started: false,
            closed: false,
        }
    }

    /// Set the sheet-level `PERFORMER`.
    pub fn with_performer(mut self, performer: impl Into<String>) -> Self {
        self.performer = Some(performer.into());
        self
    }

    /// Set the sheet-level `TITLE`.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn start_if_needed(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }

        if let Some(performer) = &self.performer {
            writeln!(self.w, "PERFORMER \"{}\"", quote_safe(performer))?;
        }
        if let Some(title) = &self.title {
            writeln!(self.w, "TITLE \"{}\"", quote_safe(title))?;
        }
        writeln!(
            self.w,
            "FILE \"{}\" {}",
            quote_safe(&self.file_name),
            file_type(&self.file_name)
        )?;
        self.started = true;
        Ok(())
    }
}

impl<W: Write> ChunkEncoder for CueEncoder<W> {
    fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        if self.closed {
            return Err(crate::Error::msg(
                "cannot write chunk: encoder is already closed",
            ));
        }

        self.start_if_needed()?;

        writeln!(self.w, "  TRACK {:02} AUDIO", chunk.sequence)?;
        writeln!(self.w, "    TITLE \"{:02}_chunk\"", chunk.sequence)?;
        writeln!(
            self.w,
            "    INDEX 01 {}",
            format_timestamp_cue(chunk.start_ms)
        )?;
        self.w.flush()?;
        Ok(())
    }

    /// Flush the underlying writer. Idempotent.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.w.flush()?;
        self.closed = true;
        Ok(())
    }
}

/// `MM:SS:FF`, where minutes do not wrap and `FF` counts 1/75 s frames (rounded down).
fn format_timestamp_cue(ms: u64) -> String {
    let total_s = ms / 1000;
    let frames = (ms % 1000) * CUE_FRAMES_PER_SECOND / 1000;
    let m = total_s / 60;
    let s = total_s % 60;
    format!("{m:02}:{s:02}:{frames:02}")
}

/// CUE file type keyword for a file name.
fn file_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp3") => "MP3",
        Some("aif" | "aiff") => "AIFF",
        _ => "WAVE",
    }
}

fn quote_safe(s: &str) -> String {
    s.replace('"', "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_without_chunks_emits_nothing() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = CueEncoder::new(&mut out, "gig.wav");
        enc.close()?;
        assert_eq!(std::str::from_utf8(&out)?, "");
        Ok(())
    }

    #[test]
    fn writes_header_once_and_indexes_tracks() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = CueEncoder::new(&mut out, "gig.wav")
            .with_performer("The \"Band\"")
            .with_title("Live");

        enc.write_chunk(&Chunk::new(1, 60_000, 245_000, 2000, 4_000_000))?;
        enc.write_chunk(&Chunk::new(2, 3_725_500, 3_900_000, 2000, 4_000_000))?;
        enc.close()?;

        let s = std::str::from_utf8(&out)?;
        assert!(s.starts_with("PERFORMER \"The 'Band'\"\nTITLE \"Live\"\nFILE \"gig.wav\" WAVE\n"));
        assert!(s.contains("  TRACK 01 AUDIO\n    TITLE \"01_chunk\"\n    INDEX 01 01:00:00\n"));
        // Minutes keep counting past the hour.
        assert!(s.contains("  TRACK 02 AUDIO\n    TITLE \"02_chunk\"\n    INDEX 01 62:05:37\n"));
        assert_eq!(s.matches("FILE ").count(), 1);
        Ok(())
    }

    #[test]
    fn timestamp_frames_round_down() {
        assert_eq!(format_timestamp_cue(0), "00:00:00");
        assert_eq!(format_timestamp_cue(13), "00:00:00");
        assert_eq!(format_timestamp_cue(14), "00:00:01");
        assert_eq!(format_timestamp_cue(999), "00:00:74");
    }

    #[test]
    fn file_type_follows_extension() {
        assert_eq!(file_type("a.MP3"), "MP3");
        assert_eq!(file_type("a.aiff"), "AIFF");
        assert_eq!(file_type("a.flac"), "WAVE");
        assert_eq!(file_type("noext"), "WAVE");
    }

    #[test]
    fn write_after_close_errors() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = CueEncoder::new(&mut out, "gig.wav");
        enc.close()?;
        let err = enc
            .write_chunk(&Chunk::new(1, 0, 1000, 0, 1000))
            .unwrap_err();
        assert!(err.to_string().contains("already closed"));
        Ok(())
    }
}
