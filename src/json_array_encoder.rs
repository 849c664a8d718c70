use std::io::Write;

use crate::Result;
use crate::chunk::Chunk;
use crate::chunk_encoder::ChunkEncoder;

/// A `ChunkEncoder` that writes chunks as a single JSON array.
///
/// Chunks are streamed to the writer as they are found, so the array is well-formed only
/// after `close`.
///
/// Example output:
/// ```json
/// [
///   { "sequence": 1, "start_ms": 60000, "end_ms": 245000, "padded_start_ms": 58000,
///     "padded_end_ms": 247000, "label": "01_chunk: 00:01:00-00:04:05 (03:05)" }
/// ]
/// ```
pub struct JsonArrayEncoder<W: Write> {
    /// The underlying writer we stream JSON into.
    w: W,

    /// Whether the opening `[` has been written.
    started: bool,

    /// Whether the next element is the first (no leading comma).
    first: bool,

    /// Once closed, no further writes are allowed.
    closed: bool,
}

impl<W: Write> JsonArrayEncoder<W> {
    /// Create an encoder; nothing is written until the first chunk or `close`.
    pub fn new(w: W) -> Self {
        Self {
            w,
            started: false,
            first: true,
            closed: false,
        }
    }

    fn start_if_needed(&mut self) -> Result<()> {
        if !self.started {
            self.w.write_all(b"[")?;
            self.started = true;
        }
        Ok(())
    }
}

impl<W: Write> ChunkEncoder for JsonArrayEncoder<W> {
    fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        if self.closed {
            return Err(crate::Error::msg(
                "cannot write chunk: encoder is already closed",
            ));
        }

        self.start_if_needed()?;
        if !self.first {
            self.w.write_all(b",")?;
        }
        self.first = false;

        serde_json::to_writer(&mut self.w, chunk)?;
        self.w.flush()?;
        Ok(())
    }

    /// Close the array. Idempotent; an encoder that saw no chunks writes `[]`.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.start_if_needed()?;

        // Close the JSON array.
        self.w.write_all(b"]")?;
        self.w.flush()?;

        self.closed = true;
        Ok(())
    }
}
