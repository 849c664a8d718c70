use std::io::Write;

use crate::Result;
use crate::chunk::Chunk;

/// Streams a list of chunks into some textual format.
///
/// Callers write chunks in emission order and then call `close` once.
pub trait ChunkEncoder {
    fn write_chunk(&mut self, chunk: &Chunk) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// Writes each chunk's label on its own line.
pub struct LabelEncoder<W: Write> {
    w: W,
    closed: bool,
}

impl<W: Write> LabelEncoder<W> {
    pub fn new(w: W) -> Self {
        Self { w, closed: false }
    }
}

impl<W: Write> ChunkEncoder for LabelEncoder<W> {
    fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        if self.closed {
            return Err(crate::Error::msg(
                "cannot write chunk: encoder is already closed",
            ));
        }
        writeln!(self.w, "{}", chunk.label)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.w.flush()?;
            self.closed = true;
        }
        Ok(())
    }
}
