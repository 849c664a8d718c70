/// The supported listing formats for detected chunks.
///
/// Each variant maps to a concrete `ChunkEncoder` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputType {
    /// Plain labels, one per line (`01_chunk: 00:01:00-00:04:05 (03:05)`).
    #[default]
    Text,

    /// Chunks as a JSON array.
    Json,

    /// A CUE sheet indexing each chunk inside the source file.
    Cue,
}
