use crate::output_type::OutputType;
use crate::segmenter::SegmenterOpts;

/// Options that control a chopping run.
///
/// This struct represents *library-level configuration*, not CLI flags or INI keys directly.
/// The CLI maps its config file and flags into this type so the library stays usable from
/// tests, batch jobs, or other frontends.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChopOpts {
    /// Thresholds handed to the segmenter.
    pub segmenter: SegmenterOpts,

    /// Format used by [`crate::chopper::Chopper::list`].
    pub output_type: OutputType,
}
