// src/decoder.rs

//! Decode media (audio/video containers) into a [`Signal`] ready for analysis.
//!
//! This module is orchestration only:
//! - `demux` handles probing + packet iteration
//! - `decode` handles codec decoding
//! - `audio_pipeline` handles conversion to interleaved `f32`
//!
//! Two entry points exist:
//! - [`decode_signal_from_path`] opens a seekable file (works for every container layout)
//! - [`decode_signal_from_read`] takes any `Read` (stdin, sockets); some layouts that keep
//!   their index at the end of the file cannot be probed this way

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use symphonia::core::io::{MediaSource, ReadOnlySource};

use crate::audio_pipeline::{AudioLayout, AudioPipeline, SignalBuilder};
use crate::decode::{PacketOutcome, decode_packet_and_then, make_decoder_for_track};
use crate::demux::{next_packet, probe_source};
use crate::signal::Signal;
use crate::{Error, Result};

/// Sample rate reported for streams that end before producing any audio.
const FALLBACK_SAMPLE_RATE: u32 = 44_100;

/// Consumer callback for decoded audio.
///
/// The sink receives interleaved `f32` samples in the stream's own layout.
/// Returning `Ok(false)` stops decoding early.
pub trait SamplesSink {
    fn on_samples(&mut self, interleaved: &[f32], layout: AudioLayout) -> anyhow::Result<bool>;
}

/// Decode configuration.
#[derive(Debug, Clone, Default)]
pub struct StreamDecodeOpts {
    /// Optional container hint (e.g. "wav", "flac", "mp3", "mkv").
    /// This improves probing, especially for unseekable streams.
    pub hint_extension: Option<String>,
}

impl StreamDecodeOpts {
    /// Options hinted with the extension of `path`, if it has one.
    pub fn for_path(path: &Path) -> Self {
        Self {
            hint_extension: path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase),
        }
    }
}

/// Decode the file at `path` into a [`Signal`].
pub fn decode_signal_from_path(path: impl AsRef<Path>) -> Result<Signal> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::SourceNotFound(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let opts = StreamDecodeOpts::for_path(path);
    decode_signal(Box::new(file), &opts)
}

/// Decode an unseekable input stream into a [`Signal`].
pub fn decode_signal_from_read<R>(reader: R, opts: &StreamDecodeOpts) -> Result<Signal>
where
    R: Read + Send + 'static,
{
    decode_signal(read_only_source(reader), opts)
}

/// Decode an unseekable input stream and hand each decoded block to `sink`.
pub fn decode_to_sink_from_read<R>(
    reader: R,
    opts: &StreamDecodeOpts,
    sink: &mut dyn SamplesSink,
) -> Result<()>
where
    R: Read + Send + 'static,
{
    decode_impl(read_only_source(reader), opts, sink).map_err(decode_error)
}

fn decode_signal(source: Box<dyn MediaSource>, opts: &StreamDecodeOpts) -> Result<Signal> {
    let mut sink = SignalSink::default();
    decode_impl(source, opts, &mut sink).map_err(decode_error)?;

    let signal = sink.builder.finish(FALLBACK_SAMPLE_RATE);
    tracing::debug!(
        frames = signal.frames(),
        channels = signal.channels(),
        sample_rate = signal.sample_rate(),
        "decoded signal"
    );
    Ok(signal)
}

fn decode_impl(
    source: Box<dyn MediaSource>,
    opts: &StreamDecodeOpts,
    sink: &mut dyn SamplesSink,
) -> anyhow::Result<()> {
    let (mut format, track) = probe_source(source, opts.hint_extension.as_deref())?;
    let mut decoder = make_decoder_for_track(&track)?;
    let mut pipeline = AudioPipeline::new();
    let mut skipped = 0usize;
    let mut keep_going = true;

    while keep_going {
        let Some(packet) = next_packet(&mut format)? else {
            break;
        };

        // Ignore packets from other tracks (video, subtitles, alternate audio).
        if packet.track_id() != track.id {
            continue;
        }

        let outcome = decode_packet_and_then(&mut decoder, &packet, |decoded| {
            pipeline
                .push_decoded_and_emit(&decoded, |samples, layout| {
                    keep_going = sink.on_samples(samples, layout)?;
                    Ok(())
                })
                .context("audio pipeline failed while processing decoded samples")
        })?;

        match outcome {
            PacketOutcome::Skipped => skipped += 1,
            PacketOutcome::Ended => break,
            PacketOutcome::Decoded | PacketOutcome::Reset => {}
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, "some frames could not be decoded");
    }
    Ok(())
}

fn decode_error(err: anyhow::Error) -> Error {
    Error::Decode(format!("{err:#}"))
}

fn read_only_source<R>(reader: R) -> Box<dyn MediaSource>
where
    R: Read + Send + 'static,
{
    // Symphonia's `MediaSource` is `Read + Send + Sync`. We only need to *move* the reader,
    // never share it, so a mutex is enough to satisfy `Sync`.
    Box::new(ReadOnlySource::new(LockedRead::new(reader)))
}

/// Collects every decoded block into a [`SignalBuilder`].
#[derive(Default)]
struct SignalSink {
    builder: SignalBuilder,
}

impl SamplesSink for SignalSink {
    fn on_samples(&mut self, interleaved: &[f32], layout: AudioLayout) -> anyhow::Result<bool> {
        self.builder.push(interleaved, layout);
        Ok(true)
    }
}

struct LockedRead<R> {
    inner: Mutex<R>,
}

impl<R> LockedRead<R> {
    fn new(inner: R) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }
}

impl<R: Read> Read for LockedRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner
            .get_mut()
            .map_err(|_| std::io::Error::other("decoder input mutex poisoned"))?
            .read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn wav_bytes(channels: u16, rate: u32, frames: usize, amp: i16) -> anyhow::Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for _ in 0..frames * channels as usize {
                writer.write_sample(amp)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    #[test]
    fn decodes_stereo_wav_and_keeps_layout() -> anyhow::Result<()> {
        let bytes = wav_bytes(2, 8_000, 8_000, i16::MAX / 2)?;
        let opts = StreamDecodeOpts {
            hint_extension: Some("wav".into()),
        };
        let signal = decode_signal_from_read(Cursor::new(bytes), &opts)?;

        assert_eq!(signal.channels(), 2);
        assert_eq!(signal.sample_rate(), 8_000);
        assert_eq!(signal.frames(), 8_000);
        assert_eq!(signal.len_ms(), 1000);
        assert!((signal.dbfs() + 6.02).abs() < 0.05);
        Ok(())
    }

    #[test]
    fn sink_can_stop_early() -> anyhow::Result<()> {
        struct FirstBlock(usize);
        impl SamplesSink for FirstBlock {
            fn on_samples(&mut self, s: &[f32], _: AudioLayout) -> anyhow::Result<bool> {
                self.0 += s.len();
                Ok(false)
            }
        }

        let bytes = wav_bytes(1, 8_000, 80_000, 1000)?;
        let mut sink = FirstBlock(0);
        decode_to_sink_from_read(Cursor::new(bytes), &StreamDecodeOpts::default(), &mut sink)?;
        assert!(sink.0 > 0);
        assert!(sink.0 < 80_000);
        Ok(())
    }

    #[test]
    fn garbage_input_is_a_decode_error() {
        let err = decode_signal_from_read(Cursor::new(vec![7u8; 128]), &StreamDecodeOpts::default())
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn missing_file_is_reported_as_such() {
        let err = decode_signal_from_path("does/not/exist.wav").unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }

    #[test]
    fn hint_comes_from_extension() {
        let opts = StreamDecodeOpts::for_path(Path::new("live/Set.FLAC"));
        assert_eq!(opts.hint_extension.as_deref(), Some("flac"));
        assert!(StreamDecodeOpts::for_path(Path::new("noext")).hint_extension.is_none());
    }
}
