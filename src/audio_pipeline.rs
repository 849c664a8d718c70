//! PCM normalization for decoded audio.
//!
//! Responsibilities:
//! - Convert Symphonia-decoded PCM (any sample format) into interleaved `f32`
//! - Pin the stream layout (channels + sample rate) from the first buffer
//! - Hand interleaved blocks to a callback, or accumulate them into a [`Signal`]
//!
//! The source channel layout and sample rate are kept as-is, so exported chunks match the
//! recording they were cut from.

use anyhow::{Result, anyhow, bail};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};

use crate::signal::Signal;

/// Channel count and sample rate of a decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioLayout {
    pub channels: u16,
    pub sample_rate: u32,
}

/// Converts decoded buffers into interleaved `f32` blocks with a fixed layout.
#[derive(Default)]
pub struct AudioPipeline {
    // Scratch buffer reused across packets; rebuilt when a larger packet arrives.
    sample_buf: Option<SampleBuffer<f32>>,
    sample_buf_frames: u64,

    layout: Option<AudioLayout>,
}

impl AudioPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout pinned by the first decoded buffer, if any.
    pub fn layout(&self) -> Option<AudioLayout> {
        self.layout
    }

    /// Convert one decoded buffer and pass the interleaved samples to `emit`.
    ///
    /// Fails if the buffer has no channels or its layout differs from earlier buffers.
    pub fn push_decoded_and_emit(
        &mut self,
        decoded: &AudioBufferRef<'_>,
        mut emit: impl FnMut(&[f32], AudioLayout) -> Result<()>,
    ) -> Result<()> {
        let layout = self.check_layout(decoded)?;
        if decoded.frames() == 0 {
            return Ok(());
        }

        self.ensure_sample_buffer(decoded);
        let buf = self
            .sample_buf
            .as_mut()
            .ok_or_else(|| anyhow!("sample buffer not initialized"))?;

        buf.copy_interleaved_ref(decoded.clone());
        emit(buf.samples(), layout)
    }

    fn check_layout(&mut self, decoded: &AudioBufferRef<'_>) -> Result<AudioLayout> {
        let spec = decoded.spec();
        let channels = spec.channels.count();
        if channels == 0 {
            bail!("decoded audio had zero channels");
        }

        let layout = AudioLayout {
            channels: u16::try_from(channels)
                .map_err(|_| anyhow!("too many channels: {channels}"))?,
            sample_rate: spec.rate,
        };

        match self.layout {
            None => {
                self.layout = Some(layout);
                Ok(layout)
            }
            Some(pinned) if pinned == layout => Ok(layout),
            Some(pinned) => bail!(
                "audio layout changed mid-stream: {}ch@{}Hz -> {}ch@{}Hz",
                pinned.channels,
                pinned.sample_rate,
                layout.channels,
                layout.sample_rate
            ),
        }
    }

    fn ensure_sample_buffer(&mut self, decoded: &AudioBufferRef<'_>) {
        let needed = decoded.capacity() as u64;
        if self.sample_buf.is_some() && self.sample_buf_frames >= needed {
            return;
        }

        self.sample_buf = Some(SampleBuffer::<f32>::new(needed, *decoded.spec()));
        self.sample_buf_frames = needed;
    }
}

/// Collects interleaved blocks into a single [`Signal`].
#[derive(Debug, Default)]
pub struct SignalBuilder {
    samples: Vec<f32>,
    layout: Option<AudioLayout>,
}

impl SignalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block. The first block's layout wins.
    pub fn push(&mut self, interleaved: &[f32], layout: AudioLayout) {
        self.layout.get_or_insert(layout);
        self.samples.extend_from_slice(interleaved);
    }

    /// Finish into a signal. A stream that never produced audio becomes an empty mono signal
    /// at `fallback_rate`.
    pub fn finish(self, fallback_rate: u32) -> Signal {
        let layout = self.layout.unwrap_or(AudioLayout {
            channels: 1,
            sample_rate: fallback_rate,
        });
        Signal::new(self.samples, layout.channels, layout.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    use symphonia::core::audio::{AudioBuffer, Channels, Signal as _, SignalSpec};

    fn buffer_ref(buf: &AudioBuffer<i16>) -> AudioBufferRef<'_> {
        AudioBufferRef::S16(Cow::Borrowed(buf))
    }

    fn stereo_buffer(frames: usize, rate: u32) -> AudioBuffer<i16> {
        let spec = SignalSpec::new(rate, Channels::FRONT_LEFT | Channels::FRONT_RIGHT);
        let mut buf = AudioBuffer::<i16>::new(frames as u64, spec);
        buf.render_reserved(Some(frames));
        for (i, s) in buf.chan_mut(0).iter_mut().enumerate() {
            *s = if i % 2 == 0 { i16::MAX } else { 0 };
        }
        buf
    }

    #[test]
    fn converts_to_interleaved_f32_and_pins_layout() -> anyhow::Result<()> {
        let mut pipeline = AudioPipeline::new();
        let buf = stereo_buffer(4, 8_000);

        let mut seen = Vec::new();
        pipeline.push_decoded_and_emit(&buffer_ref(&buf), |s, layout| {
            seen.extend_from_slice(s);
            assert_eq!(layout.channels, 2);
            assert_eq!(layout.sample_rate, 8_000);
            Ok(())
        })?;

        assert_eq!(seen.len(), 8);
        // Left channel alternates full scale / zero; right channel stays silent.
        assert!((seen[0] - 1.0).abs() < 1e-3);
        assert_eq!(seen[1], 0.0);
        assert_eq!(seen[2], 0.0);
        assert_eq!(
            pipeline.layout(),
            Some(AudioLayout {
                channels: 2,
                sample_rate: 8_000
            })
        );
        Ok(())
    }

    #[test]
    fn layout_change_is_rejected() -> anyhow::Result<()> {
        let mut pipeline = AudioPipeline::new();
        let a = stereo_buffer(4, 8_000);
        let b = stereo_buffer(4, 16_000);

        pipeline.push_decoded_and_emit(&buffer_ref(&a), |_, _| Ok(()))?;
        let err = pipeline
            .push_decoded_and_emit(&buffer_ref(&b), |_, _| Ok(()))
            .unwrap_err();
        assert!(err.to_string().contains("layout changed"));
        Ok(())
    }

    #[test]
    fn larger_buffers_grow_the_scratch_space() -> anyhow::Result<()> {
        let mut pipeline = AudioPipeline::new();
        let small = stereo_buffer(2, 8_000);
        let large = stereo_buffer(64, 8_000);

        let mut total = 0usize;
        for buf in [&small, &large] {
            pipeline.push_decoded_and_emit(&buffer_ref(buf), |s, _| {
                total += s.len();
                Ok(())
            })?;
        }
        assert_eq!(total, (2 + 64) * 2);
        Ok(())
    }

    #[test]
    fn builder_without_audio_is_empty_mono() {
        let signal = SignalBuilder::new().finish(44_100);
        assert!(signal.is_empty());
        assert_eq!(signal.channels(), 1);
        assert_eq!(signal.sample_rate(), 44_100);
    }

    #[test]
    fn builder_concatenates_blocks() {
        let layout = AudioLayout {
            channels: 2,
            sample_rate: 1_000,
        };
        let mut builder = SignalBuilder::new();
        builder.push(&[0.1, 0.2], layout);
        builder.push(&[0.3, 0.4], layout);
        let signal = builder.finish(44_100);
        assert_eq!(signal.frames(), 2);
        assert_eq!(signal.samples(), &[0.1, 0.2, 0.3, 0.4]);
    }
}
