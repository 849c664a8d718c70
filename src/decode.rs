// src/decode.rs

//! Codec-level decoding helpers built on Symphonia.
//!
//! This module owns Symphonia's codec error model so the decode loop in `decoder` only
//! has to care about "got audio", "skip", or "fail".

use anyhow::{Context, Result, anyhow};
use symphonia::core::audio::AudioBufferRef;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{Packet, Track};

/// Create a decoder for `track` from Symphonia's default codec registry.
pub fn make_decoder_for_track(track: &Track) -> Result<Box<dyn Decoder>> {
    symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| anyhow!(e))
        .context("failed to create decoder for audio track")
}

/// What happened to a packet handed to [`decode_packet_and_then`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Audio was decoded and passed to the callback.
    Decoded,
    /// A corrupt frame was dropped; decoding can continue.
    Skipped,
    /// The decoder was reset after a stream discontinuity; the packet was dropped.
    Reset,
    /// The codec hit the end of its input.
    Ended,
}

/// Decode `packet` and hand the decoded buffer to `on_decoded`.
///
/// Error policy:
/// - `DecodeError`     → skip the frame
/// - `ResetRequired`   → reset the decoder and drop the packet
/// - `IoError`         → end of stream
/// - anything else     → fatal
pub fn decode_packet_and_then(
    decoder: &mut Box<dyn Decoder>,
    packet: &Packet,
    mut on_decoded: impl FnMut(AudioBufferRef<'_>) -> Result<()>,
) -> Result<PacketOutcome> {
    match decoder.decode(packet) {
        Ok(buf) => {
            on_decoded(buf)?;
            Ok(PacketOutcome::Decoded)
        }
        Err(SymphoniaError::DecodeError(reason)) => {
            tracing::warn!(reason, ts = packet.ts(), "skipping undecodable frame");
            Ok(PacketOutcome::Skipped)
        }
        Err(SymphoniaError::ResetRequired) => {
            decoder.reset();
            Ok(PacketOutcome::Reset)
        }
        Err(SymphoniaError::IoError(_)) => Ok(PacketOutcome::Ended),
        Err(e) => Err(anyhow!(e)).context("decoder failure"),
    }
}
