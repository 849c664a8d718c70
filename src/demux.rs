// src/demux.rs

//! Container probing and packet iteration on top of Symphonia.
//!
//! Responsibilities:
//! - Probe a `MediaSource` and choose the audio track to analyze
//! - Provide a `next_packet` helper that treats IO errors as end-of-stream

use anyhow::{Context, Result, anyhow};
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, Track};
use symphonia::core::io::{MediaSource, MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Probe `source` and return its format reader plus the track to decode.
///
/// Track selection:
/// - the container's default track, when it is decodable
/// - otherwise the first decodable track
///
/// A track is decodable when its codec is known and it reports a sample rate.
pub fn probe_source(
    source: Box<dyn MediaSource>,
    hint_extension: Option<&str>,
) -> Result<(Box<dyn FormatReader>, Track)> {
    // Symphonia wants a power-of-two buffer larger than 32KiB.
    let mss = MediaSourceStream::new(
        source,
        MediaSourceStreamOptions {
            buffer_len: 256 * 1024,
        },
    );

    let mut hint = Hint::new();
    if let Some(ext) = hint_extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| anyhow!(e))
        .context("failed to probe media stream")?;

    let format = probed.format;
    let track = pick_track(format.default_track(), format.tracks())
        .cloned()
        .ok_or_else(|| anyhow!("no audio track found"))?;

    tracing::debug!(
        track_id = track.id,
        sample_rate = track.codec_params.sample_rate,
        channels = track.codec_params.channels.map(|c| c.count()),
        "selected audio track"
    );

    Ok((format, track))
}

fn pick_track<'a>(default: Option<&'a Track>, tracks: &'a [Track]) -> Option<&'a Track> {
    default
        .filter(|t| is_decodable(t))
        .or_else(|| tracks.iter().find(|t| is_decodable(t)))
}

fn is_decodable(track: &Track) -> bool {
    track.codec_params.codec != CODEC_TYPE_NULL && track.codec_params.sample_rate.is_some()
}

/// Read the next packet. `Ok(None)` means the stream ended.
pub fn next_packet(format: &mut Box<dyn FormatReader>) -> Result<Option<Packet>> {
    match format.next_packet() {
        Ok(p) => Ok(Some(p)),
        Err(SymphoniaError::IoError(_)) => Ok(None),
        Err(e) => Err(anyhow!(e)).context("failed reading packet"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::codecs::{CODEC_TYPE_PCM_S16LE, CodecParameters};

    fn track(id: u32, codec: symphonia::core::codecs::CodecType, rate: Option<u32>) -> Track {
        let mut params = CodecParameters::new();
        params.for_codec(codec);
        if let Some(rate) = rate {
            params.with_sample_rate(rate);
        }
        Track::new(id, params)
    }

    #[test]
    fn prefers_decodable_default_track() {
        let tracks = vec![
            track(1, CODEC_TYPE_PCM_S16LE, Some(44_100)),
            track(2, CODEC_TYPE_PCM_S16LE, Some(48_000)),
        ];
        let picked = pick_track(Some(&tracks[1]), &tracks).map(|t| t.id);
        assert_eq!(picked, Some(2));
    }

    #[test]
    fn falls_back_to_first_decodable_track() {
        let tracks = vec![
            track(1, CODEC_TYPE_NULL, Some(44_100)),
            track(2, CODEC_TYPE_PCM_S16LE, None),
            track(3, CODEC_TYPE_PCM_S16LE, Some(8_000)),
        ];
        let picked = pick_track(Some(&tracks[0]), &tracks).map(|t| t.id);
        assert_eq!(picked, Some(3));
    }

    #[test]
    fn no_decodable_track_yields_none() {
        let tracks = vec![track(1, CODEC_TYPE_NULL, None)];
        assert!(pick_track(None, &tracks).is_none());
    }

    #[test]
    fn probing_garbage_fails_with_context() {
        let source = symphonia::core::io::ReadOnlySource::new(std::io::Cursor::new(vec![0u8; 64]));
        let err = match probe_source(Box::new(source), None) {
            Ok(_) => panic!("expected probe failure"),
            Err(err) => err,
        };
        assert!(format!("{err:#}").contains("failed to probe media stream"));
    }
}
