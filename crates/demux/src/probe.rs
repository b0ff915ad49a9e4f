// Resolve kind, properties and tags of an audio container

use crate::demuxer::Demuxer;
use mrlkit_core::{AudioProperties, Resolution, Result, Stream, StreamProperties};
use symphonia::core::codecs::CodecParameters;
use symphonia::core::io::MediaSource;
use symphonia::core::probe::Hint;

/// Probe `source` and describe what it holds.
///
/// Only the container headers are read; no packet is decoded.
pub fn probe_media(source: Box<dyn MediaSource>, hint: Hint) -> Result<Resolution> {
    let demuxer = Demuxer::open(source, hint)?;
    Ok(describe(&demuxer))
}

/// Build a `Resolution` from an already opened demuxer
pub fn describe(demuxer: &Demuxer) -> Resolution {
    let params = demuxer.codec_params();
    let length_ms = duration_ms(params);

    let audio = AudioProperties {
        codec: codec_name(params),
        bitrate: average_bitrate(demuxer.byte_len(), length_ms),
        bits: params.bits_per_sample.or(params.bits_per_coded_sample),
        channels: params.channels.map(|c| c.count() as u32),
        sample_rate: params.sample_rate,
    };

    // Symphonia has no video decoders: a container with tracks it cannot
    // decode may be carrying video, so report that stream as undetermined
    let video = if demuxer.has_undecodable_tracks() {
        Stream::Unknown
    } else {
        Stream::Missing
    };

    let properties = StreamProperties {
        seekable: Some(demuxer.is_seekable()),
        length_ms,
        audio: Stream::Present(audio),
        video,
    };

    Resolution {
        kind: properties.guess_kind(),
        properties,
        metadata: demuxer.metadata().clone(),
    }
}

/// Short codec name as registered with Symphonia (e.g. "flac", "pcm_s16le")
pub fn codec_name(params: &CodecParameters) -> Option<String> {
    symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|descriptor| descriptor.short_name.to_string())
}

fn duration_ms(params: &CodecParameters) -> Option<u32> {
    let frames = params.n_frames?;
    let ms = match params.time_base {
        Some(tb) => {
            let time = tb.calc_time(frames);
            time.seconds * 1000 + (time.frac * 1000.0) as u64
        }
        None => {
            let rate = params.sample_rate.filter(|r| *r > 0)? as u64;
            frames * 1000 / rate
        }
    };
    u32::try_from(ms).ok()
}

fn average_bitrate(byte_len: Option<u64>, length_ms: Option<u32>) -> Option<u32> {
    let bytes = byte_len?;
    let ms = length_ms.filter(|ms| *ms > 0)? as u64;
    u32::try_from(bytes * 8 * 1000 / ms).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_bitrate() {
        // 1 second, 16000 bytes
        assert_eq!(average_bitrate(Some(16_000), Some(1000)), Some(128_000));
        assert_eq!(average_bitrate(Some(16_000), Some(0)), None);
        assert_eq!(average_bitrate(None, Some(1000)), None);
    }
}
