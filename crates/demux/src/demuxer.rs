// Demuxing audio containers using Symphonia

use mrlkit_core::{MediaError, MediaMetadata, MetadataKey, Result};
use symphonia::core::codecs::{CodecParameters, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::Hint;

/// Audio demuxer wrapper
pub struct Demuxer {
    format_reader: Box<dyn FormatReader>,
    track_id: u32,
    codec_params: CodecParameters,
    metadata: MediaMetadata,
    byte_len: Option<u64>,
    seekable: bool,
}

impl Demuxer {
    /// Probe `media_source` and select its first decodable track
    pub fn open(media_source: Box<dyn MediaSource>, hint: Hint) -> Result<Self> {
        let byte_len = media_source.byte_len();
        let seekable = media_source.is_seekable();
        let media_source_stream = MediaSourceStream::new(media_source, Default::default());

        let mut probed = symphonia::default::get_probe()
            .format(
                &hint,
                media_source_stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| MediaError::DecodingError(format!("Unsupported container: {}", e)))?;

        // Tags found ahead of the container (ID3v2) come first
        let mut metadata = MediaMetadata::new();
        if let Some(probed_meta) = probed.metadata.get() {
            if let Some(revision) = probed_meta.current() {
                collect_tags(revision, &mut metadata);
            }
        }

        let mut format_reader = probed.format;
        {
            let container_meta = format_reader.metadata();
            if let Some(revision) = container_meta.current() {
                collect_tags(revision, &mut metadata);
            }
        }

        let (track_id, codec_params) = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .map(|t| (t.id, t.codec_params.clone()))
            .ok_or_else(|| MediaError::DecodingError("No decodable audio track".to_string()))?;

        Ok(Self {
            format_reader,
            track_id,
            codec_params,
            metadata,
            byte_len,
            seekable,
        })
    }

    /// Create a hint from a file extension
    pub fn hint_for_extension(extension: Option<&str>) -> Hint {
        let mut hint = Hint::new();
        if let Some(extension) = extension {
            hint.with_extension(extension);
        }
        hint
    }

    /// Next packet of the selected track; `None` at end of stream
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    log::warn!("Stream parameters changed mid-stream, ending playback");
                    return Ok(None);
                }
                Err(e) => {
                    return Err(MediaError::DecodingError(format!(
                        "Failed to read packet: {}",
                        e
                    )))
                }
            };

            // Only return packets for our track
            if packet.track_id() == self.track_id {
                return Ok(Some(packet));
            }
        }
    }

    /// Seek the selected track to `time_ms`; returns the position reached in ms
    pub fn seek(&mut self, time_ms: u64) -> Result<u64> {
        let time_base = self
            .codec_params
            .time_base
            .ok_or_else(|| MediaError::DecodingError("Track has no time base".to_string()))?;

        let timestamp = (time_ms * time_base.denom as u64) / (time_base.numer as u64 * 1000);
        let seeked = self
            .format_reader
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: timestamp,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| MediaError::DecodingError(format!("Seek failed: {}", e)))?;

        let reached = time_base.calc_time(seeked.actual_ts);
        Ok(reached.seconds * 1000 + (reached.frac * 1000.0) as u64)
    }

    /// Codec parameters of the selected track
    pub fn codec_params(&self) -> &CodecParameters {
        &self.codec_params
    }

    /// Whether the container holds tracks Symphonia cannot decode (typically video)
    pub fn has_undecodable_tracks(&self) -> bool {
        self.format_reader
            .tracks()
            .iter()
            .any(|t| t.codec_params.codec == CODEC_TYPE_NULL)
    }

    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    pub fn byte_len(&self) -> Option<u64> {
        self.byte_len
    }

    pub fn is_seekable(&self) -> bool {
        self.seekable
    }
}

fn collect_tags(revision: &MetadataRevision, metadata: &mut MediaMetadata) {
    for tag in revision.tags() {
        let key = match tag.std_key {
            Some(StandardTagKey::TrackTitle) => MetadataKey::Title,
            Some(StandardTagKey::Artist) => MetadataKey::Artist,
            Some(StandardTagKey::Genre) => MetadataKey::Genre,
            Some(StandardTagKey::Album) => MetadataKey::Album,
            Some(StandardTagKey::Date)
            | Some(StandardTagKey::ReleaseDate)
            | Some(StandardTagKey::OriginalDate) => MetadataKey::Year,
            Some(StandardTagKey::TrackNumber) => MetadataKey::Track,
            Some(StandardTagKey::Comment) => MetadataKey::Comment,
            _ => continue,
        };
        metadata.set_if_absent(key, tag.value.to_string());
    }
}
