// Still images: dimensions and format without decoding pixels

use mrlkit_core::{
    MediaError, MediaKind, MediaMetadata, Resolution, Result, Stream, StreamProperties,
    VideoProperties,
};
use std::path::Path;

/// Whether the extension names an image format we can probe
pub fn is_image_extension(extension: &str) -> bool {
    image::ImageFormat::from_extension(extension).is_some()
}

/// Read the header of the image at `path`
pub fn probe_image(path: &Path) -> Result<Resolution> {
    let reader = image::io::Reader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| MediaError::DecodingError(format!("Unknown image format: {}", path.display())))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| MediaError::DecodingError(format!("Failed to read image header: {}", e)))?;

    let video = VideoProperties {
        codec: Some(format!("{:?}", format).to_ascii_lowercase()),
        bitrate: None,
        width: Some(width),
        height: Some(height),
        frame_duration: None,
    };

    Ok(Resolution {
        kind: MediaKind::Image,
        properties: StreamProperties {
            seekable: Some(false),
            length_ms: Some(0),
            audio: Stream::Missing,
            video: Stream::Present(video),
        },
        metadata: MediaMetadata::new(),
    })
}
