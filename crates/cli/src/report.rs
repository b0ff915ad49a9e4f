// Human-readable description of the active media

use mrlkit_session::{MediaKind, MetadataKey, PropertyKey, Resolution, Session};
use std::fmt;

const UNKNOWN: &str = "unknown";

/// Snapshot of everything the session knows about its active locator
#[derive(Debug, Default)]
pub struct MediaReport {
    pub kind: MediaKind,
    pub size: Option<u64>,
    pub length_ms: Option<u32>,
    pub seekable: Option<u32>,
    pub audio_codec: Option<String>,
    pub audio_bits: Option<u32>,
    pub sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
    pub audio_bitrate: Option<u32>,
    pub video_codec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub video_bitrate: Option<u32>,
    pub frame_duration: Option<u32>,
    pub tags: Vec<(&'static str, Option<String>)>,
}

impl MediaReport {
    /// Gather the report, waiting for the resolution at most once
    pub fn collect(session: &Session) -> Self {
        let resolution = session.resolution();
        let mut report = Self::from_resolution(resolution.as_deref());
        report.size = session.media_size();
        report
    }

    fn from_resolution(resolution: Option<&Resolution>) -> Self {
        let property = |key: PropertyKey| resolution.and_then(|r| r.properties.get(key));
        let tags = [
            ("Title", MetadataKey::Title),
            ("Artist", MetadataKey::Artist),
            ("Genre", MetadataKey::Genre),
            ("Album", MetadataKey::Album),
            ("Year", MetadataKey::Year),
            ("Track Number", MetadataKey::Track),
            ("Description", MetadataKey::Comment),
        ]
        .into_iter()
        .map(|(label, key)| {
            let value = resolution.and_then(|r| r.metadata.get(key)).map(str::to_string);
            (label, value)
        })
        .collect();

        Self {
            kind: resolution.map(|r| r.kind).unwrap_or_default(),
            size: None,
            length_ms: property(PropertyKey::Length),
            seekable: property(PropertyKey::Seekable),
            audio_codec: resolution
                .and_then(|r| r.properties.audio_codec())
                .map(str::to_string),
            audio_bits: property(PropertyKey::AudioBits),
            sample_rate: property(PropertyKey::SampleRate),
            audio_channels: property(PropertyKey::AudioChannels),
            audio_bitrate: property(PropertyKey::AudioBitrate),
            video_codec: resolution
                .and_then(|r| r.properties.video_codec())
                .map(str::to_string),
            width: property(PropertyKey::Width),
            height: property(PropertyKey::Height),
            video_bitrate: property(PropertyKey::VideoBitrate),
            frame_duration: property(PropertyKey::Fps),
            tags,
        }
    }
}

fn or_unknown<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), |v| v.to_string())
}

impl fmt::Display for MediaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Type: {}", self.kind.to_string().to_lowercase())?;
        writeln!(
            f,
            "Size: {}",
            or_unknown(self.size.map(|s| format!("{:.2} MB", s as f64 / 1024.0 / 1024.0)))
        )?;
        writeln!(
            f,
            "Length: {}",
            or_unknown(self.length_ms.map(|ms| format!("{:.2} sec", ms as f64 / 1000.0)))
        )?;
        writeln!(
            f,
            "Seekable: {}",
            or_unknown(self.seekable.map(|s| if s != 0 { "yes" } else { "no" }))
        )?;

        writeln!(f, "Audio Codec: {}", or_unknown(self.audio_codec.as_deref()))?;
        writeln!(f, "Audio Bits: {}", or_unknown(self.audio_bits.map(|b| format!("{} bps", b))))?;
        writeln!(
            f,
            "Audio Sample Rate: {}",
            or_unknown(self.sample_rate.map(|r| format!("{} Hz", r)))
        )?;
        writeln!(f, "Audio Channels: {}", or_unknown(self.audio_channels))?;
        writeln!(
            f,
            "Audio Bitrate: {}",
            or_unknown(self.audio_bitrate.map(|b| format!("{} kbps", b / 1000)))
        )?;

        if self.kind == MediaKind::Video {
            writeln!(f, "Video Codec: {}", or_unknown(self.video_codec.as_deref()))?;
            let resolution = match (self.width, self.height) {
                (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
                _ => None,
            };
            writeln!(f, "Video Resolution: {}", or_unknown(resolution))?;
            writeln!(
                f,
                "Video Bitrate: {}",
                or_unknown(self.video_bitrate.map(|b| format!("{} kbps", b / 1000)))
            )?;
            // Frame duration is in 90 kHz ticks
            let framerate = self
                .frame_duration
                .filter(|d| *d > 0)
                .map(|d| format!("{:.2} fps", 90_000.0 / d as f64));
            writeln!(f, "Video Framerate: {}", or_unknown(framerate))?;
        }

        for (label, value) in &self.tags {
            writeln!(f, "{}: {}", label, or_unknown(value.as_deref()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrlkit_session::{
        Backend, CancelToken, EngineKind, MediaError, MediaLocator, MrlResource, Playback,
        PlaybackContext, PlayerConfig, Result, SourceInfo,
    };
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    /// Keeps every resolution pending until cancelled
    struct PendingBackend;

    impl Backend for PendingBackend {
        fn name(&self) -> &'static str {
            "pending"
        }

        fn supports_resource(&self, _resource: MrlResource) -> bool {
            true
        }

        fn resolve(
            &self,
            _locator: &MediaLocator,
            _source: &SourceInfo,
            cancel: &CancelToken,
        ) -> Result<Resolution> {
            loop {
                cancel.check("resolve")?;
                thread::sleep(Duration::from_millis(5));
            }
        }

        fn start(&self, _ctx: PlaybackContext) -> Result<Box<dyn Playback>> {
            Err(MediaError::PlaybackStartError("cannot play".to_string()))
        }
    }

    #[test]
    fn test_collect_waits_once_for_a_pending_resolution() {
        let config =
            PlayerConfig::new(EngineKind::Dummy).with_resolve_timeout(Duration::from_millis(100));
        let session = Session::open_with_backend(config, Arc::new(PendingBackend)).unwrap();
        let locator = session.create_locator("dvd://1").unwrap();
        session.set_active(&locator).unwrap();

        let started = Instant::now();
        let report = MediaReport::collect(&session);
        // Seventeen separate waits would take well over a second
        assert!(started.elapsed() < Duration::from_millis(500));

        assert_eq!(report.kind, MediaKind::Unknown);
        assert_eq!(report.length_ms, None);
        assert!(report.tags.iter().all(|(_, value)| value.is_none()));
        assert!(report.to_string().contains("Length: unknown\n"));
        session.close();
    }

    fn audio_report() -> MediaReport {
        MediaReport {
            kind: MediaKind::Audio,
            size: Some(3 * 1024 * 1024),
            length_ms: Some(2500),
            seekable: Some(1),
            audio_codec: Some("flac".to_string()),
            audio_bits: Some(16),
            sample_rate: Some(44_100),
            audio_channels: Some(2),
            audio_bitrate: Some(900_000),
            tags: vec![
                ("Title", Some("Intro".to_string())),
                ("Artist", None),
                ("Description", Some(String::new())),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_audio_report() {
        let text = audio_report().to_string();
        assert!(text.contains("Type: audio\n"));
        assert!(text.contains("Size: 3.00 MB\n"));
        assert!(text.contains("Length: 2.50 sec\n"));
        assert!(text.contains("Seekable: yes\n"));
        assert!(text.contains("Audio Bitrate: 900 kbps\n"));
        assert!(text.contains("Title: Intro\n"));
        assert!(text.contains("Artist: unknown\n"));
        // Present but empty is not unknown
        assert!(text.contains("Description: \n"));
        assert!(!text.contains("Video"));
    }

    #[test]
    fn test_video_section_only_for_video() {
        let report = MediaReport {
            kind: MediaKind::Video,
            width: Some(1920),
            height: Some(1080),
            frame_duration: Some(3600),
            ..Default::default()
        };
        let text = report.to_string();
        assert!(text.contains("Video Resolution: 1920x1080\n"));
        assert!(text.contains("Video Framerate: 25.00 fps\n"));
        assert!(text.contains("Video Codec: unknown\n"));
        assert!(text.contains("Audio Channels: unknown\n"));
    }
}
