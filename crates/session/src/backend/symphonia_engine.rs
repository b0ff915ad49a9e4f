// Audio engine built on Symphonia: probing for resolution, a decode thread for playback

use crate::engine::{self, EngineOptions};
use crate::source::open_media_source;
use mrlkit_core::{
    AudioOutput, Backend, CancelToken, MediaError, MediaLocator, MrlResource, Playback,
    PlaybackContext, PlayerConfig, Resolution, Result, SourceInfo, VideoOutput,
};
use mrlkit_demux::{is_image_extension, probe_image, probe_media, Demuxer};
use mrlkit_transport_http::HttpClient;
use std::time::Duration;

pub struct SymphoniaBackend {
    http: HttpClient,
    audio_output: AudioOutput,
    start_timeout: Duration,
}

impl SymphoniaBackend {
    /// Fails when the output combination cannot be honoured on this host
    pub fn new(config: &PlayerConfig) -> Result<Self> {
        if config.video_output() != VideoOutput::Null {
            return Err(MediaError::BackendInitError(format!(
                "symphonia engine has no video output, got vo={}",
                config.video_output()
            )));
        }
        if config.audio_output() == AudioOutput::Auto && !mrlkit_renderer::default_output_available()
        {
            return Err(MediaError::BackendInitError(
                "no default audio output device (try ao=null)".to_string(),
            ));
        }

        Ok(Self {
            http: HttpClient::new(),
            audio_output: config.audio_output(),
            start_timeout: config.start_timeout(),
        })
    }
}

impl Backend for SymphoniaBackend {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    fn supports_resource(&self, resource: MrlResource) -> bool {
        matches!(
            resource,
            MrlResource::File | MrlResource::Http | MrlResource::Https
        )
    }

    fn resolve(
        &self,
        locator: &MediaLocator,
        _source: &SourceInfo,
        cancel: &CancelToken,
    ) -> Result<Resolution> {
        cancel.check("resolve")?;
        let extension = locator.extension();

        if let (Some(path), Some(ext)) = (locator.path(), extension.as_deref()) {
            if is_image_extension(ext) {
                return probe_image(path);
            }
        }

        let media_source = open_media_source(locator, &self.http, cancel)?;
        let resolution = probe_media(media_source, Demuxer::hint_for_extension(extension.as_deref()));
        // A read failed by cancellation surfaces as a probe error
        cancel.check("resolve")?;
        resolution
    }

    fn start(&self, ctx: PlaybackContext) -> Result<Box<dyn Playback>> {
        let options = EngineOptions {
            audio_output: self.audio_output,
            start_timeout: self.start_timeout,
        };
        let playback = engine::spawn(ctx, self.http.clone(), options)?;
        Ok(Box::new(playback))
    }
}
