// Engine that only logs what it is asked to do

use mrlkit_core::{
    Backend, CancelToken, MediaLocator, MrlResource, Playback, PlaybackContext, PlayerConfig,
    Resolution, Result, SourceInfo, StreamProperties,
};

pub struct DummyBackend;

impl DummyBackend {
    pub fn new(config: &PlayerConfig) -> Self {
        log::info!(
            "dummy: init (ao={}, vo={})",
            config.audio_output(),
            config.video_output()
        );
        Self
    }
}

impl Backend for DummyBackend {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn supports_resource(&self, _resource: MrlResource) -> bool {
        true
    }

    /// Knows nothing about the streams; only seekability comes from the source
    fn resolve(
        &self,
        locator: &MediaLocator,
        source: &SourceInfo,
        _cancel: &CancelToken,
    ) -> Result<Resolution> {
        log::info!("dummy: resolve {}", locator);
        Ok(Resolution {
            properties: StreamProperties {
                seekable: Some(source.seekable),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn start(&self, ctx: PlaybackContext) -> Result<Box<dyn Playback>> {
        log::info!("dummy: play {}", ctx.locator);
        Ok(Box::new(DummyPlayback))
    }

    fn release(&self) {
        log::info!("dummy: uninit");
    }
}

struct DummyPlayback;

impl Playback for DummyPlayback {
    fn pause(&mut self) -> Result<()> {
        log::info!("dummy: pause");
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        log::info!("dummy: resume");
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        log::info!("dummy: seek {} ms", position_ms);
        Ok(())
    }

    fn stop(&mut self) {
        log::info!("dummy: stop");
    }

    fn position_ms(&self) -> u64 {
        0
    }
}
