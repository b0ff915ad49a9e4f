use mrlkit_session::{
    AudioOutput, Backend, CancelToken, EngineKind, MediaError, MediaKind, MediaLocator,
    MetadataKey, MrlResource, Playback, PlaybackContext, PlayerConfig, PlayerEvent, PropertyKey,
    RecordingListener, Resolution, ResolutionStatus, Result, Session, SessionState, SourceInfo,
    VideoOutput,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn null_config(engine: EngineKind) -> PlayerConfig {
    PlayerConfig::new(engine)
        .with_audio_output(AudioOutput::Null)
        .with_video_output(VideoOutput::Null)
}

fn write_wav(path: &Path, sample_rate: u32, frames: u32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        let s = ((i % 64) as i16 - 32) * 256;
        writer.write_sample(s).unwrap();
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

fn wav_fixture(dir: &Path, name: &str, seconds_tenths: u32) -> PathBuf {
    let path = dir.join(name);
    write_wav(&path, 8_000, 800 * seconds_tenths);
    path
}

fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Resolves after a delay, reporting the source size as the length
struct SlowBackend {
    delay: Duration,
    /// Give up early when cancelled
    cooperative: bool,
}

impl SlowBackend {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            cooperative: true,
        }
    }

    /// Sits out the whole delay even after cancellation
    fn stubborn(delay: Duration) -> Self {
        Self {
            delay,
            cooperative: false,
        }
    }
}

impl Backend for SlowBackend {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn supports_resource(&self, resource: MrlResource) -> bool {
        resource == MrlResource::File
    }

    fn resolve(
        &self,
        _locator: &MediaLocator,
        source: &SourceInfo,
        cancel: &CancelToken,
    ) -> Result<Resolution> {
        let deadline = Instant::now() + self.delay;
        while Instant::now() < deadline {
            if self.cooperative {
                cancel.check("resolve")?;
            }
            thread::sleep(Duration::from_millis(5));
        }
        let mut resolution = Resolution::default();
        resolution.properties.length_ms = source.size.map(|s| s as u32);
        Ok(resolution)
    }

    fn start(&self, _ctx: PlaybackContext) -> Result<Box<dyn Playback>> {
        Err(MediaError::PlaybackStartError("slow backend cannot play".to_string()))
    }
}

/// Playback that either has already run out or refuses to pause
struct ScriptedPlayback {
    finished: bool,
    refuse_pause: bool,
}

impl Playback for ScriptedPlayback {
    fn pause(&mut self) -> Result<()> {
        if self.refuse_pause {
            Err(MediaError::InvalidState("engine is gone".to_string()))
        } else {
            Ok(())
        }
    }

    fn resume(&mut self) -> Result<()> {
        Ok(())
    }

    fn seek(&mut self, _position_ms: u64) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn position_ms(&self) -> u64 {
        0
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

struct ScriptedBackend {
    finished: bool,
    refuse_pause: bool,
    starts: AtomicUsize,
}

impl ScriptedBackend {
    fn new(finished: bool, refuse_pause: bool) -> Self {
        Self {
            finished,
            refuse_pause,
            starts: AtomicUsize::new(0),
        }
    }
}

impl Backend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn supports_resource(&self, resource: MrlResource) -> bool {
        resource == MrlResource::File
    }

    fn resolve(
        &self,
        _locator: &MediaLocator,
        _source: &SourceInfo,
        _cancel: &CancelToken,
    ) -> Result<Resolution> {
        Ok(Resolution::default())
    }

    fn start(&self, _ctx: PlaybackContext) -> Result<Box<dyn Playback>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedPlayback {
            finished: self.finished,
            refuse_pause: self.refuse_pause,
        }))
    }
}

#[test]
fn test_open_then_close_twice() {
    for engine in [EngineKind::Symphonia, EngineKind::Dummy] {
        let session = Session::open(null_config(engine)).unwrap();
        assert_eq!(session.state(), SessionState::Open);
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }
}

#[test]
fn test_play_without_active_locator() {
    let configs = [
        null_config(EngineKind::Symphonia),
        null_config(EngineKind::Dummy),
        null_config(EngineKind::Dummy).with_video_output(VideoOutput::X11),
        null_config(EngineKind::Dummy).with_video_output(VideoOutput::Gl),
    ];
    for config in configs {
        let session = Session::open(config).unwrap();
        assert_eq!(session.play(), Err(MediaError::NoActiveMediaError));
        assert_eq!(session.state(), SessionState::Open);
    }
}

#[test]
fn test_symphonia_rejects_video_output() {
    let config = null_config(EngineKind::Symphonia).with_video_output(VideoOutput::X11);
    assert!(matches!(
        Session::open(config),
        Err(MediaError::BackendInitError(_))
    ));
}

#[test]
fn test_empty_locator_leaves_session_untouched() {
    let session = Session::open(null_config(EngineKind::Dummy)).unwrap();
    assert!(matches!(
        session.create_locator(""),
        Err(MediaError::InvalidLocatorError(_))
    ));
    assert_eq!(session.state(), SessionState::Open);
    assert!(session.active_locator().is_none());
    assert_eq!(session.resolution_status(), ResolutionStatus::None);
}

#[test]
fn test_size_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blob.bin");
    std::fs::write(&path, vec![7u8; 4321]).unwrap();

    let session = Session::open(null_config(EngineKind::Dummy)).unwrap();
    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();
    assert_eq!(session.media_size(), Some(4321));
}

#[test]
fn test_local_wav_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = wav_fixture(dir.path(), "sample.wav", 5);

    let config = null_config(EngineKind::Symphonia)
        .with_resolve_timeout(Duration::from_secs(5));
    let session = Session::open(config).unwrap();
    let uri = format!("file://{}", path.display());
    let locator = session.create_locator(&uri).unwrap();
    session.set_active(&locator).unwrap();

    assert_eq!(session.get_property(PropertyKey::Seekable), Some(1));
    assert_eq!(session.get_property(PropertyKey::AudioChannels), Some(2));
    assert_eq!(session.get_property(PropertyKey::SampleRate), Some(8_000));
    assert_eq!(session.get_property(PropertyKey::Length), Some(500));
    assert_eq!(session.get_metadata(MetadataKey::Title), None);
    assert_eq!(session.media_kind(), MediaKind::Audio);
    assert_eq!(session.audio_codec().as_deref(), Some("pcm_s16le"));
    assert_eq!(session.video_codec(), None);
    assert_eq!(session.resolution_status(), ResolutionStatus::Resolved);
}

#[test]
fn test_image_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cover.png");
    image::RgbImage::new(32, 16).save(&path).unwrap();

    let session = Session::open(null_config(EngineKind::Symphonia)).unwrap();
    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();
    assert!(session.wait_resolved(Duration::from_secs(5)));

    assert_eq!(session.media_kind(), MediaKind::Image);
    assert_eq!(session.get_property(PropertyKey::Width), Some(32));
    assert_eq!(session.get_property(PropertyKey::Height), Some(16));
    assert_eq!(session.get_property(PropertyKey::AudioChannels), Some(0));
}

#[test]
fn test_pending_resolution_reads_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.bin");
    std::fs::write(&path, vec![0u8; 100]).unwrap();

    let config = null_config(EngineKind::Dummy).with_resolve_timeout(Duration::from_millis(50));
    let backend = Arc::new(SlowBackend::new(Duration::from_millis(500)));
    let session = Session::open_with_backend(config, backend).unwrap();
    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();

    let started = Instant::now();
    assert_eq!(session.get_property(PropertyKey::Length), None);
    assert_eq!(session.get_metadata(MetadataKey::Artist), None);
    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(session.resolution_status(), ResolutionStatus::Pending);

    assert!(session.wait_resolved(Duration::from_secs(5)));
    assert_eq!(session.get_property(PropertyKey::Length), Some(100));
}

#[test]
fn test_replacing_locator_discards_previous_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.bin");
    let second = dir.path().join("second.bin");
    std::fs::write(&first, vec![0u8; 111]).unwrap();
    std::fs::write(&second, vec![0u8; 222]).unwrap();

    let config = null_config(EngineKind::Dummy).with_resolve_timeout(Duration::from_millis(20));
    let backend = Arc::new(SlowBackend::new(Duration::from_millis(200)));
    let session = Session::open_with_backend(config, backend).unwrap();

    let first = session.create_locator(first.to_str().unwrap()).unwrap();
    session.set_active(&first).unwrap();
    assert!(session.wait_resolved(Duration::from_secs(5)));
    assert_eq!(session.get_property(PropertyKey::Length), Some(111));

    let second = session.create_locator(second.to_str().unwrap()).unwrap();
    session.set_active(&second).unwrap();
    assert_eq!(session.get_property(PropertyKey::Length), None);
    assert_eq!(session.media_size(), Some(222));

    assert!(session.wait_resolved(Duration::from_secs(5)));
    assert_eq!(session.get_property(PropertyKey::Length), Some(222));
}

#[test]
fn test_close_during_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.bin");
    std::fs::write(&path, vec![0u8; 10]).unwrap();

    let backend = Arc::new(SlowBackend::new(Duration::from_millis(200)));
    let session = Session::open_with_backend(null_config(EngineKind::Dummy), backend).unwrap();
    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();
    session.close();

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.get_property(PropertyKey::Length), None);
    assert_eq!(session.resolution_status(), ResolutionStatus::None);
    assert_eq!(session.create_locator("/tmp/x.ogg"), Err(MediaError::SessionClosed));
    assert_eq!(session.play(), Err(MediaError::SessionClosed));
}

#[test]
fn test_foreign_locator_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = wav_fixture(dir.path(), "x.wav", 1);

    let owner = Session::open(null_config(EngineKind::Dummy)).unwrap();
    let other = Session::open(null_config(EngineKind::Dummy)).unwrap();
    let locator = owner.create_locator(path.to_str().unwrap()).unwrap();

    assert!(matches!(
        other.set_active(&locator),
        Err(MediaError::InvalidLocatorError(_))
    ));
    assert!(other.active_locator().is_none());
}

#[test]
fn test_unavailable_resources() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::open(null_config(EngineKind::Symphonia)).unwrap();

    let missing = session
        .create_locator(dir.path().join("missing.mp3").to_str().unwrap())
        .unwrap();
    assert!(matches!(
        session.set_active(&missing),
        Err(MediaError::ResourceUnavailableError(_))
    ));

    let dvd = session.create_locator("dvd://1").unwrap();
    assert!(matches!(
        session.set_active(&dvd),
        Err(MediaError::ResourceUnavailableError(_))
    ));
    assert!(session.active_locator().is_none());
}

#[test]
fn test_unsupported_container_fails_to_play() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake.mp3");
    std::fs::write(&path, b"definitely not an mpeg stream").unwrap();

    let session = Session::open(null_config(EngineKind::Symphonia)).unwrap();
    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();

    assert!(session.wait_resolved(Duration::from_secs(5)));
    assert_eq!(session.resolution_status(), ResolutionStatus::Failed);
    assert_eq!(session.get_property(PropertyKey::AudioChannels), None);
    assert!(matches!(
        session.play(),
        Err(MediaError::PlaybackStartError(_))
    ));
    assert_eq!(session.state(), SessionState::Open);
}

#[test]
fn test_playback_on_null_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = wav_fixture(dir.path(), "long.wav", 30);

    let session = Session::open(null_config(EngineKind::Symphonia)).unwrap();
    let listener = Arc::new(RecordingListener::new());
    session.subscribe(listener.clone());

    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();
    session.play().unwrap();
    assert_eq!(session.state(), SessionState::Playing);
    assert!(wait_for(Duration::from_secs(2), || session.position_ms() > 0));

    session.pause().unwrap();
    assert_eq!(session.state(), SessionState::Paused);
    session.play().unwrap();
    assert_eq!(session.state(), SessionState::Playing);

    let started = Instant::now();
    session.close();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(session.state(), SessionState::Closed);

    let events = listener.events();
    assert!(events.contains(&PlayerEvent::PlaybackStart));
    assert!(events.contains(&PlayerEvent::PlaybackStop));
    assert!(!events.contains(&PlayerEvent::PlaybackFinished));
}

#[test]
fn test_stream_end_stops_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = wav_fixture(dir.path(), "short.wav", 2);

    let session = Session::open(null_config(EngineKind::Symphonia)).unwrap();
    let listener = Arc::new(RecordingListener::new());
    session.subscribe(listener.clone());

    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();
    session.play().unwrap();

    assert!(wait_for(Duration::from_secs(5), || {
        session.state() == SessionState::Stopped
    }));
    assert!(listener.events().contains(&PlayerEvent::PlaybackFinished));

    // A finished session can play again
    session.play().unwrap();
    assert_eq!(session.state(), SessionState::Playing);
    session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test]
fn test_resolution_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = wav_fixture(dir.path(), "tagless.wav", 1);

    let session = Session::open(null_config(EngineKind::Dummy)).unwrap();
    let listener = Arc::new(RecordingListener::new());
    session.subscribe(listener.clone());

    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();
    assert!(session.wait_resolved(Duration::from_secs(5)));
    assert!(wait_for(Duration::from_secs(1), || {
        listener.events().contains(&PlayerEvent::MrlUpdated {
            uri: locator.uri().to_string(),
        })
    }));

    // The dummy engine only knows seekability
    assert_eq!(session.get_property(PropertyKey::Seekable), Some(1));
    assert_eq!(session.get_property(PropertyKey::AudioChannels), None);
    assert_eq!(session.media_kind(), MediaKind::Unknown);
}

#[test]
fn test_dummy_play_stop_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = wav_fixture(dir.path(), "any.wav", 1);

    let session = Session::open(null_config(EngineKind::Dummy)).unwrap();
    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();

    session.play().unwrap();
    assert_eq!(session.state(), SessionState::Playing);
    assert!(matches!(
        session.set_volume(1.5),
        Err(MediaError::InvalidArgument(_))
    ));
    session.set_volume(0.25).unwrap();
    session.set_muted(true).unwrap();
    assert_eq!(session.volume(), 0.25);
    assert!(session.is_muted());

    session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(matches!(session.pause(), Err(MediaError::InvalidState(_))));

    // Rebinding returns the session to Open
    session.set_active(&locator).unwrap();
    assert_eq!(session.state(), SessionState::Open);
}

#[test]
fn test_queries_stay_bounded_while_previous_resolution_winds_down() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.bin");
    let second = dir.path().join("second.bin");
    std::fs::write(&first, vec![0u8; 11]).unwrap();
    std::fs::write(&second, vec![0u8; 22]).unwrap();

    let config = null_config(EngineKind::Dummy).with_resolve_timeout(Duration::from_millis(50));
    let backend = Arc::new(SlowBackend::stubborn(Duration::from_millis(1500)));
    let session = Session::open_with_backend(config, backend).unwrap();
    let first = session.create_locator(first.to_str().unwrap()).unwrap();
    let second = session.create_locator(second.to_str().unwrap()).unwrap();
    session.set_active(&first).unwrap();

    thread::scope(|scope| {
        // Waits out the first resolver, which ignores cancellation
        let rebind = scope.spawn(|| session.set_active(&second));
        thread::sleep(Duration::from_millis(100));

        let started = Instant::now();
        assert_eq!(session.get_property(PropertyKey::Length), None);
        assert_eq!(session.media_size(), Some(22));
        assert!(
            started.elapsed() < Duration::from_millis(500),
            "queries blocked for {:?}",
            started.elapsed()
        );
        rebind.join().unwrap().unwrap();
    });
}

#[test]
fn test_close_cancels_pending_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.bin");
    std::fs::write(&path, vec![0u8; 10]).unwrap();

    let backend = Arc::new(SlowBackend::new(Duration::from_secs(10)));
    let session = Session::open_with_backend(null_config(EngineKind::Dummy), backend).unwrap();
    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();

    let started = Instant::now();
    session.close();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_seek_moves_playback_forward() {
    let dir = tempfile::tempdir().unwrap();
    let path = wav_fixture(dir.path(), "three.wav", 30);

    let session = Session::open(null_config(EngineKind::Symphonia)).unwrap();
    let listener = Arc::new(RecordingListener::new());
    session.subscribe(listener.clone());

    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();
    assert!(matches!(session.seek(1000), Err(MediaError::InvalidState(_))));

    session.play().unwrap();
    assert!(wait_for(Duration::from_secs(2), || session.position_ms() > 0));
    session.seek(2500).unwrap();
    assert!(wait_for(Duration::from_millis(500), || session.position_ms() >= 2000));

    // Only half a second is left after the jump
    assert!(wait_for(Duration::from_millis(2000), || {
        session.state() == SessionState::Stopped
    }));
    assert!(listener.events().contains(&PlayerEvent::PlaybackFinished));
}

#[test]
fn test_play_restarts_an_engine_that_ended_while_paused() {
    let dir = tempfile::tempdir().unwrap();
    let path = wav_fixture(dir.path(), "x.wav", 1);

    let backend = Arc::new(ScriptedBackend::new(true, false));
    let session =
        Session::open_with_backend(null_config(EngineKind::Dummy), backend.clone()).unwrap();
    let listener = Arc::new(RecordingListener::new());
    session.subscribe(listener.clone());
    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();

    session.play().unwrap();
    session.pause().unwrap();
    assert_eq!(session.state(), SessionState::Paused);

    session.play().unwrap();
    assert_eq!(session.state(), SessionState::Playing);
    assert_eq!(backend.starts.load(Ordering::SeqCst), 2);
    assert!(listener.events().contains(&PlayerEvent::StateChanged {
        old_state: SessionState::Paused,
        new_state: SessionState::Stopped,
    }));
}

#[test]
fn test_failed_pause_keeps_playing() {
    let dir = tempfile::tempdir().unwrap();
    let path = wav_fixture(dir.path(), "x.wav", 1);

    let backend = Arc::new(ScriptedBackend::new(false, true));
    let session = Session::open_with_backend(null_config(EngineKind::Dummy), backend).unwrap();
    let locator = session.create_locator(path.to_str().unwrap()).unwrap();
    session.set_active(&locator).unwrap();

    session.play().unwrap();
    assert!(matches!(session.pause(), Err(MediaError::InvalidState(_))));
    assert_eq!(session.state(), SessionState::Playing);
}
