// Playback thread: demux -> decode -> renderer

use crate::source::open_media_source;
use crossbeam_channel::RecvTimeoutError;
use mrlkit_core::{
    AudioOutput, CancelToken, MediaError, MediaLocator, Playback, PlaybackContext, PlayerEvent,
    Result, SessionState,
};
use mrlkit_decode::AudioDecoder;
use mrlkit_demux::Demuxer;
use mrlkit_renderer::{create_renderer, AudioRenderer, AudioSpec};
use mrlkit_transport_http::HttpClient;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// `seek_request` value meaning no seek is pending
const NO_SEEK: u64 = u64::MAX;

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub audio_output: AudioOutput,
    /// How long `spawn` waits for the thread to report it is playing
    pub start_timeout: Duration,
}

/// How the decode loop ended
enum Exit {
    Stopped,
    Finished,
    Failed,
}

/// Handle on a running decode thread
pub struct EnginePlayback {
    stop: CancelToken,
    paused: Arc<AtomicBool>,
    seek_request: Arc<AtomicU64>,
    position_ms: Arc<AtomicU64>,
    thread: Option<thread::JoinHandle<()>>,
}

/// Shared between the handle and the decode thread
struct Controls {
    stop: CancelToken,
    paused: Arc<AtomicBool>,
    seek_request: Arc<AtomicU64>,
    position_ms: Arc<AtomicU64>,
}

/// What `prepare` hands to the decode loop
struct Pipeline {
    demuxer: Demuxer,
    decoder: AudioDecoder,
    renderer: Box<dyn AudioRenderer>,
    /// Samples decoded while learning the channel layout
    first: Option<Vec<f32>>,
}

/// Start the decode thread and wait for it to acknowledge.
///
/// The renderer is created on the thread itself since cpal streams
/// cannot move between threads.
pub fn spawn(ctx: PlaybackContext, http: HttpClient, options: EngineOptions) -> Result<EnginePlayback> {
    let controls = Controls {
        stop: CancelToken::new(),
        paused: Arc::new(AtomicBool::new(false)),
        seek_request: Arc::new(AtomicU64::new(NO_SEEK)),
        position_ms: Arc::new(AtomicU64::new(0)),
    };
    let (ack_tx, ack_rx) = crossbeam_channel::bounded::<Result<()>>(1);

    let mut playback = EnginePlayback {
        stop: controls.stop.clone(),
        paused: controls.paused.clone(),
        seek_request: controls.seek_request.clone(),
        position_ms: controls.position_ms.clone(),
        thread: None,
    };

    let thread = thread::Builder::new()
        .name("mrl-engine".to_string())
        .spawn(move || {
            let pipeline = match prepare(&ctx.locator, &http, options.audio_output, &controls.stop) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    let _ = ack_tx.send(Err(e));
                    return;
                }
            };
            if ack_tx.send(Ok(())).is_err() || controls.stop.is_cancelled() {
                return;
            }
            run(ctx, pipeline, &controls);
        })?;
    playback.thread = Some(thread);

    match ack_rx.recv_timeout(options.start_timeout) {
        Ok(Ok(())) => Ok(playback),
        Ok(Err(e)) => {
            playback.stop();
            Err(MediaError::PlaybackStartError(e.to_string()))
        }
        Err(RecvTimeoutError::Timeout) => {
            playback.stop();
            Err(MediaError::PlaybackStartError(format!(
                "engine did not start within {:?}",
                options.start_timeout
            )))
        }
        Err(RecvTimeoutError::Disconnected) => {
            playback.stop();
            Err(MediaError::PlaybackStartError(
                "engine thread exited before starting".to_string(),
            ))
        }
    }
}

fn prepare(
    locator: &MediaLocator,
    http: &HttpClient,
    output: AudioOutput,
    stop: &CancelToken,
) -> Result<Pipeline> {
    let media_source = open_media_source(locator, http, stop)?;
    let extension = locator.extension();
    let mut demuxer = Demuxer::open(media_source, Demuxer::hint_for_extension(extension.as_deref()))?;
    let mut decoder = AudioDecoder::from_demuxer(&demuxer)?;

    // The output layout must match the decoded buffers, not the container's claim
    let mut first = None;
    while let Some(packet) = demuxer.next_packet()? {
        let pcm = decoder.decode(&packet)?;
        if !pcm.is_empty() {
            first = Some(pcm);
            break;
        }
    }

    let spec = AudioSpec {
        sample_rate: decoder.sample_rate(),
        // An empty stream writes nothing, so any layout will do
        channels: decoder.channels().unwrap_or(AudioSpec::default().channels),
    };
    log::info!(
        "[engine] {} sample_rate={} channels={}",
        locator,
        spec.sample_rate,
        spec.channels
    );
    let mut renderer = create_renderer(output, spec)?;
    renderer.start()?;
    Ok(Pipeline {
        demuxer,
        decoder,
        renderer,
        first,
    })
}

fn run(ctx: PlaybackContext, pipeline: Pipeline, controls: &Controls) {
    let Pipeline {
        mut demuxer,
        mut decoder,
        mut renderer,
        first,
    } = pipeline;
    let stop = controls.stop.as_flag();
    let spec = renderer.spec();
    let channels = spec.channels.max(1) as u64;
    let rate = spec.sample_rate.max(1) as u64;
    let mut pending = first;
    let mut base_ms: u64 = 0;
    let mut frames_written: u64 = 0;
    let mut renderer_paused = false;

    let exit = loop {
        if stop.load(Ordering::SeqCst) {
            break Exit::Stopped;
        }

        let target = controls.seek_request.swap(NO_SEEK, Ordering::SeqCst);
        if target != NO_SEEK {
            match demuxer.seek(target) {
                Ok(reached) => {
                    decoder.reset();
                    renderer.flush();
                    pending = None;
                    base_ms = reached;
                    frames_written = 0;
                    controls.position_ms.store(reached, Ordering::SeqCst);
                    ctx.state.update_status(|s| s.position_ms = reached);
                    log::info!("[engine] seek to {} ms (reached {} ms)", target, reached);
                }
                Err(e) => {
                    log::warn!("[engine] {}", e);
                    ctx.events.dispatch(PlayerEvent::Error {
                        message: e.to_string(),
                    });
                }
            }
        }

        if controls.paused.load(Ordering::SeqCst) {
            if !renderer_paused {
                if let Err(e) = renderer.pause() {
                    log::warn!("[engine] pause failed: {}", e);
                }
                renderer_paused = true;
            }
            thread::sleep(Duration::from_millis(10));
            continue;
        } else if renderer_paused {
            if let Err(e) = renderer.resume() {
                log::warn!("[engine] resume failed: {}", e);
            }
            renderer_paused = false;
        }

        let mut pcm = match pending.take() {
            Some(pcm) => pcm,
            None => {
                let packet = match demuxer.next_packet() {
                    Ok(Some(packet)) => packet,
                    Ok(None) => {
                        renderer.drain(stop);
                        break if stop.load(Ordering::SeqCst) {
                            Exit::Stopped
                        } else {
                            Exit::Finished
                        };
                    }
                    Err(e) => {
                        ctx.events.dispatch(PlayerEvent::Error {
                            message: e.to_string(),
                        });
                        log::error!("[engine] {}", e);
                        break Exit::Failed;
                    }
                };
                match decoder.decode(&packet) {
                    Ok(pcm) => pcm,
                    Err(e) => {
                        ctx.events.dispatch(PlayerEvent::Error {
                            message: e.to_string(),
                        });
                        log::error!("[engine] {}", e);
                        break Exit::Failed;
                    }
                }
            }
        };
        if pcm.is_empty() {
            continue;
        }
        if decoder.channels() != Some(spec.channels) {
            log::warn!(
                "[engine] dropping packet with {:?} channels, output has {}",
                decoder.channels(),
                spec.channels
            );
            continue;
        }

        let status = ctx.state.get_status();
        let gain = if status.muted { 0.0 } else { status.volume };
        if gain != 1.0 {
            pcm.iter_mut().for_each(|s| *s *= gain);
        }

        match renderer.write(&pcm, stop) {
            Ok(written) => frames_written += written as u64 / channels,
            Err(e) => {
                log::error!("[engine] output failed: {}", e);
                break Exit::Failed;
            }
        }

        let played = frames_written.saturating_sub(renderer.queued() as u64 / channels);
        let pos = base_ms + played * 1000 / rate;
        controls.position_ms.store(pos, Ordering::SeqCst);
        ctx.state.update_status(|s| s.position_ms = pos);
        ctx.events
            .dispatch(PlayerEvent::PositionChanged { position_ms: pos });
    };

    if let Err(e) = renderer.release() {
        log::warn!("[engine] release failed: {}", e);
    }

    match exit {
        Exit::Stopped => log::debug!("[engine] stop requested"),
        Exit::Finished | Exit::Failed => {
            // A pause may have landed after the last packet; the stream is over either way.
            // A concurrent stop or close has already moved the state on.
            let old_state = [SessionState::Playing, SessionState::Paused]
                .into_iter()
                .find(|from| ctx.state.transition_if(*from, SessionState::Stopped));
            if let Some(old_state) = old_state {
                ctx.events.dispatch(PlayerEvent::StateChanged {
                    old_state,
                    new_state: SessionState::Stopped,
                });
                if matches!(exit, Exit::Finished) {
                    log::info!("[engine] end of stream for {}", ctx.locator);
                    ctx.events.dispatch(PlayerEvent::PlaybackFinished);
                }
            }
        }
    }
}

impl Playback for EnginePlayback {
    fn pause(&mut self) -> Result<()> {
        if self.is_finished() {
            return Err(MediaError::InvalidState("playback has already ended".to_string()));
        }
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if self.is_finished() {
            return Err(MediaError::InvalidState("playback has already ended".to_string()));
        }
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        if self.is_finished() {
            return Err(MediaError::InvalidState("playback has already ended".to_string()));
        }
        // Report the target straight away; the decode thread corrects it once the demuxer lands
        self.position_ms.store(position_ms, Ordering::SeqCst);
        self.seek_request.store(position_ms, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.cancel();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("[engine] decode thread panicked");
            }
        }
    }

    fn position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::SeqCst)
    }

    fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |handle| handle.is_finished())
    }
}

impl Drop for EnginePlayback {
    fn drop(&mut self) {
        self.stop();
    }
}
