// cpal-based audio renderer on the default output device

use crate::{AudioRenderer, AudioSpec};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use mrlkit_core::{MediaError, Result};
use mrlkit_ringbuffer::SharedRingBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// cpal audio renderer
pub struct CpalRenderer {
    stream: Option<Stream>,
    ring_buffer: SharedRingBuffer,
    is_playing: Arc<AtomicBool>,
    spec: AudioSpec,
}

impl CpalRenderer {
    pub fn new(spec: AudioSpec) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MediaError::BackendInitError("No output device available".to_string()))?;

        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // Half a second of audio between the decoder and the device
        let ring_buffer =
            SharedRingBuffer::new(spec.sample_rate as usize * spec.channels as usize / 2);
        let is_playing = Arc::new(AtomicBool::new(false));

        let ring_buffer_clone = ring_buffer.clone();
        let is_playing_clone = is_playing.clone();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !is_playing_clone.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }

                    let samples_written = ring_buffer_clone.read(data);
                    // Zero-fill any unwritten samples to prevent playing stale data
                    if samples_written < data.len() {
                        data[samples_written..].fill(0.0);
                    }
                },
                |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| {
                MediaError::PlaybackStartError(format!("Failed to build output stream: {}", e))
            })?;

        Ok(Self {
            stream: Some(stream),
            ring_buffer,
            is_playing,
            spec,
        })
    }

    fn set_playing(&mut self, playing: bool) -> Result<()> {
        self.is_playing.store(playing, Ordering::Relaxed);
        if let Some(stream) = &self.stream {
            if playing {
                stream.play().map_err(|e| {
                    MediaError::PlaybackStartError(format!("Failed to start stream: {}", e))
                })?;
            } else {
                stream.pause().map_err(|e| {
                    MediaError::PlaybackStartError(format!("Failed to pause stream: {}", e))
                })?;
            }
        }
        Ok(())
    }
}

impl AudioRenderer for CpalRenderer {
    fn start(&mut self) -> Result<()> {
        self.set_playing(true)
    }

    fn pause(&mut self) -> Result<()> {
        self.set_playing(false)
    }

    fn resume(&mut self) -> Result<()> {
        self.set_playing(true)
    }

    fn write(&mut self, samples: &[f32], stop: &AtomicBool) -> Result<usize> {
        Ok(self.ring_buffer.write_all(samples, stop))
    }

    fn drain(&mut self, stop: &AtomicBool) {
        while !self.ring_buffer.is_empty() && !stop.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn flush(&mut self) {
        self.ring_buffer.clear();
    }

    fn queued(&self) -> usize {
        self.ring_buffer.len()
    }

    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn release(&mut self) -> Result<()> {
        self.is_playing.store(false, Ordering::Relaxed);
        self.ring_buffer.clear();
        self.stream = None;
        Ok(())
    }
}
