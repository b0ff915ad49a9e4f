// Audio output for the playback engine

mod cpal_renderer;
mod null_renderer;

pub use cpal_renderer::CpalRenderer;
pub use null_renderer::NullRenderer;

use cpal::traits::HostTrait;
use mrlkit_core::{AudioOutput, Result};
use std::sync::atomic::AtomicBool;

/// Audio renderer trait.
///
/// Renderers live on the engine thread that created them and are never
/// moved across threads (cpal streams cannot be).
pub trait AudioRenderer {
    /// Start the audio stream
    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn resume(&mut self) -> Result<()>;

    /// Queue interleaved samples, blocking while the output catches up.
    /// Returns early once `stop` is raised.
    fn write(&mut self, samples: &[f32], stop: &AtomicBool) -> Result<usize>;

    /// Block until everything queued has been played, or `stop` is raised
    fn drain(&mut self, _stop: &AtomicBool) {}

    /// Drop everything queued, e.g. after a seek
    fn flush(&mut self) {}

    /// Samples accepted but not yet played
    fn queued(&self) -> usize {
        0
    }

    fn spec(&self) -> AudioSpec;

    /// Release all audio resources
    fn release(&mut self) -> Result<()>;
}

/// PCM layout fed to a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

/// Whether the default host exposes an output device
pub fn default_output_available() -> bool {
    cpal::default_host().default_output_device().is_some()
}

/// Renderer for the configured audio output
pub fn create_renderer(output: AudioOutput, spec: AudioSpec) -> Result<Box<dyn AudioRenderer>> {
    match output {
        AudioOutput::Null => Ok(Box::new(NullRenderer::new(spec))),
        AudioOutput::Auto => Ok(Box::new(CpalRenderer::new(spec)?)),
    }
}
