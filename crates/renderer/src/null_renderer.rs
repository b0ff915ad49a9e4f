// Discarding renderer that still consumes audio in real time

use crate::{AudioRenderer, AudioSpec};
use mrlkit_core::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const MAX_SLEEP: Duration = Duration::from_millis(10);

/// Drops every sample but paces writes to the stream's sample rate,
/// so positions and end-of-stream timing match a real device
pub struct NullRenderer {
    spec: AudioSpec,
    origin: Instant,
    frames: u64,
}

impl NullRenderer {
    pub fn new(spec: AudioSpec) -> Self {
        Self {
            spec,
            origin: Instant::now(),
            frames: 0,
        }
    }

    fn played(&self) -> Duration {
        Duration::from_micros(self.frames * 1_000_000 / self.spec.sample_rate.max(1) as u64)
    }
}

impl AudioRenderer for NullRenderer {
    fn start(&mut self) -> Result<()> {
        self.origin = Instant::now();
        self.frames = 0;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        // Time spent paused must not count as played
        let now = Instant::now();
        self.origin = now.checked_sub(self.played()).unwrap_or(now);
        Ok(())
    }

    fn write(&mut self, samples: &[f32], stop: &AtomicBool) -> Result<usize> {
        self.frames += (samples.len() / self.spec.channels.max(1) as usize) as u64;
        let deadline = self.origin + self.played();
        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(MAX_SLEEP));
        }
        Ok(samples.len())
    }

    fn flush(&mut self) {
        self.origin = Instant::now();
        self.frames = 0;
    }

    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}
