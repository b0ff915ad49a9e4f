// PCM ring buffer between the decode thread and the audio callback

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Fixed-capacity single-producer/single-consumer sample queue.
///
/// One slot is always kept free so `read_pos == write_pos` means empty.
pub struct PcmRingBuffer {
    buffer: Vec<f32>,
    write_pos: usize,
    read_pos: usize,
}

impl PcmRingBuffer {
    /// `capacity` is in samples and must be at least 2
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(2)],
            write_pos: 0,
            read_pos: 0,
        }
    }

    fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Copy as much of `data` as fits; returns the number of samples taken
    pub fn write(&mut self, data: &[f32]) -> usize {
        let to_write = data.len().min(self.free());
        if to_write == 0 {
            return 0;
        }

        let size = self.size();
        let first = to_write.min(size - self.write_pos);
        self.buffer[self.write_pos..self.write_pos + first].copy_from_slice(&data[..first]);
        let second = to_write - first;
        if second > 0 {
            self.buffer[..second].copy_from_slice(&data[first..to_write]);
        }
        self.write_pos = (self.write_pos + to_write) % size;

        to_write
    }

    /// Fill `output` from the queue; returns the number of samples produced
    pub fn read(&mut self, output: &mut [f32]) -> usize {
        let to_read = output.len().min(self.len());
        if to_read == 0 {
            return 0;
        }

        let size = self.size();
        let first = to_read.min(size - self.read_pos);
        output[..first].copy_from_slice(&self.buffer[self.read_pos..self.read_pos + first]);
        let second = to_read - first;
        if second > 0 {
            output[first..to_read].copy_from_slice(&self.buffer[..second]);
        }
        self.read_pos = (self.read_pos + to_read) % size;

        to_read
    }

    /// Samples waiting to be read
    pub fn len(&self) -> usize {
        if self.write_pos >= self.read_pos {
            self.write_pos - self.read_pos
        } else {
            self.size() - (self.read_pos - self.write_pos)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples that can be written right now
    pub fn free(&self) -> usize {
        self.size() - self.len() - 1
    }

    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.read_pos = 0;
    }

    /// Fill level from 0.0 to 1.0
    pub fn fullness(&self) -> f32 {
        self.len() as f32 / (self.size() - 1) as f32
    }
}

/// Shared handle on a `PcmRingBuffer`
#[derive(Clone)]
pub struct SharedRingBuffer {
    inner: Arc<Mutex<PcmRingBuffer>>,
}

impl SharedRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PcmRingBuffer::new(capacity))),
        }
    }

    pub fn write(&self, data: &[f32]) -> usize {
        self.inner.lock().write(data)
    }

    pub fn read(&self, output: &mut [f32]) -> usize {
        self.inner.lock().read(output)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear()
    }

    pub fn fullness(&self) -> f32 {
        self.inner.lock().fullness()
    }

    /// Push every sample, sleeping while the buffer is full.
    ///
    /// Gives up early when `stop` is raised; returns the samples written.
    pub fn write_all(&self, data: &[f32], stop: &AtomicBool) -> usize {
        let mut written = 0;
        while written < data.len() {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let mut buffer = self.inner.lock();
            let w = buffer.write(&data[written..]);
            if w > 0 {
                written += w;
                continue;
            }

            // Longer sleep when the consumer has more left to play
            let fullness = buffer.fullness();
            drop(buffer);
            let sleep_ms = if fullness > 0.9 {
                15
            } else if fullness > 0.7 {
                10
            } else {
                5
            };
            thread::sleep(Duration::from_millis(sleep_ms));
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_around_preserves_order() {
        let mut ring = PcmRingBuffer::new(5);
        assert_eq!(ring.write(&[1.0, 2.0, 3.0]), 3);

        let mut out = [0.0; 2];
        assert_eq!(ring.read(&mut out), 2);
        assert_eq!(out, [1.0, 2.0]);

        // Crosses the end of the backing storage
        assert_eq!(ring.write(&[4.0, 5.0, 6.0]), 3);
        let mut out = [0.0; 4];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_capacity_keeps_one_slot_free() {
        let mut ring = PcmRingBuffer::new(4);
        assert_eq!(ring.write(&[1.0; 10]), 3);
        assert_eq!(ring.free(), 0);
        assert_eq!(ring.fullness(), 1.0);

        ring.clear();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.free(), 3);
    }

    #[test]
    fn test_write_all_stops_when_signalled() {
        let ring = SharedRingBuffer::new(4);
        let stop = AtomicBool::new(true);
        assert_eq!(ring.write_all(&[0.5; 8], &stop), 0);
    }

    #[test]
    fn test_write_all_waits_for_consumer() {
        let ring = SharedRingBuffer::new(4);
        let consumer = ring.clone();
        let stop = Arc::new(AtomicBool::new(false));

        let reader = thread::spawn(move || {
            let mut drained = Vec::new();
            let mut out = [0.0; 2];
            while drained.len() < 6 {
                let n = consumer.read(&mut out);
                drained.extend_from_slice(&out[..n]);
                thread::sleep(Duration::from_millis(1));
            }
            drained
        });

        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(ring.write_all(&data, &stop), 6);
        assert_eq!(reader.join().unwrap(), data.to_vec());
    }
}
