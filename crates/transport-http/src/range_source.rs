// HTTP Range-based media source for on-demand reads

use crate::client::{HttpClient, RemoteInfo};
use mrlkit_core::{CancelToken, Result};
use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom};

/// Chunk size for Range requests (256KB)
const CHUNK_SIZE: u64 = 256 * 1024;

/// Maximum cache size (8MB)
const MAX_CACHE_SIZE: usize = 8 * 1024 * 1024;

struct CacheEntry {
    offset: u64,
    data: Vec<u8>,
}

impl CacheEntry {
    fn covers(&self, offset: u64) -> bool {
        offset >= self.offset && offset < self.offset + self.data.len() as u64
    }
}

/// Seekable reader over an HTTP resource that serves `Range` requests
pub struct HttpRangeSource {
    client: HttpClient,
    url: String,
    total_size: Option<u64>,
    position: u64,
    cache: VecDeque<CacheEntry>,
    cached_bytes: usize,
    cancel: Option<CancelToken>,
}

impl HttpRangeSource {
    /// `info` comes from an earlier `HttpClient::inspect` of the same URL
    pub fn new(client: HttpClient, url: impl Into<String>, info: RemoteInfo) -> Self {
        let url = url.into();
        if let Some(size) = info.content_length {
            log::debug!(
                "HTTP range source for {}: {} bytes ({:.2} MB)",
                url,
                size,
                size as f64 / 1024.0 / 1024.0
            );
        }
        Self {
            client,
            url,
            total_size: info.content_length,
            position: 0,
            cache: VecDeque::new(),
            cached_bytes: 0,
            cancel: None,
        }
    }

    /// Fail reads that would hit the network once `cancel` is raised
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn fetch_chunk(&mut self, offset: u64) -> Result<usize> {
        let mut end = offset + CHUNK_SIZE - 1;
        if let Some(total) = self.total_size {
            end = end.min(total.saturating_sub(1));
        }

        log::debug!("Fetching range: bytes={}-{}", offset, end);
        let response = self.client.get_range(&self.url, offset, end)?;
        let mut data = Vec::with_capacity((end - offset + 1) as usize);
        response.into_reader().read_to_end(&mut data)?;

        let len = data.len();
        self.cached_bytes += len;
        self.cache.push_back(CacheEntry { offset, data });
        while self.cached_bytes > MAX_CACHE_SIZE {
            match self.cache.pop_front() {
                Some(old) => self.cached_bytes -= old.data.len(),
                None => break,
            }
        }
        Ok(len)
    }

    fn read_cached(&self, buf: &mut [u8]) -> Option<usize> {
        let entry = self.cache.iter().find(|e| e.covers(self.position))?;
        let start = (self.position - entry.offset) as usize;
        let n = buf.len().min(entry.data.len() - start);
        buf[..n].copy_from_slice(&entry.data[start..start + n]);
        Some(n)
    }
}

impl Read for HttpRangeSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(total) = self.total_size {
            if self.position >= total {
                return Ok(0);
            }
        }

        let n = match self.read_cached(buf) {
            Some(n) => n,
            None => {
                if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                    return Err(io::Error::new(io::ErrorKind::Other, "read cancelled"));
                }
                let fetched = self
                    .fetch_chunk(self.position)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
                if fetched == 0 {
                    return Ok(0);
                }
                self.read_cached(buf).unwrap_or(0)
            }
        };
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for HttpRangeSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(pos) => Some(pos),
            SeekFrom::Current(offset) => self.position.checked_add_signed(offset),
            SeekFrom::End(offset) => {
                let total = self.total_size.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::Unsupported, "total size unknown")
                })?;
                total.checked_add_signed(offset)
            }
        };

        let new_pos = new_pos.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
        })?;
        self.position = new_pos;
        Ok(new_pos)
    }
}

impl symphonia::core::io::MediaSource for HttpRangeSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        self.total_size
    }
}
