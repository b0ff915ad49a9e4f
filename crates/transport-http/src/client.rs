// HTTP client configuration and resource inspection

use mrlkit_core::{MediaError, Result};
use std::time::Duration;

/// Create a configured HTTP agent with bounded timeouts.
///
/// The read timeout caps how long any worker thread can block on a
/// stalled server, which in turn bounds how long `close` may wait.
pub fn create_http_agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(10))
        .timeout_read(Duration::from_secs(15))
        .timeout_write(Duration::from_secs(10))
        .user_agent(concat!("mrlkit/", env!("CARGO_PKG_VERSION")))
        .redirects(10)
        .build()
}

/// What a HEAD (or probing range) request told us about a remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteInfo {
    pub content_length: Option<u64>,
    /// Server honours `Range` requests
    pub accepts_ranges: bool,
}

/// HTTP client wrapper
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            agent: create_http_agent(),
        }
    }

    /// Check the resource is reachable and learn its size and seekability
    pub fn inspect(&self, url: &str) -> Result<RemoteInfo> {
        match self.agent.head(url).call() {
            Ok(response) => {
                let info = RemoteInfo {
                    content_length: response
                        .header("Content-Length")
                        .and_then(|s| s.trim().parse::<u64>().ok()),
                    accepts_ranges: response
                        .header("Accept-Ranges")
                        .map(|v| v.to_ascii_lowercase().contains("bytes"))
                        .unwrap_or(false),
                };
                if info.accepts_ranges {
                    return Ok(info);
                }
                // Some servers only reveal range support on a GET
                Ok(self.inspect_with_range_request(url).unwrap_or(info))
            }
            Err(ureq::Error::Status(code, _)) if code == 404 || code == 410 => Err(
                MediaError::NetworkError(format!("HTTP {} for {}", code, url)),
            ),
            Err(e) => {
                log::debug!("HEAD {} failed ({}), trying a range request", url, e);
                self.inspect_with_range_request(url)
            }
        }
    }

    fn inspect_with_range_request(&self, url: &str) -> Result<RemoteInfo> {
        let response = self
            .agent
            .get(url)
            .set("Range", "bytes=0-0")
            .call()
            .map_err(|e| MediaError::NetworkError(format!("GET {} failed: {}", url, e)))?;

        if response.status() == 206 {
            let total = response
                .header("Content-Range")
                .and_then(parse_total_from_content_range);
            return Ok(RemoteInfo {
                content_length: total,
                accepts_ranges: true,
            });
        }

        Ok(RemoteInfo {
            content_length: response
                .header("Content-Length")
                .and_then(|s| s.trim().parse::<u64>().ok()),
            accepts_ranges: false,
        })
    }

    /// Plain GET returning the body as a sequential stream
    pub fn get_stream(&self, url: &str) -> Result<Box<dyn std::io::Read + Send + Sync>> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| MediaError::NetworkError(format!("GET {} failed: {}", url, e)))?;
        Ok(response.into_reader())
    }

    pub fn get_range(&self, url: &str, start: u64, end: u64) -> Result<ureq::Response> {
        self.agent
            .get(url)
            .set("Range", &format!("bytes={}-{}", start, end))
            .call()
            .map_err(|e| MediaError::NetworkError(format!("Range request failed: {}", e)))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Total size from a `Content-Range: bytes 0-0/12345` header
pub fn parse_total_from_content_range(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse::<u64>().ok()
}
