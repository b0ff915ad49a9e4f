// Opening the resource behind a locator

use mrlkit_core::{CancelToken, Location, MediaError, MediaLocator, MrlResource, Result, SourceInfo};
use mrlkit_transport_http::{HttpClient, HttpRangeSource};
use std::fs::File;
use std::io::{self, Read};
use symphonia::core::io::{MediaSource, ReadOnlySource};

/// Check the resource exists and learn its size and seekability.
///
/// Errors come back as `ResourceUnavailableError`.
pub fn inspect_source(locator: &MediaLocator, http: &HttpClient) -> Result<SourceInfo> {
    let unavailable =
        |e: MediaError| MediaError::ResourceUnavailableError(format!("{}: {}", locator, e));

    match (locator.resource(), locator.location()) {
        (MrlResource::File, Location::Path(path)) => {
            let meta = std::fs::metadata(path)
                .map_err(|e| unavailable(MediaError::IoError(e.to_string())))?;
            if !meta.is_file() {
                return Err(MediaError::ResourceUnavailableError(format!(
                    "{} is not a regular file",
                    locator
                )));
            }
            Ok(SourceInfo {
                size: Some(meta.len()),
                seekable: true,
            })
        }
        (MrlResource::Http | MrlResource::Https, Location::Url(url)) => {
            let info = http.inspect(url).map_err(unavailable)?;
            Ok(SourceInfo {
                size: info.content_length,
                seekable: info.accepts_ranges,
            })
        }
        // Devices and streaming protocols are left to the engine
        _ => Ok(SourceInfo::default()),
    }
}

/// Sequential network reader that gives up once its token is cancelled
struct CancellableRead<R> {
    inner: R,
    cancel: CancelToken,
}

impl<R: Read> Read for CancellableRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Other, "read cancelled"));
        }
        self.inner.read(buf)
    }
}

/// Open a byte stream Symphonia can probe and demux.
///
/// Network reads fail soon after `cancel` is raised; local files are
/// read to completion.
pub fn open_media_source(
    locator: &MediaLocator,
    http: &HttpClient,
    cancel: &CancelToken,
) -> Result<Box<dyn MediaSource>> {
    match (locator.resource(), locator.location()) {
        (MrlResource::File, Location::Path(path)) => Ok(Box::new(File::open(path)?)),
        (MrlResource::Http | MrlResource::Https, Location::Url(url)) => {
            let info = http.inspect(url)?;
            cancel.check("open")?;
            if info.accepts_ranges {
                let source = HttpRangeSource::new(http.clone(), url.clone(), info)
                    .with_cancel(cancel.clone());
                Ok(Box::new(source))
            } else {
                log::debug!("{} does not accept ranges, reading sequentially", url);
                let reader = CancellableRead {
                    inner: http.get_stream(url)?,
                    cancel: cancel.clone(),
                };
                Ok(Box::new(ReadOnlySource::new(reader)))
            }
        }
        (resource, _) => Err(MediaError::ResourceUnavailableError(format!(
            "cannot read {} resources",
            resource
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, vec![0u8; 1234]).unwrap();

        let locator = MediaLocator::parse(path.to_str().unwrap(), 1).unwrap();
        let info = inspect_source(&locator, &HttpClient::new()).unwrap();
        assert_eq!(info.size, Some(1234));
        assert!(info.seekable);
    }

    #[test]
    fn test_inspect_rejects_missing_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let http = HttpClient::new();

        let missing = MediaLocator::parse(dir.path().join("nope.ogg").to_str().unwrap(), 1).unwrap();
        assert!(matches!(
            inspect_source(&missing, &http),
            Err(MediaError::ResourceUnavailableError(_))
        ));

        let directory = MediaLocator::parse(dir.path().to_str().unwrap(), 1).unwrap();
        assert!(matches!(
            inspect_source(&directory, &http),
            Err(MediaError::ResourceUnavailableError(_))
        ));
    }

    #[test]
    fn test_device_resources_are_not_read() {
        let locator = MediaLocator::parse("dvd://1", 1).unwrap();
        let http = HttpClient::new();
        assert_eq!(inspect_source(&locator, &http).unwrap(), SourceInfo::default());
        assert!(open_media_source(&locator, &http, &CancelToken::new()).is_err());
    }

    #[test]
    fn test_cancelled_sequential_read_fails() {
        let cancel = CancelToken::new();
        let mut reader = CancellableRead {
            inner: io::Cursor::new(vec![7u8; 16]),
            cancel: cancel.clone(),
        };
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 8);

        cancel.cancel();
        assert!(reader.read(&mut buf).is_err());
    }
}
