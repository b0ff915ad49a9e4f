// Media Resource Locators

use crate::error::{MediaError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Resource class of a locator, taken from its URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MrlResource {
    // Local streams
    Fifo,
    File,
    Stdin,

    // Audio CD
    Cdda,
    Cddb,

    // Video discs
    Dvd,
    DvdNav,
    Vcd,

    // Radio/Television
    Dvb,
    Pvr,
    Radio,
    Tv,

    // Network streams
    Ftp,
    Http,
    Https,
    Mms,
    Rtp,
    Rtsp,
    Smb,
    Tcp,
    Udp,
    Unsv,
}

impl MrlResource {
    fn from_scheme(scheme: &str) -> Option<Self> {
        let resource = match scheme {
            "fifo" => MrlResource::Fifo,
            "file" => MrlResource::File,
            "stdin" => MrlResource::Stdin,
            "cdda" => MrlResource::Cdda,
            "cddb" => MrlResource::Cddb,
            "dvd" => MrlResource::Dvd,
            "dvdnav" => MrlResource::DvdNav,
            "vcd" => MrlResource::Vcd,
            "dvb" => MrlResource::Dvb,
            "pvr" => MrlResource::Pvr,
            "radio" => MrlResource::Radio,
            "tv" => MrlResource::Tv,
            "ftp" => MrlResource::Ftp,
            "http" => MrlResource::Http,
            "https" => MrlResource::Https,
            "mms" => MrlResource::Mms,
            "rtp" => MrlResource::Rtp,
            "rtsp" => MrlResource::Rtsp,
            "smb" => MrlResource::Smb,
            "tcp" => MrlResource::Tcp,
            "udp" => MrlResource::Udp,
            "unsv" => MrlResource::Unsv,
            _ => return None,
        };
        Some(resource)
    }

    /// Local resources address the filesystem directly
    pub fn is_local(self) -> bool {
        matches!(self, MrlResource::File | MrlResource::Fifo | MrlResource::Stdin)
    }

    pub fn is_network(self) -> bool {
        matches!(
            self,
            MrlResource::Ftp
                | MrlResource::Http
                | MrlResource::Https
                | MrlResource::Mms
                | MrlResource::Rtp
                | MrlResource::Rtsp
                | MrlResource::Smb
                | MrlResource::Tcp
                | MrlResource::Udp
                | MrlResource::Unsv
        )
    }
}

impl fmt::Display for MrlResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{:?}", self).to_lowercase();
        f.write_str(&name)
    }
}

/// Where a locator points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Local filesystem path
    Path(PathBuf),
    /// Full URL, passed to the transport untouched
    Url(String),
    /// Device or channel reference (`dvd://1`, `tv://5`, ...)
    Device(String),
}

/// One addressable media resource, bound to the session that created it.
///
/// A locator only says where the media lives. What it resolves to (kind,
/// byte size, seekability and the other properties) is answered by the
/// owning `Session` once the locator is active: `media_kind`, `media_size`
/// and `get_property(PropertyKey::Seekable)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLocator {
    uri: String,
    resource: MrlResource,
    location: Location,
    session_id: u64,
}

fn invalid(message: String) -> MediaError {
    MediaError::InvalidLocatorError(message)
}

impl MediaLocator {
    /// Parse `uri` into a locator owned by `session_id`.
    ///
    /// Accepts bare filesystem paths and `scheme://rest` URIs. Nothing is
    /// opened or probed here.
    pub fn parse(uri: &str, session_id: u64) -> Result<Self> {
        if uri.trim().is_empty() {
            return Err(invalid("empty locator".to_string()));
        }
        if uri.contains('\0') {
            return Err(invalid("locator contains a NUL byte".to_string()));
        }

        let (resource, location) = match uri.split_once("://") {
            None => (MrlResource::File, Location::Path(PathBuf::from(uri))),
            Some((_, rest)) => {
                if rest.is_empty() {
                    return Err(invalid(format!("'{}' has no location after the scheme", uri)));
                }
                let url = Url::parse(uri).map_err(|e| invalid(format!("'{}': {}", uri, e)))?;
                let resource = MrlResource::from_scheme(url.scheme())
                    .ok_or_else(|| invalid(format!("unknown scheme '{}'", url.scheme())))?;
                (resource, Self::parse_location(resource, uri, &url, rest)?)
            }
        };

        Ok(Self {
            uri: uri.to_string(),
            resource,
            location,
            session_id,
        })
    }

    fn parse_location(
        resource: MrlResource,
        uri: &str,
        url: &Url,
        rest: &str,
    ) -> Result<Location> {
        match resource {
            MrlResource::File | MrlResource::Fifo => {
                // fifo:// takes the same path syntax as file://
                let file_url = match resource {
                    MrlResource::Fifo => Url::parse(&format!("file://{}", rest))
                        .map_err(|e| invalid(format!("'{}': {}", uri, e)))?,
                    _ => url.clone(),
                };
                if has_malformed_escape(file_url.path()) {
                    return Err(invalid(format!("bad percent-escape in '{}'", uri)));
                }
                let path = file_url
                    .to_file_path()
                    .map_err(|()| invalid(format!("'{}' must name an absolute local path", uri)))?;
                Ok(Location::Path(path))
            }
            MrlResource::Http | MrlResource::Https | MrlResource::Ftp | MrlResource::Smb => {
                // Special schemes skip extra slashes, so `http:///x` would parse with host `x`
                let has_host =
                    !rest.starts_with('/') && url.host_str().is_some_and(|h| !h.is_empty());
                if !has_host {
                    return Err(invalid(format!("'{}' has no host", uri)));
                }
                Ok(Location::Url(uri.to_string()))
            }
            _ if resource.is_network() => Ok(Location::Url(uri.to_string())),
            _ => Ok(Location::Device(rest.to_string())),
        }
    }

    /// The original string this locator was created from
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn resource(&self) -> MrlResource {
        self.resource
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Filesystem path for local locators
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Lower-cased file extension, used as a format hint
    pub fn extension(&self) -> Option<String> {
        let file = match &self.location {
            Location::Path(path) => path.file_name()?.to_str()?.to_string(),
            Location::Url(url) => Url::parse(url).ok()?.path_segments()?.last()?.to_string(),
            Location::Device(_) => return None,
        };
        let (_, ext) = file.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_ascii_lowercase())
        }
    }

    /// Id of the session this locator belongs to
    pub fn session_id(&self) -> u64 {
        self.session_id
    }
}

impl fmt::Display for MediaLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// A `%` not followed by two hex digits
fn has_malformed_escape(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    })
}
