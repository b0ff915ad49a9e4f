// Container probing and demuxing for mrlkit backends

pub mod demuxer;
pub mod image_probe;
pub mod probe;

pub use demuxer::Demuxer;
pub use image_probe::{is_image_extension, probe_image};
pub use probe::{codec_name, describe, probe_media};
