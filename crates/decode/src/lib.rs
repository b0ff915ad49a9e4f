// Audio decoding using Symphonia

use mrlkit_core::{MediaError, Result};
use mrlkit_demux::Demuxer;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Packet;

/// Decoder for the track a `Demuxer` selected
pub struct AudioDecoder {
    decoder: Box<dyn Decoder>,
    sample_buf: Option<SampleBuffer<f32>>,
    sample_rate: u32,
    /// From the codec parameters until the first buffer is decoded
    channels: Option<u16>,
}

impl AudioDecoder {
    pub fn from_demuxer(demuxer: &Demuxer) -> Result<Self> {
        let codec_params = demuxer.codec_params();
        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| MediaError::DecodingError("Sample rate not specified".to_string()))?;
        let channels = codec_params.channels.map(|c| c.count() as u16);

        let decoder = symphonia::default::get_codecs()
            .make(codec_params, &DecoderOptions::default())
            .map_err(|e| MediaError::DecodingError(format!("Failed to create decoder: {}", e)))?;

        Ok(Self {
            decoder,
            sample_buf: None,
            sample_rate,
            channels,
        })
    }

    /// Decode one packet into interleaved f32 samples.
    ///
    /// A corrupt packet yields no samples rather than an error.
    pub fn decode(&mut self, packet: &Packet) -> Result<Vec<f32>> {
        let decoded = match self.decoder.decode(packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet: {}", e);
                return Ok(Vec::new());
            }
            Err(e) => return Err(MediaError::DecodingError(format!("Decoding failed: {}", e))),
        };

        let spec = *decoded.spec();
        self.sample_rate = spec.rate;
        self.channels = Some(spec.channels.count() as u16);
        let frames = decoded.capacity() as u64;
        let needed = frames as usize * spec.channels.count();
        let mut sample_buf = match self.sample_buf.take() {
            Some(buf) if buf.capacity() >= needed => buf,
            _ => SampleBuffer::new(frames, spec),
        };
        sample_buf.copy_interleaved_ref(decoded);
        let samples = sample_buf.samples().to_vec();
        self.sample_buf = Some(sample_buf);
        Ok(samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the decoded output; `None` when the container
    /// does not say and nothing has been decoded yet
    pub fn channels(&self) -> Option<u16> {
        self.channels
    }

    /// Forget decoder state after the demuxer seeks
    pub fn reset(&mut self) {
        self.decoder.reset();
    }
}
