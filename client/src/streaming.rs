//! Reader for the streaming connections, which deliver one dataset after another, each
//! preceded by a response-style header carrying its length.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use hyperion_protocol::data::{
    AMPLITUDE_SIZE, MAX_AMPLITUDES_PER_CHANNEL, MAX_CHANNEL_COUNT, MAX_PEAKS_PER_CHANNEL, PEAK_WAVELENGTH_SIZE,
    SENSOR_VALUE_SIZE,
};
use hyperion_protocol::{decode_response_header, HEADER_SIZE};

use crate::read::{read_exact_resilient, read_exact_resilient_async};
use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamingMode {
    Peaks,
    Spectrum,
    Sensor,
}

impl StreamingMode {
    /// Size of the buffer preallocated by a [`StreamingDataReader`] for this mode.
    pub fn max_buffer_size(&self) -> usize {
        match self {
            StreamingMode::Peaks => MAX_CHANNEL_COUNT * MAX_PEAKS_PER_CHANNEL * PEAK_WAVELENGTH_SIZE,
            StreamingMode::Spectrum => MAX_CHANNEL_COUNT * MAX_AMPLITUDES_PER_CHANNEL * AMPLITUDE_SIZE,
            StreamingMode::Sensor => MAX_CHANNEL_COUNT * MAX_PEAKS_PER_CHANNEL * SENSOR_VALUE_SIZE,
        }
    }
}

impl fmt::Display for StreamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ret = match self {
            StreamingMode::Peaks => "peaks",
            StreamingMode::Spectrum => "spectrum",
            StreamingMode::Sensor => "sensor",
        };
        f.write_str(ret)
    }
}

impl FromStr for StreamingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "peaks" => Ok(StreamingMode::Peaks),
            "spectrum" => Ok(StreamingMode::Spectrum),
            "sensor" | "sensors" => Ok(StreamingMode::Sensor),
            _ => Err(Error::argument(anyhow!("Unknown streaming mode: `{}`", s))),
        }
    }
}

/// Reads consecutive datasets of one streaming connection into a single reusable buffer.
///
/// The slice returned by `read_next` borrows that buffer, so it has to be processed (or
/// copied) before the next dataset is read.
pub struct StreamingDataReader {
    mode: StreamingMode,
    header: [u8; HEADER_SIZE],
    buffer: Vec<u8>,
}

impl StreamingDataReader {
    pub fn new(mode: StreamingMode) -> Self {
        Self {
            mode,
            header: [0_u8; HEADER_SIZE],
            buffer: vec![0_u8; mode.max_buffer_size()],
        }
    }

    pub fn mode(&self) -> StreamingMode {
        self.mode
    }

    /// Read the next dataset from a blocking stream.
    pub fn read_next<R: Read + ?Sized>(&mut self, stream: &mut R) -> crate::Result<&[u8]> {
        read_exact_resilient(stream, &mut self.header)?;
        let len = self.content_length()?;
        read_exact_resilient(stream, &mut self.buffer[..len])?;
        Ok(&self.buffer[..len])
    }

    /// Read the next dataset from an async stream.
    pub async fn read_next_async<R: AsyncRead + Unpin + ?Sized>(&mut self, stream: &mut R) -> crate::Result<&[u8]> {
        read_exact_resilient_async(stream, &mut self.header).await?;
        let len = self.content_length()?;
        read_exact_resilient_async(stream, &mut self.buffer[..len]).await?;
        Ok(&self.buffer[..len])
    }

    fn content_length(&mut self) -> crate::Result<usize> {
        let header = decode_response_header(&self.header)?;
        let len = header.content_length as usize;
        if len > self.buffer.len() {
            log::warn!(
                "{} dataset of {} bytes exceeds the {} byte buffer, growing it",
                self.mode,
                len,
                self.buffer.len()
            );
            self.buffer.resize(len, 0);
        }
        log::trace!("{} dataset: {} bytes", self.mode, len);
        Ok(len)
    }
}
