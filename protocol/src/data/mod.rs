//! Read-only views over raw acquisition buffers, as returned in the content of a command
//! response or read from one of the streaming connections.
//!
//! The views borrow the buffer and decode values on demand. The only copies made are by the
//! explicit `to_array` methods, which memoize their result.
//!
//! Every dataset starts with the same fields:
//!
//! ```text
//!  offset  size  field
//!  0       2     header length (offset of the first data byte)
//!  2       1     acquisition status
//!  3       1     available streaming buffer (percent)
//!  8       8     serial number
//!  16      4     timestamp, seconds since 1970-01-01 UTC
//!  20      4     timestamp, nanoseconds
//! ```

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, TimeZone, Utc};

use crate::Error;

mod peak;
mod sensor;
mod spectrum;

pub use peak::PeakData;
pub use sensor::SensorData;
pub use spectrum::SpectrumData;

pub const MAX_CHANNEL_COUNT: usize = 16;

pub const MAX_PEAKS_PER_CHANNEL: usize = 256;
pub const PEAK_WAVELENGTH_SIZE: usize = std::mem::size_of::<f64>();

pub const SENSOR_VALUE_SIZE: usize = std::mem::size_of::<f64>();

pub const MAX_AMPLITUDES_PER_CHANNEL: usize = 64 * 1024;
pub const AMPLITUDE_SIZE: usize = std::mem::size_of::<u16>();

const HEADER_LENGTH_OFFSET: usize = 0;
const STATUS_OFFSET: usize = 2;
const AVAILABLE_BUFFER_OFFSET: usize = 3;
const SERIAL_NUMBER_OFFSET: usize = 8;
const TIMESTAMP_SECONDS_OFFSET: usize = 16;
const TIMESTAMP_NANOSECONDS_OFFSET: usize = 20;

const NANOSECONDS_PER_SECOND: u32 = 1_000_000_000;

/// Header fields shared by peak, spectrum and sensor datasets.
pub trait Dataset {
    fn raw(&self) -> &[u8];

    /// Length of the header in bytes, i.e. the offset of the first data value.
    fn header_length(&self) -> usize {
        LittleEndian::read_u16(&self.raw()[HEADER_LENGTH_OFFSET..]) as usize
    }

    /// Instrument data acquisition status.
    fn status(&self) -> u8 {
        self.raw()[STATUS_OFFSET]
    }

    /// Percentage of the instrument's streaming buffer which is currently available. Values
    /// trending towards 0 indicate that the client does not keep up with the data rate. Once
    /// the buffer is full, the instrument resets it and the buffered datasets are lost.
    fn available_buffer_percentage(&self) -> u8 {
        self.raw()[AVAILABLE_BUFFER_OFFSET]
    }

    /// Sequential acquisition id, incremented once per completed laser sweep.
    fn serial_number(&self) -> u64 {
        LittleEndian::read_u64(&self.raw()[SERIAL_NUMBER_OFFSET..])
    }

    /// Raw `(seconds, nanoseconds)` of the acquisition timestamp.
    fn timestamp_parts(&self) -> (u32, u32) {
        let raw = self.raw();
        (
            LittleEndian::read_u32(&raw[TIMESTAMP_SECONDS_OFFSET..]),
            LittleEndian::read_u32(&raw[TIMESTAMP_NANOSECONDS_OFFSET..]),
        )
    }

    /// UTC time captured once the acquisition completed.
    fn timestamp(&self) -> DateTime<Utc> {
        let (seconds, nanoseconds) = self.timestamp_parts();
        timestamp_from_parts(seconds, nanoseconds)
    }
}

/// Reconstruct a UTC instant from whole seconds and a nanosecond remainder since the unix epoch.
pub fn timestamp_from_parts(seconds: u32, nanoseconds: u32) -> DateTime<Utc> {
    let secs = i64::from(seconds) + i64::from(nanoseconds / NANOSECONDS_PER_SECOND);
    let nanos = nanoseconds % NANOSECONDS_PER_SECOND;
    Utc.timestamp_opt(secs, nanos).single().unwrap_or_default()
}

/// Validates the fixed part of a dataset header and returns the declared header length.
fn check_header(data: &[u8], fixed_size: usize) -> crate::Result<usize> {
    Error::check_len(fixed_size, data.len())?;
    let header_length = LittleEndian::read_u16(&data[HEADER_LENGTH_OFFSET..]) as usize;
    if header_length < fixed_size {
        return Err(Error::malformed(format!(
            "header length {} is shorter than the {} byte fixed header",
            header_length, fixed_size
        )));
    }
    Ok(header_length)
}

fn count(value: i64, what: &str) -> crate::Result<usize> {
    if value < 0 {
        return Err(Error::malformed(format!("negative {}: {}", what, value)));
    }
    Ok(value as usize)
}

/// Lazy iterator decoding fixed-width little-endian values straight from a dataset buffer.
///
/// A clone continues from the current position. Every call to the `iter` method of a view
/// starts over at the first value.
#[derive(Clone)]
pub struct Values<'a, T> {
    data: &'a [u8],
    size: usize,
    read: fn(&[u8]) -> T,
}

impl<'a, T> Values<'a, T> {
    fn new(data: &'a [u8], size: usize, read: fn(&[u8]) -> T) -> Self {
        Self {
            data,
            size,
            read,
        }
    }
}

impl<'a, T> Iterator for Values<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.data.len() < self.size {
            return None;
        }
        let (head, tail) = self.data.split_at(self.size);
        self.data = tail;
        Some((self.read)(head))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.data.len() / self.size;
        (len, Some(len))
    }
}

impl<'a, T> ExactSizeIterator for Values<'a, T> {}

/// Peak wavelengths in nm.
pub type Wavelengths<'a> = Values<'a, f64>;

/// Raw full spectrum amplitudes.
pub type Amplitudes<'a> = Values<'a, u16>;

fn f64_values(data: &[u8]) -> Values<'_, f64> {
    Values::new(data, std::mem::size_of::<f64>(), <LittleEndian as ByteOrder>::read_f64)
}

fn u16_values(data: &[u8]) -> Values<'_, u16> {
    Values::new(data, std::mem::size_of::<u16>(), <LittleEndian as ByteOrder>::read_u16)
}
