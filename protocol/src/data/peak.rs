use std::cell::OnceCell;

use byteorder::{ByteOrder, LittleEndian};

use super::{check_header, count, f64_values, Dataset, Wavelengths, MAX_CHANNEL_COUNT, PEAK_WAVELENGTH_SIZE};
use crate::Error;

const PEAK_COUNTS_OFFSET: usize = 24;
const FIXED_HEADER_SIZE: usize = PEAK_COUNTS_OFFSET + MAX_CHANNEL_COUNT * 2;

/// Peak wavelengths (in nm) detected on each channel during one acquisition.
///
/// The header holds one signed 16 bit peak count per channel. The peaks of all channels
/// follow the header back to back, channel 1 first.
pub struct PeakData<'a> {
    data: &'a [u8],
    counts: [usize; MAX_CHANNEL_COUNT],
    offsets: [usize; MAX_CHANNEL_COUNT],
    peaks: [OnceCell<Vec<f64>>; MAX_CHANNEL_COUNT],
}

impl<'a> PeakData<'a> {
    pub fn new(data: &'a [u8]) -> crate::Result<Self> {
        let header_length = check_header(data, FIXED_HEADER_SIZE)?;

        let mut counts = [0_usize; MAX_CHANNEL_COUNT];
        for (idx, x) in counts.iter_mut().enumerate() {
            let raw = LittleEndian::read_i16(&data[PEAK_COUNTS_OFFSET + idx * 2..]);
            *x = count(raw.into(), "peak count")?;
        }

        let mut offsets = [0_usize; MAX_CHANNEL_COUNT];
        offsets[0] = header_length;
        for idx in 1..MAX_CHANNEL_COUNT {
            offsets[idx] = offsets[idx - 1] + counts[idx - 1] * PEAK_WAVELENGTH_SIZE;
        }
        let end = offsets[MAX_CHANNEL_COUNT - 1] + counts[MAX_CHANNEL_COUNT - 1] * PEAK_WAVELENGTH_SIZE;
        Error::check_len(end, data.len())?;

        Ok(Self {
            data,
            counts,
            offsets,
            peaks: Default::default(),
        })
    }

    /// Number of peaks on each channel, indexed by channel index (channel number - 1).
    pub fn peak_counts(&self) -> &[usize; MAX_CHANNEL_COUNT] {
        &self.counts
    }

    /// Number of peaks on a channel (1 to 16).
    pub fn peak_count(&self, channel: usize) -> crate::Result<usize> {
        let idx = channel_index(channel)?;
        Ok(self.counts[idx])
    }

    /// Copy of the peak wavelengths of a channel (1 to 16). The copy is made once and kept
    /// for subsequent calls.
    pub fn to_array(&self, channel: usize) -> crate::Result<&[f64]> {
        let idx = channel_index(channel)?;
        let ret = self.peaks[idx].get_or_init(|| self.values(idx).collect());
        Ok(ret)
    }

    /// Iterate the peak wavelengths of a channel (1 to 16) directly from the buffer.
    pub fn iter(&self, channel: usize) -> crate::Result<Wavelengths<'a>> {
        let idx = channel_index(channel)?;
        Ok(self.values(idx))
    }

    fn values(&self, idx: usize) -> Wavelengths<'a> {
        let begin = self.offsets[idx];
        let end = begin + self.counts[idx] * PEAK_WAVELENGTH_SIZE;
        let data: &'a [u8] = self.data;
        f64_values(&data[begin..end])
    }
}

impl<'a> Dataset for PeakData<'a> {
    fn raw(&self) -> &[u8] {
        self.data
    }
}

fn channel_index(channel: usize) -> crate::Result<usize> {
    if channel == 0 || channel > MAX_CHANNEL_COUNT {
        return Err(Error::InvalidChannel(channel));
    }
    Ok(channel - 1)
}
