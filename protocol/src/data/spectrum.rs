use std::cell::OnceCell;

use byteorder::{ByteOrder, LittleEndian};

use super::{check_header, count, u16_values, Amplitudes, Dataset, AMPLITUDE_SIZE, MAX_CHANNEL_COUNT};
use crate::Error;

const WAVELENGTH_START_OFFSET: usize = 24;
const WAVELENGTH_STEP_OFFSET: usize = 32;
const STEP_COUNT_OFFSET: usize = 40;
const CHANNEL_COUNT_OFFSET: usize = 44;
const FIXED_HEADER_SIZE: usize = CHANNEL_COUNT_OFFSET + 2;

/// Full optical spectrum of every channel: one unsigned 16 bit amplitude per wavelength step.
///
/// Channels follow the header back to back, each occupying `step_count` amplitudes.
pub struct SpectrumData<'a> {
    data: &'a [u8],
    header_length: usize,
    step_count: usize,
    channel_count: usize,
    spectra: [OnceCell<Vec<u16>>; MAX_CHANNEL_COUNT],
}

impl<'a> SpectrumData<'a> {
    pub fn new(data: &'a [u8]) -> crate::Result<Self> {
        let header_length = check_header(data, FIXED_HEADER_SIZE)?;
        let step_count = count(LittleEndian::read_i32(&data[STEP_COUNT_OFFSET..]).into(), "step count")?;
        let channel_count = count(
            LittleEndian::read_i16(&data[CHANNEL_COUNT_OFFSET..]).into(),
            "channel count",
        )?;
        if channel_count > MAX_CHANNEL_COUNT {
            return Err(Error::malformed(format!("{} channels in spectrum", channel_count)));
        }
        Error::check_len(header_length + channel_count * step_count * AMPLITUDE_SIZE, data.len())?;
        Ok(Self {
            data,
            header_length,
            step_count,
            channel_count,
            spectra: Default::default(),
        })
    }

    /// Number of optical channels present in the dataset.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// First wavelength of the sweep in nm.
    pub fn wavelength_start(&self) -> f64 {
        LittleEndian::read_f64(&self.data[WAVELENGTH_START_OFFSET..])
    }

    /// Wavelength increment between two amplitudes in nm.
    pub fn wavelength_step(&self) -> f64 {
        LittleEndian::read_f64(&self.data[WAVELENGTH_STEP_OFFSET..])
    }

    /// Number of amplitudes per channel.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Wavelength in nm of the amplitude at `index`.
    pub fn wavelength(&self, index: usize) -> f64 {
        self.wavelength_start() + index as f64 * self.wavelength_step()
    }

    /// Copy of the amplitudes of a channel (1 to `channel_count`). The copy is made once and
    /// kept for subsequent calls.
    pub fn to_array(&self, channel: usize) -> crate::Result<&[u16]> {
        let idx = self.channel_index(channel)?;
        let ret = self.spectra[idx].get_or_init(|| self.values(idx).collect());
        Ok(ret)
    }

    /// Iterate the amplitudes of a channel (1 to `channel_count`) directly from the buffer.
    pub fn iter(&self, channel: usize) -> crate::Result<Amplitudes<'a>> {
        let idx = self.channel_index(channel)?;
        Ok(self.values(idx))
    }

    fn values(&self, idx: usize) -> Amplitudes<'a> {
        let stride = self.step_count * AMPLITUDE_SIZE;
        let begin = self.header_length + idx * stride;
        let data: &'a [u8] = self.data;
        u16_values(&data[begin..begin + stride])
    }

    fn channel_index(&self, channel: usize) -> crate::Result<usize> {
        if channel == 0 || channel > self.channel_count {
            return Err(Error::InvalidChannel(channel));
        }
        Ok(channel - 1)
    }
}

impl<'a> Dataset for SpectrumData<'a> {
    fn raw(&self) -> &[u8] {
        self.data
    }
}
