use std::cell::OnceCell;

use byteorder::{ByteOrder, LittleEndian};

use super::{check_header, f64_values, Dataset, Values, SENSOR_VALUE_SIZE};
use crate::Error;

const SENSOR_COUNT_OFFSET: usize = 24;
const FIXED_HEADER_SIZE: usize = SENSOR_COUNT_OFFSET + 2;

/// Values of all sensors defined on the instrument, as a flat list following the header.
pub struct SensorData<'a> {
    data: &'a [u8],
    header_length: usize,
    sensor_count: usize,
    values: OnceCell<Vec<f64>>,
}

impl<'a> SensorData<'a> {
    pub fn new(data: &'a [u8]) -> crate::Result<Self> {
        let header_length = check_header(data, FIXED_HEADER_SIZE)?;
        let sensor_count = LittleEndian::read_u16(&data[SENSOR_COUNT_OFFSET..]) as usize;
        Error::check_len(header_length + sensor_count * SENSOR_VALUE_SIZE, data.len())?;
        Ok(Self {
            data,
            header_length,
            sensor_count,
            values: OnceCell::new(),
        })
    }

    pub fn sensor_count(&self) -> usize {
        self.sensor_count
    }

    /// Value of the sensor at `index` (0-based).
    pub fn value(&self, index: usize) -> Option<f64> {
        if index >= self.sensor_count {
            return None;
        }
        let offset = self.header_length + index * SENSOR_VALUE_SIZE;
        Some(LittleEndian::read_f64(&self.data[offset..]))
    }

    /// Copy of all sensor values. The copy is made once and kept for subsequent calls.
    pub fn to_array(&self) -> &[f64] {
        self.values.get_or_init(|| self.iter().collect())
    }

    /// Iterate the sensor values directly from the buffer.
    pub fn iter(&self) -> Values<'a, f64> {
        let end = self.header_length + self.sensor_count * SENSOR_VALUE_SIZE;
        let data: &'a [u8] = self.data;
        f64_values(&data[self.header_length..end])
    }
}

impl<'a> Dataset for SensorData<'a> {
    fn raw(&self) -> &[u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::super::testdata::common_header;
    use super::*;

    fn build(header_length: usize, values: &[f64]) -> Vec<u8> {
        let mut buf = vec![0_u8; header_length + values.len() * 8];
        common_header(&mut buf, header_length as u16, 5, 1, 2);
        LittleEndian::write_u16(&mut buf[SENSOR_COUNT_OFFSET..], values.len() as u16);
        for (idx, x) in values.iter().enumerate() {
            LittleEndian::write_f64(&mut buf[header_length + idx * 8..], *x);
        }
        buf
    }

    #[test]
    fn flat_values() {
        let buf = build(32, &[0.25, -1.5, 9.75]);
        let data = SensorData::new(&buf).unwrap();
        assert_eq!(data.sensor_count(), 3);
        assert_eq!(data.to_array(), &[0.25, -1.5, 9.75]);
        assert_eq!(data.iter().collect::<Vec<_>>(), data.to_array());
        assert_eq!(data.value(1), Some(-1.5));
        assert_eq!(data.value(3), None);
        assert_eq!(data.serial_number(), 5);
    }

    #[test]
    fn header_length_is_respected() {
        // values start at the declared header length, not at a fixed offset
        let buf = build(40, &[42.0]);
        let data = SensorData::new(&buf).unwrap();
        assert_eq!(data.value(0), Some(42.0));
    }

    #[test]
    fn empty_and_truncated() {
        let buf = build(32, &[]);
        let data = SensorData::new(&buf).unwrap();
        assert!(data.to_array().is_empty());
        assert_eq!(data.iter().count(), 0);

        let buf = build(32, &[1.0, 2.0]);
        assert!(matches!(
            SensorData::new(&buf[..buf.len() - 4]),
            Err(Error::Truncated { .. })
        ));
    }
}
