//! Fabry-Perot accelerometers (os7510, os7520).
//!
//! The model specific fields start with a nested version tag, followed by the wavelength band
//! and the calibration factor. The remaining fields depend on the nested version:
//!
//! * 1: recenter gain, recenter threshold high, recenter threshold low
//! * 2: as 1, followed by the delta-N peak threshold, delta-N over-range threshold and
//!   error average length
//! * 3: fixed orientation flag (one byte)

use anyhow::anyhow;
use byteorder::{LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};

use super::{parse_f64, ConfigReader, SensorKind};
use crate::Error;

pub const RECENTER_GAIN_DEFAULT: f64 = 0.1;
pub const RECENTER_THRESHOLD_HIGH_DEFAULT: f64 = 1.0;
pub const RECENTER_THRESHOLD_LOW_DEFAULT: f64 = 0.005;

pub const DELTA_N_PEAK_THRESHOLD_DEFAULT: f64 = 0.5;
pub const DELTA_N_OVER_RANGE_THRESHOLD_DEFAULT: f64 = 0.9;
pub const ERROR_AVERAGE_LENGTH_DEFAULT: f64 = 100.0;

const RECENTER_FIELD_COUNT: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recenter {
    pub gain: f64,
    pub threshold_high: f64,
    pub threshold_low: f64,
}

impl Default for Recenter {
    fn default() -> Self {
        Self {
            gain: RECENTER_GAIN_DEFAULT,
            threshold_high: RECENTER_THRESHOLD_HIGH_DEFAULT,
            threshold_low: RECENTER_THRESHOLD_LOW_DEFAULT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeltaN {
    pub peak_threshold: f64,
    pub over_range_threshold: f64,
    pub error_average_length: f64,
}

impl Default for DeltaN {
    fn default() -> Self {
        Self {
            peak_threshold: DELTA_N_PEAK_THRESHOLD_DEFAULT,
            over_range_threshold: DELTA_N_OVER_RANGE_THRESHOLD_DEFAULT,
            error_average_length: ERROR_AVERAGE_LENGTH_DEFAULT,
        }
    }
}

/// Version dependent part of a Fabry-Perot configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum FabryPerotLayout {
    V1 { recenter: Recenter },
    V2 { recenter: Recenter, delta_n: DeltaN },
    V3 { fixed_orientation: bool },
}

impl FabryPerotLayout {
    pub fn version(&self) -> u16 {
        match self {
            FabryPerotLayout::V1 { .. } => 1,
            FabryPerotLayout::V2 { .. } => 2,
            FabryPerotLayout::V3 { .. } => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FabryPerotAccelerometer {
    /// Nominal wavelength band in nm.
    pub wavelength_band: f64,
    pub calibration_factor: f64,
    pub layout: FabryPerotLayout,
}

impl FabryPerotAccelerometer {
    pub fn version(&self) -> u16 {
        self.layout.version()
    }

    pub fn recenter(&self) -> Option<&Recenter> {
        match &self.layout {
            FabryPerotLayout::V1 { recenter } | FabryPerotLayout::V2 { recenter, .. } => Some(recenter),
            FabryPerotLayout::V3 { .. } => None,
        }
    }

    pub fn recenter_gain(&self) -> Option<f64> {
        self.recenter().map(|x| x.gain)
    }

    pub fn recenter_threshold_high(&self) -> Option<f64> {
        self.recenter().map(|x| x.threshold_high)
    }

    pub fn recenter_threshold_low(&self) -> Option<f64> {
        self.recenter().map(|x| x.threshold_low)
    }

    /// Delta-N settings. Version 1 configurations predate these fields and report the defaults.
    pub fn delta_n(&self) -> Option<DeltaN> {
        match &self.layout {
            FabryPerotLayout::V1 { .. } => Some(DeltaN::default()),
            FabryPerotLayout::V2 { delta_n, .. } => Some(*delta_n),
            FabryPerotLayout::V3 { .. } => None,
        }
    }

    pub fn fixed_orientation(&self) -> Option<bool> {
        match &self.layout {
            FabryPerotLayout::V3 { fixed_orientation } => Some(*fixed_orientation),
            _ => None,
        }
    }

    pub(super) fn encode(&self, buf: &mut Vec<u8>) -> crate::Result<()> {
        buf.write_u16::<LittleEndian>(self.version())?;
        buf.write_f64::<LittleEndian>(self.wavelength_band)?;
        buf.write_f64::<LittleEndian>(self.calibration_factor)?;
        match &self.layout {
            FabryPerotLayout::V1 { recenter } => write_recenter(buf, recenter)?,
            FabryPerotLayout::V2 { recenter, delta_n } => {
                write_recenter(buf, recenter)?;
                buf.write_f64::<LittleEndian>(delta_n.peak_threshold)?;
                buf.write_f64::<LittleEndian>(delta_n.over_range_threshold)?;
                buf.write_f64::<LittleEndian>(delta_n.error_average_length)?;
            }
            FabryPerotLayout::V3 { fixed_orientation } => buf.write_u8(u8::from(*fixed_orientation))?,
        }
        Ok(())
    }
}

fn write_recenter(buf: &mut Vec<u8>, recenter: &Recenter) -> crate::Result<()> {
    buf.write_f64::<LittleEndian>(recenter.gain)?;
    buf.write_f64::<LittleEndian>(recenter.threshold_high)?;
    buf.write_f64::<LittleEndian>(recenter.threshold_low)?;
    Ok(())
}

struct LayoutDecoder {
    version: u16,
    decode: fn(&mut ConfigReader) -> crate::Result<FabryPerotLayout>,
}

const LAYOUT_DECODERS: &[LayoutDecoder] = &[
    LayoutDecoder {
        version: 1,
        decode: decode_v1,
    },
    LayoutDecoder {
        version: 2,
        decode: decode_v2,
    },
    LayoutDecoder {
        version: 3,
        decode: decode_v3,
    },
];

fn read_recenter(reader: &mut ConfigReader) -> crate::Result<Recenter> {
    Ok(Recenter {
        gain: reader.f64()?,
        threshold_high: reader.f64()?,
        threshold_low: reader.f64()?,
    })
}

fn decode_v1(reader: &mut ConfigReader) -> crate::Result<FabryPerotLayout> {
    let recenter = read_recenter(reader)?;
    Ok(FabryPerotLayout::V1 { recenter })
}

fn decode_v2(reader: &mut ConfigReader) -> crate::Result<FabryPerotLayout> {
    let recenter = read_recenter(reader)?;
    let delta_n = DeltaN {
        peak_threshold: reader.f64()?,
        over_range_threshold: reader.f64()?,
        error_average_length: reader.f64()?,
    };
    Ok(FabryPerotLayout::V2 { recenter, delta_n })
}

fn decode_v3(reader: &mut ConfigReader) -> crate::Result<FabryPerotLayout> {
    let fixed_orientation = reader.u8()? != 0;
    Ok(FabryPerotLayout::V3 { fixed_orientation })
}

pub(super) fn decode_kind(model: &str, reader: &mut ConfigReader) -> crate::Result<SensorKind> {
    let version = reader.u16()?;
    let decoder = LAYOUT_DECODERS
        .iter()
        .find(|x| x.version == version)
        .ok_or_else(|| Error::UnsupportedVersion {
            model: model.to_string(),
            version,
        })?;
    let wavelength_band = reader.f64()?;
    let calibration_factor = reader.f64()?;
    let layout = (decoder.decode)(reader)?;
    Ok(SensorKind::FabryPerot(FabryPerotAccelerometer {
        wavelength_band,
        calibration_factor,
        layout,
    }))
}

/// Parse `band, calibration factor[, gain, threshold high, threshold low[, delta-N peak
/// threshold, delta-N over-range threshold, error average length]]`.
///
/// Any of the delta-N fields selects version 2, otherwise version 1 is created.
pub(super) fn parse_kind(fields: &[&str]) -> crate::Result<SensorKind> {
    const NAMES: [&str; 8] = [
        "wavelength band",
        "calibration factor",
        "recenter gain",
        "recenter threshold high",
        "recenter threshold low",
        "delta-N peak threshold",
        "delta-N over-range threshold",
        "error average length",
    ];
    if fields.len() < 2 {
        return Err(Error::argument(anyhow!(
            "Fabry-Perot sensors require a wavelength band and a calibration factor"
        )));
    }
    if fields.len() > NAMES.len() {
        return Err(Error::argument(anyhow!(
            "Too many fields for a Fabry-Perot sensor: {}",
            fields.len()
        )));
    }
    let mut values = Vec::with_capacity(fields.len());
    for (field, name) in fields.iter().zip(NAMES.iter()) {
        values.push(parse_f64(field, name)?);
    }
    let value = |idx: usize, default: f64| values.get(idx).copied().unwrap_or(default);

    let recenter = Recenter {
        gain: value(2, RECENTER_GAIN_DEFAULT),
        threshold_high: value(3, RECENTER_THRESHOLD_HIGH_DEFAULT),
        threshold_low: value(4, RECENTER_THRESHOLD_LOW_DEFAULT),
    };
    let layout = if values.len() > 2 + RECENTER_FIELD_COUNT {
        let delta_n = DeltaN {
            peak_threshold: value(5, DELTA_N_PEAK_THRESHOLD_DEFAULT),
            over_range_threshold: value(6, DELTA_N_OVER_RANGE_THRESHOLD_DEFAULT),
            error_average_length: value(7, ERROR_AVERAGE_LENGTH_DEFAULT),
        };
        FabryPerotLayout::V2 { recenter, delta_n }
    } else {
        FabryPerotLayout::V1 { recenter }
    };

    Ok(SensorKind::FabryPerot(FabryPerotAccelerometer {
        wavelength_band: values[0],
        calibration_factor: values[1],
        layout,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ByteOrder;

    fn nested(version: u16, tail: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u16::<LittleEndian>(version).unwrap();
        buf.write_f64::<LittleEndian>(1540.0).unwrap();
        buf.write_f64::<LittleEndian>(2.5).unwrap();
        buf.extend_from_slice(tail);
        buf
    }

    fn f64s(values: &[f64]) -> Vec<u8> {
        let mut ret = vec![0_u8; values.len() * 8];
        LittleEndian::write_f64_into(values, &mut ret);
        ret
    }

    fn decode(data: &[u8]) -> crate::Result<FabryPerotAccelerometer> {
        let mut reader = ConfigReader::new(data);
        match decode_kind("os7510", &mut reader)? {
            SensorKind::FabryPerot(x) => Ok(x),
        }
    }

    #[test]
    fn version_one_defaults_delta_n() {
        let fp = decode(&nested(1, &f64s(&[0.3, 1.5, 0.01]))).unwrap();
        assert_eq!(fp.version(), 1);
        assert_eq!(fp.wavelength_band, 1540.0);
        assert_eq!(fp.calibration_factor, 2.5);
        assert_eq!(fp.recenter_gain(), Some(0.3));
        assert_eq!(fp.recenter_threshold_high(), Some(1.5));
        assert_eq!(fp.recenter_threshold_low(), Some(0.01));
        let delta_n = fp.delta_n().unwrap();
        assert_eq!(delta_n.peak_threshold, 0.5);
        assert_eq!(delta_n.over_range_threshold, 0.9);
        assert_eq!(delta_n.error_average_length, 100.0);
        assert_eq!(fp.fixed_orientation(), None);
    }

    #[test]
    fn version_two() {
        let fp = decode(&nested(2, &f64s(&[0.3, 1.5, 0.01, 0.4, 0.8, 64.0]))).unwrap();
        assert_eq!(fp.version(), 2);
        assert_eq!(
            fp.delta_n(),
            Some(DeltaN {
                peak_threshold: 0.4,
                over_range_threshold: 0.8,
                error_average_length: 64.0,
            })
        );
    }

    #[test]
    fn version_three_has_no_recenter_fields() {
        let fp = decode(&nested(3, &[1])).unwrap();
        assert_eq!(fp.version(), 3);
        assert_eq!(fp.wavelength_band, 1540.0);
        assert_eq!(fp.calibration_factor, 2.5);
        assert_eq!(fp.fixed_orientation(), Some(true));
        assert_eq!(fp.recenter_gain(), None);
        assert_eq!(fp.delta_n(), None);
    }

    #[test]
    fn unsupported_version() {
        match decode(&nested(7, &[])) {
            Err(Error::UnsupportedVersion { model, version }) => {
                assert_eq!(model, "os7510");
                assert_eq!(version, 7);
            }
            _ => panic!(),
        }
    }

    #[test]
    fn encoder_writes_held_version() {
        let fp = FabryPerotAccelerometer {
            wavelength_band: 1.0,
            calibration_factor: 2.0,
            layout: FabryPerotLayout::V3 { fixed_orientation: true },
        };
        let mut buf = Vec::new();
        fp.encode(&mut buf).unwrap();
        assert_eq!(LittleEndian::read_u16(&buf), 3);
        assert_eq!(buf.len(), 2 + 16 + 1);
        assert_eq!(decode(&buf).unwrap(), fp);
    }

    #[test]
    fn text_fields_select_version() {
        let SensorKind::FabryPerot(fp) = parse_kind(&["1550", "0.2", "0.3"]).unwrap();
        assert_eq!(fp.version(), 1);
        assert_eq!(fp.recenter_gain(), Some(0.3));
        assert_eq!(fp.recenter_threshold_low(), Some(RECENTER_THRESHOLD_LOW_DEFAULT));

        let SensorKind::FabryPerot(fp) = parse_kind(&["1550", "0.2", "0.3", "2", "0.1", "0.6"]).unwrap();
        assert_eq!(fp.version(), 2);
        let delta_n = fp.delta_n().unwrap();
        assert_eq!(delta_n.peak_threshold, 0.6);
        assert_eq!(delta_n.over_range_threshold, DELTA_N_OVER_RANGE_THRESHOLD_DEFAULT);

        assert!(matches!(parse_kind(&["1550"]), Err(Error::Argument(_))));
        assert!(matches!(parse_kind(&["1550", "x"]), Err(Error::Argument(_))));
        assert!(matches!(parse_kind(&["1"; 9]), Err(Error::Argument(_))));
    }
}
