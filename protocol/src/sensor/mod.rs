//! Binary and text codec for the sensor definitions stored on the instrument.
//!
//! A binary record is laid out as follows (all integers little-endian):
//!
//! ```text
//!  size   field
//!  2      configuration version (2)
//!  16     id (GUID byte order)
//!  2 + n  name (ASCII, u16 length prefix)
//!  2 + n  model (ASCII, u16 length prefix)
//!  2      DUT channel index (0-based)
//!  8      distance (f64)
//!  ...    model specific fields, starting with their own version tag
//! ```
//!
//! Records carry no overall length, so a list of records can only be walked as long as every
//! record decodes.

use anyhow::anyhow;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::decode_ascii;
use crate::Error;

pub mod fabry_perot;

pub use fabry_perot::{DeltaN, FabryPerotAccelerometer, FabryPerotLayout, Recenter};

/// Version of the outer record layout written by [`SensorDefinition::encode`].
pub const SENSOR_CONFIGURATION_VERSION: u16 = 2;

const ID_SIZE: usize = 16;

const MODEL_FIELD: usize = 0;
const DUT_CHANNEL_FIELD: usize = 1;
const DISTANCE_FIELD: usize = 2;
const BASE_FIELD_COUNT: usize = 3;

/// Model specific part of a sensor definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SensorKind {
    FabryPerot(FabryPerotAccelerometer),
}

impl SensorKind {
    /// Sensors which must be evaluated on every acquisition, whether or not a client asked
    /// for their value.
    pub fn is_always_active(&self) -> bool {
        match self {
            SensorKind::FabryPerot(_) => true,
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) -> crate::Result<()> {
        match self {
            SensorKind::FabryPerot(x) => x.encode(buf),
        }
    }
}

struct SensorModel {
    name: &'static str,
    decode: fn(&str, &mut ConfigReader) -> crate::Result<SensorKind>,
    parse: fn(&[&str]) -> crate::Result<SensorKind>,
}

/// Registered sensor models, keyed by lower-case model identifier.
const SENSOR_MODELS: &[SensorModel] = &[
    SensorModel {
        name: "os7510",
        decode: fabry_perot::decode_kind,
        parse: fabry_perot::parse_kind,
    },
    SensorModel {
        name: "os7520",
        decode: fabry_perot::decode_kind,
        parse: fabry_perot::parse_kind,
    },
];

fn lookup_model(model: &str) -> crate::Result<&'static SensorModel> {
    let key = model.to_lowercase();
    SENSOR_MODELS
        .iter()
        .find(|x| x.name == key)
        .ok_or_else(|| Error::UnknownSensorModel(model.to_string()))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorDefinition {
    pub id: Uuid,
    pub name: String,
    pub model: String,
    /// 0-based DUT channel index.
    pub dut_channel_index: u16,
    pub distance: f64,
    pub is_active: bool,
    pub is_available: bool,
    pub kind: SensorKind,
}

impl SensorDefinition {
    /// Create a new sensor with a fresh id.
    pub fn new(name: &str, model: &str, dut_channel_index: u16, distance: f64, kind: SensorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            model: model.to_string(),
            dut_channel_index,
            distance,
            is_active: kind.is_always_active(),
            is_available: true,
            kind,
        }
    }

    /// Build a sensor from user supplied text fields:
    /// `model, DUT channel (1 to N), distance, model specific fields...`.
    ///
    /// Trailing model specific fields may be omitted, in which case the model defaults apply.
    pub fn from_fields(name: &str, fields: &[&str]) -> crate::Result<Self> {
        if fields.len() < BASE_FIELD_COUNT {
            return Err(Error::argument(anyhow!(
                "Expected at least {} fields (model, channel, distance), got {}",
                BASE_FIELD_COUNT,
                fields.len()
            )));
        }
        let model = fields[MODEL_FIELD].trim();
        let channel: u16 = fields[DUT_CHANNEL_FIELD]
            .trim()
            .parse()
            .map_err(|_| Error::argument(anyhow!("Invalid DUT channel: `{}`", fields[DUT_CHANNEL_FIELD])))?;
        if channel == 0 {
            return Err(Error::argument(anyhow!("DUT channel numbers start at 1")));
        }
        let distance = parse_f64(fields[DISTANCE_FIELD], "distance")?;
        let codec = lookup_model(model)?;
        let kind = (codec.parse)(&fields[BASE_FIELD_COUNT..])?;
        Ok(Self::new(name, model, channel - 1, distance, kind))
    }

    pub fn fabry_perot(&self) -> Option<&FabryPerotAccelerometer> {
        match &self.kind {
            SensorKind::FabryPerot(x) => Some(x),
        }
    }

    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        let mut ret = Vec::new();
        self.encode_into(&mut ret)?;
        Ok(ret)
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) -> crate::Result<()> {
        buf.write_u16::<LittleEndian>(SENSOR_CONFIGURATION_VERSION)?;
        buf.extend_from_slice(&self.id.to_bytes_le());
        write_ascii(buf, &self.name)?;
        write_ascii(buf, &self.model)?;
        buf.write_u16::<LittleEndian>(self.dut_channel_index)?;
        buf.write_f64::<LittleEndian>(self.distance)?;
        self.kind.encode(buf)
    }

    /// Decode a single record from the start of `data`.
    ///
    /// Returns `Ok(None)` for records of an unknown configuration version.
    pub fn decode(data: &[u8]) -> crate::Result<Option<Self>> {
        let mut reader = ConfigReader::new(data);
        Self::read(&mut reader)
    }

    fn read(reader: &mut ConfigReader) -> crate::Result<Option<Self>> {
        let version = reader.u16()?;
        if version != SENSOR_CONFIGURATION_VERSION {
            log::debug!("Skipping sensor configuration of version {}", version);
            return Ok(None);
        }
        let mut id = [0_u8; ID_SIZE];
        id.copy_from_slice(reader.bytes(ID_SIZE)?);
        let id = Uuid::from_bytes_le(id);
        let name = reader.ascii()?;
        let model = reader.ascii()?;
        let dut_channel_index = reader.u16()?;
        let distance = reader.f64()?;

        let codec = lookup_model(&model)?;
        let kind = (codec.decode)(&model, reader)?;
        Ok(Some(Self {
            id,
            name,
            model,
            dut_channel_index,
            distance,
            is_active: kind.is_always_active(),
            is_available: true,
            kind,
        }))
    }
}

/// The sensor list as exported by the instrument.
#[derive(Debug)]
pub struct SensorExport {
    pub version: u16,
    /// Declared number of records.
    pub count: u16,
    /// Decode result of each record, in order. Decoding stops at the first record which
    /// cannot be decoded, since the start of the following record is unknown.
    pub sensors: Vec<crate::Result<SensorDefinition>>,
}

impl SensorExport {
    /// Successfully decoded sensors.
    pub fn decoded(&self) -> impl Iterator<Item = &SensorDefinition> {
        self.sensors.iter().filter_map(|x| x.as_ref().ok())
    }
}

/// Decode an exported sensor list: `u16` export version, `u16` record count, records.
pub fn decode_sensor_list(data: &[u8]) -> crate::Result<SensorExport> {
    let mut reader = ConfigReader::new(data);
    let version = reader.u16()?;
    let count = reader.u16()?;
    let mut sensors = Vec::with_capacity(count as usize);
    for idx in 0..count {
        match SensorDefinition::read(&mut reader) {
            Ok(Some(sensor)) => sensors.push(Ok(sensor)),
            Ok(None) => {
                log::debug!("Sensor record {} has an unknown version, stopping", idx);
                break;
            }
            Err(err) => {
                log::debug!("Failed to decode sensor record {}: {}", idx, err);
                sensors.push(Err(err));
                break;
            }
        }
    }
    Ok(SensorExport { version, count, sensors })
}

pub fn encode_sensor_list(version: u16, sensors: &[SensorDefinition]) -> crate::Result<Vec<u8>> {
    let count = u16::try_from(sensors.len()).map_err(|_| Error::argument(anyhow!("Too many sensors")))?;
    let mut ret = Vec::new();
    ret.write_u16::<LittleEndian>(version)?;
    ret.write_u16::<LittleEndian>(count)?;
    for sensor in sensors {
        sensor.encode_into(&mut ret)?;
    }
    Ok(ret)
}

fn write_ascii(buf: &mut Vec<u8>, text: &str) -> crate::Result<()> {
    if !text.is_ascii() {
        return Err(Error::argument(anyhow!("`{}` is not ASCII", text)));
    }
    let len = u16::try_from(text.len()).map_err(|_| Error::argument(anyhow!("`{}` is too long", text)))?;
    buf.write_u16::<LittleEndian>(len)?;
    buf.extend_from_slice(text.as_bytes());
    Ok(())
}

pub(crate) fn parse_f64(field: &str, what: &str) -> crate::Result<f64> {
    field
        .trim()
        .parse()
        .map_err(|_| Error::argument(anyhow!("Invalid {}: `{}`", what, field)))
}

/// Sequential little-endian reader over a configuration buffer.
pub(crate) struct ConfigReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ConfigReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn bytes(&mut self, len: usize) -> crate::Result<&'a [u8]> {
        let end = self.pos + len;
        Error::check_len(end, self.data.len())?;
        let data: &'a [u8] = self.data;
        let ret = &data[self.pos..end];
        self.pos = end;
        Ok(ret)
    }

    pub(crate) fn u8(&mut self) -> crate::Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> crate::Result<u16> {
        Ok(LittleEndian::read_u16(self.bytes(2)?))
    }

    pub(crate) fn f64(&mut self) -> crate::Result<f64> {
        Ok(LittleEndian::read_f64(self.bytes(8)?))
    }

    fn ascii(&mut self) -> crate::Result<String> {
        let len = self.u16()? as usize;
        Ok(decode_ascii(self.bytes(len)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(name: &str, layout: FabryPerotLayout) -> SensorDefinition {
        let kind = SensorKind::FabryPerot(FabryPerotAccelerometer {
            wavelength_band: 1545.0,
            calibration_factor: 0.0123,
            layout,
        });
        SensorDefinition::new(name, "os7510", 3, 12.5, kind)
    }

    fn recenter() -> Recenter {
        Recenter {
            gain: 0.2,
            threshold_high: 2.0,
            threshold_low: 0.01,
        }
    }

    #[test]
    fn roundtrip_every_layout() {
        let layouts = [
            FabryPerotLayout::V1 { recenter: recenter() },
            FabryPerotLayout::V2 {
                recenter: recenter(),
                delta_n: DeltaN {
                    peak_threshold: 0.3,
                    over_range_threshold: 0.7,
                    error_average_length: 50.0,
                },
            },
            FabryPerotLayout::V3 { fixed_orientation: true },
        ];
        for layout in layouts {
            let def = sensor("accel", layout);
            let encoded = def.encode().unwrap();
            let decoded = SensorDefinition::decode(&encoded).unwrap().unwrap();
            assert_eq!(decoded, def);
        }
    }

    #[test]
    fn record_layout() {
        let def = sensor("ab", FabryPerotLayout::V3 { fixed_orientation: false });
        let encoded = def.encode().unwrap();
        assert_eq!(&encoded[0..2], &[2, 0]);
        assert_eq!(&encoded[2..18], &def.id.to_bytes_le());
        assert_eq!(&encoded[18..22], &[2, 0, b'a', b'b']);
        assert_eq!(&encoded[22..30], &[6, 0, b'o', b's', b'7', b'5', b'1', b'0']);
        assert_eq!(&encoded[30..32], &[3, 0]);
        assert_eq!(&encoded[32..40], &12.5_f64.to_le_bytes());
        // nested version, band, calibration, flag
        assert_eq!(&encoded[40..42], &[3, 0]);
        assert_eq!(encoded.len(), 42 + 8 + 8 + 1);
    }

    #[test]
    fn guid_byte_order() {
        let mut data = sensor("x", FabryPerotLayout::V3 { fixed_orientation: false }).encode().unwrap();
        let raw: [u8; 16] = [
            0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF,
        ];
        data[2..18].copy_from_slice(&raw);
        let decoded = SensorDefinition::decode(&data).unwrap().unwrap();
        assert_eq!(decoded.id.to_string(), "00112233-4455-6677-8899-aabbccddeeff");
    }

    #[test]
    fn unknown_version_yields_nothing() {
        let mut data = sensor("x", FabryPerotLayout::V1 { recenter: recenter() }).encode().unwrap();
        data[0] = 1;
        assert!(SensorDefinition::decode(&data).unwrap().is_none());
    }

    #[test]
    fn unknown_model() {
        let mut def = sensor("x", FabryPerotLayout::V1 { recenter: recenter() });
        def.model = "os9999".to_string();
        let data = def.encode().unwrap();
        match SensorDefinition::decode(&data) {
            Err(Error::UnknownSensorModel(model)) => assert_eq!(model, "os9999"),
            _ => panic!(),
        }
    }

    #[test]
    fn model_is_case_insensitive() {
        let mut def = sensor("x", FabryPerotLayout::V1 { recenter: recenter() });
        def.model = "OS7520".to_string();
        let data = def.encode().unwrap();
        let decoded = SensorDefinition::decode(&data).unwrap().unwrap();
        assert_eq!(decoded.model, "OS7520");
        assert!(decoded.is_active);
    }

    #[test]
    fn truncated_record() {
        let data = sensor("x", FabryPerotLayout::V1 { recenter: recenter() }).encode().unwrap();
        assert!(matches!(
            SensorDefinition::decode(&data[..data.len() - 1]),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn non_ascii_name() {
        let def = sensor("Beschleunigungssensor \u{e4}", FabryPerotLayout::V1 { recenter: recenter() });
        assert!(matches!(def.encode(), Err(Error::Argument(_))));
    }

    #[test]
    fn from_fields_with_defaults() {
        let sensor = SensorDefinition::from_fields("s1", &["os7510", "4", "10.5", "1550", "0.25"]).unwrap();
        assert_eq!(sensor.model, "os7510");
        assert_eq!(sensor.dut_channel_index, 3);
        assert_eq!(sensor.distance, 10.5);
        assert!(sensor.is_active);
        assert!(sensor.is_available);
        let fp = sensor.fabry_perot().unwrap();
        assert_eq!(fp.wavelength_band, 1550.0);
        assert_eq!(fp.calibration_factor, 0.25);
        assert_eq!(fp.version(), 1);
        assert_eq!(fp.recenter_gain(), Some(fabry_perot::RECENTER_GAIN_DEFAULT));
        assert_eq!(
            fp.recenter_threshold_high(),
            Some(fabry_perot::RECENTER_THRESHOLD_HIGH_DEFAULT)
        );
        assert_eq!(fp.recenter_threshold_low(), Some(fabry_perot::RECENTER_THRESHOLD_LOW_DEFAULT));
    }

    #[test]
    fn from_fields_errors() {
        assert!(matches!(
            SensorDefinition::from_fields("s", &["os7510", "1"]),
            Err(Error::Argument(_))
        ));
        assert!(matches!(
            SensorDefinition::from_fields("s", &["os7510", "0", "1", "1550", "1"]),
            Err(Error::Argument(_))
        ));
        assert!(matches!(
            SensorDefinition::from_fields("s", &["os7510", "1", "far", "1550", "1"]),
            Err(Error::Argument(_))
        ));
        assert!(matches!(
            SensorDefinition::from_fields("s", &["strain", "1", "1", "1550", "1"]),
            Err(Error::UnknownSensorModel(_))
        ));
    }

    #[test]
    fn sensor_list_keeps_earlier_siblings() {
        let first = sensor("a", FabryPerotLayout::V1 { recenter: recenter() });
        let second = sensor("b", FabryPerotLayout::V3 { fixed_orientation: true });
        let mut unknown = sensor("c", FabryPerotLayout::V1 { recenter: recenter() });
        unknown.model = "mystery".to_string();
        let data = encode_sensor_list(1, &[first.clone(), second.clone(), unknown, first.clone()]).unwrap();

        let export = decode_sensor_list(&data).unwrap();
        assert_eq!(export.version, 1);
        assert_eq!(export.count, 4);
        assert_eq!(export.sensors.len(), 3);
        assert_eq!(export.sensors[0].as_ref().unwrap(), &first);
        assert_eq!(export.sensors[1].as_ref().unwrap(), &second);
        assert!(matches!(export.sensors[2], Err(Error::UnknownSensorModel(_))));
        assert_eq!(export.decoded().count(), 2);
    }

    #[test]
    fn sensor_list_roundtrip() {
        let sensors = vec![
            sensor("a", FabryPerotLayout::V1 { recenter: recenter() }),
            sensor("b", FabryPerotLayout::V3 { fixed_orientation: false }),
        ];
        let data = encode_sensor_list(1, &sensors).unwrap();
        let export = decode_sensor_list(&data).unwrap();
        let decoded: Vec<_> = export.decoded().cloned().collect();
        assert_eq!(decoded, sensors);
        assert!(matches!(decode_sensor_list(&[1]), Err(Error::Truncated { .. })));
    }
}
