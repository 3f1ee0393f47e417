//! # Wire Protocol of Hyperion Optical Sensing Instruments
//!
//! This crate contains the transport independent parts of the instrument protocol:
//!
//!  * [`header`] - The fixed 8 byte request and response headers of the command protocol
//!  * [`command`] - Command options, status and the decoded [`CommandResponse`]
//!  * [`data`] - Zero-copy views over acquisition datasets ([`PeakData`], [`SpectrumData`], [`SensorData`])
//!  * [`sensor`] - Binary and text codec of the sensor definitions stored on the instrument
//!
//! All multi-byte values on the wire are little-endian. Errors are captured in the [`enum@Error`] type.
//! The actual I/O happens in the `hyperion_client` crate.

pub mod command;
pub mod data;
pub mod error;
pub mod header;
pub mod sensor;
pub mod util;

pub use crate::command::{CommandOptions, CommandResponse, CommandStatus};
pub use crate::data::{Dataset, PeakData, SensorData, SpectrumData};
pub use crate::error::{Error, TransportError};
pub use crate::header::{decode_response_header, encode_request_header, RequestHeader, ResponseHeader, HEADER_SIZE};
pub use crate::sensor::{decode_sensor_list, encode_sensor_list, SensorDefinition, SensorExport, SensorKind};

pub type Result<T> = std::result::Result<T, Error>;
