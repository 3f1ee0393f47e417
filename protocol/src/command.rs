use std::fmt::{self, Display, Formatter};
use std::ops::{BitAnd, BitOr, BitOrAssign};

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::data::{PeakData, SensorData, SpectrumData};
use crate::util::{decode_ascii, from_base64, to_base64};
use crate::Error;

/// Request options, echoed back by the instrument in the response header.
///
/// A suppressed message or content is transmitted with a length of zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandOptions(u8);

impl CommandOptions {
    pub const NONE: CommandOptions = CommandOptions(0);
    pub const SUPPRESS_MESSAGE: CommandOptions = CommandOptions(1);
    pub const SUPPRESS_CONTENT: CommandOptions = CommandOptions(2);
    pub const USE_COMPRESSION: CommandOptions = CommandOptions(4);

    pub const fn from_bits(bits: u8) -> Self {
        CommandOptions(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: CommandOptions) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CommandOptions {
    type Output = CommandOptions;

    fn bitor(self, rhs: Self) -> Self::Output {
        CommandOptions(self.0 | rhs.0)
    }
}

impl BitOrAssign for CommandOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}

impl BitAnd for CommandOptions {
    type Output = CommandOptions;

    fn bitand(self, rhs: Self) -> Self::Output {
        CommandOptions(self.0 & rhs.0)
    }
}

impl Display for CommandOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("None");
        }
        let names = [
            (CommandOptions::SUPPRESS_MESSAGE, "SuppressMessage"),
            (CommandOptions::SUPPRESS_CONTENT, "SuppressContent"),
            (CommandOptions::USE_COMPRESSION, "UseCompression"),
        ];
        let x: Vec<_> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&x.join("|"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    Success,
    Error,
}

impl From<u8> for CommandStatus {
    /// Any non-zero status byte is reported as an error.
    fn from(x: u8) -> Self {
        if x == 0 {
            CommandStatus::Success
        } else {
            CommandStatus::Error
        }
    }
}

impl From<CommandStatus> for u8 {
    fn from(x: CommandStatus) -> Self {
        match x {
            CommandStatus::Success => 0,
            CommandStatus::Error => 1,
        }
    }
}

/// The answer of the instrument to a command request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    status: CommandStatus,
    options: CommandOptions,
    message: String,
    #[serde(serialize_with = "to_base64", deserialize_with = "from_base64")]
    content: Vec<u8>,
}

impl CommandResponse {
    /// Assemble a response from its decoded parts. Normally only called by the command channel
    /// once the full response has been read from the stream.
    pub fn new(status: CommandStatus, options: CommandOptions, message: String, content: Vec<u8>) -> Self {
        Self {
            status,
            options,
            message,
            content,
        }
    }

    pub fn status(&self) -> CommandStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Success
    }

    pub fn options(&self) -> CommandOptions {
        self.options
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    pub fn content_as_string(&self) -> String {
        decode_ascii(&self.content)
    }

    pub fn content_as_f64(&self) -> crate::Result<f64> {
        Ok(LittleEndian::read_f64(self.leading(8)?))
    }

    pub fn content_as_i16(&self) -> crate::Result<i16> {
        Ok(LittleEndian::read_i16(self.leading(2)?))
    }

    pub fn content_as_u16(&self) -> crate::Result<u16> {
        Ok(LittleEndian::read_u16(self.leading(2)?))
    }

    pub fn content_as_i32(&self) -> crate::Result<i32> {
        Ok(LittleEndian::read_i32(self.leading(4)?))
    }

    pub fn content_as_u32(&self) -> crate::Result<u32> {
        Ok(LittleEndian::read_u32(self.leading(4)?))
    }

    pub fn content_as_i64(&self) -> crate::Result<i64> {
        Ok(LittleEndian::read_i64(self.leading(8)?))
    }

    pub fn content_as_u64(&self) -> crate::Result<u64> {
        Ok(LittleEndian::read_u64(self.leading(8)?))
    }

    pub fn as_peak_data(&self) -> crate::Result<PeakData<'_>> {
        PeakData::new(&self.content)
    }

    pub fn as_spectrum_data(&self) -> crate::Result<SpectrumData<'_>> {
        SpectrumData::new(&self.content)
    }

    pub fn as_sensor_data(&self) -> crate::Result<SensorData<'_>> {
        SensorData::new(&self.content)
    }

    fn leading(&self, len: usize) -> crate::Result<&[u8]> {
        Error::check_len(len, self.content.len())?;
        Ok(&self.content[..len])
    }
}
