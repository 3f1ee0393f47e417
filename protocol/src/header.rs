//! Encoding and decoding of the 8 byte headers preceding every command request and
//! response (and every streamed dataset).
//!
//! ```text
//!  request                          response
//!  offset  size  field              offset  size  field
//!  0       1     options            0       1     status
//!  1       1     unused             1       1     options (echo)
//!  2       2     name length        2       2     message length
//!  4       4     content length     4       4     content length
//! ```
//!
//! All lengths are little-endian.

use byteorder::{ByteOrder, LittleEndian};

use crate::command::{CommandOptions, CommandStatus};
use crate::Error;

pub const HEADER_SIZE: usize = 8;

const REQUEST_OPTIONS_OFFSET: usize = 0;
const REQUEST_NAME_LENGTH_OFFSET: usize = 2;
const REQUEST_CONTENT_LENGTH_OFFSET: usize = 4;

const RESPONSE_STATUS_OFFSET: usize = 0;
const RESPONSE_OPTIONS_OFFSET: usize = 1;
const RESPONSE_MESSAGE_LENGTH_OFFSET: usize = 2;
const RESPONSE_CONTENT_LENGTH_OFFSET: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestHeader {
    pub options: CommandOptions,
    pub name_length: u16,
    pub content_length: u32,
}

impl RequestHeader {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        encode_request_header(self.options, self.name_length, self.content_length)
    }

    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        check_header(data)?;
        Ok(Self {
            options: CommandOptions::from_bits(data[REQUEST_OPTIONS_OFFSET]),
            name_length: LittleEndian::read_u16(&data[REQUEST_NAME_LENGTH_OFFSET..]),
            content_length: LittleEndian::read_u32(&data[REQUEST_CONTENT_LENGTH_OFFSET..]),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: CommandStatus,
    pub options: CommandOptions,
    pub message_length: u16,
    pub content_length: u32,
}

impl ResponseHeader {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut ret = [0_u8; HEADER_SIZE];
        ret[RESPONSE_STATUS_OFFSET] = self.status.into();
        ret[RESPONSE_OPTIONS_OFFSET] = self.options.bits();
        LittleEndian::write_u16(&mut ret[RESPONSE_MESSAGE_LENGTH_OFFSET..], self.message_length);
        LittleEndian::write_u32(&mut ret[RESPONSE_CONTENT_LENGTH_OFFSET..], self.content_length);
        ret
    }

    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        decode_response_header(data)
    }
}

/// Encode a request header. Lengths are taken as given; checking that the name and content
/// fit into their fields is up to the caller.
pub fn encode_request_header(options: CommandOptions, name_length: u16, content_length: u32) -> [u8; HEADER_SIZE] {
    let mut ret = [0_u8; HEADER_SIZE];
    ret[REQUEST_OPTIONS_OFFSET] = options.bits();
    LittleEndian::write_u16(&mut ret[REQUEST_NAME_LENGTH_OFFSET..], name_length);
    LittleEndian::write_u32(&mut ret[REQUEST_CONTENT_LENGTH_OFFSET..], content_length);
    ret
}

/// Decode a response header from the first 8 bytes of `data`.
pub fn decode_response_header(data: &[u8]) -> crate::Result<ResponseHeader> {
    check_header(data)?;
    Ok(ResponseHeader {
        status: data[RESPONSE_STATUS_OFFSET].into(),
        options: CommandOptions::from_bits(data[RESPONSE_OPTIONS_OFFSET]),
        message_length: LittleEndian::read_u16(&data[RESPONSE_MESSAGE_LENGTH_OFFSET..]),
        content_length: LittleEndian::read_u32(&data[RESPONSE_CONTENT_LENGTH_OFFSET..]),
    })
}

fn check_header(data: &[u8]) -> crate::Result<()> {
    if data.len() < HEADER_SIZE {
        return Err(Error::MalformedHeader {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }
    Ok(())
}
