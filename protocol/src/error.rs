use serde::{self, Deserializer, Serializer};
use std::{io, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Serialize, Deserialize)]
struct AnyHowError {
    description: String,
    backtrace: String,
}

#[derive(Serialize, Deserialize)]
struct IoError {
    description: String,
    kind: String,
}

fn serialize_io_error<S>(error: &Arc<io::Error>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let to_serialize = IoError {
        description: format!("{}", error),
        kind: format!("{:?}", error.kind()),
    };
    to_serialize.serialize(serializer)
}

fn deserialize_io_error<'de, D>(deserializer: D) -> Result<Arc<io::Error>, D::Error>
where
    D: Deserializer<'de>,
{
    let ret = IoError::deserialize(deserializer)?;
    let kind = match ret.kind.as_str() {
        "UnexpectedEof" => io::ErrorKind::UnexpectedEof,
        "ConnectionReset" => io::ErrorKind::ConnectionReset,
        "ConnectionAborted" => io::ErrorKind::ConnectionAborted,
        "BrokenPipe" => io::ErrorKind::BrokenPipe,
        "TimedOut" => io::ErrorKind::TimedOut,
        _ => io::ErrorKind::Other,
    };
    Ok(Arc::new(io::Error::new(kind, ret.description)))
}

fn serialize_anyhow_error<S>(error: &Arc<anyhow::Error>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let to_serialize = AnyHowError {
        description: error.to_string(),
        backtrace: format!("{:?}", error.backtrace()),
    };
    to_serialize.serialize(serializer)
}

fn deserialize_anyhow_error<'de, D>(deserializer: D) -> Result<Arc<anyhow::Error>, D::Error>
where
    D: Deserializer<'de>,
{
    let ret = AnyHowError::deserialize(deserializer)?;
    let ret = anyhow::Error::msg(ret.description);
    Ok(Arc::new(ret))
}

/// Failure of the underlying byte stream.
#[derive(Error, Clone, Debug, Serialize, Deserialize)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(
        #[serde(
            serialize_with = "serialize_io_error",
            deserialize_with = "deserialize_io_error"
        )]
        Arc<io::Error>,
    ),
    #[error("Other Error: {0}")]
    Other(
        #[serde(
            serialize_with = "serialize_anyhow_error",
            deserialize_with = "deserialize_anyhow_error"
        )]
        Arc<anyhow::Error>,
    ),
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::Io(Arc::new(err))
    }
}

impl From<anyhow::Error> for TransportError {
    fn from(x: anyhow::Error) -> Self {
        TransportError::Other(Arc::new(x))
    }
}

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum Error {
    #[error("Malformed header: expected {expected} bytes, got {actual}")]
    MalformedHeader { expected: usize, actual: usize },
    #[error("Stream stalled: {read} of {requested} bytes read")]
    StreamStalled { read: usize, requested: usize },
    #[error("Transport Error {0}")]
    Transport(TransportError),
    #[error("Invalid channel number: {0}")]
    InvalidChannel(usize),
    #[error("Unknown sensor model: {0}")]
    UnknownSensorModel(String),
    #[error("Unsupported configuration version {version} for sensor model {model}")]
    UnsupportedVersion { model: String, version: u16 },
    #[error("Truncated buffer: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("Malformed dataset: {0}")]
    Malformed(String),
    #[error("Argument Error {0}")]
    Argument(
        #[serde(
            serialize_with = "serialize_anyhow_error",
            deserialize_with = "deserialize_anyhow_error"
        )]
        Arc<anyhow::Error>,
    ),
}

impl Error {
    pub fn transport<T: Into<TransportError>>(err: T) -> Self {
        Self::Transport(err.into())
    }

    pub fn argument<T: Into<anyhow::Error>>(err: T) -> Self {
        Self::Argument(Arc::new(err.into()))
    }

    pub fn malformed<T: Into<String>>(msg: T) -> Self {
        Self::Malformed(msg.into())
    }

    /// Checks that `actual` bytes are enough to hold `expected` bytes.
    pub fn check_len(expected: usize, actual: usize) -> crate::Result<()> {
        if actual < expected {
            Err(Error::Truncated { expected, actual })
        } else {
            Ok(())
        }
    }

    /// True if the error indicates that the connection is unusable and should be re-established.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Error::StreamStalled { .. } => true,
            Error::Transport(TransportError::Io(err)) => {
                err.kind() == io::ErrorKind::ConnectionReset
                    || err.kind() == io::ErrorKind::ConnectionAborted
                    || err.kind() == io::ErrorKind::BrokenPipe
                    || err.kind() == io::ErrorKind::UnexpectedEof
            }
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(x: io::Error) -> Self {
        Error::Transport(TransportError::Io(Arc::new(x)))
    }
}
