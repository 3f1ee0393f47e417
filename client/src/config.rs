//! Connection settings of an instrument.
//!
//! The command connection and each streaming mode use their own TCP port. The defaults
//! are the ports used by the instrument firmware but all of them may be overridden, for
//! example when connecting through a port forward.

use std::io;
use std::net::{SocketAddr, TcpStream as StdTcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::streaming::StreamingMode;
use crate::Error;

pub const DEFAULT_COMMAND_PORT: u16 = 51971;
pub const DEFAULT_PEAK_PORT: u16 = 51972;
pub const DEFAULT_SPECTRUM_PORT: u16 = 51973;
pub const DEFAULT_SENSOR_PORT: u16 = 51974;

const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(2000);

fn default_command_port() -> u16 {
    DEFAULT_COMMAND_PORT
}

fn default_peak_port() -> u16 {
    DEFAULT_PEAK_PORT
}

fn default_spectrum_port() -> u16 {
    DEFAULT_SPECTRUM_PORT
}

fn default_sensor_port() -> u16 {
    DEFAULT_SENSOR_PORT
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentAddress {
    pub host: String,
    #[serde(default = "default_command_port")]
    pub command_port: u16,
    #[serde(default = "default_peak_port")]
    pub peak_port: u16,
    #[serde(default = "default_spectrum_port")]
    pub spectrum_port: u16,
    #[serde(default = "default_sensor_port")]
    pub sensor_port: u16,
    /// Connection timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub connection_timeout_ms: Option<u64>,
}

impl InstrumentAddress {
    pub fn new<T: Into<String>>(host: T) -> Self {
        Self {
            host: host.into(),
            command_port: DEFAULT_COMMAND_PORT,
            peak_port: DEFAULT_PEAK_PORT,
            spectrum_port: DEFAULT_SPECTRUM_PORT,
            sensor_port: DEFAULT_SENSOR_PORT,
            connection_timeout_ms: None,
        }
    }

    /// Load the address from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|x| Error::argument(anyhow!("Cannot read `{}`: {}", path.display(), x)))?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> crate::Result<Self> {
        serde_json::from_str(data).map_err(|x| Error::argument(anyhow!("Invalid instrument address: {}", x)))
    }

    pub fn port_for(&self, mode: StreamingMode) -> u16 {
        match mode {
            StreamingMode::Peaks => self.peak_port,
            StreamingMode::Spectrum => self.spectrum_port,
            StreamingMode::Sensor => self.sensor_port,
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_CONNECTION_TIMEOUT)
    }
}

/// Open an async TCP connection to `port` on the instrument.
pub async fn connect(addr: &InstrumentAddress, port: u16) -> crate::Result<TcpStream> {
    log::debug!("connecting to {}:{}", addr.host, port);
    let host = addr.host.clone();
    let fut = async move { TcpStream::connect((host.as_str(), port)).await.map_err(Error::transport) };
    let stream = match timeout(addr.connection_timeout(), fut).await {
        Ok(Ok(x)) => x,
        Ok(Err(x)) => return Err(x),
        Err(_) => {
            return Err(Error::transport(io::Error::new(
                io::ErrorKind::TimedOut,
                "Connection timed out",
            )))
        }
    };
    stream.set_nodelay(true).map_err(Error::transport)?;
    Ok(stream)
}

/// Open a blocking TCP connection to `port` on the instrument.
pub fn connect_blocking(addr: &InstrumentAddress, port: u16) -> crate::Result<StdTcpStream> {
    log::debug!("connecting to {}:{}", addr.host, port);
    let addrs: Vec<SocketAddr> = (addr.host.as_str(), port)
        .to_socket_addrs()
        .map_err(Error::transport)?
        .collect();
    let mut last_err = io::Error::new(io::ErrorKind::NotFound, format!("Cannot resolve `{}`", addr.host));
    for socket_addr in addrs {
        match StdTcpStream::connect_timeout(&socket_addr, addr.connection_timeout()) {
            Ok(stream) => {
                stream.set_nodelay(true).map_err(Error::transport)?;
                return Ok(stream);
            }
            Err(err) => {
                log::debug!("cannot connect to {}: {}", socket_addr, err);
                last_err = err;
            }
        }
    }
    Err(Error::transport(last_err))
}
