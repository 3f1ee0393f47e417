//! # Client Library for Hyperion Optical Sensing Instruments
//!
//! This crate performs the I/O on top of the `hyperion_protocol` crate. It works on any byte
//! stream, blocking ([`std::io::Read`] + [`std::io::Write`]) or async
//! ([`tokio::io::AsyncRead`] + [`tokio::io::AsyncWrite`]):
//!
//!  * [`command::execute`] / [`command::execute_async`] - Send a command on the command connection
//!     and receive its [`CommandResponse`]
//!  * [`streaming::StreamingDataReader`] - Read consecutive datasets from one of the streaming connections
//!  * [`config::InstrumentAddress`] - Host and ports of an instrument, with helpers to open the
//!     TCP connections
//!
//! The datasets returned by the instrument are interpreted with the views in
//! [`hyperion_protocol::data`]. Errors are captured in the [`enum@Error`] type.

pub mod command;
pub mod config;
pub mod read;
pub mod streaming;

#[cfg(test)]
pub(crate) mod mock;

pub use hyperion_protocol::{CommandOptions, CommandResponse, CommandStatus, Error, Result, TransportError};

pub use command::{execute, execute_args, execute_args_async, execute_async};
pub use config::{connect, connect_blocking, InstrumentAddress};
pub use streaming::{StreamingDataReader, StreamingMode};

#[cfg(test)]
mod tests {
    use super::*;
    use hyperion_protocol::{decode_sensor_list, HEADER_SIZE};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers one command with `message` and `content`, echoing the request options.
    async fn serve_once(listener: TcpListener, message: &'static [u8], content: Vec<u8>) -> (String, Vec<u8>) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut header = [0_u8; HEADER_SIZE];
        socket.read_exact(&mut header).await.unwrap();
        let name_length = u16::from_le_bytes([header[2], header[3]]) as usize;
        let content_length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let mut name = vec![0_u8; name_length];
        socket.read_exact(&mut name).await.unwrap();
        let mut args = vec![0_u8; content_length];
        socket.read_exact(&mut args).await.unwrap();

        let mut response = vec![0, header[0]];
        response.extend_from_slice(&(message.len() as u16).to_le_bytes());
        response.extend_from_slice(&(content.len() as u32).to_le_bytes());
        response.extend_from_slice(message);
        response.extend_from_slice(&content);
        // split to force short reads on the client side
        let (a, b) = response.split_at(response.len() / 2);
        socket.write_all(a).await.unwrap();
        socket.flush().await.unwrap();
        socket.write_all(b).await.unwrap();
        (String::from_utf8(name).unwrap(), args)
    }

    #[tokio::test]
    async fn command_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(serve_once(listener, b"Export complete", vec![0, 0, 0, 0]));

        let addr = InstrumentAddress::new("127.0.0.1");
        let mut stream = connect(&addr, port).await.unwrap();
        let response = execute_args_async(&mut stream, "#ExportSensors", &[1, 2]).await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.message(), "Export complete");

        let export = decode_sensor_list(response.content()).unwrap();
        assert_eq!(export.count, 0);
        assert!(export.sensors.is_empty());

        let (name, args) = server.await.unwrap();
        assert_eq!(name, "#ExportSensors");
        assert_eq!(args, b"1 2");
    }
}
