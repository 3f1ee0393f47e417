//! Request/response exchange on the command connection.
//!
//! A request is the 8 byte request header followed by the ASCII command name and the
//! binary content. The instrument answers with the 8 byte response header followed by an
//! ASCII message and the binary content. Both a blocking and an async variant are provided,
//! with identical semantics.

use std::fmt::Display;
use std::io::{Read, Write};

use anyhow::anyhow;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use hyperion_protocol::util::decode_ascii;
use hyperion_protocol::{
    decode_response_header, encode_request_header, CommandOptions, CommandResponse, ResponseHeader, HEADER_SIZE,
};

use crate::read::{read_exact_resilient, read_exact_resilient_async};
use crate::Error;

/// Validated request, ready to be written.
struct Request<'a> {
    header: [u8; HEADER_SIZE],
    name: &'a [u8],
    content: &'a [u8],
}

impl<'a> Request<'a> {
    fn new(options: CommandOptions, name: &'a str, content: Option<&'a [u8]>) -> crate::Result<Self> {
        let content = content.unwrap_or_default();
        if !name.is_ascii() {
            return Err(Error::argument(anyhow!("Command name `{}` is not ASCII", name)));
        }
        let name_length =
            u16::try_from(name.len()).map_err(|_| Error::argument(anyhow!("Command name is too long")))?;
        let content_length = u32::try_from(content.len())
            .map_err(|_| Error::argument(anyhow!("Command content is too long: {} bytes", content.len())))?;
        log::debug!(
            "execute `{}` ({} bytes content, options {})",
            name,
            content_length,
            options
        );
        Ok(Self {
            header: encode_request_header(options, name_length, content_length),
            name: name.as_bytes(),
            content,
        })
    }
}

fn response(header: &ResponseHeader, message: &[u8], content: Vec<u8>) -> CommandResponse {
    log::debug!(
        "response: {:?}, {} bytes message, {} bytes content",
        header.status,
        header.message_length,
        header.content_length
    );
    CommandResponse::new(header.status, header.options, decode_ascii(message), content)
}

/// Execute a command on a blocking stream.
pub fn execute<S: Read + Write + ?Sized>(
    stream: &mut S,
    options: CommandOptions,
    name: &str,
    content: Option<&[u8]>,
) -> crate::Result<CommandResponse> {
    let request = Request::new(options, name, content)?;
    stream.write_all(&request.header).map_err(Error::transport)?;
    stream.write_all(request.name).map_err(Error::transport)?;
    stream.write_all(request.content).map_err(Error::transport)?;
    stream.flush().map_err(Error::transport)?;

    let mut header = [0_u8; HEADER_SIZE];
    read_exact_resilient(stream, &mut header)?;
    let header = decode_response_header(&header)?;
    let mut message = vec![0_u8; header.message_length as usize];
    read_exact_resilient(stream, &mut message)?;
    let mut content = vec![0_u8; header.content_length as usize];
    read_exact_resilient(stream, &mut content)?;
    Ok(response(&header, &message, content))
}

/// Execute a command on an async stream.
pub async fn execute_async<S: AsyncRead + AsyncWrite + Unpin + ?Sized>(
    stream: &mut S,
    options: CommandOptions,
    name: &str,
    content: Option<&[u8]>,
) -> crate::Result<CommandResponse> {
    let request = Request::new(options, name, content)?;
    stream.write_all(&request.header).await.map_err(Error::transport)?;
    stream.write_all(request.name).await.map_err(Error::transport)?;
    stream.write_all(request.content).await.map_err(Error::transport)?;
    stream.flush().await.map_err(Error::transport)?;

    let mut header = [0_u8; HEADER_SIZE];
    read_exact_resilient_async(stream, &mut header).await?;
    let header = decode_response_header(&header)?;
    let mut message = vec![0_u8; header.message_length as usize];
    read_exact_resilient_async(stream, &mut message).await?;
    let mut content = vec![0_u8; header.content_length as usize];
    read_exact_resilient_async(stream, &mut content).await?;
    Ok(response(&header, &message, content))
}

/// Join positional arguments with spaces, as expected by most instrument commands.
pub fn join_arguments<T: Display>(args: &[T]) -> String {
    args.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(" ")
}

/// Execute a command with space separated arguments and no options.
pub fn execute_args<S: Read + Write + ?Sized, T: Display>(
    stream: &mut S,
    name: &str,
    args: &[T],
) -> crate::Result<CommandResponse> {
    let content = join_arguments(args);
    execute(stream, CommandOptions::NONE, name, Some(content.as_bytes()))
}

/// Async variant of [`execute_args`].
pub async fn execute_args_async<S: AsyncRead + AsyncWrite + Unpin + ?Sized, T: Display>(
    stream: &mut S,
    name: &str,
    args: &[T],
) -> crate::Result<CommandResponse> {
    let content = join_arguments(args);
    execute_async(stream, CommandOptions::NONE, name, Some(content.as_bytes())).await
}
