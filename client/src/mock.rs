//! Scripted in-memory stream for driving the command channel and streaming reader in tests.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Outcome of one `read()` call on a [`MockStream`].
#[derive(Clone, Debug)]
pub enum Chunk {
    /// Up to this many bytes are returned. Remaining bytes are returned by the next read.
    Data(Vec<u8>),
    Zero,
    Interrupted,
    Reset,
}

impl Chunk {
    pub fn data(data: &[u8]) -> Self {
        Chunk::Data(data.to_vec())
    }
}

/// Once the script is exhausted, every read returns 0 bytes.
pub struct MockStream {
    chunks: VecDeque<Chunk>,
    read_calls: usize,
    written: Vec<u8>,
    flushes: usize,
}

impl MockStream {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks: chunks.into(),
            read_calls: 0,
            written: Vec::new(),
            flushes: 0,
        }
    }

    /// Deliver `data` in pieces of at most `chunk_size` bytes.
    pub fn chunked(data: &[u8], chunk_size: usize) -> Self {
        Self::new(data.chunks(chunk_size).map(Chunk::data).collect())
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    fn next_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_calls += 1;
        match self.chunks.pop_front() {
            None | Some(Chunk::Zero) => Ok(0),
            Some(Chunk::Interrupted) => Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted")),
            Some(Chunk::Reset) => Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            Some(Chunk::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.chunks.push_front(Chunk::Data(data.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.next_read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

impl AsyncRead for MockStream {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let ret = this.next_read(buf.initialize_unfilled()).map(|n| buf.advance(n));
        Poll::Ready(ret)
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Write::write(self.get_mut(), buf))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Write::flush(self.get_mut()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
