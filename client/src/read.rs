//! Fixed-size reads which tolerate short reads of the underlying stream.
//!
//! A single `read()` may return fewer bytes than requested, so reads are repeated until the
//! buffer is full. A stream which keeps returning 0 bytes is considered dead once it did so
//! [`MAX_ZERO_READS`] times in a row.

use std::io::{self, Read};

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::Error;

/// Number of consecutive zero-byte reads after which a stream is considered stalled.
pub const MAX_ZERO_READS: u32 = 10;

/// Progress of a fixed-size read. Shared by the blocking and the async read loop.
struct ReadProgress {
    read: usize,
    requested: usize,
    zero_reads: u32,
}

impl ReadProgress {
    fn new(requested: usize) -> Self {
        Self {
            read: 0,
            requested,
            zero_reads: 0,
        }
    }

    fn is_done(&self) -> bool {
        self.read >= self.requested
    }

    fn advance(&mut self, result: io::Result<usize>) -> crate::Result<()> {
        match result {
            Ok(0) => {
                self.zero_reads += 1;
                log::trace!(
                    "zero-byte read {} of {} at {}/{}",
                    self.zero_reads,
                    MAX_ZERO_READS,
                    self.read,
                    self.requested
                );
                if self.zero_reads >= MAX_ZERO_READS {
                    return Err(Error::StreamStalled {
                        read: self.read,
                        requested: self.requested,
                    });
                }
            }
            Ok(n) => {
                self.read += n;
                self.zero_reads = 0;
                if !self.is_done() {
                    log::trace!("short read: {}/{}", self.read, self.requested);
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(Error::transport(err)),
        }
        Ok(())
    }
}

/// Fill `buf` completely from a blocking stream.
pub fn read_exact_resilient<R: Read + ?Sized>(stream: &mut R, buf: &mut [u8]) -> crate::Result<()> {
    let mut progress = ReadProgress::new(buf.len());
    while !progress.is_done() {
        let result = stream.read(&mut buf[progress.read..]);
        progress.advance(result)?;
    }
    Ok(())
}

/// Fill `buf` completely from an async stream.
pub async fn read_exact_resilient_async<R: AsyncRead + Unpin + ?Sized>(
    stream: &mut R,
    buf: &mut [u8],
) -> crate::Result<()> {
    let mut progress = ReadProgress::new(buf.len());
    while !progress.is_done() {
        let result = stream.read(&mut buf[progress.read..]).await;
        progress.advance(result)?;
    }
    Ok(())
}
