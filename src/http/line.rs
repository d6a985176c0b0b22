use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::time::timeout;

use crate::http::error::HttpError;

/// Longest line accepted, terminators excluded.
pub const MAX_LINE_LENGTH: usize = 8192;

/// Reads `\n`-terminated lines from a buffered stream.
///
/// Every call is bounded by the read timeout, so a half-open peer ends the
/// session instead of parking it forever.
pub struct LineReader<R> {
    inner: BufReader<R>,
    read_timeout: Duration,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R, read_timeout: Duration) -> Self {
        Self {
            inner: BufReader::new(inner),
            read_timeout,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Buffered stream, for readers that must see bytes already buffered here.
    pub fn get_mut(&mut self) -> &mut BufReader<R> {
        &mut self.inner
    }

    /// Reads the next line with `\r` bytes dropped and the `\n` stripped.
    ///
    /// Returns `Ok(None)` when the peer closed the stream before sending a
    /// single byte of the line.
    pub async fn read_line(&mut self) -> Result<Option<String>, HttpError> {
        let deadline = self.read_timeout;
        // one extra byte for the terminator, one to detect overflow
        let limit = (MAX_LINE_LENGTH + 2) as u64;

        let mut buf = Vec::new();
        let mut limited = (&mut self.inner).take(limit);
        let n = timeout(deadline, limited.read_until(b'\n', &mut buf))
            .await
            .map_err(|_| HttpError::ReadTimeout(deadline))??;

        if n == 0 {
            return Ok(None);
        }

        if buf.last() != Some(&b'\n') {
            if buf.len() as u64 >= limit {
                return Err(HttpError::LineTooLong { max: MAX_LINE_LENGTH });
            }
            return Err(HttpError::ConnectionClosed);
        }

        buf.pop();
        buf.retain(|&b| b != b'\r');

        if buf.len() > MAX_LINE_LENGTH {
            return Err(HttpError::LineTooLong { max: MAX_LINE_LENGTH });
        }

        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}
