use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::http::error::HttpError;

/// Largest request body accepted (10 MiB).
pub const MAX_BODY_SIZE: u64 = 10_485_760;

const CHUNK_SIZE: usize = 4096;

/// Reads exactly `Content-Length` bytes of body from `reader`.
///
/// No header means no body. The declared size is checked against
/// [`MAX_BODY_SIZE`] before a single byte is consumed.
pub async fn read_body<R>(
    reader: &mut R,
    content_length: Option<&str>,
    read_timeout: Duration,
) -> Result<String, HttpError>
where
    R: AsyncRead + Unpin,
{
    let Some(raw) = content_length else {
        return Ok(String::new());
    };

    let length: u64 = raw
        .trim()
        .parse()
        .map_err(|_| HttpError::invalid_content_length(raw))?;

    if length > MAX_BODY_SIZE {
        return Err(HttpError::PayloadTooLarge {
            length,
            max: MAX_BODY_SIZE,
        });
    }

    let length = length as usize;
    let mut body = Vec::with_capacity(length);
    let mut chunk = [0u8; CHUNK_SIZE];

    while body.len() < length {
        let remaining = length - body.len();
        let to_read = remaining.min(CHUNK_SIZE);

        let n = timeout(read_timeout, reader.read(&mut chunk[..to_read]))
            .await
            .map_err(|_| HttpError::ReadTimeout(read_timeout))??;

        if n == 0 {
            return Err(HttpError::ClientDisconnected { remaining });
        }

        body.extend_from_slice(&chunk[..n]);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}
