use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::error::HttpError;
use crate::http::request::{Method, Request};
use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";
const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Headers the writer emits itself; copies in the response map are skipped.
const RESERVED_HEADERS: [&str; 3] = ["Connection", "Content-Type", "Content-Length"];

/// The `Connection` value to send back.
///
/// A forced close or a missing/blank client value yields `close`; otherwise
/// the client's value is echoed.
pub fn connection_directive(declared: Option<&str>, force_close: bool) -> &str {
    match declared {
        Some(value) if !force_close && !value.trim().is_empty() => value,
        _ => "close",
    }
}

/// Whether a `Connection` directive lets the session read another request.
pub fn keeps_alive(directive: &str) -> bool {
    !directive.trim().eq_ignore_ascii_case("close")
}

fn gzip(body: &str) -> Result<Vec<u8>, HttpError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(body.as_bytes())
        .map_err(|source| HttpError::Encoding { source })?;
    encoder.finish().map_err(|source| HttpError::Encoding { source })
}

fn push_header(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
}

/// Serializes `response` as the answer to `request`.
///
/// Applies gzip when the client accepts it and the body is not blank, and
/// injects the `X-Powered-By` and CORS headers.
pub fn serialize_response(
    request: &Request,
    response: &Response,
    powered_by: &str,
) -> Result<ResponseWriter, HttpError> {
    let mut headers = response.headers.clone();
    let body = response.body.as_deref().filter(|b| !b.trim().is_empty());

    let mut content_type = response
        .content_type
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let payload = match body {
        Some(text) if request.accepts_gzip() => {
            headers.insert("Content-Encoding".to_string(), "gzip".to_string());
            content_type.push_str("; charset=utf-8");
            Some(gzip(text)?)
        }
        Some(text) => Some(text.as_bytes().to_vec()),
        None => None,
    };

    headers.insert("X-Powered-By".to_string(), powered_by.to_string());
    headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());

    let connection = connection_directive(request.connection(), response.force_close);

    let mut buf = Vec::with_capacity(256 + payload.as_ref().map_or(0, Vec::len));

    // Status line
    buf.extend_from_slice(format!("{} {}\r\n", HTTP_VERSION, response.status).as_bytes());
    push_header(&mut buf, "Connection", connection);

    if let Some(payload) = &payload {
        push_header(&mut buf, "Content-Type", &content_type);
        push_header(&mut buf, "Content-Length", &payload.len().to_string());
    }

    for (name, value) in &headers {
        if RESERVED_HEADERS.iter().any(|r| r.eq_ignore_ascii_case(name)) {
            continue;
        }
        push_header(&mut buf, name, value);
    }

    for (name, value) in &response.set_cookies {
        buf.extend_from_slice(format!("Set-Cookie: {name}={value}\r\n").as_bytes());
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    if let Some(payload) = payload {
        if request.method != Method::HEAD {
            buf.extend_from_slice(&payload);
        }
    }

    Ok(ResponseWriter {
        buffer: buf,
        written: 0,
        keep_alive: keeps_alive(connection),
    })
}

/// A fully serialized response and the persistence decision that came with it.
#[derive(Debug)]
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
    keep_alive: bool,
}

impl ResponseWriter {
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether the session may read another request after this response.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> Result<(), HttpError>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(HttpError::ConnectionClosed);
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
