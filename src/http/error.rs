use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failures raised while reading a request or producing its response.
///
/// [`HttpError::is_transport`] splits these into errors that leave the socket
/// unusable and errors a `500` response can still be sent for.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid http request line: {line:?}")]
    MalformedRequestLine { line: String },

    #[error("invalid http header: {line:?}")]
    MalformedHeaderLine { line: String },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid query segment: {segment:?}")]
    MalformedQuery { segment: String },

    #[error("invalid content-length header: {value:?}")]
    InvalidContentLength { value: String },

    #[error("request body of {length} bytes exceeds the limit {max}")]
    PayloadTooLarge { length: u64, max: u64 },

    #[error("client disconnected with {remaining} body bytes outstanding")]
    ClientDisconnected { remaining: usize },

    #[error("line exceeds the limit of {max} bytes")]
    LineTooLong { max: usize },

    #[error("invalid authorization header: {reason}")]
    InvalidAuthorization { reason: String },

    #[error("cannot send new response after response has been sent")]
    DoubleResponse,

    #[error("failed to encode response body: {source}")]
    Encoding { source: io::Error },

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("no data received within {0:?}")]
    ReadTimeout(Duration),

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl HttpError {
    pub fn malformed_request_line<S: ToString>(line: S) -> Self {
        Self::MalformedRequestLine { line: line.to_string() }
    }

    pub fn malformed_header_line<S: ToString>(line: S) -> Self {
        Self::MalformedHeaderLine { line: line.to_string() }
    }

    pub fn malformed_query<S: ToString>(segment: S) -> Self {
        Self::MalformedQuery { segment: segment.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(value: S) -> Self {
        Self::InvalidContentLength { value: value.to_string() }
    }

    pub fn invalid_authorization<S: ToString>(reason: S) -> Self {
        Self::InvalidAuthorization { reason: reason.to_string() }
    }

    /// Whether the underlying stream is gone, so no response can be written.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::ReadTimeout(_) | Self::Io { .. }
        )
    }
}
