use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::{Instrument, Span};

use crate::config::ServerConfig;
use crate::http::body::read_body;
use crate::http::error::HttpError;
use crate::http::exchange::Exchange;
use crate::http::handler::Handler;
use crate::http::line::LineReader;
use crate::http::parser::read_request;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::writer::{ResponseWriter, serialize_response};

/// Per-connection knobs, shared by every session the listener spawns.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Deadline for each line and each body chunk; also the idle timeout
    pub read_timeout: Duration,
    /// Value of the `X-Powered-By` header
    pub powered_by: Arc<str>,
}

impl ConnectionSettings {
    pub fn from_config(cfg: &ServerConfig) -> Self {
        Self {
            read_timeout: Duration::from_secs(cfg.read_timeout_secs),
            powered_by: Arc::from(cfg.powered_by.as_str()),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

pub struct Connection<S, H> {
    reader: LineReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    handler: Arc<H>,
    settings: ConnectionSettings,
    span: Span,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Dispatching(Request),
    Writing(ResponseWriter),
    /// Carries the request when one was parsed, so the 500 can honor it
    Failing(anyhow::Error, Option<Request>),
    Closed,
}

impl<S, H> Connection<S, H>
where
    S: AsyncRead + AsyncWrite + Send,
    H: Handler,
{
    pub fn new(stream: S, handler: Arc<H>, settings: ConnectionSettings) -> Self {
        let (read_half, writer) = tokio::io::split(stream);
        Self {
            reader: LineReader::new(read_half, settings.read_timeout),
            writer,
            handler,
            settings,
            span: Span::current(),
            state: ConnectionState::Reading,
        }
    }

    /// Attaches the span every log line of this session is recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Serves requests until the client or an error ends the session.
    pub async fn run(mut self) {
        let span = self.span.clone();
        self.serve().instrument(span).await;
    }

    async fn serve(&mut self) {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::Reading => match self.read_request().await {
                    Ok(Some(request)) => self.attach_body(request).await,
                    Ok(None) => {
                        tracing::debug!("Client closed connection");
                        ConnectionState::Closed
                    }
                    Err(e) => ConnectionState::Failing(e.into(), None),
                },

                ConnectionState::Dispatching(request) => self.dispatch(request).await,

                ConnectionState::Writing(mut writer) => {
                    match writer.write_to_stream(&mut self.writer).await {
                        Ok(()) if writer.keep_alive() => ConnectionState::Reading,
                        Ok(()) => ConnectionState::Closed,
                        Err(e) => ConnectionState::Failing(e.into(), None),
                    }
                }

                ConnectionState::Failing(error, request) => {
                    self.recover(error, request).await;
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!(error = %e, "Failed to shut down connection");
        }
    }

    async fn read_request(&mut self) -> Result<Option<Request>, HttpError> {
        let Some(request) = read_request(&mut self.reader).await? else {
            return Ok(None);
        };

        tracing::info!(method = %request.method, url = %request.url, "Request");
        Ok(Some(request))
    }

    async fn attach_body(&mut self, mut request: Request) -> ConnectionState {
        if !request.method.has_body() {
            return ConnectionState::Dispatching(request);
        }

        let body = read_body(
            self.reader.get_mut(),
            request.header("Content-Length"),
            self.settings.read_timeout,
        )
        .await;

        match body {
            Ok(body) => {
                request.body = body;
                ConnectionState::Dispatching(request)
            }
            Err(e) => ConnectionState::Failing(e.into(), Some(request)),
        }
    }

    async fn dispatch(&mut self, request: Request) -> ConnectionState {
        let mut exchange = Exchange::new(request, self.settings.powered_by.clone());

        let method = exchange.request().method;
        let result = match method {
            Method::OPTIONS => exchange.send(Response::options()).map_err(anyhow::Error::from),
            Method::TRACE => exchange.send(Response::method_not_allowed()).map_err(anyhow::Error::from),
            _ => self.handler.handle(&mut exchange).await,
        };

        let (request, written) = exchange.into_parts();
        match (result, written) {
            (Ok(()), Some(writer)) => ConnectionState::Writing(writer),
            (Ok(()), None) => {
                tracing::warn!("Handler returned without a response, closing connection");
                ConnectionState::Closed
            }
            (Err(e), Some(mut writer)) => {
                tracing::error!(error = %e, "Handler failed after responding");
                if let Err(e) = writer.write_to_stream(&mut self.writer).await {
                    tracing::debug!(error = %e, "Could not deliver response");
                }
                ConnectionState::Closed
            }
            (Err(e), None) => ConnectionState::Failing(e, Some(request)),
        }
    }

    /// Answers with a 500 unless the stream itself is what failed.
    ///
    /// The 500 is negotiated against `request` (HEAD, gzip); without one,
    /// a blank request stands in.
    async fn recover(&mut self, error: anyhow::Error, request: Option<Request>) {
        let transport = error
            .downcast_ref::<HttpError>()
            .is_some_and(HttpError::is_transport);

        if transport {
            match error.downcast_ref::<HttpError>() {
                Some(HttpError::Io { .. }) => {
                    tracing::error!(error = %error, "Connection to client terminated without proper shutdown");
                }
                _ => tracing::debug!(error = %error, "Connection ended"),
            }
            return;
        }

        let request = request.unwrap_or_default();
        let failure = serialize_response(&request, &Response::server_failure(), &self.settings.powered_by);
        if let Ok(mut writer) = failure {
            // the peer may already be gone; nothing more can be reported
            let _ = writer.write_to_stream(&mut self.writer).await;
        }

        tracing::error!(error = %error, "Request failed");
    }
}
