//! HTTP protocol implementation.
//!
//! This module implements a small HTTP/1.1 server directly on top of a byte
//! stream, with support for keep-alive connections.
//!
//! # Architecture
//!
//! - **`line`**: Reads CR/LF-terminated lines under a read deadline
//! - **`parser`**: Parses the request line, headers, cookies and query strings
//! - **`body`**: Reads a `Content-Length` bounded request body
//! - **`request`**: HTTP request representation and Basic auth helpers
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes responses, negotiates gzip and keep-alive
//! - **`exchange`**: The request/response pair a handler works on
//! - **`handler`**: The trait application code implements
//! - **`connection`**: The per-connection request-response state machine
//! - **`error`**: Protocol and transport errors
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Parse request line, headers, body
//!        └──────┬──────┘
//!               │ Request received
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← OPTIONS / 405 / Handler
//!        └──────┬───────────┘
//!               │ Response finalized
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```
//!
//! Any non-transport error moves the connection to `Failing`, which makes a
//! best-effort `500` and closes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use servius::http::connection::{Connection, ConnectionSettings};
//! use servius::http::exchange::Exchange;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let handler = Arc::new(|exchange: &mut Exchange| -> anyhow::Result<()> {
//!         exchange.write_success(r#"{"hello":"world"}"#)?;
//!         Ok(())
//!     });
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let conn = Connection::new(socket, handler.clone(), ConnectionSettings::default());
//!         tokio::spawn(conn.run());
//!     }
//! }
//! ```

pub mod body;
pub mod connection;
pub mod error;
pub mod exchange;
pub mod handler;
pub mod line;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

pub use error::HttpError;
