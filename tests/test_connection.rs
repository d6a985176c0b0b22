//! End-to-end tests driving a `Connection` over an in-memory duplex stream.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use flate2::read::GzDecoder;
use servius::http::connection::{Connection, ConnectionSettings};
use servius::http::exchange::Exchange;
use servius::http::handler::Handler;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

fn settings() -> ConnectionSettings {
    ConnectionSettings {
        read_timeout: Duration::from_secs(2),
        powered_by: Arc::from("Test Server"),
    }
}

fn spawn<H: Handler>(handler: H, settings: ConnectionSettings) -> (DuplexStream, JoinHandle<()>) {
    let (client, server) = tokio::io::duplex(1 << 16);
    let conn = Connection::new(server, Arc::new(handler), settings);
    (client, tokio::spawn(conn.run()))
}

/// Sends `raw`, then reads until the server closes the connection.
async fn roundtrip<H: Handler>(handler: H, raw: &[u8]) -> String {
    let (mut client, task) = spawn(handler, settings());
    client.write_all(raw).await.unwrap();

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    task.await.unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

fn echo_url(exchange: &mut Exchange) -> anyhow::Result<()> {
    let body = format!(r#"{{"url":"{}"}}"#, exchange.request().url);
    exchange.write_success(&body)?;
    Ok(())
}

fn counting(counter: Arc<AtomicUsize>) -> impl Handler {
    move |exchange: &mut Exchange| -> anyhow::Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        exchange.write_success("{}")?;
        Ok(())
    }
}

#[tokio::test]
async fn test_single_request_closes_without_connection_header() {
    let out = roundtrip(echo_url, b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(out.starts_with("HTTP/1.1 200 OK\r\nConnection: close\r\n"));
    assert!(out.contains("Content-Type: application/json\r\n"));
    assert!(out.contains("X-Powered-By: Test Server\r\n"));
    assert!(out.contains("Access-Control-Allow-Origin: *\r\n"));
    assert!(out.ends_with(r#"{"url":"/hello"}"#));
    assert_eq!(out.matches("HTTP/1.1 ").count(), 1);
}

#[tokio::test]
async fn test_keep_alive_serves_second_request_on_same_connection() {
    let raw = b"GET /one HTTP/1.1\r\nConnection: keep-alive\r\n\r\n\
                GET /two HTTP/1.1\r\n\r\n";
    let out = roundtrip(echo_url, raw).await;

    assert_eq!(out.matches("HTTP/1.1 200 OK").count(), 2);
    assert!(out.contains("Connection: keep-alive\r\n"));
    assert!(out.contains(r#"{"url":"/one"}"#));
    assert!(out.ends_with(r#"{"url":"/two"}"#));
}

#[tokio::test]
async fn test_explicit_close_ignores_further_requests() {
    let raw = b"GET /one HTTP/1.1\r\nConnection: close\r\n\r\n\
                GET /two HTTP/1.1\r\n\r\n";
    let out = roundtrip(echo_url, raw).await;

    assert_eq!(out.matches("HTTP/1.1 200 OK").count(), 1);
    assert!(!out.contains("/two"));
}

#[tokio::test]
async fn test_post_body_reaches_handler() {
    let handler = |exchange: &mut Exchange| -> anyhow::Result<()> {
        let body = exchange.request().body.clone();
        exchange.write_success_as(&body, "text/plain")?;
        Ok(())
    };
    let raw = b"POST /echo HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello world";
    let out = roundtrip(handler, raw).await;

    assert!(out.contains("Content-Length: 11\r\n"));
    assert!(out.ends_with("\r\n\r\nhello world"));
}

#[tokio::test]
async fn test_post_with_keep_alive_reads_next_request_after_body() {
    let raw = b"PUT /a HTTP/1.1\r\nConnection: keep-alive\r\nContent-Length: 3\r\n\r\nabc\
                GET /b HTTP/1.1\r\n\r\n";
    let out = roundtrip(echo_url, raw).await;

    assert!(out.contains(r#"{"url":"/a"}"#));
    assert!(out.ends_with(r#"{"url":"/b"}"#));
}

#[tokio::test]
async fn test_options_bypasses_handler() {
    let counter = Arc::new(AtomicUsize::new(0));
    let out = roundtrip(
        counting(counter.clone()),
        b"OPTIONS /anything HTTP/1.1\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.contains("Allow: HEAD,GET,POST,PUT,DELETE,OPTIONS\r\n"));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_method_gets_405_without_body() {
    let counter = Arc::new(AtomicUsize::new(0));
    let out = roundtrip(counting(counter.clone()), b"PATCH /x HTTP/1.1\r\n\r\n").await;

    assert!(out.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    assert!(!out.contains("Content-Length"));
    assert!(out.ends_with("\r\n\r\n"));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_gzip_negotiation_end_to_end() {
    let body = r#"{"stories":["a","b","c","d","e","f","g"]}"#;
    let handler = move |exchange: &mut Exchange| -> anyhow::Result<()> {
        exchange.write_success(body)?;
        Ok(())
    };

    let (mut client, task) = spawn(handler, settings());
    client
        .write_all(b"GET / HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n")
        .await
        .unwrap();
    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    task.await.unwrap();

    let end = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
    let head = std::str::from_utf8(&out[..end]).unwrap();
    let payload = &out[end + 4..];

    assert!(head.contains("Content-Encoding: gzip"));
    assert!(head.contains(&format!("Content-Length: {}", payload.len())));

    let mut decoded = String::new();
    GzDecoder::new(payload).read_to_string(&mut decoded).unwrap();
    assert_eq!(decoded, body);
}

#[tokio::test]
async fn test_malformed_request_line_gets_500_and_close() {
    let counter = Arc::new(AtomicUsize::new(0));
    let out = roundtrip(
        counting(counter.clone()),
        b"GARBAGE\r\nConnection: keep-alive\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\nConnection: close\r\n"));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_header_gets_500() {
    let out = roundtrip(echo_url, b"GET / HTTP/1.1\r\nNoColonHere\r\n\r\n").await;

    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
}

#[tokio::test]
async fn test_oversized_body_rejected_with_500() {
    let counter = Arc::new(AtomicUsize::new(0));
    let raw = b"POST /upload HTTP/1.1\r\nContent-Length: 10485761\r\n\r\npartial";
    let out = roundtrip(counting(counter.clone()), raw).await;

    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handler_error_gets_500_even_with_keep_alive() {
    let handler = |_: &mut Exchange| -> anyhow::Result<()> { anyhow::bail!("boom") };
    let raw = b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n\
                GET / HTTP/1.1\r\n\r\n";
    let out = roundtrip(handler, raw).await;

    assert_eq!(out.matches("HTTP/1.1 500 Internal Server Error").count(), 1);
    assert!(out.contains("Connection: close\r\n"));
}

#[tokio::test]
async fn test_double_response_keeps_first_response() {
    let handler = |exchange: &mut Exchange| -> anyhow::Result<()> {
        exchange.write_success(r#"{"first":true}"#)?;
        exchange.write_success(r#"{"second":true}"#)?;
        Ok(())
    };
    let out = roundtrip(handler, b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n").await;

    assert_eq!(out.matches("HTTP/1.1 ").count(), 1);
    assert!(out.ends_with(r#"{"first":true}"#));
    assert!(!out.contains("second"));
}

#[tokio::test]
async fn test_handler_without_response_closes() {
    let handler = |_: &mut Exchange| -> anyhow::Result<()> { Ok(()) };
    let out = roundtrip(handler, b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n").await;

    assert!(out.is_empty());
}

#[tokio::test]
async fn test_head_response_has_no_body() {
    let out = roundtrip(echo_url, b"HEAD /page HTTP/1.1\r\n\r\n").await;

    assert!(out.contains("Content-Length: 15\r\n"));
    assert!(out.ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_disconnect_during_headers_writes_nothing() {
    let counter = Arc::new(AtomicUsize::new(0));
    let (mut client, task) = spawn(counting(counter.clone()), settings());

    client.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n").await.unwrap();
    client.shutdown().await.unwrap();

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    task.await.unwrap();

    assert!(out.is_empty());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_disconnect_does_not_affect_other_sessions() {
    let (mut broken, broken_task) = spawn(echo_url, settings());
    let (mut healthy, healthy_task) = spawn(echo_url, settings());

    broken.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
    drop(broken);

    healthy.write_all(b"GET /ok HTTP/1.1\r\n\r\n").await.unwrap();
    let mut out = Vec::new();
    healthy.read_to_end(&mut out).await.unwrap();

    broken_task.await.unwrap();
    healthy_task.await.unwrap();
    assert!(String::from_utf8_lossy(&out).ends_with(r#"{"url":"/ok"}"#));
}

#[tokio::test]
async fn test_idle_connection_times_out_silently() {
    let settings = ConnectionSettings {
        read_timeout: Duration::from_millis(50),
        ..settings()
    };
    let (mut client, task) = spawn(echo_url, settings);

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    task.await.unwrap();

    assert!(out.is_empty());
}

#[tokio::test]
async fn test_cookies_and_query_visible_to_handler() {
    let handler = |exchange: &mut Exchange| -> anyhow::Result<()> {
        let request = exchange.request();
        let params = request.query_params()?;
        let body = format!(
            "{}|{}|{}",
            params.get("a").map(String::as_str).unwrap_or(""),
            request.cookie("x").unwrap_or(""),
            request.cookie("y").unwrap_or("")
        );
        exchange.set_cookie("seen", "1");
        exchange.write_success_as(&body, "text/plain")?;
        Ok(())
    };
    let raw = b"GET /q?a=1&b=2 HTTP/1.1\r\nCookie: x=1; y=2\r\n\r\n";
    let out = roundtrip(handler, raw).await;

    assert!(out.contains("Set-Cookie: seen=1\r\n"));
    assert!(out.ends_with("1|1|2"));
}

#[tokio::test]
async fn test_handler_error_on_head_sends_500_without_body() {
    let handler = |_: &mut Exchange| -> anyhow::Result<()> { anyhow::bail!("boom") };
    let out = roundtrip(handler, b"HEAD / HTTP/1.1\r\n\r\n").await;

    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\nConnection: close\r\n"));
    assert!(out.contains("Content-Length: 33\r\n"));
    assert!(out.ends_with("\r\n\r\n"));
    assert!(!out.contains("<b>"));
}

#[tokio::test]
async fn test_handler_error_honors_gzip_negotiation() {
    let handler = |_: &mut Exchange| -> anyhow::Result<()> { anyhow::bail!("boom") };
    let (mut client, task) = spawn(handler, settings());
    client
        .write_all(b"GET / HTTP/1.1\r\nAccept-Encoding: gzip\r\n\r\n")
        .await
        .unwrap();
    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    task.await.unwrap();

    let end = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
    let head = std::str::from_utf8(&out[..end]).unwrap();
    let payload = &out[end + 4..];

    assert!(head.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(head.contains("Content-Encoding: gzip"));
    assert!(head.contains("Content-Type: text/html; charset=utf-8"));

    let mut decoded = String::new();
    GzDecoder::new(payload).read_to_string(&mut decoded).unwrap();
    assert_eq!(decoded, "<b>500, Internal Server Error</b>");
}
