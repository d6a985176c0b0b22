use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use tokio::io::AsyncRead;

use crate::http::error::HttpError;
use crate::http::line::LineReader;
use crate::http::request::{Method, Request};

/// Most header lines accepted in a single request.
pub const MAX_HEADERS: usize = 128;

/// Reads a request line and its headers from `reader`.
///
/// The body is left unread. Returns `Ok(None)` if the peer closed the
/// connection before sending anything.
pub async fn read_request<R>(reader: &mut LineReader<R>) -> Result<Option<Request>, HttpError>
where
    R: AsyncRead + Unpin,
{
    let Some(request_line) = reader.read_line().await? else {
        return Ok(None);
    };
    let (method, target, version) = parse_request_line(&request_line)?;
    let (url, query) = split_target(target);

    let mut headers = HashMap::new();
    loop {
        let line = reader.read_line().await?.ok_or(HttpError::ConnectionClosed)?;
        if line.trim().is_empty() {
            break;
        }
        if headers.len() >= MAX_HEADERS {
            return Err(HttpError::TooManyHeaders { max_num: MAX_HEADERS });
        }
        let (name, value) = parse_header_line(&line)?;
        headers.insert(name.to_string(), value.to_string());
    }

    let mut request = Request {
        method,
        url,
        query,
        version: version.to_string(),
        headers,
        cookies: HashMap::new(),
        body: String::new(),
    };
    request.cookies = request
        .header("Cookie")
        .map(parse_cookies)
        .unwrap_or_default();

    Ok(Some(request))
}

/// Splits `METHOD SP target SP version` into its three tokens.
pub fn parse_request_line(line: &str) -> Result<(Method, &str, &str), HttpError> {
    let tokens: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = tokens[..] else {
        return Err(HttpError::malformed_request_line(line));
    };
    Ok((Method::from_token(method), target, version))
}

/// Decodes the request target and splits it at the first `?`.
///
/// The path never carries a `?`; the query half is kept as text for
/// [`parse_query`].
pub fn split_target(target: &str) -> (String, String) {
    let decoded = percent_decode(target);
    match decoded.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (decoded, String::new()),
    }
}

/// Splits a header line at its first `:` and trims the value.
pub fn parse_header_line(line: &str) -> Result<(&str, &str), HttpError> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| HttpError::malformed_header_line(line))?;
    Ok((name, value.trim()))
}

/// Parses a `Cookie` header value such as `x=1; y=2`.
///
/// Segments without `=` carry no value and are skipped.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|segment| segment.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Decodes `a=1&b=2` into a map; every segment must contain `=`.
pub fn parse_query(query: &str) -> Result<HashMap<String, String>, HttpError> {
    let mut params = HashMap::new();
    if query.is_empty() {
        return Ok(params);
    }
    for segment in query.split('&') {
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| HttpError::malformed_query(segment))?;
        params.insert(percent_decode(key), percent_decode(value));
    }
    Ok(params)
}

/// Decodes `%XX` escapes; invalid escapes and `+` are kept literally.
pub fn percent_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}
