use std::collections::HashMap;
use std::fmt;

use base64ct::{Base64, Encoding};

use crate::http::error::HttpError;
use crate::http::parser;

/// HTTP request methods.
///
/// Every verb the server does not know is folded into `TRACE`, which is then
/// answered with 405 Method Not Allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    #[default]
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// DELETE - Delete a resource
    DELETE,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// TRACE - Also stands in for any unrecognized verb
    TRACE,
}

impl Method {
    /// Maps a request-line token to a method, ignoring case.
    ///
    /// # Example
    ///
    /// ```
    /// # use servius::http::request::Method;
    /// assert_eq!(Method::from_token("get"), Method::GET);
    /// assert_eq!(Method::from_token("PATCH"), Method::TRACE);
    /// ```
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "get" => Method::GET,
            "post" => Method::POST,
            "put" => Method::PUT,
            "head" => Method::HEAD,
            "delete" => Method::DELETE,
            "options" => Method::OPTIONS,
            _ => Method::TRACE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::HEAD => "HEAD",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
        }
    }

    /// Whether a `Content-Length` body is read before dispatching.
    pub fn has_body(&self) -> bool {
        matches!(self, Method::POST | Method::PUT)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a parsed HTTP request from a client.
///
/// Built fresh for every request on a connection and never mutated after the
/// body has been read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Percent-decoded path, never containing the query string
    pub url: String,
    /// Raw text after the first `?`, empty when absent
    pub query: String,
    /// HTTP version token as sent (typically "HTTP/1.1")
    pub version: String,
    /// Request headers, names as received, last occurrence wins
    pub headers: HashMap<String, String>,
    /// Cookies parsed from the `Cookie` header
    pub cookies: HashMap<String, String>,
    /// Request body for POST/PUT requests
    pub body: String,
}

/// Username and password carried by a Basic `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    url: Option<String>,
    query: String,
    version: Option<String>,
    headers: HashMap<String, String>,
    body: String,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            url: None,
            query: String::new(),
            version: None,
            headers: HashMap::new(),
            body: String::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the request, deriving cookies from any `Cookie` header.
    pub fn build(self) -> Result<Request, &'static str> {
        let mut request = Request {
            method: self.method.ok_or("method missing")?,
            url: self.url.ok_or("url missing")?,
            query: self.query,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
            cookies: HashMap::new(),
            body: self.body,
        };
        request.cookies = request
            .header("Cookie")
            .map(parser::parse_cookies)
            .unwrap_or_default();
        Ok(request)
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Retrieves a header value by name, ignoring ASCII case.
    ///
    /// An exact-case match is preferred when several spellings were received.
    pub fn header(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(key) {
            return Some(value.as_str());
        }
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Retrieves a cookie sent by the client.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|v| v.as_str())
    }

    /// The declared `Connection` header, if any.
    pub fn connection(&self) -> Option<&str> {
        self.header("Connection")
    }

    /// Whether the client advertised gzip in `Accept-Encoding`.
    pub fn accepts_gzip(&self) -> bool {
        self.header("Accept-Encoding")
            .is_some_and(|v| v.contains("gzip"))
    }

    /// Decodes the query string into a key/value map.
    pub fn query_params(&self) -> Result<HashMap<String, String>, HttpError> {
        parser::parse_query(&self.query)
    }

    /// Decodes a `Basic` authorization header into its `user:password` text.
    ///
    /// Returns `Ok(None)` when the header is absent or uses another scheme.
    pub fn authorization(&self) -> Result<Option<String>, HttpError> {
        let Some(value) = self.header("Authorization") else {
            return Ok(None);
        };
        let Some((scheme, payload)) = value.trim().split_once(' ') else {
            return Ok(None);
        };
        if !scheme.eq_ignore_ascii_case("basic") {
            return Ok(None);
        }

        let bytes = Base64::decode_vec(payload.trim())
            .map_err(|e| HttpError::invalid_authorization(format!("bad base64: {e}")))?;
        let decoded = String::from_utf8(bytes)
            .map_err(|_| HttpError::invalid_authorization("credentials are not utf-8"))?;
        Ok(Some(decoded))
    }

    /// Splits the Basic credentials at the first `:`.
    pub fn credentials(&self) -> Result<Option<Credentials>, HttpError> {
        let Some(decoded) = self.authorization()? else {
            return Ok(None);
        };
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| HttpError::invalid_authorization("missing ':' separator"))?;
        Ok(Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }))
    }
}
