use std::fmt;

use indexmap::IndexMap;

/// Value of the `Allow` header sent for OPTIONS requests.
pub const ALLOWED_METHODS: &str = "HEAD,GET,POST,PUT,DELETE,OPTIONS";

/// HTTP status codes supported by the server.
///
/// Common HTTP status codes used in responses:
/// - `Ok` (200): Request successful
/// - `Found` (302): Redirect to the `Location` header
/// - `Unauthorized` (401): Credentials required
/// - `NotFound` (404): Resource not found
/// - `MethodNotAllowed` (405): HTTP method not supported
/// - `InternalServerError` (500): Server error
/// - `BadGateway` (502): Upstream service failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 302 Found
    Found,
    /// 401 Unauthorized
    Unauthorized,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 500 Internal Server Error
    InternalServerError,
    /// 502 Bad Gateway
    BadGateway,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use servius::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Found.as_u16(), 302);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Found => 302,
            StatusCode::Unauthorized => 401,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
            StatusCode::BadGateway => 502,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Found => "Found",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::BadGateway => "Bad Gateway",
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }
}

/// Formats as the status-line token, e.g. `200 OK`.
impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// An HTTP response waiting to be serialized.
///
/// Header and cookie maps keep insertion order, which is the order they go
/// out on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// Extra headers, last write per name wins
    pub headers: IndexMap<String, String>,
    /// One `Set-Cookie` line per entry
    pub set_cookies: IndexMap<String, String>,
    /// Response body; `None` writes no body at all
    pub body: Option<String>,
    /// Defaults to `text/html` when a body is present
    pub content_type: Option<String>,
    /// Close the connection after this response whatever the client asked
    pub force_close: bool,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use servius::http::response::{Response, StatusCode};
/// let response = Response::new(StatusCode::Ok)
///     .content_type("application/json")
///     .body("{}")
///     .build();
/// assert_eq!(response.body.as_deref(), Some("{}"));
/// ```
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            response: Response {
                status,
                headers: IndexMap::new(),
                set_cookies: IndexMap::new(),
                body: None,
                content_type: None,
                force_close: false,
            },
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.headers.insert(key.into(), value.into());
        self
    }

    /// Adds or replaces a cookie to send back with `Set-Cookie`.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.set_cookies.insert(name.into(), value.into());
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.response.body = Some(body.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.response.content_type = Some(content_type.into());
        self
    }

    /// Forces `Connection: close` on this response.
    pub fn close(mut self) -> Self {
        self.response.force_close = true;
        self
    }

    pub fn build(self) -> Response {
        self.response
    }
}

impl Response {
    /// Starts a response with the given status.
    pub fn new(status: StatusCode) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    /// Creates a 200 OK response with a JSON body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::success(Some(body.into()), None)
    }

    /// 200 OK; the content type defaults to `application/json`.
    pub fn success(body: Option<String>, content_type: Option<&str>) -> Self {
        let mut response = Response::new(StatusCode::Ok)
            .content_type(content_type.unwrap_or("application/json"))
            .build();
        response.body = body;
        response
    }

    /// 302 Found pointing at `location`.
    pub fn redirect(location: &str) -> Self {
        Response::new(StatusCode::Found)
            .header("Location", location)
            .content_type("application/json")
            .body(r#"{"success":true}"#)
            .build()
    }

    /// 401 with an optional Basic challenge for `realm`.
    pub fn auth_required(realm: Option<&str>) -> Self {
        let mut builder = Response::new(StatusCode::Unauthorized);
        if let Some(realm) = realm {
            builder = builder.header("WWW-Authenticate", format!("Basic realm=\"{realm}\""));
        }
        builder.body("<b>401, Login Required</b>").build()
    }

    /// 500 that always closes the connection.
    pub fn server_failure() -> Self {
        Response::new(StatusCode::InternalServerError)
            .body("<b>500, Internal Server Error</b>")
            .close()
            .build()
    }

    /// 405 with no body.
    pub fn method_not_allowed() -> Self {
        Response::new(StatusCode::MethodNotAllowed).build()
    }

    /// 200 advertising the supported methods.
    pub fn options() -> Self {
        Response::new(StatusCode::Ok)
            .header("Allow", ALLOWED_METHODS)
            .build()
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Response::new(StatusCode::NotFound)
            .content_type("application/json")
            .body(r#"{"error":"not found"}"#)
            .build()
    }
}
