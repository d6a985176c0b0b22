//! The per-request surface handed to a [`Handler`](crate::http::handler::Handler).

use std::sync::Arc;

use indexmap::IndexMap;

use crate::http::error::HttpError;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::{ResponseWriter, serialize_response};

/// One request and the single response it may receive.
///
/// Headers and cookies can be staged at any point before the response is
/// finalized; after that every further finalize fails with
/// [`HttpError::DoubleResponse`].
pub struct Exchange {
    request: Request,
    headers: IndexMap<String, String>,
    cookies: IndexMap<String, String>,
    powered_by: Arc<str>,
    sent: Option<ResponseWriter>,
}

impl Exchange {
    pub fn new(request: Request, powered_by: Arc<str>) -> Self {
        Self {
            request,
            headers: IndexMap::new(),
            cookies: IndexMap::new(),
            powered_by,
            sent: None,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Stages a response header. Headers set on the sent [`Response`] win.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Stages a `Set-Cookie` entry.
    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn is_written(&self) -> bool {
        self.sent.is_some()
    }

    /// Serialized response, once one has been sent.
    pub fn written(&self) -> Option<&ResponseWriter> {
        self.sent.as_ref()
    }

    /// Gives the request back along with whatever response was sent.
    pub(crate) fn into_parts(self) -> (Request, Option<ResponseWriter>) {
        (self.request, self.sent)
    }

    /// Finalizes `response` for this request.
    pub fn send(&mut self, response: Response) -> Result<(), HttpError> {
        if self.sent.is_some() {
            return Err(HttpError::DoubleResponse);
        }

        let mut response = response;
        let mut headers = self.headers.clone();
        headers.extend(response.headers);
        response.headers = headers;
        let mut cookies = self.cookies.clone();
        cookies.extend(response.set_cookies);
        response.set_cookies = cookies;

        let writer = serialize_response(&self.request, &response, &self.powered_by)?;

        if response.status.is_success() {
            tracing::info!(status = %response.status, "Response");
        } else {
            tracing::warn!(status = %response.status, "Response");
        }

        self.sent = Some(writer);
        Ok(())
    }

    /// Sends `status` with an optional body and content type.
    pub fn write_response(
        &mut self,
        status: StatusCode,
        body: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<(), HttpError> {
        let response = Response {
            body: body.map(str::to_string),
            content_type: content_type.map(str::to_string),
            ..Response::new(status).build()
        };
        self.send(response)
    }

    /// 200 OK with a JSON body.
    pub fn write_success(&mut self, body: &str) -> Result<(), HttpError> {
        self.send(Response::success(Some(body.to_string()), None))
    }

    /// 200 OK with an explicit content type.
    pub fn write_success_as(&mut self, body: &str, content_type: &str) -> Result<(), HttpError> {
        self.send(Response::success(Some(body.to_string()), Some(content_type)))
    }

    pub fn write_redirect(&mut self, location: &str) -> Result<(), HttpError> {
        self.send(Response::redirect(location))
    }

    /// 401; `realm` adds a Basic `WWW-Authenticate` challenge.
    pub fn write_auth_required(&mut self, realm: Option<&str>) -> Result<(), HttpError> {
        self.send(Response::auth_required(realm))
    }

    /// 500, closing the connection afterwards.
    pub fn write_server_failure(&mut self) -> Result<(), HttpError> {
        self.send(Response::server_failure())
    }
}
