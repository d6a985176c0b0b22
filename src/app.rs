//! The Times API: a JSON front for Agilefant sprint data.
//!
//! Callers authenticate with their Agilefant credentials over HTTP Basic auth;
//! each request logs in upstream with them.

use crate::agilefant::{AgilefantError, AgilefantSession, Sprint};
use crate::http::exchange::Exchange;
use crate::http::handler::Handler;
use crate::http::request::{Credentials, Method};
use crate::http::response::{Response, StatusCode};

const REALM: &str = "Agilefant";

#[derive(Debug, Clone)]
enum Route {
    Ping,
    Sprint(i64),
    ProjectSprints(i64),
    NotFound,
}

impl Route {
    fn resolve(method: Method, url: &str) -> Self {
        if !matches!(method, Method::GET | Method::HEAD) {
            return Route::NotFound;
        }
        let segments: Vec<&str> = url.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["api", "ping"] => Route::Ping,
            ["api", "sprints", id] => id.parse().map(Route::Sprint).unwrap_or(Route::NotFound),
            ["api", "projects", id, "sprints"] => id
                .parse()
                .map(Route::ProjectSprints)
                .unwrap_or(Route::NotFound),
            _ => Route::NotFound,
        }
    }
}

pub struct TimesApi {
    agilefant_url: String,
}

impl TimesApi {
    pub fn new(agilefant_url: impl Into<String>) -> Self {
        Self {
            agilefant_url: agilefant_url.into(),
        }
    }

    /// Logs in upstream, answering 401 itself when that is not possible.
    async fn login(&self, exchange: &mut Exchange) -> anyhow::Result<Option<AgilefantSession>> {
        // malformed Authorization headers are treated like missing ones
        let credentials = exchange.request().credentials().unwrap_or(None);
        let Some(Credentials { username, password }) = credentials else {
            exchange.write_auth_required(Some(REALM))?;
            return Ok(None);
        };

        match AgilefantSession::login(&self.agilefant_url, &username, &password).await {
            Ok(session) => Ok(Some(session)),
            Err(AgilefantError::InvalidCredentials) => {
                exchange.write_auth_required(Some(REALM))?;
                Ok(None)
            }
            Err(e) => {
                tracing::error!(error = %e, "Agilefant login failed");
                exchange.send(bad_gateway())?;
                Ok(None)
            }
        }
    }
}

fn bad_gateway() -> Response {
    Response::new(StatusCode::BadGateway)
        .content_type("application/json")
        .body(r#"{"error":"agilefant unavailable"}"#)
        .build()
}

fn respond_json<T: serde::Serialize>(
    exchange: &mut Exchange,
    result: Result<T, AgilefantError>,
) -> anyhow::Result<()> {
    match result {
        Ok(value) => exchange.write_success(&serde_json::to_string(&value)?)?,
        Err(e) => {
            tracing::error!(error = %e, "Agilefant request failed");
            exchange.send(bad_gateway())?;
        }
    }
    Ok(())
}

impl Handler for TimesApi {
    async fn handle(&self, exchange: &mut Exchange) -> anyhow::Result<()> {
        let request = exchange.request();
        let route = Route::resolve(request.method, &request.url);

        match route {
            Route::Ping => exchange.write_success(r#"{"pong":true}"#)?,
            Route::NotFound => exchange.send(Response::not_found())?,
            Route::Sprint(id) => {
                if let Some(session) = self.login(exchange).await? {
                    let result = Sprint::fetch(&session, id).await;
                    respond_json(exchange, result)?;
                }
            }
            Route::ProjectSprints(id) => {
                if let Some(session) = self.login(exchange).await? {
                    let result = Sprint::fetch_for_project(&session, id).await;
                    respond_json(exchange, result)?;
                }
            }
        }
        Ok(())
    }
}
