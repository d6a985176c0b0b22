//! Client for the Agilefant project-management web application.
//!
//! Agilefant has no token API: a session is a cookie jar obtained by posting
//! the Spring Security login form, after which the `ajax/*.action` endpoints
//! answer with JSON.

pub mod session;
pub mod sprint;

use thiserror::Error;

pub use session::AgilefantSession;
pub use sprint::{Responsible, Sprint, burndown_image};

#[derive(Debug, Error)]
pub enum AgilefantError {
    #[error("agilefant request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid agilefant url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid username or password")]
    InvalidCredentials,
}
