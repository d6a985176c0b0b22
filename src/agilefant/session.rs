use std::collections::HashMap;

use url::Url;

use crate::agilefant::AgilefantError;

const LOGIN_PATH: &str = "j_spring_security_check";
const LOGOUT_PATH: &str = "j_spring_security_logout?exit=Logout";
const LOGIN_FAILED_MARKER: &str = "Invalid username or password";

/// A logged-in Agilefant session.
///
/// The reqwest client keeps the session cookie, so every request made through
/// it is authenticated.
#[derive(Debug, Clone)]
pub struct AgilefantSession {
    client: reqwest::Client,
    base_url: Url,
    username: String,
}

impl AgilefantSession {
    /// Logs in and creates a new session.
    ///
    /// Agilefant answers a bad login with a 200 login page, so the body is
    /// checked for the failure message as well as the status.
    pub async fn login(base_url: &str, username: &str, password: &str) -> Result<Self, AgilefantError> {
        let base_url = normalize_base(base_url)?;
        let client = reqwest::Client::builder().cookie_store(true).build()?;

        let mut form = HashMap::new();
        form.insert("j_username", username);
        form.insert("j_password", password);

        let content = client
            .post(base_url.join(LOGIN_PATH)?)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if content.contains(LOGIN_FAILED_MARKER) {
            tracing::warn!(username, "Agilefant login rejected");
            return Err(AgilefantError::InvalidCredentials);
        }

        tracing::debug!(username, "Agilefant login succeeded");
        Ok(Self {
            client,
            base_url,
            username: username.to_string(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` (which may carry a query) against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, AgilefantError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn get(&self, path: &str) -> Result<reqwest::Response, AgilefantError> {
        Ok(self.client.get(self.url(path)?).send().await?)
    }

    pub async fn post(&self, path: &str, body: String) -> Result<reqwest::Response, AgilefantError> {
        Ok(self.client.post(self.url(path)?).body(body).send().await?)
    }

    /// Posts `fields` as `application/x-www-form-urlencoded`.
    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> Result<reqwest::Response, AgilefantError> {
        Ok(self.client.post(self.url(path)?).form(fields).send().await?)
    }

    pub async fn logout(self) -> Result<(), AgilefantError> {
        self.get(LOGOUT_PATH).await?.error_for_status()?;
        Ok(())
    }
}

/// Parses the base URL, making sure `join` appends rather than replaces the
/// last path segment.
pub fn normalize_base(base_url: &str) -> Result<Url, AgilefantError> {
    if base_url.ends_with('/') {
        Ok(Url::parse(base_url)?)
    } else {
        Ok(Url::parse(&format!("{base_url}/"))?)
    }
}
