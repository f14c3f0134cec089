//! HTTP client for the external page-rendering service.
//!
//! The service drives a real browser context on our behalf: `POST /render`
//! with a target URL and the session cookies, get back the final URL after
//! redirects, the rendered HTML, and the updated cookie jar. Anti-detection
//! behavior lives entirely inside the service; this client only carries
//! state back and forth.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::session::SessionCookie;

/// Request body for `POST /render`.
#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
    cookies: &'a [SessionCookie],
    wait_until: &'a str,
    timeout_ms: u64,
}

/// Response envelope from the rendering service.
#[derive(Debug, Deserialize)]
pub struct RenderedPage {
    /// URL the browser ended up on after redirects; the input to challenge
    /// classification.
    pub final_url: String,

    pub html: String,

    /// Cookie jar after the navigation.
    #[serde(default)]
    pub cookies: Vec<SessionCookie>,
}

/// Client for the rendering service.
pub struct RenderClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout_ms: u64,
}

impl RenderClient {
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            // The service needs the full navigation window plus margin.
            .timeout(Duration::from_secs(timeout_secs.saturating_add(15)))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.map(str::to_owned),
            timeout_ms: timeout_secs.saturating_mul(1000),
        })
    }

    /// Navigates the rendering session to `url` and returns the rendered page.
    ///
    /// # Errors
    ///
    /// - [`FetchError::UnexpectedStatus`] on a non-2xx service response.
    /// - [`FetchError::Http`] on network failure or timeout.
    /// - [`FetchError::Deserialize`] if the envelope does not parse.
    pub async fn render(
        &self,
        url: &str,
        cookies: &[SessionCookie],
    ) -> Result<RenderedPage, FetchError> {
        let mut endpoint = format!("{}/render", self.base_url);
        if let Some(token) = &self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = RenderRequest {
            url,
            cookies,
            wait_until: "networkidle",
            timeout_ms: self.timeout_ms,
        };

        let response = self.client.post(&endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let raw = response.text().await?;
        serde_json::from_str::<RenderedPage>(&raw).map_err(|e| FetchError::Deserialize {
            context: format!("render envelope for {url}"),
            source: e,
        })
    }
}
