// Agent REST API HTTP client
//
// Wraps `reqwest::Client` with endpoint URL construction, Basic auth
// injection, and error-body unwrapping. The endpoint groups (session,
// events, files) are implemented as inherent methods in separate files
// to keep this module focused on transport mechanics.

use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Error body returned by the agent on failed requests.
#[derive(serde::Deserialize)]
struct ErrorBody {
    error: String,
}

/// Where a request goes and which credentials it carries.
///
/// Rebuilt by the caller for every request so a settings or credential
/// change takes effect on the very next call.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: String,
    authorization: Option<SecretString>,
}

impl Endpoint {
    /// `base` is the full API root, e.g. `http://127.0.0.1:8081/api`.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            authorization: None,
        }
    }

    /// Attach an `Authorization` header value.
    pub fn with_authorization(mut self, header: Option<SecretString>) -> Self {
        self.authorization = header;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Build `{base}/{path}`.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base.trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

/// Raw HTTP client for the agent's REST API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: reqwest::Client,
}

impl AgentClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Start a request with the endpoint's credentials applied.
    pub(crate) fn request(
        &self,
        method: reqwest::Method,
        endpoint: &Endpoint,
        url: Url,
    ) -> reqwest::RequestBuilder {
        debug!("{method} {url}");
        let builder = self.http.request(method, url);
        match &endpoint.authorization {
            Some(header) => builder.header(AUTHORIZATION, header.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and map non-success statuses to errors.
    pub(crate) async fn send(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, Error> {
        let resp = builder.send().await.map_err(Error::Transport)?;
        check_status(resp).await
    }

    /// Send a request and decode a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, Error> {
        let resp = self.send(builder).await?;
        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(bytes = body.len(), "decoding response body");

        serde_json::from_str(&body).map_err(|e| {
            let preview = preview(&body);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}

/// Turn 401 and other non-success statuses into errors, unwrapping the
/// agent's `{"error": "..."}` body when there is one.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_else(|_| preview(&body).to_owned());

    if status == reqwest::StatusCode::UNAUTHORIZED {
        let message = if message.is_empty() {
            "invalid credentials".into()
        } else {
            message
        };
        return Err(Error::Unauthorized { message });
    }

    Err(Error::Status {
        status: status.as_u16(),
        message,
    })
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let ep = Endpoint::new("http://127.0.0.1:8081/api/");
        assert_eq!(
            ep.url("session").map(String::from).ok().as_deref(),
            Some("http://127.0.0.1:8081/api/session")
        );
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let ep = Endpoint::new("https://agent.lan:443/nested/api");
        assert_eq!(
            ep.url("events").map(String::from).ok().as_deref(),
            Some("https://agent.lan/nested/api/events")
        );
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(Endpoint::new("not a url").url("session").is_err());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        assert_eq!(preview(&long).chars().count(), 200);
        assert_eq!(preview("short"), "short");
    }
}
