//! Signed HTTP client for the remote commerce platform.
//!
//! Every request carries an OAuth-style Authorization header built in
//! [`super::signing`]. Transient transport failures (connect errors,
//! timeouts, connections dropped mid-request) are retried a fixed number
//! of times with a fresh nonce and timestamp per attempt; application
//! rejections (non-2xx) are never retried.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use super::signing;
use crate::config::RemoteCredentials;

/// Total attempts per request, including the first.
const MAX_ATTEMPTS: u32 = 3;
/// Fixed delay between attempts.
const RETRY_DELAY: Duration = Duration::from_secs(1);

const CLIENT_USER_AGENT: &str = concat!("shopsync/", env!("CARGO_PKG_VERSION"));

/// Errors from the signed client.
#[derive(Debug)]
pub enum RemoteError {
    /// The remote platform answered with a non-2xx status
    Api { status: u16, message: String },
    /// Transport-level failure, surfaced after retries are exhausted
    Network(String),
    /// The response body could not be parsed as JSON
    InvalidResponse(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::Api { status, message } => {
                write!(f, "Remote API error ({}): {}", status, message)
            }
            RemoteError::Network(e) => write!(f, "Network error: {}", e),
            RemoteError::InvalidResponse(e) => write!(f, "Invalid response from remote: {}", e),
        }
    }
}

impl std::error::Error for RemoteError {}

/// A transport failure expected to resolve on retry, as opposed to an
/// application-level rejection.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Value-configured signed HTTP client. Constructed once from resolved
/// credentials; holds no mutable state beyond the shared connection pool.
#[derive(Debug, Clone)]
pub struct SignedClient {
    http: reqwest::Client,
    credentials: RemoteCredentials,
}

impl SignedClient {
    pub fn new(credentials: RemoteCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
        }
    }

    /// Executes a signed request against `{api_url}{path}`, retrying
    /// transient transport failures up to the attempt bound.
    ///
    /// Returns the parsed JSON response body (`Value::Null` for an empty
    /// body) or a classified [`RemoteError`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let url = format!("{}{}", self.credentials.api_url, path);

        let mut last_transient: Option<reqwest::Error> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(RETRY_DELAY).await;
            }

            match self.execute(&method, &url, query, body).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Transport(e)) if is_transient(&e) => {
                    tracing::warn!(
                        "Transient error calling {} {} (attempt {}/{}): {}",
                        method,
                        url,
                        attempt,
                        MAX_ATTEMPTS,
                        e
                    );
                    last_transient = Some(e);
                }
                Err(AttemptError::Transport(e)) => {
                    return Err(RemoteError::Network(e.to_string()));
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
            }
        }

        // All attempts failed with transient errors
        let e = last_transient.expect("at least one attempt was made");
        Err(RemoteError::Network(e.to_string()))
    }

    /// One signed attempt. Each call regenerates the nonce and timestamp,
    /// since a retried request must not reuse a stale signature.
    async fn execute(
        &self,
        method: &Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, AttemptError> {
        let nonce = signing::generate_nonce();
        let timestamp = chrono::Utc::now().timestamp();

        // Query parameters enter the signature only for GET; bodies never do
        let signed_query: &[(String, String)] = if *method == Method::GET { query } else { &[] };

        let params = signing::sign_request(
            method.as_str(),
            url,
            signed_query,
            &self.credentials.consumer_key,
            &self.credentials.consumer_secret,
            &nonce,
            timestamp,
        );

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, signing::authorization_header(&params))
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT);

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(AttemptError::Transport)?;
        let status = response.status();
        let text = response.text().await.map_err(AttemptError::Transport)?;

        if !status.is_success() {
            return Err(AttemptError::Fatal(RemoteError::Api {
                status: status.as_u16(),
                message: error_message(status, &text),
            }));
        }

        if text.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| AttemptError::Fatal(RemoteError::InvalidResponse(e.to_string())))
    }
}

enum AttemptError {
    Transport(reqwest::Error),
    Fatal(RemoteError),
}

/// Pulls a human-readable message out of an error body, falling back to
/// `"<status> <reason>"` when the body is not the expected JSON shape.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(message)) = map.get("message") {
            return message.clone();
        }
    }

    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Error")
    )
}
