//! HTTP client for the Onshape REST API.
//!
//! Requests use Basic authentication with the configured access/secret key
//! pair. Timeouts come from the configuration; there is no retry logic.

use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::OnshapeConfig;
use crate::onshape::error::{OnshapeError, OnshapeResult};

/// `Accept` header value the Onshape API expects for JSON responses.
const ACCEPT_JSON: &str = "application/json;charset=UTF-8; qs=0.09";

/// Client for the Onshape REST API.
pub struct OnshapeClient {
    http: reqwest::Client,
    base_url: Url,
    auth_header: String,
}

impl OnshapeClient {
    /// Creates a client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is unusable or the HTTP client cannot
    /// be built.
    pub fn new(config: &OnshapeConfig) -> OnshapeResult<Self> {
        let invalid = || OnshapeError::InvalidBaseUrl {
            url: config.base_url.clone(),
        };
        let base_url = Url::parse(&config.base_url).map_err(|_| invalid())?;
        if base_url.cannot_be_a_base() {
            return Err(invalid());
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| OnshapeError::ClientBuild { source })?;

        Ok(Self {
            http,
            base_url,
            auth_header: basic_auth_header(&config.access_key, &config.secret_key),
        })
    }

    /// Builds a request URL from path segments, escaping each one.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Cannot fail: `new` rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends a GET request and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status, or a body
    /// that does not decode as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> OnshapeResult<T> {
        let url = self.endpoint(segments);
        let path = url.path().to_string();
        debug!(%path, "GET");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(ACCEPT, ACCEPT_JSON)
            .send()
            .await
            .map_err(|source| OnshapeError::Request {
                path: path.clone(),
                source,
            })?;

        let body = read_body(&path, response).await?;
        serde_json::from_slice(&body).map_err(|source| OnshapeError::Decode { path, source })
    }

    /// Sends a POST request with a JSON body.
    ///
    /// An empty response body decodes as `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status, or a
    /// non-JSON response body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> OnshapeResult<Value> {
        let url = self.endpoint(segments);
        let path = url.path().to_string();
        debug!(%path, "POST");

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(ACCEPT, ACCEPT_JSON)
            .json(body)
            .send()
            .await
            .map_err(|source| OnshapeError::Request {
                path: path.clone(),
                source,
            })?;

        let body = read_body(&path, response).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|source| OnshapeError::Decode { path, source })
    }
}

impl fmt::Debug for OnshapeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnshapeClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Reads the body, turning non-success statuses into [`OnshapeError::Http`].
async fn read_body(path: &str, response: Response) -> OnshapeResult<Vec<u8>> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|source| OnshapeError::Request {
            path: path.to_string(),
            source,
        })?;

    if !status.is_success() {
        return Err(OnshapeError::http(
            status.as_u16(),
            path,
            &String::from_utf8_lossy(&body),
        ));
    }

    Ok(body.to_vec())
}

/// `Authorization` header value for an access/secret key pair.
fn basic_auth_header(access_key: &str, secret_key: &str) -> String {
    let encoded = BASE64_STANDARD.encode(format!("{access_key}:{secret_key}"));
    format!("Basic {encoded}")
}
