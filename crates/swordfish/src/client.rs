//! HTTP client for the minoTour swordfish API.
//!
//! Requests go through a [`Transport`]. The production transport wraps a
//! `ureq` agent; [`RetryingTransport`] adds bounded exponential backoff for
//! transient failures. [`StatusClient`] resolves endpoint templates and
//! classifies replies so the sync loop can branch on them without ever
//! seeing an HTTP error as a Rust error.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use smol_str::SmolStr;
use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::endpoints::Endpoint;
use crate::error::SwordfishError;
use crate::settings::ServiceSettings;

/// Statuses retried by the default policy.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub authorization: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Header names are lower-case.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One GET round trip. Any HTTP status is `Ok`; only transport failures are `Err`.
pub trait Transport: Send {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse, SwordfishError>;
}

/// Blocking `ureq` transport.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    #[must_use]
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse, SwordfishError> {
        let mut builder = self
            .agent
            .get(request.url.as_str())
            .header("Authorization", request.authorization.as_str())
            .header("Accept", "application/json");
        for (key, value) in &request.query {
            builder = builder.query(key, value);
        }
        let mut response = builder
            .call()
            .map_err(|err| SwordfishError::Transport(format!("{}: {err}", request.url).into()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| SwordfishError::Transport(format!("{}: {err}", request.url).into()))?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Backoff schedule and retryable status set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
    pub max_backoff: Duration,
    pub retryable: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 6,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2,
            max_backoff: Duration::from_secs(120),
            retryable: RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable.contains(&status)
    }

    /// Delay before retry number `attempt` (zero based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Wraps a transport with [`RetryPolicy`].
pub struct RetryingTransport {
    inner: Box<dyn Transport>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RetryingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingTransport")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryingTransport {
    #[must_use]
    pub fn new(inner: Box<dyn Transport>, policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            policy,
            clock,
        }
    }
}

impl Transport for RetryingTransport {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse, SwordfishError> {
        let mut attempt = 0;
        loop {
            let result = self.inner.send(request);
            let transient = match &result {
                Ok(response) => self.policy.is_retryable(response.status),
                Err(SwordfishError::Transport(_)) => true,
                Err(_) => false,
            };
            if !transient {
                return result;
            }
            let reason = match &result {
                Ok(response) => format!("status {}", response.status),
                Err(err) => err.to_string(),
            };
            if attempt >= self.policy.max_retries {
                error!(
                    url = %request.url,
                    attempts = attempt + 1,
                    "retry budget exhausted ({reason})"
                );
                return result;
            }
            let delay = self.policy.delay(attempt);
            debug!(url = %request.url, ?delay, "transient failure ({reason}), retrying");
            self.clock.sleep(delay);
            attempt += 1;
        }
    }
}

/// Classified outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiReply<T> {
    /// 2xx with a decoded body.
    Ok(T),
    /// 204.
    NoContent,
    /// 404.
    NotFound,
    /// Any other status, after retries.
    Status(u16),
    /// 2xx whose body did not decode.
    Undecodable(SmolStr),
    /// Transport failure after retries.
    Unreachable(SmolStr),
}

/// Client bound to one minoTour instance.
pub struct StatusClient {
    base_url: String,
    authorization: String,
    transport: Box<dyn Transport>,
}

impl std::fmt::Debug for StatusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl StatusClient {
    #[must_use]
    pub fn new(settings: &ServiceSettings, transport: Box<dyn Transport>) -> Self {
        Self {
            base_url: settings.base_url(),
            authorization: format!("Token {}", settings.token),
            transport,
        }
    }

    /// `ureq` transport with the default retry policy.
    #[must_use]
    pub fn connect(settings: &ServiceSettings, clock: Arc<dyn Clock>) -> Self {
        let transport = RetryingTransport::new(
            Box::new(UreqTransport::new()),
            RetryPolicy::default(),
            clock,
        );
        Self::new(settings, Box::new(transport))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Raw round trip; the caller inspects status and headers itself.
    pub fn get(
        &self,
        endpoint: Endpoint,
        path: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> Result<RawResponse, SwordfishError> {
        let url = format!("{}{}", self.base_url, endpoint.resolve(path)?);
        let request = ApiRequest {
            url,
            query: query
                .iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                .collect(),
            authorization: self.authorization.clone(),
        };
        self.transport.send(&request)
    }

    /// GET and decode a JSON body.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        path: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> Result<ApiReply<T>, SwordfishError> {
        let reply = match self.classify(endpoint, path, query)? {
            Classified::Body(body) => match serde_json::from_str::<T>(&body) {
                Ok(payload) => ApiReply::Ok(payload),
                Err(err) => {
                    error!(%endpoint, "could not decode response: {err}");
                    ApiReply::Undecodable(err.to_string().into())
                }
            },
            Classified::Reply(reply) => reply,
        };
        Ok(reply)
    }

    /// GET where only the status matters.
    pub fn get_status(
        &self,
        endpoint: Endpoint,
        path: &[(&str, &str)],
    ) -> Result<ApiReply<()>, SwordfishError> {
        Ok(match self.classify(endpoint, path, &[])? {
            Classified::Body(_) => ApiReply::Ok(()),
            Classified::Reply(reply) => reply,
        })
    }

    /// Only endpoint template errors (programmer errors) are `Err`.
    fn classify<T>(
        &self,
        endpoint: Endpoint,
        path: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> Result<Classified<T>, SwordfishError> {
        let response = match self.get(endpoint, path, query) {
            Ok(response) => response,
            Err(SwordfishError::Transport(message)) => {
                error!(%endpoint, "minoTour unreachable: {message}");
                return Ok(Classified::Reply(ApiReply::Unreachable(message)));
            }
            Err(err) => return Err(err),
        };
        Ok(match response.status {
            204 => Classified::Reply(ApiReply::NoContent),
            404 => Classified::Reply(ApiReply::NotFound),
            status if (200..300).contains(&status) => Classified::Body(response.body),
            status => {
                if status == 401 || status == 403 {
                    error!(%endpoint, status, "minoTour rejected the access token");
                } else {
                    warn!(%endpoint, status, "unexpected status from minoTour");
                }
                Classified::Reply(ApiReply::Status(status))
            }
        })
    }
}

enum Classified<T> {
    Body(String),
    Reply(ApiReply<T>),
}
