//! Executes `HttpRequest` values over the network.
//!
//! `Transport` is the seam between the sans-io `GymClient` and real I/O.
//! `UreqTransport` returns non-2xx statuses as data so status handling stays
//! in the parse step, and only reports `ApiError::Network` when no response
//! arrived. With credentials enabled it keeps a cookie jar for the origin.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use ureq::{Agent, RequestBuilder};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport built on a shared `ureq::Agent`.
pub struct UreqTransport {
    agent: Agent,
    cookies: Option<CookieJar>,
}

impl UreqTransport {
    pub fn new(timeout: Duration, with_credentials: bool) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            cookies: with_credentials.then(CookieJar::default),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.timeout, config.with_credentials)
    }

    /// Cookies currently held, as `name=value` pairs. Empty without
    /// credentials.
    pub fn cookies(&self) -> Vec<String> {
        self.cookies.as_ref().map(CookieJar::pairs).unwrap_or_default()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut headers = request.headers;
        if let Some(cookie) = self.cookies.as_ref().and_then(CookieJar::header_value) {
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case("cookie"));
            headers.push(("cookie".to_string(), cookie));
        }

        let url = request.url.as_str();
        let result = match (request.method, request.body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), &headers).call(),
            (HttpMethod::Delete, Some(body)) => with_headers(self.agent.delete(url), &headers)
                .force_send_body()
                .send(body.as_bytes()),
            (HttpMethod::Delete, None) => with_headers(self.agent.delete(url), &headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), &headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), &headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(url), &headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), &headers).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let response_headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        if let Some(jar) = &self.cookies {
            jar.store(&response_headers);
        }
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        debug!(%status, url, "response received");
        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Cookies set by the origin, replayed on later requests.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<BTreeMap<String, String>>,
}

impl CookieJar {
    /// Record every `Set-Cookie` header. Only the leading `name=value` is
    /// kept. An empty value, `Max-Age<=0` or an `Expires` in the past removes
    /// the cookie; `Max-Age` wins over `Expires` when both are present.
    pub fn store(&self, headers: &[(String, String)]) {
        let now = Utc::now();
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        for (name, value) in headers {
            if !name.eq_ignore_ascii_case("set-cookie") {
                continue;
            }
            let mut parts = value.split(';');
            let pair = parts.next().unwrap_or_default().trim();
            let Some((key, val)) = pair.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            if val.is_empty() || is_expired(parts, now) {
                cookies.remove(key);
            } else {
                cookies.insert(key.to_string(), val.to_string());
            }
        }
    }

    /// Value for a `Cookie` request header, if any cookie is held.
    pub fn header_value(&self) -> Option<String> {
        let pairs = self.pairs();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    fn pairs(&self) -> Vec<String> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }
}

fn is_expired<'a>(attributes: impl Iterator<Item = &'a str>, now: DateTime<Utc>) -> bool {
    let mut max_age = None;
    let mut expires = None;
    for attribute in attributes {
        let Some((name, value)) = attribute.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "max-age" => max_age = value.parse::<i64>().ok(),
            "expires" => expires = DateTime::parse_from_rfc2822(value).ok(),
            _ => {}
        }
    }
    match (max_age, expires) {
        (Some(age), _) => age <= 0,
        (None, Some(at)) => at <= now,
        (None, None) => false,
    }
}
