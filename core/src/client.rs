//! Stateless HTTP request builder and response parser for the storefront API.
//!
//! # Design
//! `GymClient` holds the base origin and the session token captured when it
//! was built. Each endpoint is split into a `build_*` method producing an
//! `HttpRequest` and a `parse_*` method consuming an `HttpResponse`; the
//! caller (usually `ApiClient`) executes the round-trip. The token is a
//! static header value: it changes only through `set_token`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{merge_headers, HttpMethod, HttpRequest, HttpResponse};
use crate::token::TokenStore;
use crate::types::{
    AddToCart, Envelope, ProductCatalog, ProductsEnvelope, Trainer, TrainerRoster, User,
};

/// Header carrying the session token on every request.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

pub const TRAINERS_PATH: &str = "/get-all-trainers";
pub const CURRENT_USER_PATH: &str = "/get-current-user";
pub const PRODUCTS_PATH: &str = "/get-all-products";
pub const ADD_TO_CART_PATH: &str = "/add-to-cart";

/// Status and decoded JSON body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// Synchronous, stateless client for the storefront API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GymClient {
    base_url: String,
    token: Option<String>,
}

impl GymClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Bind to the configured origin, reading the token from `store` once.
    pub fn from_config(config: &ClientConfig, store: &dyn TokenStore) -> Self {
        Self::new(&config.base_url, store.load())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.trim().is_empty());
    }

    /// Headers attached to every request. The access-token header is
    /// omitted when there is no token.
    pub fn default_headers(&self) -> Vec<(String, String)> {
        match &self.token {
            Some(token) => vec![(ACCESS_TOKEN_HEADER.to_string(), token.clone())],
            None => Vec::new(),
        }
    }

    /// Build a request for `origin + path` with default headers merged with
    /// `overrides` (overrides win).
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        overrides: &[(String, String)],
    ) -> Result<HttpRequest, ApiError> {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut headers = self.default_headers();
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        merge_headers(&mut headers, overrides);
        Ok(HttpRequest {
            method,
            url: self.url(path),
            headers,
            body,
        })
    }

    fn build_json<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_value(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.build_request(method, path, Some(&body), &[])
    }

    fn build_get(&self, path: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url(path),
            headers: self.default_headers(),
            body: None,
        }
    }

    pub fn build_get_all_trainers(&self) -> HttpRequest {
        self.build_get(TRAINERS_PATH)
    }

    pub fn build_get_current_user(&self) -> HttpRequest {
        self.build_get(CURRENT_USER_PATH)
    }

    pub fn build_get_all_products(&self) -> HttpRequest {
        self.build_get(PRODUCTS_PATH)
    }

    pub fn build_add_to_cart(&self, input: &AddToCart) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, ADD_TO_CART_PATH, input)
    }

    /// Decode any 2xx response into `ApiResponse`. An empty body decodes
    /// to `null`.
    pub fn parse_response(&self, response: HttpResponse) -> Result<ApiResponse, ApiError> {
        check_status(&response)?;
        let body = if response.body.trim().is_empty() {
            Value::Null
        } else {
            decode(&response.body)?
        };
        Ok(ApiResponse {
            status: response.status,
            body,
        })
    }

    pub fn parse_get_all_trainers(&self, response: HttpResponse) -> Result<Vec<Trainer>, ApiError> {
        check_status(&response)?;
        let envelope: Envelope<TrainerRoster> = decode(&response.body)?;
        if let Some(message) = envelope.error {
            return Err(ApiError::Application(message));
        }
        Ok(envelope.success.map(|roster| roster.0).unwrap_or_default())
    }

    /// `Ok(None)` when the envelope has no `success` field: the caller is
    /// not signed in.
    pub fn parse_get_current_user(&self, response: HttpResponse) -> Result<Option<User>, ApiError> {
        check_status(&response)?;
        let envelope: Envelope<User> = decode(&response.body)?;
        if envelope.success.is_none() {
            if let Some(message) = &envelope.error {
                debug!(reason = %message, "current user unavailable");
            }
        }
        Ok(envelope.success)
    }

    pub fn parse_get_all_products(&self, response: HttpResponse) -> Result<ProductCatalog, ApiError> {
        check_status(&response)?;
        let envelope: ProductsEnvelope = decode(&response.body)?;
        if let Some(message) = envelope.error {
            return Err(ApiError::Application(message));
        }
        Ok(envelope.products.unwrap_or_default())
    }

    /// Success message of an add-to-cart call. An `error` field becomes
    /// `ApiError::Application`; an envelope with neither yields `None`.
    pub fn parse_add_to_cart(&self, response: HttpResponse) -> Result<Option<String>, ApiError> {
        check_status(&response)?;
        let envelope: Envelope<Value> = decode(&response.body)?;
        if let Some(message) = envelope.error {
            return Err(ApiError::Application(message));
        }
        Ok(envelope.success.map(|success| match success {
            Value::String(message) => message,
            other => other.to_string(),
        }))
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Map non-2xx status codes to `ApiError::Http`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}
