//! `ApiClient`: a `GymClient` paired with a `Transport`.
//!
//! Built once per configuration and shared by every caller. The session
//! token is captured at construction; `refresh_token` re-reads it after a
//! login or logout.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, info};

use crate::client::{ApiResponse, GymClient};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::token::TokenStore;
use crate::transport::{Transport, UreqTransport};
use crate::types::{AddToCart, ProductCatalog, Trainer, User};

pub struct ApiClient {
    client: RwLock<GymClient>,
    transport: Box<dyn Transport>,
    with_credentials: bool,
}

impl ApiClient {
    /// Construct against the configured origin with a `UreqTransport`.
    pub fn connect(config: &ClientConfig, store: &dyn TokenStore) -> Self {
        Self::with_transport(config, store, Box::new(UreqTransport::from_config(config)))
    }

    pub fn with_transport(
        config: &ClientConfig,
        store: &dyn TokenStore,
        transport: Box<dyn Transport>,
    ) -> Self {
        let client = GymClient::from_config(config, store);
        info!(
            base_url = client.base_url(),
            authenticated = client.token().is_some(),
            with_credentials = config.with_credentials,
            "API client constructed"
        );
        Self {
            client: RwLock::new(client),
            transport,
            with_credentials: config.with_credentials,
        }
    }

    pub fn base_url(&self) -> String {
        self.snapshot().base_url().to_string()
    }

    pub fn with_credentials(&self) -> bool {
        self.with_credentials
    }

    pub fn has_token(&self) -> bool {
        self.snapshot().token().is_some()
    }

    /// Re-read the token from `store`. Requests built afterwards carry the
    /// new value; requests already in flight keep the old one.
    pub fn refresh_token(&self, store: &dyn TokenStore) {
        let token = store.load();
        info!(authenticated = token.is_some(), "access token refreshed");
        self.client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_token(token);
    }

    /// Issue `method origin+path` with default headers merged with
    /// `overrides`. Non-2xx responses become `ApiError::Http`.
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        overrides: &[(String, String)],
    ) -> Result<ApiResponse, ApiError> {
        let client = self.snapshot();
        let request = client.build_request(method, path, body, overrides)?;
        client.parse_response(self.send(request)?)
    }

    pub fn get_all_trainers(&self) -> Result<Vec<Trainer>, ApiError> {
        let client = self.snapshot();
        client.parse_get_all_trainers(self.send(client.build_get_all_trainers())?)
    }

    pub fn get_current_user(&self) -> Result<Option<User>, ApiError> {
        let client = self.snapshot();
        client.parse_get_current_user(self.send(client.build_get_current_user())?)
    }

    pub fn get_all_products(&self) -> Result<ProductCatalog, ApiError> {
        let client = self.snapshot();
        client.parse_get_all_products(self.send(client.build_get_all_products())?)
    }

    pub fn add_to_cart(&self, input: &AddToCart) -> Result<Option<String>, ApiError> {
        let client = self.snapshot();
        client.parse_add_to_cart(self.send(client.build_add_to_cart(input)?)?)
    }

    fn snapshot(&self) -> GymClient {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        self.transport.execute(request)
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url())
            .field("with_credentials", &self.with_credentials)
            .field("has_token", &self.has_token())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for unit tests.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    pub struct ScriptedTransport {
        pub requests: Arc<Mutex<Vec<HttpRequest>>>,
        responses: Arc<Mutex<VecDeque<Result<HttpResponse, ApiError>>>>,
    }

    impl ScriptedTransport {
        pub fn reply(&self, status: u16, body: &str) -> &Self {
            self.responses.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            }));
            self
        }

        pub fn fail(&self, error: ApiError) -> &Self {
            self.responses.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn sent(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn sent_to(&self, path: &str) -> usize {
            self.sent().iter().filter(|r| r.url.ends_with(path)).count()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Network("no scripted response".to_string())))
        }
    }

    pub fn api(transport: &ScriptedTransport, token: Option<&str>) -> ApiClient {
        let config = ClientConfig::new("http://gym.test", false).unwrap();
        let store = crate::token::MemoryTokenStore::new(token);
        ApiClient::with_transport(&config, &store, Box::new(transport.clone()))
    }
}
