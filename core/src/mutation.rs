//! The add-to-cart mutation and its completion handler.
//!
//! A completed mutation first invalidates the queries it affects, then
//! publishes its notification. Both steps run for the success branch and
//! for the application-error branch alike. Network and HTTP failures are
//! returned to the caller untouched.

use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::notify::{Notification, Notifier};
use crate::query::{QueryCache, QueryKey};
use crate::types::{AddToCart, Product};

/// Queries made stale by a completed add-to-cart.
pub const ADD_TO_CART_INVALIDATES: &[QueryKey] = &[QueryKey::CURRENT_USER];

pub struct AddToCartMutation<'a> {
    api: &'a ApiClient,
    cache: &'a QueryCache,
    notifier: &'a dyn Notifier,
}

impl<'a> AddToCartMutation<'a> {
    pub fn new(api: &'a ApiClient, cache: &'a QueryCache, notifier: &'a dyn Notifier) -> Self {
        Self {
            api,
            cache,
            notifier,
        }
    }

    /// Send exactly one `POST /add-to-cart` for `product` and settle it.
    pub fn run(&self, product: &Product) -> Result<Option<Notification>, ApiError> {
        let input = AddToCart::from(product);
        info!(product_id = %input.product_id, "adding product to cart");
        let result = self.api.add_to_cart(&input);
        self.settle(result)
    }

    /// Completion handler: (1) invalidate, (2) notify.
    pub fn settle(
        &self,
        result: Result<Option<String>, ApiError>,
    ) -> Result<Option<Notification>, ApiError> {
        let notification = match result {
            Ok(message) => message.map(Notification::success),
            Err(ApiError::Application(message)) => Some(Notification::error(message)),
            Err(other) => {
                warn!(error = %other, "add to cart failed");
                return Err(other);
            }
        };
        for key in ADD_TO_CART_INVALIDATES {
            self.cache.invalidate(key);
        }
        if let Some(notification) = &notification {
            self.notifier.notify(notification.clone());
        }
        Ok(notification)
    }
}
