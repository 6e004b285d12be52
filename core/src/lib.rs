//! Synchronous client core for the gym storefront backend.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values in
//! `GymClient` without touching the network (host-does-IO pattern). A
//! `Transport` executes the round-trip; `ApiClient` pairs the two and is
//! what the rest of the crate talks to.
//!
//! # Design
//! - `GymClient` holds the origin and the session token read once from a
//!   `TokenStore`; every request carries `x-access-token` when a token
//!   exists.
//! - `QueryCache` memoizes the three home page reads by key and coalesces
//!   concurrent loads. `AddToCartMutation` invalidates `currentUser` before
//!   it publishes a notification.
//! - `view` turns cache state into plain render data for the home page.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod global;
pub mod http;
pub mod mutation;
pub mod notify;
pub mod query;
pub mod token;
pub mod transport;
pub mod types;
pub mod view;

pub use api::ApiClient;
pub use client::{ApiResponse, GymClient, ACCESS_TOKEN_HEADER};
pub use config::{ClientConfig, ConfigError, Environment};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use mutation::AddToCartMutation;
pub use notify::{Notification, NotificationCenter, NotificationKind, Notifier};
pub use query::{QueryCache, QueryKey, QueryState};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{Transport, UreqTransport};
pub use types::{AddToCart, CartItem, Product, ProductCatalog, ProductId, Trainer, User};
pub use view::{HomePage, HomeView, Storefront};
