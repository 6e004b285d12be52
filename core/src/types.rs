//! Domain DTOs for the storefront API.
//!
//! # Design
//! These types mirror the backend's JSON (camelCase) and are defined
//! independently of the mock-server crate; integration tests catch schema
//! drift. Fields the home page does not rely on are defaulted so partial
//! payloads still decode. Prices stay `serde_json::Number` so a price is
//! echoed back to the backend exactly as it was received.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use tracing::warn;

/// Product identifier: numeric in some deployments, a string in others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Number(n) => write!(f, "{n}"),
            ProductId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ProductId {
    fn from(value: u64) -> Self {
        ProductId::Number(value)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        ProductId::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Trainer {
    pub user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_image: Option<String>,
    pub clients: Vec<Value>,
}

/// The signed-in user as returned by `/get-current-user`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub cart: Vec<CartItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// A user counts as signed in only with a non-empty email.
    pub fn is_authenticated(&self) -> bool {
        self.email.as_deref().is_some_and(|email| !email.is_empty())
    }

    pub fn cart_quantity(&self) -> u64 {
        self.cart.iter().map(|item| item.quantity).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub product_price: Number,
    #[serde(default = "one")]
    pub quantity: u64,
}

fn one() -> u64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub rating: f64,
    pub price: Number,
    #[serde(default)]
    pub quantity: u64,
}

/// Payload of `/get-all-products`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCatalog {
    #[serde(default, deserialize_with = "skip_bad_products")]
    pub special_products: Vec<Product>,
}

/// Decode products one by one so a single malformed entry does not empty
/// the whole carousel.
fn skip_bad_products<'de, D>(deserializer: D) -> Result<Vec<Product>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(product) => Some(product),
            Err(error) => {
                warn!(index, %error, "skipping malformed product");
                None
            }
        })
        .collect())
}

/// Request payload for `POST /add-to-cart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: ProductId,
    pub product_price: Number,
}

impl From<&Product> for AddToCart {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            product_price: product.price.clone(),
        }
    }
}

/// The `{ success, error }` envelope used by most endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The `{ products }` envelope used by `/get-all-products`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductsEnvelope {
    #[serde(default)]
    pub products: Option<ProductCatalog>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Trainer list that accepts either a JSON array or an object whose values
/// are trainers. Object values come out in key order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainerRoster(pub Vec<Trainer>);

impl<'de> Deserialize<'de> for TrainerRoster {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<Trainer>),
            Keyed(BTreeMap<String, Trainer>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::List(trainers) => TrainerRoster(trainers),
            Raw::Keyed(trainers) => TrainerRoster(trainers.into_values().collect()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_to_cart_serializes_camel_case_and_keeps_number_shape() {
        let product: Product =
            serde_json::from_value(json!({"id": 1, "title": "Whey", "price": 10})).unwrap();
        let body = serde_json::to_value(AddToCart::from(&product)).unwrap();
        assert_eq!(body, json!({"productId": 1, "productPrice": 10}));
    }

    #[test]
    fn product_id_accepts_strings() {
        let product: Product =
            serde_json::from_value(json!({"id": "64ab", "price": 19.99})).unwrap();
        assert_eq!(product.id, ProductId::Text("64ab".to_string()));
        assert_eq!(product.id.to_string(), "64ab");
        assert_eq!(product.quantity, 0);
    }

    #[test]
    fn roster_decodes_object_values_in_key_order() {
        let roster: TrainerRoster = serde_json::from_value(json!({
            "b": {"userName": "second", "clients": []},
            "a": {"userName": "first", "clients": [1, 2]},
        }))
        .unwrap();
        let names: Vec<_> = roster.0.iter().map(|t| t.user_name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(roster.0[0].clients.len(), 2);
    }

    #[test]
    fn roster_decodes_arrays() {
        let roster: TrainerRoster =
            serde_json::from_value(json!([{"userName": "solo"}])).unwrap();
        assert_eq!(roster.0.len(), 1);
    }

    #[test]
    fn user_without_email_is_not_authenticated() {
        let user: User = serde_json::from_value(json!({"userName": "ghost"})).unwrap();
        assert!(!user.is_authenticated());
        let user: User = serde_json::from_value(json!({"email": ""})).unwrap();
        assert!(!user.is_authenticated());
        let user: User = serde_json::from_value(json!({"email": "a@b.c", "role": "client"})).unwrap();
        assert!(user.is_authenticated());
        assert_eq!(user.extra["role"], "client");
    }

    #[test]
    fn cart_quantity_sums_lines() {
        let user: User = serde_json::from_value(json!({
            "email": "a@b.c",
            "cart": [
                {"productId": 1, "productPrice": 10, "quantity": 2},
                {"productId": 2, "productPrice": 20}
            ]
        }))
        .unwrap();
        assert_eq!(user.cart_quantity(), 3);
    }

    #[test]
    fn malformed_products_are_skipped() {
        let catalog: ProductCatalog = serde_json::from_value(json!({"specialProducts": [
            {"id": 1, "price": 10},
            {"id": 2, "price": "ten"},
            {"id": -3, "price": 5},
            {"id": 4},
            {"id": "five", "price": 2.5}
        ]}))
        .unwrap();
        let ids: Vec<String> = catalog.special_products.iter().map(|p| p.id.to_string()).collect();
        assert_eq!(ids, ["1", "five"]);

        let empty: ProductCatalog = serde_json::from_value(json!({"specialProducts": null})).unwrap();
        assert!(empty.special_products.is_empty());
    }
}
