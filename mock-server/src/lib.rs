//! In-memory stand-in for the gym storefront backend.
//!
//! Serves the four storefront endpoints from a seeded `Catalog` and records
//! every request so tests can assert on the headers a client sent.

use std::{
    collections::{BTreeMap, HashMap},
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";
pub const SESSION_COOKIE: &str = "gym_session";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trainer {
    pub user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_image: String,
    pub clients: Vec<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub title: String,
    pub image_url: String,
    pub rating: f64,
    pub price: u64,
    pub quantity: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: u64,
    pub product_price: u64,
    pub quantity: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub cart: Vec<CartLine>,
}

#[derive(Clone, Debug)]
pub struct Account {
    pub token: Uuid,
    pub user: User,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: Value,
    pub product_price: Number,
}

/// `{ success }` or `{ error }`; `{}` when neither is set.
#[derive(Debug, Serialize, Deserialize)]
pub struct Reply<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Reply<T> {
    fn ok(value: T) -> Self {
        Self {
            success: Some(value),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: None,
            error: Some(message.into()),
        }
    }

    fn empty() -> Self {
        Self {
            success: None,
            error: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialProducts {
    pub special_products: Vec<Product>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductsReply {
    pub products: SpecialProducts,
}

/// One request as seen by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub access_token: Option<String>,
    pub cookie: Option<String>,
}

/// Seed data for a server instance.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub accounts: Vec<Account>,
    pub trainers: BTreeMap<String, Trainer>,
    pub products: Vec<Product>,
}

impl Catalog {
    /// One account, two trainers, two products in stock and one sold out.
    /// Account tokens are freshly issued on every call.
    pub fn demo() -> Self {
        let accounts = vec![Account {
            token: Uuid::new_v4(),
            user: User {
                email: "ana@gym.test".to_string(),
                user_name: "ana".to_string(),
                first_name: "Ana".to_string(),
                last_name: "Lima".to_string(),
                cart: Vec::new(),
            },
        }];
        let trainers = BTreeMap::from([
            (
                "t1".to_string(),
                Trainer {
                    user_name: "ironmike".to_string(),
                    email: "mike@gym.test".to_string(),
                    first_name: "Mike".to_string(),
                    last_name: "Stone".to_string(),
                    profile_image: String::new(),
                    clients: vec![Value::from("ana")],
                },
            ),
            (
                "t2".to_string(),
                Trainer {
                    user_name: "yogi".to_string(),
                    email: "yogi@gym.test".to_string(),
                    first_name: "Lena".to_string(),
                    last_name: "Park".to_string(),
                    profile_image: "https://img.gym.test/yogi.png".to_string(),
                    clients: Vec::new(),
                },
            ),
        ]);
        let products = vec![
            Product {
                id: 1,
                title: "Kettlebell".to_string(),
                image_url: "https://img.gym.test/kettlebell.png".to_string(),
                rating: 4.5,
                price: 10,
                quantity: 12,
            },
            Product {
                id: 2,
                title: "Yoga mat".to_string(),
                image_url: "https://img.gym.test/mat.png".to_string(),
                rating: 3.8,
                price: 20,
                quantity: 4,
            },
            Product {
                id: 3,
                title: "Rowing machine".to_string(),
                image_url: "https://img.gym.test/rower.png".to_string(),
                rating: 5.0,
                price: 900,
                quantity: 0,
            },
        ];
        Self {
            accounts,
            trainers,
            products,
        }
    }
}

struct Store {
    users: HashMap<Uuid, User>,
    trainers: BTreeMap<String, Trainer>,
    products: Vec<Product>,
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl AppState {
    pub fn new(catalog: Catalog) -> Self {
        let users = catalog
            .accounts
            .into_iter()
            .map(|account| (account.token, account.user))
            .collect();
        Self {
            store: Arc::new(RwLock::new(Store {
                users,
                trainers: catalog.trainers,
                products: catalog.products,
            })),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests recorded so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/get-all-trainers", get(get_all_trainers))
        .route("/get-current-user", get(get_current_user))
        .route("/get-all-products", get(get_all_products))
        .route("/add-to-cart", post(add_to_cart))
        .route("/__requests", get(list_requests))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

/// Serve `state` on a random local port from a background thread and
/// return the bound address.
pub fn spawn(state: AppState) -> std::io::Result<SocketAddr> {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = std_listener.local_addr()?;
    std_listener.set_nonblocking(true)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::spawn(move || {
        let served = runtime.block_on(async {
            let listener = TcpListener::from_std(std_listener)?;
            run(listener, state).await
        });
        if let Err(e) = served {
            tracing::error!(error = %e, "mock server stopped");
        }
    });
    Ok(addr)
}

async fn record(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if path != "/__requests" {
        let headers = request.headers();
        let entry = RecordedRequest {
            method: request.method().to_string(),
            path,
            access_token: header_str(headers, ACCESS_TOKEN_HEADER).map(str::to_string),
            cookie: header_str(headers, header::COOKIE.as_str()).map(str::to_string),
        };
        debug!(method = %entry.method, path = %entry.path, "request");
        state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
    next.run(request).await
}

async fn list_requests(State(state): State<AppState>) -> Json<Vec<RecordedRequest>> {
    Json(state.requests())
}

async fn get_all_trainers(State(state): State<AppState>) -> Json<Reply<BTreeMap<String, Trainer>>> {
    let store = state.store.read().await;
    Json(Reply::ok(store.trainers.clone()))
}

async fn get_current_user(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.store.read().await;
    match identify(&headers).and_then(|token| Some((token, store.users.get(&token)?))) {
        Some((token, user)) => {
            let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly");
            ([(header::SET_COOKIE, cookie)], Json(Reply::ok(user.clone()))).into_response()
        }
        None => Json(Reply::<User>::empty()).into_response(),
    }
}

async fn get_all_products(State(state): State<AppState>) -> Json<ProductsReply> {
    let store = state.store.read().await;
    Json(ProductsReply {
        products: SpecialProducts {
            special_products: store.products.clone(),
        },
    })
}

async fn add_to_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<AddToCart>,
) -> (StatusCode, Json<Reply<String>>) {
    let mut store = state.store.write().await;
    let Store {
        users, products, ..
    } = &mut *store;

    let Some(user) = identify(&headers).and_then(|token| users.get_mut(&token)) else {
        return (StatusCode::UNAUTHORIZED, Json(Reply::error("Please log in first")));
    };

    let requested = input
        .product_id
        .as_u64()
        .or_else(|| input.product_id.as_str().and_then(|id| id.parse().ok()));
    let Some(product) = requested.and_then(|id| products.iter().find(|p| p.id == id)) else {
        return (StatusCode::OK, Json(Reply::error("Product not found")));
    };
    if !price_matches(&input.product_price, product.price) {
        return (StatusCode::OK, Json(Reply::error("Price mismatch")));
    }
    if product.quantity == 0 {
        return (StatusCode::OK, Json(Reply::error("Product is out of stock")));
    }

    match user.cart.iter_mut().find(|line| line.product_id == product.id) {
        Some(line) => line.quantity += 1,
        None => user.cart.push(CartLine {
            product_id: product.id,
            product_price: product.price,
            quantity: 1,
        }),
    }
    info!(user = %user.user_name, product_id = product.id, "added to cart");
    (StatusCode::OK, Json(Reply::ok("Product added to cart".to_string())))
}

/// Prices are whole units, so only an exact integer echo matches.
fn price_matches(sent: &Number, price: u64) -> bool {
    sent.as_u64() == Some(price)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Token from `x-access-token`, falling back to the session cookie.
fn identify(headers: &HeaderMap) -> Option<Uuid> {
    if let Some(token) = header_str(headers, ACCESS_TOKEN_HEADER) {
        return Uuid::parse_str(token).ok();
    }
    header_str(headers, header::COOKIE.as_str())?
        .split(';')
        .find_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .and_then(|token| Uuid::parse_str(token).ok())
}
