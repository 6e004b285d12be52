//! Product cards shown in the shop carousel.

use crate::types::{Product, ProductId, User};

pub const MAX_STARS: u8 = 5;

/// Primary action of a product card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardAction {
    AddToCart,
    Login { href: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    pub image_alt: String,
    pub stars: u8,
    pub price_label: String,
    pub stock_label: String,
    pub view_href: String,
    pub action: CardAction,
}

impl ProductCard {
    /// Adding to the cart requires a user with an email; everyone else is
    /// sent to the login page.
    pub fn new(product: &Product, user: Option<&User>) -> Self {
        let action = if user.is_some_and(User::is_authenticated) {
            CardAction::AddToCart
        } else {
            CardAction::Login { href: "/login" }
        };
        Self {
            id: product.id.clone(),
            title: product.title.clone(),
            image_url: product.image_url.clone(),
            image_alt: format!("Image of {}", product.title),
            stars: stars(product.rating),
            price_label: format!("${}", product.price),
            stock_label: format!("In stock: {}", product.quantity),
            view_href: format!("/productpage/{}", product.id),
            action,
        }
    }
}

fn stars(rating: f64) -> u8 {
    if rating.is_nan() {
        return 0;
    }
    rating.round().clamp(0.0, f64::from(MAX_STARS)) as u8
}

/// A carousel slot: a placeholder while products load, then a card.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductSlot {
    Skeleton,
    Card(ProductCard),
}
