//! Plain-text rendering of view models.

use std::io::{self, Write};

use gym_core::view::{CardAction, HomeView, PanelView, ProductCard, ProductSlot, TrainerCard};
use gym_core::view::product_card::MAX_STARS;
use gym_core::{ClientConfig, User};

pub fn config(config: &ClientConfig, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "environment:      {:?}", config.environment)?;
    writeln!(out, "base url:         {}", config.base_url)?;
    writeln!(out, "with credentials: {}", config.with_credentials)?;
    writeln!(out, "timeout:          {}s", config.timeout.as_secs())?;
    writeln!(out, "token file:       {}", config.token_file.display())
}

pub fn home(view: &HomeView, out: &mut dyn Write) -> io::Result<()> {
    match &view.panel {
        PanelView::Guide(guide) => {
            writeln!(out, "== {} ==", guide.heading)?;
            for link in &guide.actions {
                writeln!(out, "  {} -> {}", link.label, link.href)?;
            }
        }
        PanelView::Trainers(trainers) => {
            writeln!(out, "== {} ==", trainers.heading)?;
            for trainer in &trainers.trainers {
                self::trainer(trainer, out)?;
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "== Shop ==")?;
    if view.products.is_empty() {
        return writeln!(out, "  no products available");
    }
    for (index, slot) in view.products.iter().enumerate() {
        let marker = if view.visible.contains(&index) { '>' } else { ' ' };
        match slot {
            ProductSlot::Skeleton => writeln!(out, "{marker} ...")?,
            ProductSlot::Card(card) => {
                write!(out, "{marker} ")?;
                product(card, out)?;
            }
        }
    }
    let left = if view.can_scroll_left { "<" } else { " " };
    let right = if view.can_scroll_right { ">" } else { " " };
    writeln!(out, "  [{left}] scroll [{right}]")
}

pub fn trainer(card: &TrainerCard, out: &mut dyn Write) -> io::Result<()> {
    let avatar = card.avatar_url.as_deref().unwrap_or(&card.avatar_fallback);
    writeln!(
        out,
        "  [{avatar}] {} {} <{}> clients: {}",
        card.user_name, card.full_name, card.email, card.client_count
    )
}

pub fn product(card: &ProductCard, out: &mut dyn Write) -> io::Result<()> {
    let action = match &card.action {
        CardAction::AddToCart => "add to cart".to_string(),
        CardAction::Login { href } => format!("login at {href}"),
    };
    writeln!(
        out,
        "#{} {} {} {} {} ({}, {})",
        card.id,
        card.title,
        stars(card.stars),
        card.price_label,
        card.stock_label,
        card.view_href,
        action
    )
}

pub fn user(user: Option<&User>, out: &mut dyn Write) -> io::Result<()> {
    let Some(user) = user.filter(|user| user.is_authenticated()) else {
        return writeln!(out, "not signed in");
    };
    writeln!(
        out,
        "{} <{}>, {} item(s) in cart",
        user.user_name.as_deref().unwrap_or("-"),
        user.email.as_deref().unwrap_or_default(),
        user.cart_quantity()
    )
}

fn stars(filled: u8) -> String {
    (0..MAX_STARS)
        .map(|i| if i < filled { '*' } else { '.' })
        .collect()
}
