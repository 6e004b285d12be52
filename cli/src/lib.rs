//! Terminal front end for the gym storefront.
//!
//! `run` resolves configuration, installs the shared client and hands the
//! command to `execute`, which only needs an `ApiClient` and is what the
//! tests drive.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gym_core::view::{Panel, ProductCard, TrainersView, DEFAULT_VIEWPORT_WIDTH};
use gym_core::{
    global, ApiClient, ClientConfig, FileTokenStore, HomePage, NotificationKind, QueryCache,
    Storefront,
};

pub mod render;

#[derive(Parser, Debug)]
#[command(name = "gym", about = "Browse the gym storefront from a terminal")]
pub struct Cli {
    /// Backend origin, overriding the configured one
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Local-storage file holding the session token
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the resolved client configuration
    Config,
    /// Render the home page
    Home {
        #[arg(long, value_enum, default_value_t = PanelArg::Guide)]
        panel: PanelArg,
        /// Press the scroll-right button this many times
        #[arg(long, default_value_t = 0)]
        scroll: u32,
        /// Viewport width in pixels
        #[arg(long, default_value_t = DEFAULT_VIEWPORT_WIDTH)]
        width: u64,
    },
    /// Show the signed-in user
    Whoami,
    /// List trainers
    Trainers,
    /// List products
    Products,
    /// Add a product to the cart
    AddToCart {
        /// Product id as shown by `products`
        id: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelArg {
    Guide,
    Trainers,
}

impl From<PanelArg> for Panel {
    fn from(value: PanelArg) -> Self {
        match value {
            PanelArg::Guide => Panel::Guide,
            PanelArg::Trainers => Panel::Trainers,
        }
    }
}

/// Configuration from file and environment, then command-line overrides.
pub fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::load().context("loading configuration")?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = ClientConfig::new(base_url, config.with_credentials)?.base_url;
    }
    if let Some(token_file) = &cli.token_file {
        config.token_file = token_file.clone();
    }
    Ok(config)
}

pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let config = resolve_config(cli)?;
    if cli.command == Command::Config {
        render::config(&config, out)?;
        return Ok(());
    }

    let store = FileTokenStore::new(&config.token_file);
    let api = global::init(config, &store)?;
    let result = execute(&cli.command, api, out);
    global::shutdown();
    result
}

pub fn execute(command: &Command, api: Arc<ApiClient>, out: &mut dyn Write) -> Result<()> {
    let storefront = Storefront::new(api, Arc::new(QueryCache::new()));
    match command {
        Command::Config => bail!("`config` does not talk to the backend"),
        Command::Home {
            panel,
            scroll,
            width,
        } => {
            storefront.refresh()?;
            let mut page = HomePage::new(*width);
            page.select_panel((*panel).into());
            storefront.snapshot(&mut page);
            for _ in 0..*scroll {
                page.scroll_right();
            }
            render::home(&storefront.snapshot(&mut page), out)?;
        }
        Command::Whoami => {
            let user = storefront.current_user()?;
            render::user((*user).as_ref(), out)?;
        }
        Command::Trainers => {
            let trainers = storefront.trainers()?;
            let view = TrainersView::new(&trainers);
            if view.trainers.is_empty() {
                writeln!(out, "no trainers")?;
            }
            for card in &view.trainers {
                render::trainer(card, out)?;
            }
        }
        Command::Products => {
            let user = storefront.current_user()?;
            let catalog = storefront.products()?;
            if catalog.special_products.is_empty() {
                writeln!(out, "no products")?;
            }
            for product in &catalog.special_products {
                let card = ProductCard::new(product, (*user).as_ref());
                render::product(&card, out)?;
            }
        }
        Command::AddToCart { id } => {
            let catalog = storefront.products()?;
            let Some(product) = catalog
                .special_products
                .iter()
                .find(|product| product.id.to_string() == *id)
            else {
                bail!("no product with id {id}");
            };
            match storefront.add_to_cart(product)? {
                Some(notification) if notification.kind == NotificationKind::Error => {
                    bail!("{}", notification.message)
                }
                Some(notification) => writeln!(out, "{notification}")?,
                None => writeln!(out, "request sent")?,
            }
        }
    }
    Ok(())
}
