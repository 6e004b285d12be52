//! Commands against the live mock server.

use std::io::Write as _;
use std::sync::Arc;

use clap::Parser;
use gym_cli::{execute, resolve_config, run, Cli, Command, PanelArg};
use gym_core::{ApiClient, ClientConfig, FileTokenStore, MemoryTokenStore};
use mock_server::{AppState, Catalog};

struct Server {
    origin: String,
    token: String,
}

fn start() -> Server {
    let catalog = Catalog::demo();
    let token = catalog.accounts[0].token.to_string();
    let addr = mock_server::spawn(AppState::new(catalog)).unwrap();
    Server {
        origin: format!("http://{addr}"),
        token,
    }
}

fn api(server: &Server, token: Option<&str>) -> Arc<ApiClient> {
    let config = ClientConfig::new(&server.origin, false).unwrap();
    Arc::new(ApiClient::connect(&config, &MemoryTokenStore::new(token)))
}

fn output(command: Command, api: Arc<ApiClient>) -> anyhow::Result<String> {
    let mut out = Vec::new();
    execute(&command, api, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn parses_home_options() {
    let cli = Cli::try_parse_from(["gym", "home", "--panel", "trainers", "--scroll", "2"]).unwrap();
    assert_eq!(
        cli.command,
        Command::Home {
            panel: PanelArg::Trainers,
            scroll: 2,
            width: 1280
        }
    );
    assert!(Cli::try_parse_from(["gym", "home", "--panel", "shop"]).is_err());
}

#[test]
fn config_command_applies_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("storage.json");
    let cli = Cli::try_parse_from([
        "gym",
        "config",
        "--base-url",
        "http://localhost:4000/",
        "--token-file",
        token_file.to_str().unwrap(),
    ])
    .unwrap();

    let config = resolve_config(&cli).unwrap();
    assert_eq!(config.base_url, "http://localhost:4000");
    assert_eq!(config.token_file, token_file);

    let mut out = Vec::new();
    run(&cli, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("base url:         http://localhost:4000"));
}

#[test]
fn rejects_base_url_without_scheme() {
    let cli = Cli::try_parse_from(["gym", "config", "--base-url", "gym.example.com"]).unwrap();
    assert!(resolve_config(&cli).is_err());
}

#[test]
fn whoami_reports_signed_in_user() {
    let server = start();
    let text = output(Command::Whoami, api(&server, Some(&server.token))).unwrap();
    assert_eq!(text, "ana <ana@gym.test>, 0 item(s) in cart\n");

    let text = output(Command::Whoami, api(&server, None)).unwrap();
    assert_eq!(text, "not signed in\n");
}

#[test]
fn token_is_read_from_local_storage_file() {
    let server = start();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local-storage.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, r#"{{"token":"{}"}}"#, server.token).unwrap();

    let config = ClientConfig::new(&server.origin, false).unwrap().with_token_file(&path);
    let store = FileTokenStore::new(&config.token_file);
    let api = Arc::new(ApiClient::connect(&config, &store));
    let text = output(Command::Whoami, api).unwrap();
    assert!(text.starts_with("ana "));
}

#[test]
fn trainers_and_products_are_listed() {
    let server = start();
    let trainers = output(Command::Trainers, api(&server, None)).unwrap();
    assert_eq!(trainers.lines().count(), 2);
    assert!(trainers.contains("ironmike Mike Stone <mike@gym.test> clients: 1"));

    let products = output(Command::Products, api(&server, None)).unwrap();
    assert_eq!(products.lines().count(), 3);
    assert!(products.contains("#1 Kettlebell"));
    assert!(products.contains("login at /login"));
}

#[test]
fn home_renders_guide_and_carousel() {
    let server = start();
    let command = Command::Home {
        panel: PanelArg::Guide,
        scroll: 1,
        width: 632,
    };
    let text = output(command, api(&server, Some(&server.token))).unwrap();
    assert!(text.contains("Start your journey! -> /newclient"));
    assert!(text.contains("add to cart"));
    assert!(text.contains("[<] scroll [>]"));
}

#[test]
fn add_to_cart_updates_the_cart() {
    let server = start();
    let api = api(&server, Some(&server.token));
    let added = output(Command::AddToCart { id: "1".to_string() }, api.clone()).unwrap();
    assert!(added.contains("Product added to cart"));

    let text = output(Command::Whoami, api.clone()).unwrap();
    assert!(text.contains("1 item(s) in cart"));

    let err = output(Command::AddToCart { id: "3".to_string() }, api.clone()).unwrap_err();
    assert_eq!(err.to_string(), "Product is out of stock");

    let err = output(Command::AddToCart { id: "42".to_string() }, api).unwrap_err();
    assert!(err.to_string().contains("no product with id 42"));
}
