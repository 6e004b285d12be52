use mock_server::{AppState, Catalog};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;

    let catalog = Catalog::demo();
    for account in &catalog.accounts {
        tracing::info!(user = %account.user.user_name, token = %account.token, "seeded account");
    }
    tracing::info!(%addr, "listening");
    mock_server::run(listener, AppState::new(catalog)).await
}
