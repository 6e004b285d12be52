use std::process;

use clap::Parser;
use gym_cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();
    if let Err(err) = run(&cli, &mut stdout) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}
