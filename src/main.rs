mod cli;
mod resolver;
mod sync;
mod wire;

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.poll_interval_ms == 0 {
        eprintln!("clipsyncd: --poll-interval-ms must be greater than zero");
        std::process::exit(1);
    }

    let config = sync::ServeConfig {
        bind: SocketAddr::new(cli.bind, cli.port),
        password: cli.password.filter(|p| !p.is_empty()),
        notify: !cli.no_notify,
        liveness_window: Duration::from_secs(cli.liveness_window),
    };
    let resolvers = resolver::ResolverSet::x11(Duration::from_millis(cli.poll_interval_ms));

    if let Err(e) = sync::run(config, resolvers).await {
        tracing::error!(error = %e, "server failed");
        eprintln!("clipsyncd: {e}");
        std::process::exit(1);
    }
}
