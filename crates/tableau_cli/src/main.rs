//! Tableau CLI
//!
//! Serves a Tableau site: the static files under `--root`, the JSON API and
//! the upload directory.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tableau_server::{ServerConfig, SiteServer, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Tableau site server.
#[derive(Parser, Debug)]
#[command(name = "tableau")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind to
    #[arg(short, long, env = "TABLEAU_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Site root holding index.html, data/ and assets/
    #[arg(short, long, env = "TABLEAU_ROOT", default_value = ".")]
    root: PathBuf,

    /// Largest accepted request body, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig::new(SocketAddr::new(self.bind, self.port))
            .with_root(self.root.clone())
            .with_max_body_bytes(self.max_body_bytes)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let server = SiteServer::bind(cli.server_config()).await?;
    server
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
            }
        })
        .await?;
    Ok(())
}
