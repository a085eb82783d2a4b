//! geokv server entry point.
//!
//! Reads configuration, sets up logging, binds the listener and serves until
//! Ctrl+C.

use geokv::{Config, Invocation, Server};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        r#"
geokv - In-Memory Key-Value and Geospatial Store

USAGE:
    geokv [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Host to bind to (default: 127.0.0.1, env: GEOKV_HOST)
    -p, --port <PORT>    Port to listen on (default: 6379, env: GEOKV_PORT)
    -v, --version        Print version information
        --help           Print this help message

LOGGING:
    Set RUST_LOG to control verbosity, e.g. RUST_LOG=geokv=debug

CONNECTING:
    $ redis-cli -p 6379
    127.0.0.1:6379> SET greeting hello 60
    OK
    127.0.0.1:6379> GEOADD fleet 52.52 13.405 car1
    OK
    127.0.0.1:6379> GEOADD fleet 48.8566 2.3522 car2
    OK
    127.0.0.1:6379> GEODIST fleet car1 car2
    "877463.325917543"
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env_and_args()? {
        Invocation::Serve(config) => config,
        Invocation::Help => {
            print_help();
            return Ok(());
        }
        Invocation::Version => {
            println!("geokv version {}", geokv::VERSION);
            return Ok(());
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let server = Server::bind(&config).await?;
    info!(
        version = geokv::VERSION,
        addr = %config.bind_address(),
        "geokv started"
    );

    server
        .run(async {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("server shutdown complete");
    Ok(())
}
