//! TCP listener.
//!
//! [`Server`] owns the long-lived service objects: one key-value store and
//! one geo engine, created when the server is built and shared by every
//! connection task through `Arc`s.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::{handle_connection, ConnectionStats};
use crate::geo::GeoEngine;
use crate::storage::KeyValueStore;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub struct Server {
    listener: TcpListener,
    commands: CommandHandler,
    stats: Arc<ConnectionStats>,
}

impl Server {
    /// Binds the configured address and creates fresh, empty engines.
    pub async fn bind(config: &Config) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        let kv = Arc::new(KeyValueStore::new());
        let geo = Arc::new(GeoEngine::new());

        Ok(Self {
            listener,
            commands: CommandHandler::new(kv, geo),
            stats: Arc::new(ConnectionStats::new()),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Connections already being served keep running on their own tasks.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        info!(addr = ?self.listener.local_addr().ok(), "accepting connections");

        tokio::select! {
            _ = self.accept_loop() => {}
            _ = shutdown => info!("shutdown signal received, stopping listener"),
        }
    }

    async fn accept_loop(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        error!(client = %addr, error = %e, "failed to set TCP_NODELAY");
                    }
                    tokio::spawn(handle_connection(
                        stream,
                        addr,
                        self.commands.clone(),
                        Arc::clone(&self.stats),
                    ));
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                }
            }
        }
    }
}
