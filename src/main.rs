use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use caching_proxy::config::{self, ProxyConfig};
use caching_proxy::lifecycle::{spawn_signal_handler, Shutdown};
use caching_proxy::net::Listener;
use caching_proxy::observability::{logging, metrics};
use caching_proxy::{HttpFetcher, ProxyServer};

/// Caching forward proxy.
#[derive(Debug, Parser)]
#[command(name = "caching-proxy", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, keeping the configured host
    #[arg(short, long)]
    port: Option<u16>,

    /// Connections serviced concurrently
    #[arg(long)]
    max_clients: Option<usize>,

    /// Responses held in the cache
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Requests allowed per client per window
    #[arg(long)]
    max_requests: Option<u64>,

    /// Rate limit window in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ProxyConfig) {
        if let Some(port) = self.port {
            config.listener.set_port(port);
        }
        if let Some(max_clients) = self.max_clients {
            config.listener.max_clients = max_clients;
        }
        if let Some(capacity) = self.cache_capacity {
            config.cache.capacity = capacity;
        }
        if let Some(max_requests) = self.max_requests {
            config.rate_limit.max_tokens = max_requests;
        }
        if let Some(window_ms) = self.window_ms {
            config.rate_limit.window_ms = window_ms;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }

    fn load(&self) -> Result<ProxyConfig, config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::read_config(path)?,
            None => ProxyConfig::default(),
        };
        self.apply_overrides(&mut config);
        config::validate_config(&config).map_err(config::ConfigError::Validation)?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("caching-proxy: {}", e);
            std::process::exit(2);
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.listener.worker_threads())
        .thread_name("proxy-worker")
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init(&config.observability.log_level)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "caching-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_clients = config.listener.max_clients,
        workers = config.listener.worker_threads(),
        cache_capacity = config.cache.capacity,
        max_requests = config.rate_limit.max_tokens,
        window_ms = config.rate_limit.window_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let fetcher = Arc::new(HttpFetcher::new(&config.upstream)?);
    let server = ProxyServer::new(&config, fetcher)?;
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let cli = Cli::parse_from([
            "caching-proxy",
            "--port",
            "9000",
            "--max-clients",
            "4",
            "--cache-capacity",
            "50",
            "--max-requests",
            "2",
            "--window-ms",
            "1000",
        ]);
        let config = cli.load().unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.listener.max_clients, 4);
        assert_eq!(config.cache.capacity, 50);
        assert_eq!(config.rate_limit.max_tokens, 2);
        assert_eq!(config.rate_limit.window_ms, 1000);
    }

    #[test]
    fn overrides_are_validated() {
        let cli = Cli::parse_from(["caching-proxy", "--cache-capacity", "0"]);
        assert!(matches!(cli.load(), Err(config::ConfigError::Validation(_))));
    }
}
