use clap::{Parser, Subcommand};
use std::time::Duration;

use caching_proxy::CacheStats;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management CLI for the caching proxy", long_about = None)]
struct Cli {
    /// Base URL of the running proxy
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Request target that returns cache counters
    #[arg(long, default_value = "/stats")]
    stats_path: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value_t = 15)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show cache hit, miss and eviction counters
    Stats,
    /// Fetch a URL through the proxy
    Get {
        /// Absolute URL to request
        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout);

    match cli.command {
        Commands::Stats => {
            let client = reqwest::Client::builder()
                .no_proxy()
                .timeout(timeout)
                .build()?;
            let res = client
                .get(format!("{}{}", cli.url.trim_end_matches('/'), cli.stats_path))
                .send()
                .await?;
            if !check_status(&res) {
                return Ok(());
            }

            let stats: CacheStats = res.json().await?;
            println!("Cache hits:      {}", stats.hits);
            println!("Cache misses:    {}", stats.misses);
            println!("Cache evictions: {}", stats.evictions);
        }
        Commands::Get { target } => {
            let client = reqwest::Client::builder()
                .proxy(reqwest::Proxy::http(&cli.url)?)
                .timeout(timeout)
                .build()?;
            let res = client.get(&target).send().await?;
            let status = res.status();
            let body = res.bytes().await?;
            println!("{} ({} bytes)", status, body.len());
        }
    }

    Ok(())
}

fn check_status(res: &reqwest::Response) -> bool {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        return false;
    }
    true
}
