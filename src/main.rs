//! Command-line probe for the resilient client.
//!
//! Issues repeated calls to one registered service and prints the outcome
//! of each, so breaker and retry behavior can be watched against a live
//! (or deliberately broken) deployment.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use resilient_client::config::{load_config, ResilienceConfig};
use resilient_client::observability::{logging, metrics};
use resilient_client::{RequestBody, RequestOptions, ServiceRegistry};

#[derive(Parser)]
#[command(name = "resilient-client")]
#[command(
    about = "Call a named service through a circuit breaker with jittered retries",
    long_about = None
)]
struct Cli {
    /// TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Registered service name
    #[arg(short, long)]
    service: String,

    #[arg(short, long, value_enum, default_value_t = Verb::Get)]
    method: Verb,

    /// Number of calls to make
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u32,

    /// Pause between calls in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Override the per-attempt timeout
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Override the retry budget
    #[arg(long)]
    max_retries: Option<u32>,

    /// JSON body for POST
    #[arg(long)]
    body: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Verb {
    Get,
    Post,
    Delete,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ResilienceConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("resilient-client v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    ServiceRegistry::from_config(&config)?.install()?;

    let mut client = ServiceRegistry::global_client(&cli.service)?;
    if let Some(timeout_ms) = cli.timeout_ms {
        client = client.with_timeout(Duration::from_millis(timeout_ms));
    }
    if let Some(max_retries) = cli.max_retries {
        client = client.with_max_retries(max_retries);
    }

    let body = cli
        .body
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()?
        .map(RequestBody::Json);

    tracing::info!(
        service = %client.service(),
        url = %client.url(),
        timeout = ?client.timeout(),
        retry = ?client.retry_policy(),
        "Probing service"
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(cli.interval_ms.max(1)));
    for call in 1..=cli.count {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping probe");
                break;
            }
        }

        let response = match cli.method {
            Verb::Get => client.get(RequestOptions::new()).await,
            Verb::Post => client.post(body.clone(), RequestOptions::new()).await,
            Verb::Delete => client.delete(RequestOptions::new()).await,
        };

        match response {
            Some(response) => println!("{call}: {}", response.status()),
            None => println!("{call}: unavailable"),
        }
    }

    if let Some(breaker) = client.breaker() {
        let snapshot = breaker.snapshot();
        println!(
            "breaker {}: state={} failures={} retry_after={:?}",
            client.service(),
            snapshot.state,
            snapshot.failure_count,
            snapshot.retry_after
        );
    }

    Ok(())
}
