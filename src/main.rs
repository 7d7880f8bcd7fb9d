use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use twinproxy::proxy::cache::ResponseCache;
use twinproxy::proxy::sigv4::AwsCredentials;
use twinproxy::proxy::{ForwardingProxy, SignedHttpClient};
use twinproxy::server::config::ProxyConfig;
use twinproxy::telemetry::PicoGwReader;
use twinproxy::version::VERSION;
use twinproxy::web;

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging() {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily("logs", "twinproxy.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    init_logging();
    info!("Starting twinproxy, version: {}", VERSION);
    dotenv().ok();

    let config = match ProxyConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load proxy configuration: {}", e);
            return Err(e.into());
        }
    };

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .map_err(|e| format!("Invalid listen address {:?}: {e}", config.listen_addr))?;

    // One client for both outbound legs; the original had no timeout at all,
    // which left a request hanging forever on a dead upstream.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream_timeout_secs))
        .build()?;

    let credentials = AwsCredentials {
        region: config.aws_region.clone(),
        access_key_id: config.aws_access_key_id.clone(),
        secret_access_key: config.aws_secret_access_key.clone(),
    };
    let cache = ResponseCache::new(
        Duration::from_secs(config.cache_ttl_secs),
        config.cache_capacity,
    );
    let upstream = Arc::new(SignedHttpClient::new(client.clone(), credentials));
    let proxy = Arc::new(ForwardingProxy::new(
        upstream,
        cache,
        config.aws_region.clone(),
        addr.port(),
    ));
    let telemetry = Arc::new(PicoGwReader::new(client, config.picogw_domain.clone()));

    let app = web::create_axum_router(proxy, telemetry, config.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, region = %config.aws_region, "twinproxy listening");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
