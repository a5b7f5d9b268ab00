mod client;
mod config;
mod error;
mod render;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use client::InspectorClient;
use config::Config;
use error::ClientError;

#[derive(Parser, Debug)]
#[command(name = "kilnctl")]
#[command(about = "Inspect a running Kiln server", long_about = None)]
struct Args {
    /// Inspector host (an embedded http:// or https:// prefix overrides --secure)
    #[arg(long)]
    host: Option<String>,

    /// Inspector port
    #[arg(long)]
    port: Option<u16>,

    /// Connect over TLS
    #[arg(long)]
    secure: bool,

    /// Emit the wire `result` payload verbatim and skip all rendering
    #[arg(long)]
    raw: bool,

    /// Render the status report as one flattened JSON line
    #[arg(long)]
    json: bool,

    /// Bearer token for the inspector endpoint
    #[arg(long, env = "KILNCTL_API_KEY")]
    api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Action to invoke on the server
    #[arg(default_value = "info")]
    action: String,

    /// Action arguments as key=value pairs (values parsed as JSON when possible)
    #[arg(value_name = "KEY=VALUE")]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout stays reserved for report output
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cfg = Config::load(&config::default_config_path())?;
    let host = args.host.or(cfg.host).unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.port.or(cfg.port).unwrap_or(6457);
    let secure = args.secure || cfg.secure.unwrap_or(false);
    let api_key = args.api_key.or(cfg.api_key);
    let kwargs = parse_kwargs(&args.args)?;

    debug!("Inspecting action={} at {}:{}", args.action, host, port);

    let client = InspectorClient::new(
        &host,
        port,
        secure,
        args.raw,
        api_key,
        Duration::from_secs(args.timeout),
    )
    .context("Failed to create inspector client")?;

    if let Err(err) = client.run(&args.action, args.json, kwargs).await {
        if let ClientError::Unreachable { url, source } = &err {
            eprintln!("Could not connect to inspector at: {url}");
            eprintln!(
                "Either the application is not running, or it did not start an inspector instance."
            );
            eprintln!("{source}");
            std::process::exit(1);
        }
        return Err(err.into());
    }
    Ok(())
}

/// Parse trailing `key=value` pairs into the action payload. Values that
/// parse as JSON keep their type; everything else is taken as a string.
fn parse_kwargs(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Invalid argument {pair:?}, expected key=value"))?;
        let value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}
