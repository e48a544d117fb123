/**
 * The entry point for the mcp-sse-bridge application.
 * It sets up logging, reads the command line and runs the bridge.
 */
use clap::Parser;
use mcp_sse_bridge::{
    config::{default_log_dir, DEV_BASE_URL},
    run_sse_client, BridgeError, HeaderSet, SseClientConfig,
};
use std::{path::PathBuf, process, time::Duration};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// MCP SSE bridge CLI arguments
#[derive(Parser, Debug)]
#[command(
    name = "mcp-sse-bridge",
    version = env!("CARGO_PKG_VERSION"),
    about = concat!("MCP SSE Bridge v", env!("CARGO_PKG_VERSION"), ". Expose a remote MCP server's HTTP/SSE transport as a stdio server."),
    long_about = None,
    after_help = "Examples:\n  \
        mcp-sse-bridge https://example.com/mcp\n  \
        mcp-sse-bridge https://example.com/mcp Authorization \"Bearer TOKEN\" X-Tenant acme\n  \
        mcp-sse-bridge https://example.com/mcp -H x-api-key SECRET --log-dir ./logs
",
)]
struct Cli {
    /// Base URL of the remote server. The event stream is read from {URL}/sse.
    #[arg(env = "SSE_URL")]
    url: Option<String>,

    /// Extra headers as alternating NAME VALUE pairs following the URL.
    #[arg(value_name = "NAME VALUE")]
    header_pairs: Vec<String>,

    /// Headers to pass to the SSE server. Can be used multiple times.
    #[arg(short = 'H', long = "headers", value_names = ["KEY", "VALUE"], number_of_values = 2)]
    headers: Vec<String>,

    /// Use the local development server when no URL is given.
    #[arg(long = "dev")]
    dev: bool,

    /// Directory for the traffic log. Defaults to the system temp directory.
    #[arg(long = "log-dir", env = "MCP_BRIDGE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Do not write a traffic log file.
    #[arg(long = "no-traffic-log")]
    no_traffic_log: bool,

    /// TCP connect timeout in seconds for requests to the server.
    #[arg(long = "connect-timeout", value_name = "SECS")]
    connect_timeout: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Result<SseClientConfig, BridgeError> {
        let url = match (self.url, self.dev) {
            (Some(url), _) => url,
            (None, true) => DEV_BASE_URL.to_string(),
            (None, false) => {
                eprintln!("Error: base URL is required");
                eprintln!("Usage: mcp-sse-bridge <BASE_URL> [NAME VALUE ...]");
                process::exit(1);
            }
        };

        // Positional pairs first, -H flags override them
        let mut headers = HeaderSet::from_flat(&self.header_pairs)?;
        headers.extend(HeaderSet::from_flat(&self.headers)?);

        let mut config = SseClientConfig::new(url).with_headers(headers);
        if !self.no_traffic_log {
            config = config.with_traffic_log_dir(self.log_dir.unwrap_or_else(default_log_dir));
        }
        if let Some(secs) = self.connect_timeout {
            config = config.with_connect_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // stdout carries protocol messages, so diagnostics go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    debug!("Starting SSE client and stdio server");

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match run_sse_client(config).await {
        Ok(outcome) => {
            debug!("Exiting after {:?}", outcome.finish);
            // A stdin read may still be parked on a blocking thread, which
            // would keep the runtime from shutting down.
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mcp-sse-bridge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_positional_header_pairs() {
        let cli = parse(&[
            "http://host/mcp/",
            "--no-traffic-log",
            "Authorization",
            "Bearer t",
            "X-Tenant",
            "acme",
        ]);
        let config = cli.into_config().unwrap();

        assert_eq!(config.base_url, "http://host/mcp");
        assert_eq!(config.headers.get("authorization"), Some("Bearer t"));
        assert_eq!(config.headers.get("x-tenant"), Some("acme"));
        assert!(config.traffic_log_dir.is_none());
    }

    #[test]
    fn test_header_flags_override_positional_pairs() {
        let cli = parse(&["http://host", "X-Key", "a", "-H", "x-key", "b"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.headers.get("X-Key"), Some("b"));
    }

    #[test]
    fn test_dev_fallback_and_options() {
        let cli = parse(&["--dev", "--log-dir", "/tmp/bridge", "--connect-timeout", "5"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.base_url, DEV_BASE_URL);
        assert_eq!(config.traffic_log_dir, Some(PathBuf::from("/tmp/bridge")));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_invalid_header_is_a_config_error() {
        let cli = parse(&["http://host", "bad header", "v"]);
        assert!(matches!(
            cli.into_config(),
            Err(BridgeError::InvalidHeader { .. })
        ));
    }
}
