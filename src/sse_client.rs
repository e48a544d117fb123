/**
 * Connect to a remote MCP server over SSE and expose it on stdin/stdout.
 */
use futures::TryStreamExt;
use reqwest::{header::ACCEPT, Client, Response};
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio_util::{io::StreamReader, sync::CancellationToken};
use tracing::{debug, error, info};

use crate::{
    config::SseClientConfig,
    downstream::{DownstreamForwarder, DownstreamStats},
    error::BridgeError,
    handshake::SessionHandshake,
    traffic_log::{Direction, TrafficLog},
    upstream::{UpstreamForwarder, UpstreamStats},
};

const EVENT_STREAM: &str = "text/event-stream";

/// Which side ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// Client input reached end of stream.
    ClientClosed,
    /// The server closed the event stream.
    ServerClosed,
    /// A shutdown signal arrived.
    Interrupted,
}

/// Summary of a finished bridge run. Stats are `None` for a loop that was
/// aborted or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeOutcome {
    pub finish: Finish,
    pub downstream: Option<DownstreamStats>,
    pub upstream: Option<UpstreamStats>,
}

/// Run the SSE client
///
/// Connects to `{base_url}/sse` and bridges it to this process's stdin and
/// stdout until either side closes or the process is interrupted.
pub async fn run_sse_client(config: SseClientConfig) -> Result<BridgeOutcome, BridgeError> {
    info!("Running SSE client with URL: {}", config.base_url);
    run_sse_client_with_io(
        config,
        tokio::io::stdin(),
        tokio::io::stdout(),
        shutdown_signal(),
    )
    .await
}

/// Same as [`run_sse_client`] with explicit client streams and shutdown
/// trigger.
pub async fn run_sse_client_with_io<I, O, S>(
    config: SseClientConfig,
    input: I,
    output: O,
    shutdown: S,
) -> Result<BridgeOutcome, BridgeError>
where
    I: AsyncRead + Unpin + Send + 'static,
    O: AsyncWrite + Unpin + Send + 'static,
    S: Future<Output = ()>,
{
    let log = match &config.traffic_log_dir {
        Some(dir) => TrafficLog::create(dir).await?,
        None => TrafficLog::disabled(),
    };
    match log.path() {
        Some(path) => info!("Traffic log: {}", path.display()),
        None => debug!("Traffic log disabled"),
    }

    let client = build_http_client(&config)?;
    let sse_url = config.sse_url();
    log.log(Direction::Connector, &format!("Connecting to: {}", sse_url))
        .await;

    let response = subscribe(&client, &sse_url).await?;
    info!("Subscribed to {}", sse_url);

    let body = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));

    let handshake = SessionHandshake::new();
    let cancel = CancellationToken::new();

    let downstream = DownstreamForwarder::new(
        config.base_url.clone(),
        handshake.clone(),
        log.clone(),
        cancel.clone(),
    );
    let upstream = UpstreamForwarder::new(client, handshake.clone(), log, cancel.clone());

    let mut downstream_task = tokio::spawn(downstream.run(BufReader::new(body), output));
    let mut upstream_task = tokio::spawn(upstream.run(BufReader::new(input)));

    let outcome = tokio::select! {
        result = &mut upstream_task => {
            let upstream = task_stats("client", result);
            cancel.cancel();
            // Let an event that is already being written reach the client.
            let downstream = task_stats("server", downstream_task.await);
            BridgeOutcome { finish: Finish::ClientClosed, downstream, upstream }
        }
        result = &mut downstream_task => {
            let downstream = task_stats("server", result);
            if cancel.is_cancelled() {
                // Client input ended first and the client task is finishing.
                let upstream = task_stats("client", upstream_task.await);
                BridgeOutcome { finish: Finish::ClientClosed, downstream, upstream }
            } else {
                if handshake.get().is_none() {
                    info!("Server closed the stream before announcing a message endpoint");
                }
                // Client input may never end; do not wait for it.
                cancel.cancel();
                upstream_task.abort();
                BridgeOutcome { finish: Finish::ServerClosed, downstream, upstream: None }
            }
        }
        _ = shutdown => {
            info!("Shutdown requested");
            cancel.cancel();
            upstream_task.abort();
            let downstream = task_stats("server", downstream_task.await);
            BridgeOutcome { finish: Finish::Interrupted, downstream, upstream: None }
        }
    };

    info!("Bridge finished: {:?}", outcome);
    Ok(outcome)
}

/// Build the shared HTTP client with the static headers as defaults.
///
/// No overall request timeout is set: the SSE response lasts for the whole
/// session.
pub fn build_http_client(config: &SseClientConfig) -> Result<Client, BridgeError> {
    if config.headers.is_empty() {
        debug!("Building HTTP client without static headers");
    } else {
        debug!(
            headers = ?config.headers.header_map().keys().collect::<Vec<_>>(),
            "Building HTTP client"
        );
    }

    let mut builder = Client::builder().default_headers(config.headers.header_map().clone());
    if let Some(timeout) = config.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    builder.build().map_err(BridgeError::Client)
}

/// Open the event stream. Any non-success status is an error.
pub async fn subscribe(client: &Client, sse_url: &str) -> Result<Response, BridgeError> {
    let response = client
        .get(sse_url)
        .header(ACCEPT, EVENT_STREAM)
        .send()
        .await
        .map_err(|source| BridgeError::Subscribe {
            url: sse_url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(BridgeError::SubscribeStatus {
            url: sse_url.to_string(),
            status,
        });
    }

    Ok(response)
}

fn task_stats<T>(
    side: &str,
    result: Result<Result<T, BridgeError>, tokio::task::JoinError>,
) -> Option<T> {
    match result {
        Ok(Ok(stats)) => Some(stats),
        Ok(Err(e)) => {
            error!("The {} side stopped with an error: {}", side, e);
            None
        }
        Err(e) => {
            error!("The {} side task failed: {}", side, e);
            None
        }
    }
}

/// Resolve on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let signal_name = {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = ctrl_c() => "SIGINT",
                        _ = term.recv() => "SIGTERM",
                    }
                }
                Err(e) => {
                    debug!("SIGTERM handler unavailable: {}", e);
                    ctrl_c().await;
                    "SIGINT"
                }
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c().await;
            "SIGINT"
        }
    };
    info!("Received {}", signal_name);
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler there is nothing to wait for.
        debug!("SIGINT handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}
