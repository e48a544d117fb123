//! Client to server direction: stdin lines in, one HTTP POST per line out.

use reqwest::{header::CONTENT_TYPE, Client};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    error::{BridgeError, SubmitError},
    handshake::SessionHandshake,
    traffic_log::{Direction, TrafficLog},
};

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamStats {
    pub posted: u64,
    pub failed: u64,
}

pub struct UpstreamForwarder {
    client: Client,
    handshake: SessionHandshake,
    log: TrafficLog,
    cancel: CancellationToken,
}

impl UpstreamForwarder {
    /// `client` is expected to carry the static headers as defaults.
    pub fn new(
        client: Client,
        handshake: SessionHandshake,
        log: TrafficLog,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            handshake,
            log,
            cancel,
        }
    }

    /// Wait for the session endpoint, then POST every line of `reader` to it.
    ///
    /// Lines are sent one at a time in input order, byte for byte without
    /// the line ending. Empty lines are skipped. A failed POST is reported
    /// and skipped. When `reader` is exhausted the cancellation token fires so
    /// the server side stops too.
    pub async fn run<R>(self, reader: R) -> Result<UpstreamStats, BridgeError>
    where
        R: AsyncBufRead + Unpin,
    {
        let message_url = self.handshake.wait().await?;
        info!("Posting client messages to {}", message_url);
        self.log
            .log(Direction::Connector, &format!("Connecting to: {}", message_url))
            .await;

        let result = self.forward_lines(reader, &message_url).await;

        debug!("Client input closed, cancelling SSE reader");
        self.cancel.cancel();
        result
    }

    async fn forward_lines<R>(&self, mut reader: R, message_url: &str) -> Result<UpstreamStats, BridgeError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stats = UpstreamStats::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = strip_line_ending(&buf);
            if line.is_empty() {
                continue;
            }

            self.log
                .log(Direction::ClientToServer, &String::from_utf8_lossy(line))
                .await;
            match submit(&self.client, message_url, line.to_vec()).await {
                Ok(()) => stats.posted += 1,
                Err(e) => {
                    eprintln!("{}", e);
                    self.log
                        .log(Direction::Connector, &format!("[error] {}", e))
                        .await;
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}

/// Drop a trailing `\n` or `\r\n`. The rest of the line is left untouched.
fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// POST one raw JSON-RPC line to the message endpoint. The body is sent as
/// is, without decoding.
pub async fn submit(client: &Client, url: &str, body: Vec<u8>) -> Result<(), SubmitError> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(body)
        .send()
        .await
        .map_err(|source| SubmitError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SubmitError::Status {
            url: url.to_string(),
            status,
        });
    }

    Ok(())
}
