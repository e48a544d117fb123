//! Server to client direction: SSE body lines in, JSON-RPC lines out.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::{
    error::BridgeError,
    handshake::SessionHandshake,
    sse_parser::{SseOutcome, SseParser},
    traffic_log::{Direction, TrafficLog},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownstreamStats {
    pub forwarded: u64,
    pub dropped: u64,
}

/// Drives the SSE parser over the subscription body and writes every event
/// payload to the client, one line each.
pub struct DownstreamForwarder {
    parser: SseParser,
    handshake: SessionHandshake,
    log: TrafficLog,
    cancel: CancellationToken,
}

impl DownstreamForwarder {
    pub fn new(
        base_url: impl Into<String>,
        handshake: SessionHandshake,
        log: TrafficLog,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            parser: SseParser::new(base_url),
            handshake,
            log,
            cancel,
        }
    }

    /// Run until the stream ends or the token is cancelled.
    ///
    /// Bytes that are not valid UTF-8 are replaced and the event is still
    /// forwarded. A read error on the stream ends the loop like end of stream
    /// does. A write error on `out` means the client is gone and is returned.
    pub async fn run<R, W>(mut self, mut reader: R, mut out: W) -> Result<DownstreamStats, BridgeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        let mut stats = DownstreamStats::default();

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                read = reader.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => {
                    info!("SSE stream closed by server");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Error reading SSE stream: {}", e);
                    break;
                }
            }

            let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
            let line = String::from_utf8_lossy(raw).into_owned();
            buf.clear();
            trace!(line = %line, "SSE line");

            match self.parser.feed(&line) {
                Some(SseOutcome::Endpoint { path, url }) => {
                    self.log
                        .log(Direction::ServerToClient, &format!("[event: endpoint] {}", path))
                        .await;
                    if self.handshake.resolve(url.clone()) {
                        info!("Session message endpoint: {}", url);
                    } else {
                        debug!("Ignoring repeated endpoint event: {}", url);
                    }
                }
                Some(SseOutcome::Payload(payload)) => {
                    out.write_all(payload.as_bytes()).await?;
                    out.write_all(b"\n").await?;
                    out.flush().await?;
                    self.log.log(Direction::ServerToClient, &payload).await;
                    stats.forwarded += 1;
                }
                Some(SseOutcome::Blank) => {
                    self.log.log(Direction::ServerDropped, "[Data is blank]").await;
                    stats.dropped += 1;
                }
                None => {}
            }
        }

        if self.parser.has_pending_data() {
            debug!("Discarding unterminated SSE event");
        }
        Ok(stats)
    }
}
