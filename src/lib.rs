/**
 * MCP SSE Bridge Library
 *
 * Connects to a remote MCP server that speaks the HTTP/SSE transport and
 * exposes it as a stdio server:
 * 1. server events read from `{base_url}/sse` are written to stdout, one JSON-RPC message per line
 * 2. lines read from stdin are POSTed to the message endpoint announced by the server
 */
pub mod config;
pub mod downstream;
pub mod error;
pub mod handshake;
pub mod sse_client;
pub mod sse_parser;
pub mod traffic_log;
pub mod upstream;

// Export main functions
pub use self::config::{HeaderSet, SseClientConfig};
pub use self::error::{BridgeError, SubmitError};
pub use self::sse_client::{run_sse_client, run_sse_client_with_io, BridgeOutcome, Finish};
