//! Line-oriented parser for the SSE subscription body.
//!
//! The parser is fed one line at a time (without the line terminator) and
//! reports either the session endpoint announced by the server or the data
//! payload of a completed event.

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";

/// Name of the event that announces the message submission path.
pub const ENDPOINT_EVENT: &str = "endpoint";

/// Result of feeding a line that completed something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseOutcome {
    /// An `endpoint` event was seen. `url` is the base URL joined with `path`.
    Endpoint { path: String, url: String },
    /// A completed event with a non-empty payload.
    Payload(String),
    /// A blank line closed an event that carried no data.
    Blank,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    #[default]
    Idle,
    /// After `event: endpoint`, looking for its `data:` line.
    AwaitingEndpointData,
    /// Collecting `data:` lines of an ordinary event.
    Accumulating,
}

#[derive(Debug)]
pub struct SseParser {
    base_url: String,
    state: State,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: State::Idle,
            data_lines: Vec::new(),
        }
    }

    pub fn feed(&mut self, line: &str) -> Option<SseOutcome> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if self.state == State::AwaitingEndpointData {
            return self.feed_endpoint_lookahead(line);
        }

        if let Some(name) = line.strip_prefix(EVENT_PREFIX) {
            // Other event names only consume the `event:` line itself; their
            // data lines are collected like untagged data.
            if name.trim() == ENDPOINT_EVENT {
                self.state = State::AwaitingEndpointData;
            }
            return None;
        }

        if let Some(data) = line.strip_prefix(DATA_PREFIX) {
            self.data_lines.push(data.trim().to_string());
            self.state = State::Accumulating;
            return None;
        }

        if line.trim().is_empty() {
            return Some(self.take_payload());
        }

        None
    }

    /// True while data lines have been collected but not yet terminated.
    pub fn has_pending_data(&self) -> bool {
        !self.data_lines.is_empty()
    }

    fn feed_endpoint_lookahead(&mut self, line: &str) -> Option<SseOutcome> {
        if let Some(path) = line.strip_prefix(DATA_PREFIX) {
            self.state = self.resume_state();
            let path = path.trim().to_string();
            let url = format!("{}{}", self.base_url, path);
            return Some(SseOutcome::Endpoint { path, url });
        }

        // A blank line before the data line abandons this endpoint event.
        if line.trim().is_empty() {
            self.state = self.resume_state();
        }
        None
    }

    fn resume_state(&self) -> State {
        if self.data_lines.is_empty() {
            State::Idle
        } else {
            State::Accumulating
        }
    }

    fn take_payload(&mut self) -> SseOutcome {
        let joined = self.data_lines.join("\n");
        self.data_lines.clear();
        self.state = State::Idle;

        let payload = joined.trim_end();
        if payload.is_empty() {
            SseOutcome::Blank
        } else {
            SseOutcome::Payload(payload.to_string())
        }
    }
}
