use std::sync::Arc;

use tokio::sync::watch;

use crate::error::BridgeError;

/// One-shot cell holding the message submission URL of the session.
///
/// The first `resolve` wins; later calls leave the published URL untouched.
/// Any number of tasks may `wait` for it, before or after it is resolved.
#[derive(Debug, Clone)]
pub struct SessionHandshake {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl Default for SessionHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandshake {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Publish `url`. Returns `false` when a URL was already published.
    pub fn resolve(&self, url: impl Into<String>) -> bool {
        let url = url.into();
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(url);
            true
        })
    }

    pub fn get(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Wait until a URL is published. There is no timeout.
    pub async fn wait(&self) -> Result<String, BridgeError> {
        let mut rx = self.tx.subscribe();
        let url = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| BridgeError::HandshakeClosed)?;
        (*url).clone().ok_or(BridgeError::HandshakeClosed)
    }
}
