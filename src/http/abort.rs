//! Client-disconnect detection.
//!
//! axum drops the request future when the connection closes. [`InFlight`]
//! lives inside that future: if it is dropped before a response was
//! produced it trips the [`AbortSignal`] and records the request's single
//! terminal classification (499).

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::error::CLIENT_CLOSED_REQUEST;
use crate::observability::metrics;

/// Cancellation signal handed to handlers.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the caller has gone away. Pends forever if the request
    /// completes normally.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone: a final `true` was already observed above if sent.
                if *rx.borrow() {
                    return;
                }
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Drop guard for one request in flight.
#[derive(Debug)]
pub struct InFlight {
    tx: watch::Sender<bool>,
    endpoint: Arc<str>,
    request_id: Arc<str>,
    started: Instant,
    responded: bool,
}

impl InFlight {
    pub fn new(endpoint: Arc<str>, request_id: Arc<str>) -> (Self, AbortSignal) {
        let (tx, rx) = watch::channel(false);
        let guard = Self {
            tx,
            endpoint,
            request_id,
            started: Instant::now(),
            responded: false,
        };
        (guard, AbortSignal { rx })
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Mark the request as answered; dropping afterwards is a no-op.
    pub fn responded(&mut self) {
        self.responded = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.responded {
            return;
        }
        self.tx.send_replace(true);
        tracing::debug!(
            endpoint = %self.endpoint,
            request_id = %self.request_id,
            status = CLIENT_CLOSED_REQUEST,
            "Client closed request"
        );
        metrics::record_request(&self.endpoint, CLIENT_CLOSED_REQUEST, self.started);
    }
}
