//! In-memory transport.
//!
//! Records every payload it is handed and can be scripted to fail, which
//! makes delivery behaviour observable without a collector.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use futures_util::future::BoxFuture;
use tokio::sync::Notify;

use crate::transport::{Transport, TransportError};

#[derive(Debug, Default)]
pub struct MemoryTransport {
    delivered: Mutex<Vec<serde_json::Value>>,
    attempts: AtomicUsize,
    failures_remaining: AtomicUsize,
    notify: Notify,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` sends with a 503.
    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<serde_json::Value>> {
        self.delivered.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Payloads accepted so far, in delivery order.
    pub fn delivered(&self) -> Vec<serde_json::Value> {
        self.lock().clone()
    }

    /// Sends attempted, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` sends have been attempted.
    pub async fn wait_for_attempts(&self, count: usize) {
        loop {
            let notified = self.notify.notified();
            if self.attempts() >= count {
                return;
            }
            notified.await;
        }
    }
}

impl Transport for MemoryTransport {
    fn send<'a>(&'a self, payload: &'a serde_json::Value) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            let failing = self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();

            let result = if failing {
                Err(TransportError::Status(503))
            } else {
                self.lock().push(payload.clone());
                Ok(())
            };

            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.notify.notify_waiters();
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_failures() {
        let transport = MemoryTransport::new();
        transport.fail_next(1);

        let payload = json!({"n": 1});
        assert_eq!(transport.send(&payload).await, Err(TransportError::Status(503)));
        assert!(transport.send(&payload).await.is_ok());

        assert_eq!(transport.attempts(), 2);
        assert_eq!(transport.delivered(), vec![payload]);
    }

    #[tokio::test]
    async fn test_wait_for_attempts() {
        let transport = std::sync::Arc::new(MemoryTransport::new());
        let sender = transport.clone();
        tokio::spawn(async move {
            let _ = sender.send(&json!({})).await;
        });
        transport.wait_for_attempts(1).await;
        assert_eq!(transport.attempts(), 1);
    }
}
