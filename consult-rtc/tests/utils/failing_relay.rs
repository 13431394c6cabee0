use async_trait::async_trait;
use consult_core::ParticipantId;
use consult_core::relay::RelayEvent;
use consult_rtc::{MemoryRelay, Relay, RelayChannel, RelayError};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// A relay that refuses every subscription.
pub struct FailingRelay;

#[async_trait]
impl Relay for FailingRelay {
    async fn subscribe(
        &self,
        _channel: &str,
        _key: &ParticipantId,
        _events: mpsc::UnboundedSender<RelayEvent>,
    ) -> Result<Box<dyn RelayChannel>, RelayError> {
        Err(RelayError::Rejected("relay is down".to_owned()))
    }
}

/// A relay that never answers the subscription.
pub struct SilentRelay;

#[async_trait]
impl Relay for SilentRelay {
    async fn subscribe(
        &self,
        _channel: &str,
        _key: &ParticipantId,
        _events: mpsc::UnboundedSender<RelayEvent>,
    ) -> Result<Box<dyn RelayChannel>, RelayError> {
        std::future::pending().await
    }
}

/// Never answers the first subscription; later ones go to `inner`.
pub struct StallFirstRelay {
    inner: MemoryRelay,
    stalled: AtomicBool,
}

impl StallFirstRelay {
    pub fn new(inner: MemoryRelay) -> Self {
        Self {
            inner,
            stalled: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Relay for StallFirstRelay {
    async fn subscribe(
        &self,
        channel: &str,
        key: &ParticipantId,
        events: mpsc::UnboundedSender<RelayEvent>,
    ) -> Result<Box<dyn RelayChannel>, RelayError> {
        if !self.stalled.swap(true, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.inner.subscribe(channel, key, events).await
    }
}
