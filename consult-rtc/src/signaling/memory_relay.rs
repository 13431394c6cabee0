use crate::signaling::{Relay, RelayChannel, RelayError};
use async_trait::async_trait;
use consult_core::ParticipantId;
use consult_core::relay::{RelayEvent, RelayHub};
use tokio::sync::mpsc;

/// In-process relay backed by a [`RelayHub`].
///
/// Every clone shares the same hub, so controllers created from clones of
/// one `MemoryRelay` can reach each other.
#[derive(Clone, Default)]
pub struct MemoryRelay {
    hub: RelayHub,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hub(hub: RelayHub) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &RelayHub {
        &self.hub
    }
}

#[async_trait]
impl Relay for MemoryRelay {
    async fn subscribe(
        &self,
        channel: &str,
        key: &ParticipantId,
        events: mpsc::UnboundedSender<RelayEvent>,
    ) -> Result<Box<dyn RelayChannel>, RelayError> {
        self.hub
            .subscribe(channel, key.clone(), events)
            .map_err(|e| RelayError::Rejected(e.to_string()))?;

        Ok(Box::new(MemoryChannel {
            hub: self.hub.clone(),
            channel: channel.to_owned(),
            key: key.clone(),
        }))
    }
}

struct MemoryChannel {
    hub: RelayHub,
    channel: String,
    key: ParticipantId,
}

#[async_trait]
impl RelayChannel for MemoryChannel {
    async fn track(&self) -> Result<(), RelayError> {
        self.hub
            .track(&self.channel, &self.key)
            .map_err(|_| RelayError::Closed)
    }

    async fn untrack(&self) {
        self.hub.untrack(&self.channel, &self.key);
    }

    async fn broadcast(&self, payload: String) -> Result<(), RelayError> {
        self.hub
            .broadcast(&self.channel, &self.key, payload)
            .map(|_| ())
            .map_err(|_| RelayError::Closed)
    }

    async fn close(&self) {
        self.hub.unsubscribe(&self.channel, &self.key);
    }
}
