use async_trait::async_trait;
use consult_core::ParticipantId;
use consult_core::relay::RelayEvent;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay rejected the subscription: {0}")]
    Rejected(String),

    #[error("relay unreachable: {0}")]
    Unreachable(String),

    #[error("relay channel closed")]
    Closed,
}

/// A best-effort pub/sub service with presence, scoped by channel name.
///
/// The signaling transport is written against this trait so it does not
/// care whether the relay lives in-process or across the network.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Joins `channel` under the presence key `key`. Resolves once the relay
    /// reports the subscription as ready; inbound traffic is pushed into
    /// `events` from then on.
    async fn subscribe(
        &self,
        channel: &str,
        key: &ParticipantId,
        events: mpsc::UnboundedSender<RelayEvent>,
    ) -> Result<Box<dyn RelayChannel>, RelayError>;
}

/// A live subscription returned by [`Relay::subscribe`].
#[async_trait]
pub trait RelayChannel: Send + Sync {
    /// Starts announcing this subscriber's presence.
    async fn track(&self) -> Result<(), RelayError>;

    async fn untrack(&self);

    async fn broadcast(&self, payload: String) -> Result<(), RelayError>;

    /// Leaves the channel. Safe to call more than once.
    async fn close(&self);
}
