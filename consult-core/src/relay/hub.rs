use crate::model::ParticipantId;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Traffic delivered to one subscriber of a relay channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Broadcast(String),
    PresenceJoin(ParticipantId),
    PresenceLeave(ParticipantId),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HubError {
    #[error("participant {0} is already subscribed to this channel")]
    DuplicateKey(ParticipantId),

    #[error("participant {0} is not subscribed to this channel")]
    NotSubscribed(ParticipantId),
}

struct Member {
    events: mpsc::UnboundedSender<RelayEvent>,
    present: bool,
}

#[derive(Default)]
struct Channel {
    members: HashMap<ParticipantId, Member>,
}

impl Channel {
    fn notify_others(&self, key: &ParticipantId, event: RelayEvent) {
        for (other_key, other) in self.members.iter().filter(|(k, _)| *k != key) {
            if other.events.send(event.clone()).is_err() {
                trace!("Subscriber {} is gone, dropping relay event", other_key);
            }
        }
    }
}

/// Room-scoped broadcast with presence, kept entirely in memory.
///
/// Broadcasts never echo back to their sender. Tracking presence announces
/// the key to every other subscriber and replays the keys that were already
/// present to the newcomer, so both sides of a room learn about each other
/// no matter who arrived first.
#[derive(Clone, Default)]
pub struct RelayHub {
    channels: Arc<DashMap<String, Channel>>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        channel: &str,
        key: ParticipantId,
        events: mpsc::UnboundedSender<RelayEvent>,
    ) -> Result<(), HubError> {
        let mut entry = self.channels.entry(channel.to_owned()).or_default();

        if entry.members.contains_key(&key) {
            return Err(HubError::DuplicateKey(key));
        }

        debug!("{} subscribed to {}", key, channel);
        entry.members.insert(
            key,
            Member {
                events,
                present: false,
            },
        );
        Ok(())
    }

    pub fn track(&self, channel: &str, key: &ParticipantId) -> Result<(), HubError> {
        let mut entry = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| HubError::NotSubscribed(key.clone()))?;
        let ch = entry.value_mut();

        let Some(member) = ch.members.get_mut(key) else {
            return Err(HubError::NotSubscribed(key.clone()));
        };
        if member.present {
            return Ok(());
        }
        member.present = true;
        let own_events = member.events.clone();

        for (other_key, other) in ch.members.iter().filter(|(k, _)| *k != key) {
            if other.present {
                let _ = own_events.send(RelayEvent::PresenceJoin(other_key.clone()));
            }
        }
        ch.notify_others(key, RelayEvent::PresenceJoin(key.clone()));

        debug!("{} is now present in {}", key, channel);
        Ok(())
    }

    pub fn untrack(&self, channel: &str, key: &ParticipantId) {
        let Some(mut entry) = self.channels.get_mut(channel) else {
            return;
        };
        let ch = entry.value_mut();

        let Some(member) = ch.members.get_mut(key) else {
            return;
        };
        if !member.present {
            return;
        }
        member.present = false;

        ch.notify_others(key, RelayEvent::PresenceLeave(key.clone()));
        debug!("{} left presence of {}", key, channel);
    }

    /// Delivers `payload` to every other subscriber and returns how many
    /// subscribers it was handed to.
    pub fn broadcast(
        &self,
        channel: &str,
        from: &ParticipantId,
        payload: String,
    ) -> Result<usize, HubError> {
        let entry = self
            .channels
            .get(channel)
            .ok_or_else(|| HubError::NotSubscribed(from.clone()))?;

        if !entry.members.contains_key(from) {
            return Err(HubError::NotSubscribed(from.clone()));
        }

        entry.notify_others(from, RelayEvent::Broadcast(payload));
        Ok(entry.members.len() - 1)
    }

    pub fn unsubscribe(&self, channel: &str, key: &ParticipantId) {
        self.untrack(channel, key);

        let now_empty = match self.channels.get_mut(channel) {
            Some(mut entry) => {
                entry.members.remove(key);
                entry.members.is_empty()
            }
            None => return,
        };

        if now_empty {
            self.channels
                .remove_if(channel, |_, ch| ch.members.is_empty());
        }
        debug!("{} unsubscribed from {}", key, channel);
    }

    /// Keys currently tracking presence in `channel`, sorted.
    pub fn present(&self, channel: &str) -> Vec<ParticipantId> {
        let Some(entry) = self.channels.get(channel) else {
            return Vec::new();
        };
        let mut keys: Vec<ParticipantId> = entry
            .members
            .iter()
            .filter(|(_, m)| m.present)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|entry| entry.members.len())
            .unwrap_or(0)
    }
}
