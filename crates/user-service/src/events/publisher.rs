//! # User Event Publishers
//!
//! Registration hands events to a [`UserEventPublisher`] chosen once at
//! startup: a no-op when events are disabled, otherwise a bounded channel
//! whose receiver forwards envelopes to the transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::EventsConfig;
use crate::events::UserRegisteredEvent;

/// Why an event was not handed over
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Invalid event for user {user_id}")]
    InvalidEvent { user_id: u64 },

    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Event channel is full")]
    ChannelFull,

    #[error("Event channel is closed")]
    ChannelClosed,
}

/// Keyed message as handed to the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub topic: String,
    pub key: String,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait UserEventPublisher: Send + Sync {
    async fn publish_user_registered(&self, event: &UserRegisteredEvent)
        -> Result<(), PublishError>;
}

/// Publisher used when events are disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventPublisher;

#[async_trait]
impl UserEventPublisher for NoopEventPublisher {
    async fn publish_user_registered(
        &self,
        event: &UserRegisteredEvent,
    ) -> Result<(), PublishError> {
        debug!(
            "Event publishing is disabled, skipping {} for user {}",
            event.event_type, event.user_id
        );
        Ok(())
    }
}

/// Publisher that queues envelopes on a bounded in-process channel
///
/// Never waits for capacity: a full channel fails the publish instead of
/// stalling registration.
#[derive(Debug, Clone)]
pub struct ChannelEventPublisher {
    topic: String,
    sender: mpsc::Sender<EventEnvelope>,
}

impl ChannelEventPublisher {
    pub fn new(topic: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<EventEnvelope>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            Self {
                topic: topic.into(),
                sender,
            },
            receiver,
        )
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl UserEventPublisher for ChannelEventPublisher {
    async fn publish_user_registered(
        &self,
        event: &UserRegisteredEvent,
    ) -> Result<(), PublishError> {
        if !event.is_valid() {
            return Err(PublishError::InvalidEvent {
                user_id: event.user_id,
            });
        }

        let envelope = EventEnvelope {
            topic: self.topic.clone(),
            key: event.key(),
            payload: serde_json::to_value(event)?,
        };

        self.sender.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PublishError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => PublishError::ChannelClosed,
        })?;

        debug!(
            "Queued {} for user {} on topic {}",
            event.event_type, event.user_id, self.topic
        );
        Ok(())
    }
}

/// Build the publisher selected by configuration
///
/// The receiver is `Some` only for the channel publisher.
pub fn publisher_from_config(
    config: &EventsConfig,
) -> (
    Arc<dyn UserEventPublisher>,
    Option<mpsc::Receiver<EventEnvelope>>,
) {
    if !config.enabled {
        info!("User event publishing disabled");
        return (Arc::new(NoopEventPublisher), None);
    }

    info!(
        "User event publishing enabled on topic {} (capacity {})",
        config.topic, config.channel_capacity
    );
    let (publisher, receiver) = ChannelEventPublisher::new(&config.topic, config.channel_capacity);
    (Arc::new(publisher), Some(receiver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(user_id: u64) -> UserRegisteredEvent {
        let now = Utc::now();
        UserRegisteredEvent {
            user_id,
            username: "lifter".to_string(),
            email: "lifter@example.com".to_string(),
            registration_date: now,
            goal_type: None,
            initial_avatar_type: None,
            event_type: crate::events::USER_REGISTERED.to_string(),
            timestamp: now,
        }
    }

    #[tokio::test]
    async fn test_channel_publisher_emits_keyed_envelope() {
        let (publisher, mut receiver) = ChannelEventPublisher::new("user-events", 4);
        publisher.publish_user_registered(&event(123456)).await.unwrap();

        let envelope = receiver.recv().await.unwrap();
        assert_eq!(envelope.topic, "user-events");
        assert_eq!(envelope.key, "user-123456");
        assert_eq!(envelope.payload["userId"], 123456);
    }

    #[tokio::test]
    async fn test_invalid_event_is_not_sent() {
        let (publisher, mut receiver) = ChannelEventPublisher::new("user-events", 4);
        let mut invalid = event(123456);
        invalid.email = String::new();

        let err = publisher.publish_user_registered(&invalid).await.unwrap_err();
        assert!(matches!(err, PublishError::InvalidEvent { user_id: 123456 }));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_and_closed_channels() {
        let (publisher, receiver) = ChannelEventPublisher::new("user-events", 1);
        publisher.publish_user_registered(&event(1)).await.unwrap();
        assert!(matches!(
            publisher.publish_user_registered(&event(2)).await,
            Err(PublishError::ChannelFull)
        ));

        drop(receiver);
        assert!(matches!(
            publisher.publish_user_registered(&event(3)).await,
            Err(PublishError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_publisher_selection() {
        let (noop, receiver) = publisher_from_config(&EventsConfig::default());
        assert!(receiver.is_none());
        noop.publish_user_registered(&event(1)).await.unwrap();

        let enabled = EventsConfig {
            enabled: true,
            ..Default::default()
        };
        let (publisher, receiver) = publisher_from_config(&enabled);
        let mut receiver = receiver.expect("Channel publisher returns a receiver");
        publisher.publish_user_registered(&event(7)).await.unwrap();
        assert_eq!(receiver.recv().await.unwrap().key, "user-7");
    }
}
