//! User lifecycle events

pub mod publisher;
pub mod user_registered;

pub use publisher::{
    publisher_from_config, ChannelEventPublisher, EventEnvelope, NoopEventPublisher, PublishError,
    UserEventPublisher,
};
pub use user_registered::{UserRegisteredEvent, USER_REGISTERED};
