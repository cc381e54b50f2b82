//! Transport and protocol error types.

use sim_component::Entity;

/// Errors raised by the command queues, the codec, and the NATS bridge.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// The message kind is not one the kernel understands.
    #[error("unrecognized message type: '{0}'")]
    UnrecognizedMessageType(String),

    /// No queue is registered for this faction.
    #[error("unknown faction: {0}")]
    UnknownFaction(Entity),

    /// The subject does not name a faction queue.
    #[error("malformed faction subject: '{0}'")]
    MalformedSubject(String),

    #[error("NATS subscribe error: {0}")]
    Subscribe(#[from] async_nats::SubscribeError),

    #[error("NATS publish error: {0}")]
    Publish(#[from] async_nats::PublishError),

    #[error("NATS flush error: {0}")]
    Flush(String),

    #[error("NATS connection error: {0}")]
    Connect(#[from] async_nats::ConnectError),
}
