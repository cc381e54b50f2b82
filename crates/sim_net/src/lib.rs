//! # sim_net
//!
//! Command transport for the simulation kernel.
//!
//! - [`messages`]: the wire envelope and the commands it carries.
//! - [`queue`]: per-faction inbound/outbound FIFO queues with a blocking wake.
//! - [`subjects`]: NATS subject names for faction queues.
//! - [`codec`]: MessagePack helpers.
//! - [`connection`] / [`bridge`]: NATS connection and the queue bridge.

pub mod bridge;
pub mod codec;
pub mod connection;
pub mod error;
pub mod messages;
pub mod queue;
pub mod subjects;

pub use bridge::{NatsBridge, route_inbound};
pub use codec::{decode, encode};
pub use connection::NatsConnection;
pub use error::NetError;
pub use messages::{AdvanceReply, Command, InspectReply, Message, Rejection, kinds};
pub use queue::CommandQueues;
