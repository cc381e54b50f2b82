//! Messages exchanged between factions and the kernel.
//!
//! Every message travels in the same envelope, [`Message`]: an id, a string
//! kind, and an opaque MessagePack payload. The kind string decides how the
//! payload is read. Inbound kinds decode into a [`Command`]; anything else is
//! an unrecognized message type.

use serde::{Deserialize, Serialize};
use sim_component::{ComponentRecord, Entity};
use uuid::Uuid;

use crate::codec::{decode, encode};
use crate::error::NetError;

/// Message kind strings.
pub mod kinds {
    // ── Inbound (faction → kernel) ─────────────────────────────────────
    /// Stop the dispatch loop.
    pub const QUIT: &str = "quit";
    /// Liveness check; written back to the sender unchanged.
    pub const ECHO: &str = "echo";
    /// Advance simulated time. Payload: `i64` seconds.
    pub const ADVANCE: &str = "advance";
    /// Read every component of one entity. Payload: [`Entity`](sim_component::Entity).
    pub const INSPECT: &str = "inspect";

    // ── Outbound (kernel → faction) ────────────────────────────────────
    /// Payload: [`AdvanceReply`](super::AdvanceReply).
    pub const ADVANCED: &str = "advanced";
    /// Payload: [`InspectReply`](super::InspectReply).
    pub const COMPONENTS: &str = "components";
    /// Payload: [`Rejection`](super::Rejection).
    pub const REJECTED: &str = "rejected";
}

/// The wire envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    /// Set on replies to the id of the message being answered.
    pub in_reply_to: Option<Uuid>,
    pub kind: String,
    /// MessagePack-encoded body; its shape depends on `kind`.
    pub payload: Vec<u8>,
}

impl Message {
    /// A fresh message with a new id.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            in_reply_to: None,
            kind: kind.into(),
            payload,
        }
    }

    /// A `quit` command.
    #[must_use]
    pub fn quit() -> Self {
        Self::new(kinds::QUIT, Vec::new())
    }

    /// An `echo` command carrying `payload`.
    #[must_use]
    pub fn echo(payload: Vec<u8>) -> Self {
        Self::new(kinds::ECHO, payload)
    }

    /// An `advance` command for `seconds`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Encode`] if the payload cannot be encoded.
    pub fn advance(seconds: i64) -> Result<Self, NetError> {
        Ok(Self::new(kinds::ADVANCE, encode(&seconds)?))
    }

    /// An `inspect` command for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Encode`] if the payload cannot be encoded.
    pub fn inspect(entity: Entity) -> Result<Self, NetError> {
        Ok(Self::new(kinds::INSPECT, encode(&entity)?))
    }

    /// Build a reply to this message.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Encode`] if the payload cannot be encoded.
    pub fn reply<T: Serialize>(&self, kind: &str, body: &T) -> Result<Self, NetError> {
        Ok(Self {
            in_reply_to: Some(self.id),
            ..Self::new(kind, encode(body)?)
        })
    }

    /// Build a `rejected` reply carrying `reason`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Encode`] if the payload cannot be encoded.
    pub fn reject(&self, reason: impl Into<String>) -> Result<Self, NetError> {
        self.reply(
            kinds::REJECTED,
            &Rejection {
                kind: self.kind.clone(),
                reason: reason.into(),
            },
        )
    }

    /// Decode the payload as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Decode`] if the payload is not a valid `T`.
    pub fn body<'a, T: Deserialize<'a>>(&'a self) -> Result<T, NetError> {
        decode(&self.payload)
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Echo,
    Advance { seconds: i64 },
    Inspect { entity: Entity },
}

impl Command {
    /// Interpret an inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnrecognizedMessageType`] for an unknown kind, or
    /// [`NetError::Decode`] if a known kind carries a malformed payload.
    pub fn decode(message: &Message) -> Result<Self, NetError> {
        match message.kind.as_str() {
            kinds::QUIT => Ok(Self::Quit),
            kinds::ECHO => Ok(Self::Echo),
            kinds::ADVANCE => Ok(Self::Advance {
                seconds: message.body()?,
            }),
            kinds::INSPECT => Ok(Self::Inspect {
                entity: message.body()?,
            }),
            other => Err(NetError::UnrecognizedMessageType(other.to_string())),
        }
    }
}

/// Body of an `advanced` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceReply {
    pub requested_secs: i64,
    pub advanced_secs: u64,
    pub subpulses: u64,
    pub interrupted: bool,
    /// Simulated time after the advance.
    pub now: u64,
}

/// Body of a `components` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectReply {
    pub entity: Entity,
    pub components: Vec<ComponentRecord>,
}

/// Body of a `rejected` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Kind of the message that was rejected.
    pub kind: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_commands() {
        assert_eq!(Command::decode(&Message::quit()).unwrap(), Command::Quit);
        assert_eq!(Command::decode(&Message::echo(vec![1, 2])).unwrap(), Command::Echo);
        assert_eq!(
            Command::decode(&Message::advance(-30).unwrap()).unwrap(),
            Command::Advance { seconds: -30 }
        );
        assert_eq!(
            Command::decode(&Message::inspect(Entity::from_raw(4)).unwrap()).unwrap(),
            Command::Inspect {
                entity: Entity::from_raw(4)
            }
        );
    }

    #[test]
    fn test_decode_unrecognized_kind() {
        let msg = Message::new("launch_fleet", Vec::new());
        match Command::decode(&msg) {
            Err(NetError::UnrecognizedMessageType(kind)) => assert_eq!(kind, "launch_fleet"),
            other => panic!("expected unrecognized type, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_malformed_payload() {
        let msg = Message::new(kinds::ADVANCE, vec![0xc1]);
        assert!(matches!(Command::decode(&msg), Err(NetError::Decode(_))));
    }

    #[test]
    fn test_reply_links_to_request() {
        let request = Message::advance(60).unwrap();
        let body = AdvanceReply {
            requested_secs: 60,
            advanced_secs: 60,
            subpulses: 12,
            interrupted: false,
            now: 60,
        };
        let reply = request.reply(kinds::ADVANCED, &body).unwrap();
        assert_eq!(reply.in_reply_to, Some(request.id));
        assert_ne!(reply.id, request.id);
        assert_eq!(reply.kind, kinds::ADVANCED);
        assert_eq!(reply.body::<AdvanceReply>().unwrap(), body);
    }

    #[test]
    fn test_reject_carries_original_kind() {
        let request = Message::new("bogus", Vec::new());
        let reply = request.reject("nope").unwrap();
        let rejection: Rejection = reply.body().unwrap();
        assert_eq!(rejection.kind, "bogus");
        assert_eq!(rejection.reason, "nope");
    }

    #[test]
    fn test_envelope_encodes() {
        let msg = Message::echo(b"ping".to_vec());
        let bytes = encode(&msg).unwrap();
        assert_eq!(decode::<Message>(&bytes).unwrap(), msg);
    }
}
