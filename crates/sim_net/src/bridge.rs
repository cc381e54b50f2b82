//! Bridges NATS subjects onto the in-process faction queues.
//!
//! Inbound: every message published on `sim.faction.<id>.in` is decoded as a
//! [`Message`] envelope and appended to that faction's inbound queue.
//! Outbound: whatever the dispatch loop left in the outbound queues is
//! published on `sim.faction.<id>.out`.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use sim_component::Entity;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::codec::decode;
use crate::connection::NatsConnection;
use crate::error::NetError;
use crate::messages::Message;
use crate::queue::CommandQueues;
use crate::subjects::{FACTION_INBOUND_WILDCARD, faction_outbound, parse_inbound_faction};

/// Decode one raw inbound NATS message and queue it for its faction.
///
/// # Errors
///
/// Returns [`NetError::MalformedSubject`], [`NetError::Decode`] or
/// [`NetError::UnknownFaction`] if the message cannot be routed.
pub fn route_inbound(
    queues: &CommandQueues,
    subject: &str,
    payload: &[u8],
) -> Result<Entity, NetError> {
    let faction = parse_inbound_faction(subject)?;
    let message: Message = decode(payload)?;
    queues.push_inbound(faction, message)?;
    Ok(faction)
}

/// Moves messages between NATS subjects and the faction queues.
#[derive(Debug, Clone)]
pub struct NatsBridge {
    conn: NatsConnection,
    queues: Arc<CommandQueues>,
}

impl NatsBridge {
    /// A bridge between `conn` and the faction queues.
    #[must_use]
    pub fn new(conn: NatsConnection, queues: Arc<CommandQueues>) -> Self {
        Self { conn, queues }
    }

    /// Forward inbound faction messages into the queues until the
    /// subscription closes. Messages that cannot be routed are logged and
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Subscribe`] if the subscription fails.
    pub async fn forward_inbound(&self) -> Result<(), NetError> {
        let mut subscriber = self.conn.subscribe(FACTION_INBOUND_WILDCARD).await?;
        info!(subject = FACTION_INBOUND_WILDCARD, "forwarding faction commands");

        while let Some(msg) = subscriber.next().await {
            match route_inbound(&self.queues, msg.subject.as_str(), &msg.payload) {
                Ok(faction) => debug!(%faction, "faction command received"),
                Err(err) => warn!(subject = %msg.subject, error = %err, "dropping inbound message"),
            }
        }

        info!("faction command subscription closed");
        Ok(())
    }

    /// Publish every queued outbound message. Returns the number published.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if encoding or publishing fails.
    pub async fn flush_outbound(&self) -> Result<usize, NetError> {
        let mut published = 0;
        for (faction, messages) in self.queues.drain_all_outbound() {
            let subject = faction_outbound(faction);
            for message in &messages {
                self.conn.publish(&subject, message).await?;
                published += 1;
            }
        }
        if published > 0 {
            debug!(published, "outbound messages flushed");
        }
        Ok(published)
    }

    /// Flush outbound queues every `interval` until `shutdown` flips to
    /// `true`, then flush one last time.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if a flush fails.
    pub async fn run_outbound(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), NetError> {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush_outbound().await?;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.flush_outbound().await?;
        self.conn
            .client()
            .flush()
            .await
            .map_err(|err| NetError::Flush(err.to_string()))?;
        Ok(())
    }
}
