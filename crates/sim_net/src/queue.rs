//! Per-faction inbound/outbound command queues.
//!
//! Each registered faction has a FIFO inbound queue (commands from an
//! external actor) and a FIFO outbound queue (replies from the kernel). The
//! queues live in a [`DashMap`] so the NATS bridge can push from its own task
//! while the dispatch loop consumes on the simulation thread.
//!
//! A pending counter tracks the total number of inbound messages across
//! every faction. It is only changed while the faction's map shard is held,
//! so it never runs ahead of or behind the queues themselves. Each push also
//! drops a token into a one-slot wake channel; the dispatch loop blocks on
//! that channel when it has nothing to do.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sim_component::Entity;
use tracing::{debug, trace};

use crate::error::NetError;
use crate::messages::Message;

#[derive(Debug, Default)]
struct FactionQueue {
    inbound: VecDeque<Message>,
    outbound: VecDeque<Message>,
}

/// The set of faction queues shared between the bridge and the dispatch loop.
#[derive(Debug)]
pub struct CommandQueues {
    queues: DashMap<Entity, FactionQueue>,
    pending: AtomicUsize,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl CommandQueues {
    /// Create an empty set with no factions registered.
    #[must_use]
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            queues: DashMap::new(),
            pending: AtomicUsize::new(0),
            wake_tx,
            wake_rx,
        }
    }

    /// Create empty queues for `faction`. Returns `false` if it already had
    /// queues.
    pub fn register_faction(&self, faction: Entity) -> bool {
        match self.queues.entry(faction) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(FactionQueue::default());
                debug!(%faction, "faction queues registered");
                true
            }
        }
    }

    /// Drop the queues for `faction`, discarding anything still queued.
    pub fn unregister_faction(&self, faction: Entity) -> bool {
        match self.queues.remove(&faction) {
            Some((_, queue)) => {
                self.pending
                    .fetch_sub(queue.inbound.len(), Ordering::AcqRel);
                debug!(
                    %faction,
                    discarded = queue.inbound.len(),
                    "faction queues unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `faction` has queues.
    #[must_use]
    pub fn is_registered(&self, faction: Entity) -> bool {
        self.queues.contains_key(&faction)
    }

    /// Registered factions in ascending id order.
    #[must_use]
    pub fn factions(&self) -> Vec<Entity> {
        let mut factions: Vec<Entity> = self.queues.iter().map(|entry| *entry.key()).collect();
        factions.sort_unstable();
        factions
    }

    /// Append a command to the back of a faction's inbound queue and wake
    /// the dispatch loop.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownFaction`] if `faction` has no queues.
    pub fn push_inbound(&self, faction: Entity, message: Message) -> Result<(), NetError> {
        let mut queue = self
            .queues
            .get_mut(&faction)
            .ok_or(NetError::UnknownFaction(faction))?;
        trace!(%faction, kind = %message.kind, "inbound message queued");
        queue.inbound.push_back(message);
        self.pending.fetch_add(1, Ordering::AcqRel);
        drop(queue);
        self.wake();
        Ok(())
    }

    /// A copy of the message at the head of a faction's inbound queue.
    #[must_use]
    pub fn peek_inbound(&self, faction: Entity) -> Option<Message> {
        self.queues
            .get(&faction)
            .and_then(|queue| queue.inbound.front().cloned())
    }

    /// Remove and return the head of a faction's inbound queue.
    pub fn pop_inbound(&self, faction: Entity) -> Option<Message> {
        let mut queue = self.queues.get_mut(&faction)?;
        let message = queue.inbound.pop_front()?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(message)
    }

    /// Number of commands waiting in a faction's inbound queue.
    #[must_use]
    pub fn inbound_len(&self, faction: Entity) -> usize {
        self.queues
            .get(&faction)
            .map_or(0, |queue| queue.inbound.len())
    }

    /// Total inbound messages waiting across every faction.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Returns `true` if any faction has an inbound command waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    /// Wake a thread blocked in [`wait_for_pending`](Self::wait_for_pending).
    /// Wakes are coalesced: at most one is buffered.
    pub fn wake(&self) {
        let _ = self.wake_tx.try_send(());
    }

    /// Block until some inbound queue is non-empty, a [`wake`](Self::wake)
    /// arrives, or `timeout` elapses. Returns `true` if messages are pending.
    pub fn wait_for_pending(&self, timeout: Duration) -> bool {
        if self.has_pending() {
            return true;
        }
        // A token or a timeout; the counter decides either way.
        let _ = self.wake_rx.recv_timeout(timeout);
        self.has_pending()
    }

    /// Block until a [`wake`](Self::wake) arrives or `timeout` elapses,
    /// whether or not messages are pending.
    pub fn wait_for_wake(&self, timeout: Duration) {
        let _ = self.wake_rx.recv_timeout(timeout);
    }

    /// Append a reply to a faction's outbound queue.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownFaction`] if `faction` has no queues.
    pub fn push_outbound(&self, faction: Entity, message: Message) -> Result<(), NetError> {
        let mut queue = self
            .queues
            .get_mut(&faction)
            .ok_or(NetError::UnknownFaction(faction))?;
        trace!(%faction, kind = %message.kind, "outbound message queued");
        queue.outbound.push_back(message);
        Ok(())
    }

    /// Number of replies waiting in a faction's outbound queue.
    #[must_use]
    pub fn outbound_len(&self, faction: Entity) -> usize {
        self.queues
            .get(&faction)
            .map_or(0, |queue| queue.outbound.len())
    }

    /// Take everything in a faction's outbound queue, oldest first.
    pub fn drain_outbound(&self, faction: Entity) -> Vec<Message> {
        self.queues
            .get_mut(&faction)
            .map(|mut queue| queue.outbound.drain(..).collect())
            .unwrap_or_default()
    }

    /// Take every faction's outbound messages, factions in ascending order.
    pub fn drain_all_outbound(&self) -> Vec<(Entity, Vec<Message>)> {
        self.factions()
            .into_iter()
            .map(|faction| (faction, self.drain_outbound(faction)))
            .filter(|(_, messages)| !messages.is_empty())
            .collect()
    }
}

impl Default for CommandQueues {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use super::*;

    const A: Entity = Entity::from_raw(1);
    const B: Entity = Entity::from_raw(2);

    fn queues() -> CommandQueues {
        let queues = CommandQueues::new();
        queues.register_faction(A);
        queues.register_faction(B);
        queues
    }

    #[test]
    fn test_register_twice() {
        let queues = CommandQueues::new();
        assert!(queues.register_faction(A));
        assert!(!queues.register_faction(A));
        assert!(queues.is_registered(A));
        assert!(!queues.is_registered(B));
    }

    #[test]
    fn test_push_unknown_faction() {
        let queues = CommandQueues::new();
        assert!(matches!(
            queues.push_inbound(A, Message::quit()),
            Err(NetError::UnknownFaction(f)) if f == A
        ));
        assert!(queues.push_outbound(A, Message::quit()).is_err());
    }

    #[test]
    fn test_inbound_fifo() {
        let queues = queues();
        let first = Message::echo(vec![1]);
        let second = Message::echo(vec![2]);
        queues.push_inbound(A, first.clone()).unwrap();
        queues.push_inbound(A, second.clone()).unwrap();

        assert_eq!(queues.peek_inbound(A), Some(first.clone()));
        assert_eq!(queues.inbound_len(A), 2);
        assert_eq!(queues.pop_inbound(A), Some(first));
        assert_eq!(queues.pop_inbound(A), Some(second));
        assert_eq!(queues.pop_inbound(A), None);
    }

    #[test]
    fn test_pending_count_tracks_all_factions() {
        let queues = queues();
        assert!(!queues.has_pending());
        queues.push_inbound(A, Message::quit()).unwrap();
        queues.push_inbound(B, Message::quit()).unwrap();
        queues.push_inbound(B, Message::quit()).unwrap();
        assert_eq!(queues.pending_count(), 3);

        queues.pop_inbound(B);
        assert_eq!(queues.pending_count(), 2);
        assert!(queues.unregister_faction(B));
        assert_eq!(queues.pending_count(), 1);
        queues.pop_inbound(A);
        assert!(!queues.has_pending());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let queues = queues();
        queues.push_inbound(A, Message::quit()).unwrap();
        assert!(queues.peek_inbound(A).is_some());
        assert!(queues.peek_inbound(A).is_some());
        assert_eq!(queues.inbound_len(A), 1);
        assert_eq!(queues.pending_count(), 1);
    }

    #[test]
    fn test_outbound_drain() {
        let queues = queues();
        queues.push_outbound(B, Message::echo(vec![2])).unwrap();
        queues.push_outbound(A, Message::echo(vec![1])).unwrap();
        queues.push_outbound(A, Message::echo(vec![3])).unwrap();

        let drained = queues.drain_all_outbound();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0, A);
        assert_eq!(
            drained[0].1.iter().map(|m| m.payload.clone()).collect::<Vec<_>>(),
            vec![vec![1], vec![3]]
        );
        assert_eq!(drained[1].0, B);
        assert_eq!(queues.outbound_len(A), 0);
        assert!(queues.drain_outbound(A).is_empty());
    }

    #[test]
    fn test_wait_times_out_when_idle() {
        let queues = queues();
        let start = Instant::now();
        assert!(!queues.wait_for_pending(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_returns_immediately_when_pending() {
        let queues = queues();
        queues.push_inbound(A, Message::quit()).unwrap();
        assert!(queues.wait_for_pending(Duration::from_secs(10)));
    }

    #[test]
    fn test_wake_ends_wait_without_pending() {
        let queues = queues();
        queues.wake();
        queues.wake();
        let start = Instant::now();
        assert!(!queues.wait_for_pending(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(10));

        // The second wake was coalesced into the first.
        assert!(!queues.wait_for_pending(Duration::from_millis(20)));
    }

    #[test]
    fn test_wait_for_wake_ignores_pending() {
        let queues = queues();
        queues.push_inbound(A, Message::quit()).unwrap();
        // Drain the token left by the push.
        queues.wait_for_wake(Duration::from_millis(1));

        let start = Instant::now();
        queues.wait_for_wake(Duration::from_millis(30));
        assert!(start.elapsed() >= Duration::from_millis(30));

        queues.wake();
        let start = Instant::now();
        queues.wait_for_wake(Duration::from_secs(10));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_pending_survives_concurrent_push_and_pop() {
        let queues = Arc::new(queues());
        let producer = Arc::clone(&queues);
        let handle = thread::spawn(move || {
            for _ in 0..500 {
                producer.push_inbound(A, Message::quit()).unwrap();
            }
        });

        let mut popped = 0;
        while popped < 500 {
            if queues.wait_for_pending(Duration::from_secs(10)) && queues.pop_inbound(A).is_some() {
                popped += 1;
            }
        }
        handle.join().unwrap();
        assert_eq!(queues.pending_count(), 0);
        assert_eq!(queues.inbound_len(A), 0);
    }

    #[test]
    fn test_push_wakes_waiter() {
        let queues = Arc::new(queues());
        let producer = Arc::clone(&queues);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push_inbound(B, Message::quit()).unwrap();
        });

        let start = Instant::now();
        assert!(queues.wait_for_pending(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(10));
        handle.join().unwrap();
    }
}
