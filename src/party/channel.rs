//! The live standings: one broadcast channel for the whole process.
//!
//! Every publish recomputes the standings from the ledger, so a subscriber that
//! misses a snapshot catches up with the next one.
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::party::standings::standings_snapshot;
use crate::party::store::BallotStore;
use crate::party::*;

pub type SharedSnapshot = Arc<StandingsSnapshot>;

pub struct StandingsChannel {
    store: BallotStore,
    // None once closed.
    sender: Mutex<Option<broadcast::Sender<SharedSnapshot>>>,
    // Snapshots are sent in the order they were computed.
    publishing: tokio::sync::Mutex<()>,
}

impl StandingsChannel {
    /// `capacity` is the number of snapshots a slow subscriber may fall behind
    /// before it skips ahead.
    pub fn new(store: BallotStore, capacity: usize) -> StandingsChannel {
        let (sender, _) = broadcast::channel(capacity.max(1));
        StandingsChannel {
            store,
            sender: Mutex::new(Some(sender)),
            publishing: tokio::sync::Mutex::new(()),
        }
    }

    fn sender(&self) -> Option<broadcast::Sender<SharedSnapshot>> {
        match self.sender.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Starts following the standings. The first snapshot of the subscription is
    /// the current one.
    pub async fn subscribe(&self) -> PartyResult<Subscription> {
        let sender = self.sender().context(ChannelClosedSnafu {})?;
        // Subscribe before reading, so that no publish falls in between.
        let receiver = sender.subscribe();
        let current = standings_snapshot(&self.store).await?;
        Ok(Subscription {
            current: Some(Arc::new(current)),
            receiver,
        })
    }

    /// Recomputes the standings and pushes them to every subscriber.
    ///
    /// Returns the number of subscribers reached.
    pub async fn publish(&self) -> PartyResult<usize> {
        let sender = self.sender().context(ChannelClosedSnafu {})?;
        let _publishing = self.publishing.lock().await;
        let snapshot = standings_snapshot(&self.store).await?;
        match sender.send(Arc::new(snapshot)) {
            Ok(n) => {
                debug!("publish: standings sent to {} subscribers", n);
                Ok(n)
            }
            Err(_) => {
                debug!("publish: no subscribers");
                Ok(0)
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender().map(|s| s.receiver_count()).unwrap_or(0)
    }

    /// Ends every subscription. Later calls to subscribe or publish fail.
    pub fn close(&self) {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(s) = sender {
            info!(
                "Closing the standings channel ({} subscribers)",
                s.receiver_count()
            );
        }
    }
}

pub struct Subscription {
    current: Option<SharedSnapshot>,
    receiver: broadcast::Receiver<SharedSnapshot>,
}

impl Subscription {
    /// The next snapshot to show, or None when the channel is closed.
    ///
    /// Snapshots that queued up while the subscriber was busy are skipped: only
    /// the most recent one is returned.
    pub async fn next(&mut self) -> Option<SharedSnapshot> {
        if let Some(s) = self.current.take() {
            return Some(s);
        }
        let mut latest = loop {
            match self.receiver.recv().await {
                Ok(s) => break s,
                Err(RecvError::Lagged(n)) => {
                    debug!("Subscription::next: skipped {} snapshots", n);
                }
                Err(RecvError::Closed) => return None,
            }
        };
        loop {
            match self.receiver.try_recv() {
                Ok(s) => latest = s,
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        Some(latest)
    }
}
