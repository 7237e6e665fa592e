use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::models::Entry;

/// Receiving end of a live entry subscription. Each message is a full
/// replacement snapshot; dropping the subscription unsubscribes.
pub(crate) struct Subscription {
    rx: Receiver<Vec<Entry>>,
}

impl Subscription {
    /// Newest snapshot delivered since the last call. Older ones are skipped.
    pub(crate) fn latest(&self) -> Option<Vec<Entry>> {
        self.rx.try_iter().last()
    }
}

#[derive(Default)]
pub(crate) struct Watchers {
    by_collection: HashMap<String, Vec<Sender<Vec<Entry>>>>,
}

impl Watchers {
    pub(crate) fn register(&mut self, collection: &str, initial: Vec<Entry>) -> Subscription {
        let (tx, rx) = mpsc::channel();
        // The receiver is alive, so the first send cannot fail.
        let _ = tx.send(initial);
        self.by_collection
            .entry(collection.to_string())
            .or_default()
            .push(tx);
        Subscription { rx }
    }

    pub(crate) fn is_watched(&self, collection: &str) -> bool {
        self.by_collection
            .get(collection)
            .is_some_and(|senders| !senders.is_empty())
    }

    /// Push a snapshot to every live subscriber, pruning dropped ones.
    pub(crate) fn publish(&mut self, collection: &str, snapshot: &[Entry]) {
        if let Some(senders) = self.by_collection.get_mut(collection) {
            senders.retain(|tx| tx.send(snapshot.to_vec()).is_ok());
            tracing::debug!(collection, subscribers = senders.len(), "published snapshot");
            if senders.is_empty() {
                self.by_collection.remove(collection);
            }
        }
    }
}
