//! Change notifications backing live queries.
//!
//! The store publishes a [`Topic`] after every committed write. A live query
//! holds a [`Subscription`] for the topics it reads and re-runs itself when one
//! fires. Dropping the subscription is the teardown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Profiles,
    Requests,
    History,
    Redemptions,
    ChatRooms,
    ChatMessages(String),
    SupportThreads,
    SupportMessages(String),
}

#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Topic>,
    listeners: Arc<AtomicUsize>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, listeners: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn publish(&self, topic: Topic) {
        // no receivers is fine: nobody is watching
        let _ = self.tx.send(topic);
    }

    pub fn subscribe(&self, interest: Vec<Topic>) -> Subscription {
        self.listeners.fetch_add(1, Ordering::SeqCst);
        Subscription { rx: self.tx.subscribe(), interest, listeners: self.listeners.clone() }
    }

    /// Number of live subscriptions not yet dropped.
    pub fn active_listeners(&self) -> usize {
        self.listeners.load(Ordering::SeqCst)
    }
}

impl Default for ChangeFeed {
    fn default() -> Self { Self::new(256) }
}

pub struct Subscription {
    rx: broadcast::Receiver<Topic>,
    interest: Vec<Topic>,
    listeners: Arc<AtomicUsize>,
}

impl Subscription {
    /// Waits for the next change to a topic of interest. `None` once the feed is gone.
    pub async fn changed(&mut self) -> Option<Topic> {
        loop {
            match self.rx.recv().await {
                Ok(topic) if self.interest.contains(&topic) => return Some(topic),
                Ok(_) => continue,
                // missed events: report a change so the caller re-queries
                Err(RecvError::Lagged(_)) => return self.interest.first().cloned(),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.listeners.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filters_by_interest() {
        let feed = ChangeFeed::new(16);
        let mut sub = feed.subscribe(vec![Topic::ChatMessages("r1".into())]);
        feed.publish(Topic::Requests);
        feed.publish(Topic::ChatMessages("r2".into()));
        feed.publish(Topic::ChatMessages("r1".into()));
        assert_eq!(sub.changed().await, Some(Topic::ChatMessages("r1".into())));
    }

    #[tokio::test]
    async fn drop_releases_listener() {
        let feed = ChangeFeed::default();
        let a = feed.subscribe(vec![Topic::Profiles]);
        let b = feed.subscribe(vec![Topic::Requests]);
        assert_eq!(feed.active_listeners(), 2);
        drop(a);
        assert_eq!(feed.active_listeners(), 1);
        drop(b);
        assert_eq!(feed.active_listeners(), 0);
    }

    #[tokio::test]
    async fn lag_is_reported_as_change() {
        let feed = ChangeFeed::new(1);
        let mut sub = feed.subscribe(vec![Topic::Requests]);
        for _ in 0..4 {
            feed.publish(Topic::Profiles);
        }
        assert_eq!(sub.changed().await, Some(Topic::Requests));
    }
}
