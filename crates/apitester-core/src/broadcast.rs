//! Live result updates.
//!
//! Observers subscribe to a channel key and receive every document
//! published on it, serialized as JSON, in publish order. Suite-level
//! documents go out on `{suiteId}`, case histories on `{suiteId}.{caseName}`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

/// Identifies a stream of updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey(String);

impl ChannelKey {
    /// Key for suite-level summary updates.
    pub fn suite(suite_id: &str) -> Self {
        Self(suite_id.to_string())
    }

    /// Key for one case's history updates.
    pub fn case(suite_id: &str, case_id: &str) -> Self {
        Self(format!("{}.{}", suite_id, case_id))
    }

    /// Splits a raw `suiteId[.caseId]` key on its first dot.
    pub fn parse(raw: &str) -> (String, Option<String>) {
        match raw.split_once('.') {
            Some((suite, case)) => (suite.to_string(), Some(case.to_string())),
            None => (raw.to_string(), None),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<String>,
}

/// Receiving end of a subscription.
///
/// Dropping it closes the subscription; the broadcaster prunes it on the
/// next publish to its key.
pub struct Subscription {
    pub key: ChannelKey,
    pub id: u64,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Subscription {
    /// Waits for the next published document.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Returns an already published document without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<String> {
        UnboundedReceiverStream::new(self.rx)
    }
}

/// Registry of live subscribers keyed by channel.
#[derive(Default)]
pub struct Broadcaster {
    channels: RwLock<HashMap<ChannelKey, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber on `key`.
    pub async fn subscribe(&self, key: ChannelKey) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.channels
            .write()
            .await
            .entry(key.clone())
            .or_default()
            .push(Subscriber { id, tx });

        debug!(key = %key, subscriber = id, "Subscriber registered");
        Subscription { key, id, rx }
    }

    /// Sends `document` to every live subscriber of `key`.
    ///
    /// Delivery is best-effort: a subscriber whose connection has gone is
    /// removed and the rest still receive the document. Returns how many
    /// subscribers it was delivered to.
    pub async fn publish<T: Serialize>(
        &self,
        key: &ChannelKey,
        document: &T,
    ) -> Result<usize, serde_json::Error> {
        let payload = serde_json::to_string(document)?;

        let mut channels = self.channels.write().await;
        let Some(subscribers) = channels.get_mut(key) else {
            return Ok(0);
        };

        subscribers.retain(|sub| match sub.tx.send(payload.clone()) {
            Ok(()) => true,
            Err(_) => {
                debug!(key = %key, subscriber = sub.id, "Pruning closed subscriber");
                false
            }
        });

        let delivered = subscribers.len();
        if subscribers.is_empty() {
            channels.remove(key);
        }

        Ok(delivered)
    }

    /// Removes every subscriber whose receiving end has been dropped.
    pub async fn prune(&self) -> usize {
        let mut channels = self.channels.write().await;
        let mut removed = 0;

        channels.retain(|_, subscribers| {
            let before = subscribers.len();
            subscribers.retain(|sub| !sub.tx.is_closed());
            removed += before - subscribers.len();
            !subscribers.is_empty()
        });

        removed
    }

    /// Number of registered subscribers on `key`.
    pub async fn subscriber_count(&self, key: &ChannelKey) -> usize {
        self.channels
            .read()
            .await
            .get(key)
            .map_or(0, Vec::len)
    }
}
