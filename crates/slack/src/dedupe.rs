//! At-most-once suppression for re-delivered inbound events.
//!
//! Slack redelivers events it believes were not handled in time. A bounded,
//! time-boxed cache of recently seen event ids lets the pump answer those
//! redeliveries with a retry-suppression signal instead of reprocessing
//! them. This is a backpressure mechanism, not an ordering one.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_MAX_LEN: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupeVerdict {
    Fresh,
    Duplicate,
}

pub struct EventDedupeCache {
    max_len: usize,
    ttl: Duration,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    seen: HashMap<String, Instant>,
    order: VecDeque<String>,
}

impl Default for EventDedupeCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEN, DEFAULT_TTL)
    }
}

impl EventDedupeCache {
    pub fn new(max_len: usize, ttl: Duration) -> Self {
        Self { max_len, ttl, inner: Mutex::new(Inner::default()) }
    }

    /// Records `event_id` and reports whether it was already seen within the
    /// expiry window. Expired and size-evicted ids count as fresh again.
    pub async fn check(&self, event_id: &str) -> DedupeVerdict {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;

        while let Some(oldest) = inner.order.front() {
            let expired = inner
                .seen
                .get(oldest)
                .map(|seen_at| now.duration_since(*seen_at) >= self.ttl)
                .unwrap_or(true);
            if !expired {
                break;
            }
            if let Some(oldest) = inner.order.pop_front() {
                inner.seen.remove(&oldest);
            }
        }

        if inner.seen.contains_key(event_id) {
            return DedupeVerdict::Duplicate;
        }

        inner.seen.insert(event_id.to_owned(), now);
        inner.order.push_back(event_id.to_owned());
        while inner.order.len() > self.max_len {
            if let Some(evicted) = inner.order.pop_front() {
                inner.seen.remove(&evicted);
            }
        }

        DedupeVerdict::Fresh
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{DedupeVerdict, EventDedupeCache};

    #[tokio::test]
    async fn repeated_event_id_is_a_duplicate() {
        let cache = EventDedupeCache::default();

        assert_eq!(cache.check("Ev1").await, DedupeVerdict::Fresh);
        assert_eq!(cache.check("Ev1").await, DedupeVerdict::Duplicate);
        assert_eq!(cache.check("Ev2").await, DedupeVerdict::Fresh);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_event_id_is_fresh_again() {
        let cache = EventDedupeCache::new(10, Duration::from_secs(120));

        assert_eq!(cache.check("Ev1").await, DedupeVerdict::Fresh);
        tokio::time::advance(Duration::from_secs(121)).await;
        assert_eq!(cache.check("Ev1").await, DedupeVerdict::Fresh);
    }

    #[tokio::test]
    async fn size_bound_evicts_oldest_first() {
        let cache = EventDedupeCache::new(2, Duration::from_secs(120));

        cache.check("Ev1").await;
        cache.check("Ev2").await;
        cache.check("Ev3").await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.check("Ev1").await, DedupeVerdict::Fresh);
        assert_eq!(cache.check("Ev3").await, DedupeVerdict::Duplicate);
    }
}
