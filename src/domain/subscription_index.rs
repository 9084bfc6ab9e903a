//! Topic ↔ connection subscription index.
//!
//! [`SubscriptionIndex`] keeps two maps in lockstep:
//!
//! - **forward**: topic → set of subscribed connections, used by publish.
//! - **reverse**: connection → set of subscribed topics, used to clean up a
//!   closed connection in O(subscribed topics) instead of scanning every
//!   topic.
//!
//! # Invariants
//!
//! - A topic key exists in the forward map only while its set is non-empty.
//! - A connection key exists in the reverse map only while its set is
//!   non-empty.
//! - `c ∈ forward[t]` iff `t ∈ reverse[c]`.
//!
//! The index itself is not synchronized; the owning [`crate::service::Hub`]
//! serializes access to it.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use super::{ConnectionId, Topic};

/// Bidirectional many-to-many map between topics and connections.
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    forward: HashMap<Topic, HashSet<ConnectionId>>,
    reverse: HashMap<ConnectionId, HashSet<Topic>>,
}

impl SubscriptionIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `conn` to `topic`.
    ///
    /// Returns `true` if the subscription is new, `false` if it already
    /// existed.
    pub fn subscribe(&mut self, conn: ConnectionId, topic: &Topic) -> bool {
        let inserted = self
            .forward
            .entry(topic.clone())
            .or_default()
            .insert(conn);
        self.reverse.entry(conn).or_default().insert(topic.clone());
        inserted
    }

    /// Unsubscribes `conn` from `topic`, pruning empty sets on both sides.
    ///
    /// Returns `true` if a subscription was removed.
    pub fn unsubscribe(&mut self, conn: ConnectionId, topic: &Topic) -> bool {
        let removed = remove_member(&mut self.forward, topic, &conn);
        remove_member(&mut self.reverse, &conn, topic);
        removed
    }

    /// Removes every subscription held by `conn`.
    ///
    /// Returns the topics the connection was subscribed to. A second call
    /// for the same connection finds no reverse entry and returns an empty
    /// list.
    pub fn remove_connection(&mut self, conn: ConnectionId) -> Vec<Topic> {
        let Some(topics) = self.reverse.remove(&conn) else {
            return Vec::new();
        };
        for topic in &topics {
            remove_member(&mut self.forward, topic, &conn);
        }
        topics.into_iter().collect()
    }

    /// Returns the current subscribers of `topic`, if any.
    #[must_use]
    pub fn subscribers(&self, topic: &Topic) -> Option<&HashSet<ConnectionId>> {
        self.forward.get(topic)
    }

    /// Returns the topics `conn` is subscribed to, if any.
    #[must_use]
    pub fn topics_of(&self, conn: ConnectionId) -> Option<&HashSet<Topic>> {
        self.reverse.get(&conn)
    }

    /// Returns `true` if `conn` is subscribed to `topic`.
    #[must_use]
    pub fn is_subscribed(&self, conn: ConnectionId, topic: &Topic) -> bool {
        self.forward
            .get(topic)
            .is_some_and(|subs| subs.contains(&conn))
    }

    /// Iterates every topic with its subscriber count.
    pub fn topic_counts(&self) -> impl Iterator<Item = (&Topic, usize)> {
        self.forward.iter().map(|(topic, subs)| (topic, subs.len()))
    }

    /// Number of topics with at least one subscriber.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.forward.len()
    }

    /// Total number of (topic, connection) pairs.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.forward.values().map(HashSet::len).sum()
    }

    /// Returns `true` if nobody is subscribed to anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Removes `member` from the set stored under `key`, dropping the key when
/// the set becomes empty.
fn remove_member<K, V>(map: &mut HashMap<K, HashSet<V>>, key: &K, member: &V) -> bool
where
    K: Hash + Eq,
    V: Hash + Eq,
{
    let Some(set) = map.get_mut(key) else {
        return false;
    };
    let removed = set.remove(member);
    if set.is_empty() {
        map.remove(key);
    }
    removed
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn topic(raw: &str) -> Topic {
        let Ok(topic) = Topic::parse(raw) else {
            panic!("invalid test topic {raw}");
        };
        topic
    }

    /// Checks that no set is empty and both maps agree.
    fn assert_consistent(index: &SubscriptionIndex) {
        for (t, subs) in &index.forward {
            assert!(!subs.is_empty(), "empty subscriber set for {t}");
            for c in subs {
                assert!(
                    index.reverse.get(c).is_some_and(|ts| ts.contains(t)),
                    "{c} in forward[{t}] but not reverse"
                );
            }
        }
        for (c, topics) in &index.reverse {
            assert!(!topics.is_empty(), "empty topic set for {c}");
            for t in topics {
                assert!(
                    index.forward.get(t).is_some_and(|cs| cs.contains(c)),
                    "{t} in reverse[{c}] but not forward"
                );
            }
        }
    }

    #[test]
    fn subscribe_populates_both_sides() {
        let mut index = SubscriptionIndex::new();
        let conn = ConnectionId::new();
        let t = topic("order:123");

        assert!(index.subscribe(conn, &t));
        assert!(index.is_subscribed(conn, &t));
        assert!(index.topics_of(conn).is_some_and(|ts| ts.contains(&t)));
        assert_consistent(&index);
    }

    #[test]
    fn duplicate_subscribe_is_harmless() {
        let mut index = SubscriptionIndex::new();
        let conn = ConnectionId::new();
        let t = topic("city:1");

        assert!(index.subscribe(conn, &t));
        assert!(!index.subscribe(conn, &t));
        assert_eq!(index.subscription_count(), 1);
        assert_consistent(&index);
    }

    #[test]
    fn unsubscribe_prunes_empty_topic() {
        let mut index = SubscriptionIndex::new();
        let conn = ConnectionId::new();
        let t = topic("driver:77");

        index.subscribe(conn, &t);
        assert!(index.unsubscribe(conn, &t));
        assert!(index.subscribers(&t).is_none());
        assert!(index.topics_of(conn).is_none());
        assert!(index.is_empty());
        assert_consistent(&index);
    }

    #[test]
    fn unsubscribe_keeps_other_subscribers() {
        let mut index = SubscriptionIndex::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let t = topic("order:9");

        index.subscribe(a, &t);
        index.subscribe(b, &t);
        index.unsubscribe(a, &t);

        let Some(subs) = index.subscribers(&t) else {
            panic!("topic should still have a subscriber");
        };
        assert_eq!(subs.len(), 1);
        assert!(subs.contains(&b));
        assert_consistent(&index);
    }

    #[test]
    fn unsubscribe_unknown_is_noop() {
        let mut index = SubscriptionIndex::new();
        assert!(!index.unsubscribe(ConnectionId::new(), &topic("city:x")));
        assert!(index.is_empty());
    }

    #[test]
    fn remove_connection_clears_all_topics() {
        let mut index = SubscriptionIndex::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let shared = topic("city:berlin");
        let only_a = topic("order:1");

        index.subscribe(a, &shared);
        index.subscribe(a, &only_a);
        index.subscribe(b, &shared);

        let mut removed = index.remove_connection(a);
        removed.sort();
        assert_eq!(removed, vec![shared.clone(), only_a.clone()]);
        assert!(index.subscribers(&only_a).is_none());
        assert_eq!(index.subscribers(&shared).map(HashSet::len), Some(1));
        assert_consistent(&index);
    }

    #[test]
    fn remove_connection_is_idempotent() {
        let mut index = SubscriptionIndex::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        index.subscribe(a, &topic("driver:1"));
        index.subscribe(b, &topic("driver:1"));

        let first = index.remove_connection(a);
        let after_first = (index.topic_count(), index.subscription_count());
        let second = index.remove_connection(a);

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(
            (index.topic_count(), index.subscription_count()),
            after_first
        );
        assert_consistent(&index);
    }

    #[test]
    fn counts_track_mutations() {
        let mut index = SubscriptionIndex::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        index.subscribe(a, &topic("city:1"));
        index.subscribe(b, &topic("city:1"));
        index.subscribe(b, &topic("order:2"));

        assert_eq!(index.topic_count(), 2);
        assert_eq!(index.subscription_count(), 3);

        let mut counts: Vec<_> = index
            .topic_counts()
            .map(|(t, n)| (t.to_string(), n))
            .collect();
        counts.sort();
        assert_eq!(
            counts,
            vec![("city:1".to_string(), 2), ("order:2".to_string(), 1)]
        );
    }

    #[test]
    fn interleaved_operations_stay_consistent() {
        let mut index = SubscriptionIndex::new();
        let conns: Vec<_> = (0..4).map(|_| ConnectionId::new()).collect();
        let topics: Vec<_> = ["city:a", "order:b", "driver:c", "controlcenter:d"]
            .into_iter()
            .map(topic)
            .collect();

        for (i, c) in conns.iter().enumerate() {
            for t in topics.iter().skip(i % 2) {
                index.subscribe(*c, t);
            }
        }
        assert_consistent(&index);

        for (c, t) in conns.iter().zip(topics.iter()) {
            index.unsubscribe(*c, t);
            assert_consistent(&index);
        }
        for c in &conns {
            index.remove_connection(*c);
            assert_consistent(&index);
        }
        assert!(index.is_empty());
    }
}
