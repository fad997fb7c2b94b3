use std::collections::HashMap;

use crate::models::{ThreadComment, Timestamp};

/// Latest activity per top-level thread, keyed by comment id.
///
/// Filled once before a page is walked and drained one entry per rendered
/// comment, so a full render leaves it empty.
#[derive(Debug, Default, Clone)]
pub struct FreshnessMap {
    latest: HashMap<String, Timestamp>,
}

impl FreshnessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: &str, ts: Timestamp) {
        self.latest.insert(id.to_string(), ts);
    }

    pub fn get(&self, id: &str) -> Option<Timestamp> {
        self.latest.get(id).copied()
    }

    // Zero is treated the same as a missing entry
    pub fn get_nonzero(&self, id: &str) -> Option<Timestamp> {
        self.get(id).filter(|ts| *ts != 0)
    }

    pub fn remove(&mut self, id: &str) -> Option<Timestamp> {
        self.latest.remove(id)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    pub fn clear(&mut self) {
        self.latest.clear();
    }

    /// Walks `comments` depth-first and returns the newest timestamp found,
    /// never lower than `floor`.
    ///
    /// Only comments at the level of the non-recursive call get an entry, and
    /// the value recorded is the running maximum across the siblings seen so
    /// far rather than each thread's own maximum. A quiet thread listed after
    /// a busy one therefore inherits the busy thread's time.
    pub fn compute_thread_latest(
        &mut self,
        comments: &[ThreadComment],
        mut floor: Timestamp,
        is_child: bool,
    ) -> Timestamp {
        for comment in comments {
            let mut this_time = comment.timestamp();
            if comment.has_children() {
                this_time = self.compute_thread_latest(&comment.children, this_time, true);
            }
            if this_time > floor {
                floor = this_time;
            }
            if !is_child {
                self.record(&comment.id, floor);
            }
        }

        floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(id: &str, ts: i64) -> ThreadComment {
        ThreadComment::new(id, ts.to_string())
    }

    #[test]
    fn single_comment_records_its_own_time() {
        let mut map = FreshnessMap::new();
        let latest = map.compute_thread_latest(&[at("a", 100)], 0, false);
        assert_eq!(latest, 100);
        assert_eq!(map.get("a"), Some(100));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn older_replies_do_not_lower_the_thread_time() {
        let mut map = FreshnessMap::new();
        let thread = at("p", 500).with_children(vec![at("c1", 100), at("c2", 200)]);
        map.compute_thread_latest(&[thread], 0, false);
        assert_eq!(map.get("p"), Some(500));
    }

    #[test]
    fn newer_reply_bubbles_up_to_the_root() {
        let mut map = FreshnessMap::new();
        let thread = at("p", 100).with_children(vec![
            at("c", 150).with_children(vec![at("gc", 900)]),
        ]);
        assert_eq!(map.compute_thread_latest(&[thread], 0, false), 900);
        assert_eq!(map.get("p"), Some(900));
        // nested replies never get their own entry
        assert_eq!(map.get("c"), None);
        assert_eq!(map.get("gc"), None);
    }

    #[test]
    fn later_siblings_inherit_the_running_max() {
        let mut map = FreshnessMap::new();
        let busy = at("busy", 100).with_children(vec![at("reply", 800)]);
        let quiet = at("quiet", 300);
        map.compute_thread_latest(&[busy, quiet], 0, false);
        assert_eq!(map.get("busy"), Some(800));
        assert_eq!(map.get("quiet"), Some(800));
    }

    #[test]
    fn floor_argument_is_respected() {
        let mut map = FreshnessMap::new();
        assert_eq!(map.compute_thread_latest(&[at("a", 10)], 50, true), 50);
        assert!(map.is_empty());
    }

    #[test]
    fn zero_entries_count_as_missing() {
        let mut map = FreshnessMap::new();
        map.record("x", 0);
        assert_eq!(map.get("x"), Some(0));
        assert_eq!(map.get_nonzero("x"), None);
        assert_eq!(map.remove("x"), Some(0));
        assert!(map.is_empty());
    }
}
