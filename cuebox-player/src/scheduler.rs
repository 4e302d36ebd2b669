//! Tick-driven timer queue
//!
//! Stands in for "wait N seconds" on the game loop: callers schedule a key to
//! fire after a delay and the owner calls [`TimerQueue::advance`] once per
//! frame. Fired keys come back in due order; nothing runs on its own.
//!
//! Paused timers keep their remaining time. Cancelled timers never fire.

use std::collections::HashMap;

/// Slack for float accumulation across many small ticks
const FIRE_EPSILON: f32 = 1e-5;

/// Handle to one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[derive(Debug)]
struct Timer<K> {
    key: K,
    remaining: f32,
    paused: bool,
}

/// Timers keyed by caller-defined payload `K`
#[derive(Debug)]
pub struct TimerQueue<K> {
    timers: HashMap<TimerId, Timer<K>>,
    next_id: u64,
}

impl<K: Clone> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
            next_id: 1,
        }
    }

    /// Schedule `key` to fire `after` seconds from now
    pub fn schedule(&mut self, after: f32, key: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(
            id,
            Timer {
                key,
                remaining: after.max(0.0),
                paused: false,
            },
        );
        id
    }

    /// Freeze a timer; returns false if it no longer exists
    pub fn pause(&mut self, id: TimerId) -> bool {
        match self.timers.get_mut(&id) {
            Some(timer) => {
                timer.paused = true;
                true
            }
            None => false,
        }
    }

    pub fn resume(&mut self, id: TimerId) -> bool {
        match self.timers.get_mut(&id) {
            Some(timer) => {
                timer.paused = false;
                true
            }
            None => false,
        }
    }

    /// Remove a timer; returns its key if it was still pending
    pub fn cancel(&mut self, id: TimerId) -> Option<K> {
        self.timers.remove(&id).map(|t| t.key)
    }

    /// Seconds left before the timer fires
    pub fn remaining(&self, id: TimerId) -> Option<f32> {
        self.timers.get(&id).map(|t| t.remaining)
    }

    pub fn is_paused(&self, id: TimerId) -> bool {
        self.timers.get(&id).map(|t| t.paused).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Move time forward by `dt` seconds and collect every timer that fell due
    ///
    /// Timers that were due earliest come first; ties keep scheduling order.
    pub fn advance(&mut self, dt: f32) -> Vec<(TimerId, K)> {
        let dt = dt.max(0.0);
        let mut due: Vec<(f32, TimerId)> = Vec::new();

        for (id, timer) in self.timers.iter_mut() {
            if timer.paused {
                continue;
            }
            timer.remaining -= dt;
            if timer.remaining <= FIRE_EPSILON {
                due.push((timer.remaining, *id));
            }
        }

        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        due.into_iter()
            .filter_map(|(_, id)| self.timers.remove(&id).map(|t| (id, t.key)))
            .collect()
    }
}

impl<K: Clone> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_delay() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule(1.0, "a");

        assert!(queue.advance(0.5).is_empty());
        assert!((queue.remaining(id).unwrap() - 0.5).abs() < 1e-6);

        let fired = queue.advance(0.5);
        assert_eq!(fired, vec![(id, "a")]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_due_order() {
        let mut queue = TimerQueue::new();
        let late = queue.schedule(0.9, "late");
        let early = queue.schedule(0.2, "early");
        let fired = queue.advance(1.0);
        assert_eq!(fired, vec![(early, "early"), (late, "late")]);
    }

    #[test]
    fn test_pause_keeps_remaining() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule(1.0, 7u32);
        queue.advance(0.25);
        assert!(queue.pause(id));
        assert!(queue.advance(5.0).is_empty());
        assert!((queue.remaining(id).unwrap() - 0.75).abs() < 1e-6);

        queue.resume(id);
        assert_eq!(queue.advance(0.75).len(), 1);
    }

    #[test]
    fn test_cancel() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule(0.1, ());
        assert_eq!(queue.cancel(id), Some(()));
        assert!(queue.advance(1.0).is_empty());
        assert!(!queue.pause(id));
    }

    #[test]
    fn test_small_ticks_accumulate() {
        let mut queue = TimerQueue::new();
        queue.schedule(1.0, ());
        let mut fired = 0;
        for _ in 0..100 {
            fired += queue.advance(0.01).len();
        }
        assert_eq!(fired, 1);
    }
}
