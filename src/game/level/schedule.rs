//! Delayed level tasks ("show feedback, then move on").
//!
//! Tasks are queued with a delay in seconds and handed back once the
//! accumulated frame time passes their fire time. Nothing sleeps; the owner
//! calls [`TaskScheduler::advance`] once per frame.

use std::{cmp::Reverse, collections::BinaryHeap};

use ordered_float::OrderedFloat;

#[derive(Debug)]
struct Entry<T> {
    fire_at: OrderedFloat<f32>,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl<T> Entry<T> {
    /// Earlier fire time first, then insertion order.
    fn key(&self) -> (OrderedFloat<f32>, u64) {
        (self.fire_at, self.seq)
    }
}

#[derive(Debug)]
pub struct TaskScheduler<T> {
    queue: BinaryHeap<Reverse<Entry<T>>>,
    now: f32,
    next_seq: u64,
}

impl<T> Default for TaskScheduler<T> {
    fn default() -> Self {
        Self {
            queue: BinaryHeap::new(),
            now: 0.0,
            next_seq: 0,
        }
    }
}

impl<T> TaskScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, delay_secs: f32, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Entry {
            fire_at: OrderedFloat(self.now + delay_secs.max(0.0)),
            seq,
            task,
        }));
    }

    /// Moves time forward and returns every task that became due, in fire order.
    pub fn advance(&mut self, delta_secs: f32) -> Vec<T> {
        self.now += delta_secs;

        let mut due = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|Reverse(entry)| entry.fire_at.0 <= self.now)
        {
            if let Some(Reverse(entry)) = self.queue.pop() {
                due.push(entry.task);
            }
        }
        due
    }

    pub fn cancel_all(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
