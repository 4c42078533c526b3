//! The time-ordered event queue (spec §4.1).
//!
//! A min-heap keyed by `(sim_time, enqueue sequence)`. Two events sharing a
//! `sim_time` never reorder relative to each other — the sequence, assigned
//! under the queue's own lock, breaks the tie and gives strict FIFO within
//! a tick.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::clock::SimTime;
use crate::event::Event;

/// Fatal: the queue's 64-bit enqueue counter wrapped. Spec §4.1 calls 2^63
/// events per run unreachable in practice and treats this as an invariant
/// violation rather than a recoverable error.
#[derive(Debug, thiserror::Error)]
#[error("event queue sequence counter overflowed")]
pub struct SequenceOverflow;

#[derive(Debug)]
struct QueuedEvent {
    sim_time: SimTime,
    sequence: u64,
    event: Event,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.sim_time == other.sim_time && self.sequence == other.sequence
    }
}
impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.sim_time, self.sequence).cmp(&(other.sim_time, other.sequence))
    }
}

/// A time-ordered, FIFO-within-same-time queue of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<QueuedEvent>>,
    next_sequence: u64,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    /// Enqueue an event at its declared `sim_time`.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceOverflow`] if the 64-bit enqueue counter has been
    /// exhausted. Callers must treat this as fatal (spec §7,
    /// `InvariantViolation`).
    pub fn push(&mut self, event: Event) -> Result<(), SequenceOverflow> {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.checked_add(1).ok_or(SequenceOverflow)?;
        let sim_time = event.sim_time;
        self.heap.push(Reverse(QueuedEvent {
            sim_time,
            sequence,
            event,
        }));
        Ok(())
    }

    /// Drain and return every event with `sim_time <= now`, in heap order
    /// (ascending sim-time, then FIFO by enqueue sequence).
    pub fn drain_due(&mut self, now: SimTime) -> Vec<Event> {
        let mut due = Vec::new();
        while let Some(Reverse(top)) = self.heap.peek() {
            if top.sim_time > now {
                break;
            }
            let Reverse(queued) = self.heap.pop().expect("peeked element must pop");
            due.push(queued.event);
        }
        due
    }

    /// The sim-time of the next pending event, if any — used for idle
    /// pacing checks.
    #[must_use]
    pub fn peek_next_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|Reverse(q)| q.sim_time)
    }

    /// Returns `true` if no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
