//! The future event set: every attached trace, merged in date order.

use crate::error::TraceError;
use crate::trace::Trace;
use indexmap::IndexMap;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::trace;
use weir_core::{ResourceHandle, StreamId, TraceEvent};

#[derive(Clone, Debug)]
struct Stream {
    resource: ResourceHandle,
    trace: Trace,
    start: f64,
    index: usize,
    lap: u64,
    laps: Option<u64>,
}

impl Stream {
    fn date_of(&self, lap: u64, index: usize) -> Option<f64> {
        let offset = self.trace.offset(index)?;
        let period = self.trace.period().unwrap_or(0.0);
        Some(self.start + lap as f64 * period + offset)
    }

    /// Move to the next point; returns its date, or `None` once exhausted.
    fn advance(&mut self) -> Option<f64> {
        self.index += 1;
        if self.index >= self.trace.len() {
            self.trace.period()?;
            let next_lap = self.lap + 1;
            if self.laps.is_some_and(|laps| next_lap >= laps) {
                return None;
            }
            self.lap = next_lap;
            self.index = 0;
        }
        self.date_of(self.lap, self.index)
    }
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    date: f64,
    seq: u64,
    stream: StreamId,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.date
            .total_cmp(&other.date)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Pending external events from every attached trace.
///
/// Each stream keeps exactly one entry in a min-heap keyed by
/// `(date, scheduling sequence)`, so events at the same date come out in
/// the order they were scheduled, identically on every run.
#[derive(Clone, Debug, Default)]
pub struct History {
    streams: IndexMap<StreamId, Stream>,
    queue: BinaryHeap<Reverse<Pending>>,
    next_stream: u64,
    next_seq: u64,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `trace` to `resource`, starting at `start_date`.
    ///
    /// `loop_count` bounds how many times a periodic trace plays (`None`
    /// plays it forever). One-shot traces play once whatever the count.
    pub fn add_trace(
        &mut self,
        resource: ResourceHandle,
        trace: Trace,
        start_date: f64,
        loop_count: Option<u64>,
    ) -> Result<StreamId, TraceError> {
        if !start_date.is_finite() || start_date < 0.0 {
            return Err(TraceError::InvalidStartDate { start: start_date });
        }
        if loop_count == Some(0) {
            return Err(TraceError::ZeroLoopCount);
        }
        let id = StreamId(self.next_stream);
        self.next_stream += 1;
        let stream = Stream {
            resource,
            trace,
            start: start_date,
            index: 0,
            lap: 0,
            laps: loop_count,
        };
        if let Some(date) = stream.date_of(0, 0) {
            self.schedule(id, date);
            self.streams.insert(id, stream);
        }
        trace!(stream = %id, %resource, start_date, "trace attached");
        Ok(id)
    }

    /// Detach a stream; its pending event is dropped. Returns whether the
    /// stream was still live.
    pub fn remove_stream(&mut self, id: StreamId) -> bool {
        if self.streams.shift_remove(&id).is_none() {
            return false;
        }
        self.queue.retain(|Reverse(p)| p.stream != id);
        true
    }

    /// Date of the earliest pending event.
    pub fn next_date(&self) -> Option<f64> {
        self.queue.peek().map(|Reverse(p)| p.date)
    }

    /// Remove and return every event dated at or before `date`, in date
    /// order. Periodic streams re-schedule their next occurrence, which is
    /// returned too if it also falls at or before `date`.
    pub fn pop_events_leq(&mut self, date: f64) -> Vec<TraceEvent> {
        let mut events = Vec::new();
        while let Some(Reverse(head)) = self.queue.peek().copied() {
            if head.date > date {
                break;
            }
            self.queue.pop();
            let Some(stream) = self.streams.get_mut(&head.stream) else {
                continue;
            };
            let value = stream.trace.points()[stream.index].value;
            events.push(TraceEvent {
                date: head.date,
                resource: stream.resource,
                value,
            });
            match stream.advance() {
                Some(next) => self.schedule(head.stream, next),
                None => {
                    self.streams.shift_remove(&head.stream);
                }
            }
        }
        events
    }

    /// Number of streams with events still to come.
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no event is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn schedule(&mut self, stream: StreamId, date: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Pending { date, seq, stream }));
    }
}
