use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(50);

/// Server-confirmed base total plus the increments not yet confirmed.
///
/// The displayed total is always `base_total + local_delta` outside of a
/// flush attempt. The buffer is a rate limiter, not a debouncer: attempts
/// inside the cooldown window are dropped, never queued.
#[derive(Debug, Clone)]
pub struct ScoreBuffer {
    base_total: u64,
    local_delta: u64,
    cooldown: Duration,
    last_accept: Option<Instant>,
}

/// A delta moved out of the buffer for one flush attempt.
///
/// The ticket is a linear token: it has to end up in exactly one of
/// [`ScoreBuffer::confirm`], [`ScoreBuffer::restore`] or, on process
/// teardown only, [`ScoreBuffer::abandon`].
#[derive(Debug)]
#[must_use = "a flush ticket must be confirmed, restored, or abandoned"]
pub struct FlushTicket {
    delta: u64,
}

impl FlushTicket {
    pub fn delta(&self) -> u64 {
        self.delta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub base_total: u64,
    pub local_delta: u64,
    pub displayed_total: u64,
}

impl ScoreBuffer {
    pub fn new(initial_total: u64, cooldown: Duration) -> Self {
        Self {
            base_total: initial_total,
            local_delta: 0,
            cooldown,
            last_accept: None,
        }
    }

    pub fn base_total(&self) -> u64 {
        self.base_total
    }

    pub fn local_delta(&self) -> u64 {
        self.local_delta
    }

    pub fn displayed_total(&self) -> u64 {
        self.base_total + self.local_delta
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            base_total: self.base_total,
            local_delta: self.local_delta,
            displayed_total: self.displayed_total(),
        }
    }

    /// Accepts one increment iff the cooldown has elapsed since the last
    /// accepted one. Returns whether the increment was accepted.
    pub fn try_increment(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accept {
            if now.duration_since(last) < self.cooldown {
                return false;
            }
        }
        self.last_accept = Some(now);
        self.local_delta += 1;
        true
    }

    /// Moves up to `max_batch` out of the buffer for one flush attempt, or
    /// `None` when there is nothing to send. New increments keep accumulating
    /// in `local_delta` while the ticket is outstanding.
    pub fn begin_flush(&mut self, max_batch: u64) -> Option<FlushTicket> {
        if self.local_delta == 0 {
            return None;
        }
        let delta = self.local_delta.min(max_batch.max(1));
        self.local_delta -= delta;
        Some(FlushTicket { delta })
    }

    /// The authority confirmed the flush: its total supersedes ours, which
    /// also heals any drift from other devices or server-side corrections.
    pub fn confirm(&mut self, ticket: FlushTicket, total: u64) {
        let _ = ticket;
        self.base_total = total;
    }

    /// The flush did not arrive; fold the delta back in. Additive, since the
    /// buffer may have accrued new increments during the attempt.
    pub fn restore(&mut self, ticket: FlushTicket) {
        self.local_delta += ticket.delta;
    }

    /// Teardown only: the delta was handed to an unconfirmed transport and
    /// its delivery will never be observed.
    pub fn abandon(&mut self, ticket: FlushTicket) {
        let _ = ticket;
    }
}
