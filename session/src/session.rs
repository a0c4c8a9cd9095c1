use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use counter::input::InputEvent;
use counter::press::PressState;
use counter::score::{FlushTicket, ScoreSnapshot};
use counter::tap::TapCore;

use crate::config::SessionConfig;
use crate::remote::{ScoreAuthority, SyncError};

/// Sink for the displayed total. Optional: a session without one simply
/// skips rendering.
pub trait ScoreDisplay: Send {
    fn show_total(&mut self, total: u64);
}

/// Sink for the press visual. Shows one exclusive state at a time;
/// `PressState::None` means nothing is pressed.
pub trait PressDisplay: Send {
    fn show_pressed(&mut self, state: PressState);
}

/// First half of a flush attempt.
#[derive(Debug)]
pub enum FlushStart {
    /// A previous attempt is still outstanding; no new snapshot was taken.
    InFlight,
    /// Nothing buffered; no request should be issued.
    Clean,
    /// Snapshot taken and zeroed out of the buffer; the ticket now has to
    /// travel through the transport and back into `complete_flush`.
    Started(FlushTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    Clean,
    InFlight,
    Confirmed { total: u64 },
    Restored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub score: ScoreSnapshot,
    pub press: PressState,
    pub flush_in_flight: bool,
}

/// The reconciliation engine: one tap core, one authority, at most one flush
/// in flight.
///
/// The flush is split in two synchronous halves around the transport await,
/// so an embedder can keep feeding input while a request is outstanding and
/// the snapshot-and-zero still happens atomically on its thread.
pub struct TapSession<A: ScoreAuthority> {
    core: TapCore,
    authority: A,
    config: SessionConfig,
    flush_in_flight: bool,
    score_display: Option<Box<dyn ScoreDisplay>>,
    press_display: Option<Box<dyn PressDisplay>>,
}

impl<A: ScoreAuthority> TapSession<A> {
    pub fn new(config: SessionConfig, authority: A) -> Self {
        let config = config.sanitized();
        Self {
            core: TapCore::new(config.initial_score, config.cooldown),
            authority,
            config,
            flush_in_flight: false,
            score_display: None,
            press_display: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    pub fn set_score_display(&mut self, display: Box<dyn ScoreDisplay>) {
        self.score_display = Some(display);
        self.render_total();
    }

    pub fn set_press_display(&mut self, display: Box<dyn PressDisplay>) {
        self.press_display = Some(display);
        self.render_press();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            score: self.core.score().snapshot(),
            press: self.core.press(),
            flush_in_flight: self.flush_in_flight,
        }
    }

    pub fn handle_input(&mut self, event: InputEvent, at: Instant) {
        let activity = self.core.handle(event, at);
        if activity.scored {
            self.render_total();
        }
        if activity.press_changed {
            self.render_press();
        }
    }

    /// Takes the optimistic snapshot for one flush attempt, honoring the
    /// single-flight guard and the empty-buffer no-op.
    pub fn try_begin_flush(&mut self) -> FlushStart {
        if self.flush_in_flight {
            return FlushStart::InFlight;
        }
        match self.core.score_mut().begin_flush(self.config.max_batch) {
            Some(ticket) => {
                self.flush_in_flight = true;
                FlushStart::Started(ticket)
            }
            None => FlushStart::Clean,
        }
    }

    /// Second half: fold the transport result back into the buffer. The
    /// ticket either confirms or restores, and the total is re-rendered
    /// whatever happened.
    pub fn complete_flush(
        &mut self,
        ticket: FlushTicket,
        result: Result<u64, SyncError>,
    ) -> FlushOutcome {
        self.flush_in_flight = false;
        let delta = ticket.delta();
        let outcome = match result {
            Ok(total) => {
                debug!(delta, total, "score sync confirmed");
                self.core.score_mut().confirm(ticket, total);
                FlushOutcome::Confirmed { total }
            }
            Err(err) => {
                warn!(delta, %err, "score sync failed, delta kept buffered");
                self.core.score_mut().restore(ticket);
                FlushOutcome::Restored
            }
        };
        self.render_total();
        outcome
    }

    /// One whole reconciliation attempt, awaited.
    pub async fn flush(&mut self) -> FlushOutcome {
        match self.try_begin_flush() {
            FlushStart::InFlight => FlushOutcome::InFlight,
            FlushStart::Clean => FlushOutcome::Clean,
            FlushStart::Started(ticket) => {
                let result = self.authority.push_delta(ticket.delta()).await;
                self.complete_flush(ticket, result)
            }
        }
    }

    /// Teardown path: hand whatever is still buffered to the detached
    /// transport. Delivery is never confirmed; the loss bound is this
    /// one snapshot.
    pub fn unload(&mut self) {
        if let Some(ticket) = self.core.score_mut().begin_flush(self.config.max_batch) {
            debug!(delta = ticket.delta(), "unload, handing delta to detached send");
            self.authority.push_detached(ticket.delta());
            self.core.score_mut().abandon(ticket);
        }
    }

    pub fn render_now(&mut self) {
        self.render_total();
        self.render_press();
    }

    fn render_total(&mut self) {
        let total = self.core.score().displayed_total();
        if let Some(display) = &mut self.score_display {
            display.show_total(total);
        }
    }

    fn render_press(&mut self) {
        let press = self.core.press();
        if let Some(display) = &mut self.press_display {
            display.show_pressed(press);
        }
    }
}
