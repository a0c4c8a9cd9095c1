use std::fmt;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::trace;

use counter::input::InputEvent;
use counter::score::FlushTicket;

use crate::remote::{ScoreAuthority, SyncError};
use crate::session::{FlushOutcome, FlushStart, SessionSnapshot, TapSession};

/// Commands serviced by the session task. Transport completions come back
/// through the same queue, which is what keeps snapshot-and-zero atomic:
/// the queue has a single consumer and both flush halves run synchronously
/// inside it.
enum Cmd {
    Input { event: InputEvent, at: Instant },
    Flush { respond: Option<oneshot::Sender<FlushOutcome>> },
    Navigate { respond: oneshot::Sender<String> },
    Unload { respond: oneshot::Sender<()> },
    Snapshot { respond: oneshot::Sender<SessionSnapshot> },
    FlushDone { result: Result<u64, SyncError> },
    Shutdown,
}

/// The session task has gone away (shut down or panicked).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClosed;

impl fmt::Display for SessionClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session is closed")
    }
}

impl std::error::Error for SessionClosed {}

/// Cheap clonable front for the session task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Cmd>,
}

impl SessionHandle {
    /// Feeds one raw input event. The timestamp is taken here, at intake,
    /// so queueing delays cannot distort the cooldown.
    pub fn input(&self, event: InputEvent) {
        let _ = self.tx.send(Cmd::Input {
            event,
            at: Instant::now(),
        });
    }

    /// Requests a flush and does not wait for it.
    pub fn trigger_flush(&self) {
        let _ = self.tx.send(Cmd::Flush { respond: None });
    }

    /// The page went hidden: best-effort flush, completion not guaranteed.
    pub fn hidden(&self) {
        self.trigger_flush();
    }

    /// Requests a flush and waits for its outcome.
    pub async fn flush(&self) -> Result<FlushOutcome, SessionClosed> {
        let (respond, rx) = oneshot::channel();
        self.tx
            .send(Cmd::Flush {
                respond: Some(respond),
            })
            .map_err(|_| SessionClosed)?;
        rx.await.map_err(|_| SessionClosed)
    }

    /// Completes a reconciliation attempt, then yields the leaderboard URL.
    /// The URL is only released once the attempt has resolved, so the
    /// authority is as current as it can be before the user leaves.
    pub async fn navigate_to_leaderboard(&self) -> Result<String, SessionClosed> {
        let (respond, rx) = oneshot::channel();
        self.tx
            .send(Cmd::Navigate { respond })
            .map_err(|_| SessionClosed)?;
        rx.await.map_err(|_| SessionClosed)
    }

    /// Page teardown: any buffered delta goes out through the detached
    /// transport. Returns once the beacon has been issued.
    pub async fn unload(&self) -> Result<(), SessionClosed> {
        let (respond, rx) = oneshot::channel();
        self.tx
            .send(Cmd::Unload { respond })
            .map_err(|_| SessionClosed)?;
        rx.await.map_err(|_| SessionClosed)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionClosed> {
        let (respond, rx) = oneshot::channel();
        self.tx
            .send(Cmd::Snapshot { respond })
            .map_err(|_| SessionClosed)?;
        rx.await.map_err(|_| SessionClosed)
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Cmd::Shutdown);
    }
}

/// Spawns the session task: one consumer servicing input, lifecycle
/// triggers and the periodic sync ticker.
pub fn spawn_session<A>(session: TapSession<A>) -> (SessionHandle, JoinHandle<()>)
where
    A: ScoreAuthority + Clone,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = SessionHandle { tx: tx.clone() };
    let join = tokio::spawn(run(session, rx, tx));
    (handle, join)
}

async fn run<A>(
    mut session: TapSession<A>,
    mut rx: mpsc::UnboundedReceiver<Cmd>,
    tx: mpsc::UnboundedSender<Cmd>,
) where
    A: ScoreAuthority + Clone,
{
    let interval = session.config().sync_interval;
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The in-flight ticket and whoever is waiting on its resolution.
    let mut pending: Option<FlushTicket> = None;
    let mut flush_waiters: Vec<oneshot::Sender<FlushOutcome>> = Vec::new();
    let mut nav_waiters: Vec<oneshot::Sender<String>> = Vec::new();

    session.render_now();

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else { break };
                match cmd {
                    Cmd::Input { event, at } => session.handle_input(event, at),
                    Cmd::Flush { respond } => {
                        start_flush(&mut session, &mut pending, &mut flush_waiters, respond, &tx);
                    }
                    Cmd::Navigate { respond } => {
                        if pending.is_some() {
                            // An attempt is already under way; navigation
                            // waits for that one instead of starting another.
                            nav_waiters.push(respond);
                        } else {
                            let _ = session.flush().await;
                            let _ = respond.send(session.config().leaderboard_url.clone());
                        }
                    }
                    Cmd::Unload { respond } => {
                        session.unload();
                        let _ = respond.send(());
                    }
                    Cmd::Snapshot { respond } => {
                        let _ = respond.send(session.snapshot());
                    }
                    Cmd::FlushDone { result } => {
                        if let Some(ticket) = pending.take() {
                            let outcome = session.complete_flush(ticket, result);
                            for waiter in flush_waiters.drain(..) {
                                let _ = waiter.send(outcome);
                            }
                            for waiter in nav_waiters.drain(..) {
                                let _ = waiter.send(session.config().leaderboard_url.clone());
                            }
                        }
                    }
                    Cmd::Shutdown => break,
                }
            }
            _ = ticker.tick() => {
                trace!("periodic sync tick");
                start_flush(&mut session, &mut pending, &mut flush_waiters, None, &tx);
            }
        }
    }
}

fn start_flush<A>(
    session: &mut TapSession<A>,
    pending: &mut Option<FlushTicket>,
    flush_waiters: &mut Vec<oneshot::Sender<FlushOutcome>>,
    respond: Option<oneshot::Sender<FlushOutcome>>,
    tx: &mpsc::UnboundedSender<Cmd>,
) where
    A: ScoreAuthority + Clone,
{
    match session.try_begin_flush() {
        FlushStart::InFlight => {
            if let Some(respond) = respond {
                let _ = respond.send(FlushOutcome::InFlight);
            }
        }
        FlushStart::Clean => {
            if let Some(respond) = respond {
                let _ = respond.send(FlushOutcome::Clean);
            }
        }
        FlushStart::Started(ticket) => {
            let delta = ticket.delta();
            *pending = Some(ticket);
            if let Some(respond) = respond {
                flush_waiters.push(respond);
            }
            // The transport await runs off-loop; input keeps flowing while
            // the request is in the air. Its completion re-enters the queue.
            let authority = session.authority().clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = authority.push_delta(delta).await;
                let _ = tx.send(Cmd::FlushDone { result });
            });
        }
    }
}
