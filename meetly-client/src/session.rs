//! Live meeting session tracker
//!
//! After joining, two independent timers run until the session is left or
//! dropped:
//! - a tick timer (default 1s) advancing the locally counted elapsed time,
//!   seeded with the participant's server-side duration;
//! - a refresh timer (default 10s) re-fetching the meeting so the
//!   participant list reflects server state.
//!
//! Each timer owns the sending half of its own watch channel. Between
//! refreshes the elapsed value is a local estimate; the server's duration
//! becomes authoritative again on leave.

use meetly_common::api::JoinMeetingResponse;
use meetly_common::config::TrackerSection;
use meetly_common::db::{Meeting, MeetingParticipant, MeetingWithParticipants};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::MeetingApi;
use crate::error::Result;

/// Timer periods for a [`MeetingSession`]
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Elapsed counter period (default: 1s)
    pub tick: Duration,
    /// Meeting refresh period (default: 10s)
    pub refresh: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            refresh: Duration::from_secs(10),
        }
    }
}

impl From<&TrackerSection> for SessionConfig {
    fn from(tracker: &TrackerSection) -> Self {
        Self {
            tick: Duration::from_millis(tracker.tick_interval_ms.max(1)),
            refresh: Duration::from_secs(tracker.refresh_interval_secs.max(1)),
        }
    }
}

/// A joined meeting with its running timers
pub struct MeetingSession {
    api: Arc<dyn MeetingApi>,
    meeting: Meeting,
    participant: MeetingParticipant,
    room_token: String,
    elapsed: watch::Receiver<u64>,
    snapshot: watch::Receiver<Option<MeetingWithParticipants>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl MeetingSession {
    /// Join the meeting with `code` and start both timers.
    ///
    /// A failed join returns the error and starts nothing.
    pub async fn join(api: Arc<dyn MeetingApi>, code: &str, config: SessionConfig) -> Result<Self> {
        let JoinMeetingResponse {
            token,
            meeting,
            participant,
        } = api.join(code).await?;

        let initial = participant.duration_in_secs.max(0) as u64;
        info!(
            "Joined meeting {} ({}) with {}s already attended",
            meeting.code, meeting.title, initial
        );

        let (elapsed_tx, elapsed) = watch::channel(initial);
        let (snapshot_tx, snapshot) = watch::channel(None);
        let cancel = CancellationToken::new();

        let tasks = vec![
            spawn_tick(config.tick, initial, elapsed_tx, cancel.clone()),
            spawn_refresh(
                config.refresh,
                Arc::clone(&api),
                meeting.code.clone(),
                snapshot_tx,
                cancel.clone(),
            ),
        ];

        Ok(Self {
            api,
            meeting,
            participant,
            room_token: token,
            elapsed,
            snapshot,
            cancel,
            tasks,
        })
    }

    pub fn meeting(&self) -> &Meeting {
        &self.meeting
    }

    /// Participant row as returned by the join call
    pub fn participant(&self) -> &MeetingParticipant {
        &self.participant
    }

    /// Media-room token for the real-time transport
    pub fn room_token(&self) -> &str {
        &self.room_token
    }

    /// Locally counted attended seconds
    pub fn elapsed(&self) -> u64 {
        *self.elapsed.borrow()
    }

    pub fn subscribe_elapsed(&self) -> watch::Receiver<u64> {
        self.elapsed.clone()
    }

    /// Latest meeting state fetched by the refresh timer
    pub fn snapshot(&self) -> Option<MeetingWithParticipants> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<Option<MeetingWithParticipants>> {
        self.snapshot.clone()
    }

    /// Stop both timers, then send the leave request.
    ///
    /// Consumes the session, so exactly one leave is sent. A failed leave is
    /// returned as is; the timers are already stopped.
    pub async fn leave(mut self) -> Result<MeetingParticipant> {
        self.stop_timers().await;
        let left = self.api.leave(&self.meeting.code).await?;
        info!(
            "Left meeting {} after {}s attended",
            self.meeting.code, left.duration_in_secs
        );
        Ok(left)
    }

    async fn stop_timers(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Session timer ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for MeetingSession {
    fn drop(&mut self) {
        if !self.tasks.is_empty() {
            debug!("Session for {} dropped without leaving", self.meeting.code);
        }
        self.cancel.cancel();
    }
}

fn spawn_tick(
    period: Duration,
    initial: u64,
    elapsed_tx: watch::Sender<u64>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let period_ms = period.as_millis() as u64;
    tokio::spawn(async move {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {
                    ticks += 1;
                    elapsed_tx.send_replace(initial + ticks * period_ms / 1000);
                }
            }
        }
    })
}

fn spawn_refresh(
    period: Duration,
    api: Arc<dyn MeetingApi>,
    code: String,
    snapshot_tx: watch::Sender<Option<MeetingWithParticipants>>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // First tick completes immediately, giving an initial snapshot
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            let fetched = tokio::select! {
                _ = cancel.cancelled() => break,
                fetched = api.meeting(&code) => fetched,
            };

            match fetched {
                Ok(meeting) => {
                    debug!(
                        "Refreshed {}: {} active participants",
                        code,
                        meeting.active_count()
                    );
                    snapshot_tx.send_replace(Some(meeting));
                }
                Err(e) => warn!("Refresh of meeting {} failed, keeping last state: {}", code, e),
            }
        }
    })
}
