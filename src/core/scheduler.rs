//! Tagged, cancellable one-shot timers for the session tick loop.
//!
//! Everything time-driven in the engine (media-load resolution, auto-advance,
//! controls auto-hide) goes through this scheduler instead of raw timeouts:
//!
//! 1. Every task carries the video id that was active when it was scheduled.
//!    A task whose tag no longer matches the active video is dropped at fire
//!    time, so a late callback from a previous video is a guaranteed no-op.
//! 2. Scheduling a kind replaces any pending task of the same kind, which
//!    keeps the "at most one pending timer per kind" property structural.
//! 3. Nothing fires on its own - the owner pumps `pop_due()` from its tick.

use std::time::{Duration, Instant};

use log::trace;
use uuid::Uuid;

use crate::entities::catalog::VideoId;

/// What a scheduled task will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Media source resolution for the loading video.
    LoadResolve,
    /// Jump to the next video after a completion.
    AutoAdvance,
    /// Hide playback controls after inactivity.
    ControlsHide,
}

/// Cancellation handle returned by `schedule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle(Uuid);

/// A task that reached its deadline, popped by `pop_due`.
#[derive(Debug, Clone, Copy)]
pub struct DueTask {
    pub kind: TimerKind,
    pub video: VideoId,
    pub handle: TaskHandle,
}

#[derive(Debug)]
struct Entry {
    handle: TaskHandle,
    kind: TimerKind,
    video: VideoId,
    due_at: Instant,
}

#[derive(Debug, Default)]
pub struct TaskScheduler {
    pending: Vec<Entry>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task tagged with the given video. Replaces any pending
    /// task of the same kind (debounce behavior).
    pub fn schedule(&mut self, kind: TimerKind, video: VideoId, delay: Duration) -> TaskHandle {
        self.cancel_kind(kind);
        let handle = TaskHandle(Uuid::new_v4());
        trace!(
            "Scheduled {:?} for video {} in {}ms",
            kind,
            video,
            delay.as_millis()
        );
        self.pending.push(Entry {
            handle,
            kind,
            video,
            due_at: Instant::now() + delay,
        });
        handle
    }

    /// Cancel one task by handle. Returns whether it was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|e| e.handle != handle);
        before != self.pending.len()
    }

    /// Cancel the pending task of a kind, if any.
    pub fn cancel_kind(&mut self, kind: TimerKind) -> bool {
        let before = self.pending.len();
        self.pending.retain(|e| e.kind != kind);
        if before != self.pending.len() {
            trace!("Cancelled pending {:?}", kind);
            true
        } else {
            false
        }
    }

    /// Cancel everything tagged with a video. Returns how many were dropped.
    pub fn cancel_video(&mut self, video: VideoId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|e| e.video != video);
        let dropped = before - self.pending.len();
        if dropped > 0 {
            trace!("Cancelled {} task(s) for video {}", dropped, video);
        }
        dropped
    }

    /// Cancel all pending tasks. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.pending.iter().any(|e| e.kind == kind)
    }

    /// Tag of the pending task of a kind, if any.
    pub fn pending_video(&self, kind: TimerKind) -> Option<VideoId> {
        self.pending.iter().find(|e| e.kind == kind).map(|e| e.video)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every task whose deadline has passed, earliest
    /// deadline first. Tasks that are not yet due stay pending.
    pub fn pop_due(&mut self, now: Instant) -> Vec<DueTask> {
        let mut fired: Vec<Entry> = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due_at <= now {
                fired.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        fired.sort_by_key(|e| e.due_at);
        fired
            .into_iter()
            .map(|e| DueTask {
                kind: e.kind,
                video: e.video,
                handle: e.handle,
            })
            .collect()
    }
}
