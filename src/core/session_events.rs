//! Events the session publishes on the engine bus.
//!
//! These are the observable state transitions a host renders from: selection
//! changes, load-state changes, completions, and auto-advance scheduling.
//! All are plain `Clone + Debug` payloads; recover them from `poll()` with
//! [`crate::core::event_bus::downcast_event`].

use crate::core::playback::LoadState;
use crate::entities::catalog::{CourseId, ModuleId, VideoId};

/// A new video became the active one.
#[derive(Clone, Debug)]
pub struct VideoSelectedEvent {
    pub video_id: VideoId,
    pub module_id: ModuleId,
}

/// The active video's load state changed (loading/ready/error).
#[derive(Clone, Debug)]
pub struct LoadStateChangedEvent {
    pub video_id: VideoId,
    pub state: LoadState,
}

/// A video was marked complete for the first time.
#[derive(Clone, Debug)]
pub struct VideoCompletedEvent {
    pub video_id: VideoId,
    pub overall_percent: u8,
}

/// An auto-advance was scheduled from one video to the next.
#[derive(Clone, Debug)]
pub struct AutoAdvanceScheduledEvent {
    pub from: VideoId,
    pub to: VideoId,
}

/// Every video in the course is now complete.
#[derive(Clone, Debug)]
pub struct CourseCompletedEvent {
    pub course_id: CourseId,
}

/// Playback controls were auto-hidden after inactivity.
#[derive(Clone, Debug)]
pub struct ControlsHiddenEvent {
    pub video_id: VideoId,
}
