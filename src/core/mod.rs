//! Core engine modules - playback, orchestration, timers, events.
//!
//! Everything here is UI-agnostic and runs on the host's loop.

pub mod event_bus;
pub mod media;
pub mod playback;
pub mod scheduler;
pub mod session;
pub mod session_events;

// Re-exports for convenience
pub use event_bus::EventBus;
pub use media::{MediaBackend, MediaInfo, MediaLoadError, StaticMedia};
pub use playback::{LoadState, PlaybackController, PlaybackRate, PlaybackState, VideoQuality};
pub use scheduler::{TaskScheduler, TimerKind};
pub use session::{ContentTab, CourseSession, SessionConfig};
