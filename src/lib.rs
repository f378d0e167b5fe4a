//! CORSO - course video player engine library
//!
//! Re-exports the engine surface for binary targets and embedding hosts.

// Core engine (playback, session orchestration, timers, events)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod platform;
pub mod shell;
pub mod utils;

// Re-export commonly used types from core
pub use crate::core::event_bus::{BoxedEvent, EventBus, EventEmitter, downcast_event};
pub use crate::core::media::{MediaBackend, MediaInfo, MediaLoadError, StaticMedia};
pub use crate::core::playback::{
    LoadState, PlaybackController, PlaybackRate, PlaybackState, VideoQuality,
};
pub use crate::core::session::{ContentTab, CourseSession, SessionConfig};

// Re-export entities and platform seams
pub use crate::entities::{
    Catalog, CatalogError, Course, CourseId, Curriculum, JsonCatalog, Module, ModuleId,
    ModuleProgress, Video, VideoId,
};
pub use crate::platform::{Fullscreen, Notifier, Platform, Storage, ToastKind, Translator};
