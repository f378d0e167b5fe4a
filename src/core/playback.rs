//! Playback controller: transient media state for the active video.
//!
//! **Architecture**: the controller does NOT own the curriculum. It manages
//! playback state only (play/pause, volume/mute, seek, rate, quality,
//! fullscreen, controls visibility) plus the load state machine for whatever
//! video the session points it at.
//!
//! # Load state machine
//!
//! ```text
//! idle ──▶ loading ──▶ ready
//!             │  ▲
//!             ▼  │ retry()
//!            error
//! ```
//!
//! `loading` is entered the instant the active video id changes, discarding
//! whatever state was current; there is no explicit transition back to
//! `idle`. Errors are scoped to the current video only.
//!
//! # Transient vs. viewer state
//!
//! Per-video state (time, playing, load state, controls) is recreated on
//! every selection. Viewer preferences (volume, mute, rate, quality,
//! fullscreen) survive video changes, the same split as persistent settings
//! vs. runtime state elsewhere in the app.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::core::media::{MediaInfo, MediaLoadError};
use crate::core::scheduler::{TaskScheduler, TimerKind};
use crate::entities::catalog::VideoId;
use crate::platform::Fullscreen;

/// Inactivity window before playback controls hide.
pub const CONTROLS_HIDE_DELAY: Duration = Duration::from_secs(3);

const DEFAULT_VOLUME: u8 = 100;

/// Load state of the currently selected video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Playback speed multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackRate {
    X0_75,
    #[default]
    X1_0,
    X1_25,
    X1_5,
    X2_0,
}

impl PlaybackRate {
    pub const ALL: &[PlaybackRate] = &[
        PlaybackRate::X0_75,
        PlaybackRate::X1_0,
        PlaybackRate::X1_25,
        PlaybackRate::X1_5,
        PlaybackRate::X2_0,
    ];

    pub fn as_f32(self) -> f32 {
        match self {
            PlaybackRate::X0_75 => 0.75,
            PlaybackRate::X1_0 => 1.0,
            PlaybackRate::X1_25 => 1.25,
            PlaybackRate::X1_5 => 1.5,
            PlaybackRate::X2_0 => 2.0,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "0.75" => Some(PlaybackRate::X0_75),
            "1" | "1.0" => Some(PlaybackRate::X1_0),
            "1.25" => Some(PlaybackRate::X1_25),
            "1.5" => Some(PlaybackRate::X1_5),
            "2" | "2.0" => Some(PlaybackRate::X2_0),
            _ => None,
        }
    }
}

impl fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.as_f32())
    }
}

/// Stream quality selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoQuality {
    #[default]
    Q1080p,
    Q720p,
    Q480p,
    Q360p,
}

impl VideoQuality {
    pub const ALL: &[VideoQuality] = &[
        VideoQuality::Q1080p,
        VideoQuality::Q720p,
        VideoQuality::Q480p,
        VideoQuality::Q360p,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1080p" | "1080" => Some(VideoQuality::Q1080p),
            "720p" | "720" => Some(VideoQuality::Q720p),
            "480p" | "480" => Some(VideoQuality::Q480p),
            "360p" | "360" => Some(VideoQuality::Q360p),
            _ => None,
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VideoQuality::Q1080p => "1080p",
            VideoQuality::Q720p => "720p",
            VideoQuality::Q480p => "480p",
            VideoQuality::Q360p => "360p",
        };
        f.write_str(label)
    }
}

/// Read-only snapshot of playback state for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackState {
    pub current_video_id: Option<VideoId>,
    pub is_playing: bool,
    pub volume: u8,
    pub is_muted: bool,
    pub current_time: f64,
    pub duration: f64,
    pub playback_rate: PlaybackRate,
    pub quality: VideoQuality,
    pub is_fullscreen: bool,
    pub controls_visible: bool,
}

pub struct PlaybackController {
    current_video_id: Option<VideoId>,
    load_state: LoadState,
    error_msg: Option<String>,

    is_playing: bool,
    current_time: f64,
    duration: f64,

    volume: u8,
    is_muted: bool,
    /// Whether the current mute came from a zero-volume set (implicitly
    /// cleared by raising the volume) rather than an explicit toggle.
    muted_by_zero_volume: bool,
    /// Last non-zero volume, restored on explicit unmute.
    last_volume: u8,

    playback_rate: PlaybackRate,
    quality: VideoQuality,
    is_fullscreen: bool,

    controls_visible: bool,
    hide_timer: TaskScheduler,
    hide_delay: Duration,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::with_hide_delay(CONTROLS_HIDE_DELAY)
    }

    pub fn with_hide_delay(hide_delay: Duration) -> Self {
        Self {
            current_video_id: None,
            load_state: LoadState::Idle,
            error_msg: None,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            volume: DEFAULT_VOLUME,
            is_muted: false,
            muted_by_zero_volume: false,
            last_volume: DEFAULT_VOLUME,
            playback_rate: PlaybackRate::default(),
            quality: VideoQuality::default(),
            is_fullscreen: false,
            controls_visible: true,
            hide_timer: TaskScheduler::new(),
            hide_delay,
        }
    }

    // === Accessors ===

    pub fn current_video_id(&self) -> Option<VideoId> {
        self.current_video_id
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn error_msg(&self) -> Option<&str> {
        self.error_msg.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn playback_rate(&self) -> PlaybackRate {
        self.playback_rate
    }

    pub fn quality(&self) -> VideoQuality {
        self.quality
    }

    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_video_id: self.current_video_id,
            is_playing: self.is_playing,
            volume: self.volume,
            is_muted: self.is_muted,
            current_time: self.current_time,
            duration: self.duration,
            playback_rate: self.playback_rate,
            quality: self.quality,
            is_fullscreen: self.is_fullscreen,
            controls_visible: self.controls_visible,
        }
    }

    // === Load state machine ===

    /// Point the controller at a new video. Discards whatever load state was
    /// current and recreates the per-video transient state.
    pub fn begin_load(&mut self, video: VideoId) {
        self.hide_timer.cancel_all();
        self.current_video_id = Some(video);
        self.load_state = LoadState::Loading;
        self.error_msg = None;
        self.is_playing = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.controls_visible = true;
        trace!("Loading video {}", video);
    }

    /// Media source resolved. Ignored outside `loading` - a resolution that
    /// lost the race against a newer selection must not land.
    pub fn mark_ready(&mut self, info: MediaInfo) {
        if self.load_state != LoadState::Loading {
            trace!("mark_ready ignored in state {:?}", self.load_state);
            return;
        }
        self.duration = info.duration_secs.max(0.0);
        self.load_state = LoadState::Ready;
        debug!(
            "Video {:?} ready (duration {:.0}s)",
            self.current_video_id, self.duration
        );
    }

    /// Media source failed. Non-fatal, scoped to the current video.
    pub fn mark_error(&mut self, err: &MediaLoadError) {
        if self.load_state != LoadState::Loading {
            trace!("mark_error ignored in state {:?}", self.load_state);
            return;
        }
        self.load_state = LoadState::Error;
        self.error_msg = Some(err.to_string());
        self.is_playing = false;
        warn!("Video {:?} failed to load: {}", self.current_video_id, err);
    }

    /// `error → loading` on explicit retry. Returns false in any other state.
    pub fn begin_retry(&mut self) -> bool {
        if self.load_state != LoadState::Error {
            return false;
        }
        self.load_state = LoadState::Loading;
        self.error_msg = None;
        trace!("Retrying video {:?}", self.current_video_id);
        true
    }

    // === Transport ===

    /// Flip play/pause. No-op unless the video is ready; returns whether
    /// state changed. Pausing reveals the controls and stops the hide
    /// countdown; resuming restarts it.
    pub fn toggle_play(&mut self) -> bool {
        if self.load_state != LoadState::Ready {
            trace!("toggle_play ignored in state {:?}", self.load_state);
            return false;
        }
        self.is_playing = !self.is_playing;
        if self.is_playing {
            self.schedule_hide();
        } else {
            self.hide_timer.cancel_all();
            self.controls_visible = true;
        }
        trace!(
            "Video {:?} {}",
            self.current_video_id,
            if self.is_playing { "playing" } else { "paused" }
        );
        true
    }

    /// Set volume, clamped to [0, 100]. Volume zero forces mute; raising the
    /// volume after a zero-volume mute un-mutes. An explicit `toggle_mute`
    /// is independent and is NOT cleared by volume changes.
    pub fn set_volume(&mut self, volume: i32) {
        let clamped = volume.clamp(0, 100) as u8;
        if clamped as i32 != volume {
            trace!("Volume {} clamped to {}", volume, clamped);
        }
        self.volume = clamped;
        if clamped == 0 {
            self.is_muted = true;
            self.muted_by_zero_volume = true;
        } else {
            self.last_volume = clamped;
            if self.muted_by_zero_volume {
                self.is_muted = false;
                self.muted_by_zero_volume = false;
            }
        }
    }

    /// Explicit mute toggle, valid at any volume. Unmuting at volume zero
    /// restores the last non-zero volume.
    pub fn toggle_mute(&mut self) {
        if self.is_muted {
            self.is_muted = false;
            self.muted_by_zero_volume = false;
            if self.volume == 0 {
                self.volume = self.last_volume;
            }
        } else {
            self.is_muted = true;
            self.muted_by_zero_volume = false;
        }
    }

    /// Seek, clamped to [0, duration]. No-op unless ready.
    pub fn seek(&mut self, time: f64) {
        if self.load_state != LoadState::Ready {
            trace!("seek ignored in state {:?}", self.load_state);
            return;
        }
        if !time.is_finite() {
            warn!("seek: non-finite time {}", time);
            return;
        }
        self.current_time = time.clamp(0.0, self.duration);
    }

    pub fn set_playback_rate(&mut self, rate: PlaybackRate) {
        self.playback_rate = rate;
        trace!("Playback rate {}", rate);
    }

    pub fn set_quality(&mut self, quality: VideoQuality) {
        self.quality = quality;
        trace!("Quality {}", quality);
    }

    // === Fullscreen ===

    /// Flip fullscreen optimistically and delegate to the platform. If the
    /// platform rejects the request, fall back to whatever it reports.
    pub fn toggle_fullscreen(&mut self, platform: &mut dyn Fullscreen) {
        let want = !self.is_fullscreen;
        self.is_fullscreen = want;
        let accepted = if want {
            platform.enter()
        } else {
            platform.exit()
        };
        if !accepted {
            warn!("Fullscreen request rejected by platform");
            self.is_fullscreen = platform.is_active();
        }
    }

    /// Reconcile against the platform (e.g. the user pressed Esc outside the
    /// app's control).
    pub fn sync_fullscreen(&mut self, platform: &dyn Fullscreen) {
        let actual = platform.is_active();
        if actual != self.is_fullscreen {
            debug!("Reconciling fullscreen state: {} → {}", self.is_fullscreen, actual);
            self.is_fullscreen = actual;
        }
    }

    // === Controls auto-hide ===

    /// Pointer/keyboard activity: show controls and restart the hide
    /// countdown. The countdown only runs while playing; while paused the
    /// controls stay visible.
    pub fn activity(&mut self) {
        self.controls_visible = true;
        if self.is_playing
            && let Some(video) = self.current_video_id
        {
            self.hide_timer
                .schedule(TimerKind::ControlsHide, video, self.hide_delay);
        } else {
            self.hide_timer.cancel_all();
        }
    }

    fn schedule_hide(&mut self) {
        if let Some(video) = self.current_video_id {
            self.hide_timer
                .schedule(TimerKind::ControlsHide, video, self.hide_delay);
        }
    }

    /// Pump the hide countdown. Returns true if the controls were hidden on
    /// this tick. The tag check makes a countdown from a previous video a
    /// no-op even if it was somehow left pending.
    pub fn tick_controls(&mut self, now: Instant) -> bool {
        for task in self.hide_timer.pop_due(now) {
            if Some(task.video) == self.current_video_id && self.is_playing {
                self.controls_visible = false;
                trace!("Controls hidden for video {}", task.video);
                return true;
            }
            trace!("Dropping stale controls timer for video {}", task.video);
        }
        false
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}
