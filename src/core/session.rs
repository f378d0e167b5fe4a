//! Course session: composes curriculum, playback controller and timers.
//!
//! This is the orchestration layer the host shell talks to. It resolves
//! video selection, marks completion, decides auto-advance, and guarantees
//! that timers scoped to a previous video never leak into the next one:
//!
//! - `select_video` cancels every pending task before scheduling anything
//!   for the new video.
//! - Every scheduled task is tagged with the video id active at schedule
//!   time; `tick` drops a due task whose tag no longer matches.
//!
//! Nothing here runs on its own thread. The host pumps `tick()` from its
//! loop; timer callbacks are just due tasks popped there.

use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::core::event_bus::EventBus;
use crate::core::media::MediaBackend;
use crate::core::playback::{LoadState, PlaybackController, PlaybackRate, VideoQuality};
use crate::core::scheduler::{TaskScheduler, TimerKind};
use crate::core::session_events::{
    AutoAdvanceScheduledEvent, ControlsHiddenEvent, CourseCompletedEvent, LoadStateChangedEvent,
    VideoCompletedEvent, VideoSelectedEvent,
};
use crate::entities::catalog::{CatalogError, Course, ModuleId, VideoId};
use crate::entities::curriculum::{Curriculum, ModuleProgress};
use crate::platform::{Platform, ToastKind};

/// Delay before a load resolves through the media backend.
pub const LOAD_RESOLVE_DELAY: Duration = Duration::from_millis(800);

/// Delay between completing a video and jumping to the next one.
pub const AUTO_ADVANCE_DELAY: Duration = Duration::from_millis(1500);

/// Content tab under the player. Selection resets to Overview on every
/// video change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentTab {
    #[default]
    Overview,
    Notes,
    Resources,
    Discussion,
}

impl ContentTab {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "overview" => Some(ContentTab::Overview),
            "notes" => Some(ContentTab::Notes),
            "resources" => Some(ContentTab::Resources),
            "discussion" => Some(ContentTab::Discussion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Auto-advance to the next video after a completion.
    pub autoplay: bool,
    pub load_delay: Duration,
    pub advance_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            load_delay: LOAD_RESOLVE_DELAY,
            advance_delay: AUTO_ADVANCE_DELAY,
        }
    }
}

pub struct CourseSession {
    curriculum: Curriculum,
    playback: PlaybackController,
    scheduler: TaskScheduler,
    bus: EventBus,
    media: Box<dyn MediaBackend>,
    platform: Platform,
    config: SessionConfig,
    active_tab: ContentTab,
}

impl CourseSession {
    /// Open a course: validate the catalog, hydrate persisted progress and
    /// select the first video.
    pub fn new(
        course: Course,
        media: Box<dyn MediaBackend>,
        platform: Platform,
        config: SessionConfig,
    ) -> Result<Self, CatalogError> {
        let curriculum = Curriculum::new(course, platform.storage.as_ref())?;
        info!(
            "Session opened: '{}' ({} modules, {}% complete)",
            curriculum.course().title,
            curriculum.course().modules.len(),
            curriculum.overall_progress()
        );

        let mut session = Self {
            curriculum,
            playback: PlaybackController::new(),
            scheduler: TaskScheduler::new(),
            bus: EventBus::new(),
            media,
            platform,
            config,
            active_tab: ContentTab::default(),
        };
        let first = session.curriculum.first_video();
        session.select_video(first);
        Ok(session)
    }

    // === Accessors ===

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn current_video_id(&self) -> Option<VideoId> {
        self.playback.current_video_id()
    }

    pub fn active_tab(&self) -> ContentTab {
        self.active_tab
    }

    pub fn autoplay(&self) -> bool {
        self.config.autoplay
    }

    pub fn set_autoplay(&mut self, autoplay: bool) {
        self.config.autoplay = autoplay;
        if !autoplay && self.scheduler.cancel_kind(TimerKind::AutoAdvance) {
            debug!("Autoplay disabled, pending auto-advance cancelled");
        }
    }

    pub fn module_progress(&self, module_id: ModuleId) -> Option<ModuleProgress> {
        self.curriculum.module_progress(module_id)
    }

    pub fn overall_progress(&self) -> u8 {
        self.curriculum.overall_progress()
    }

    // === Selection ===

    /// Make a video the active one. Cancels everything pending for the
    /// outgoing video first, then resets the controller and schedules the
    /// load. Unknown ids are a warned no-op.
    pub fn select_video(&mut self, id: VideoId) -> bool {
        let Some(location) = self.curriculum.find_video(id) else {
            warn!("select_video: video {} not in course", id);
            return false;
        };

        let cancelled = self.scheduler.cancel_all();
        if cancelled > 0 {
            trace!("Selection cancelled {} pending task(s)", cancelled);
        }

        self.playback.begin_load(id);
        self.active_tab = ContentTab::default();
        self.scheduler
            .schedule(TimerKind::LoadResolve, id, self.config.load_delay);

        self.bus.emit(VideoSelectedEvent {
            video_id: id,
            module_id: location.module_id,
        });
        self.bus.emit(LoadStateChangedEvent {
            video_id: id,
            state: LoadState::Loading,
        });
        true
    }

    /// Next video in curriculum order: following video in the same module,
    /// else the first video of the next module, else none (end of course).
    pub fn next_video(&self, from: VideoId) -> Option<VideoId> {
        let location = self.curriculum.find_video(from)?;
        let course = self.curriculum.course();
        let module = &course.modules[location.module_index];
        if location.video_index + 1 < module.videos.len() {
            return Some(module.videos[location.video_index + 1].id);
        }
        if location.module_index + 1 < course.modules.len() {
            return Some(course.modules[location.module_index + 1].videos[0].id);
        }
        None
    }

    // === Completion ===

    /// Mark the active video complete. Only a real transition (not a
    /// repeat) flushes progress, notifies, and - with autoplay on -
    /// schedules a single auto-advance.
    pub fn complete_current(&mut self) {
        let Some(id) = self.playback.current_video_id() else {
            warn!("complete_current: no active video");
            return;
        };
        if !self
            .curriculum
            .mark_complete(id, self.platform.storage.as_mut())
        {
            debug!("Video {} already complete, nothing to do", id);
            return;
        }

        let overall = self.curriculum.overall_progress();
        self.bus.emit(VideoCompletedEvent {
            video_id: id,
            overall_percent: overall,
        });
        self.platform
            .notifier
            .toast(ToastKind::Success, "Lesson completed");

        if overall == 100 {
            info!("Course '{}' completed", self.curriculum.course().title);
            self.bus.emit(CourseCompletedEvent {
                course_id: self.curriculum.course().id,
            });
            self.platform
                .notifier
                .toast(ToastKind::Success, "Course completed!");
        }

        if self.config.autoplay
            && let Some(next) = self.next_video(id)
        {
            self.scheduler
                .schedule(TimerKind::AutoAdvance, id, self.config.advance_delay);
            self.bus.emit(AutoAdvanceScheduledEvent { from: id, to: next });
            debug!("Auto-advance scheduled: {} → {}", id, next);
        }
    }

    // === Error recovery ===

    /// Retry a failed load. Returns false unless the active video is in the
    /// error state.
    pub fn retry(&mut self) -> bool {
        let Some(id) = self.playback.current_video_id() else {
            return false;
        };
        if !self.playback.begin_retry() {
            return false;
        }
        self.scheduler
            .schedule(TimerKind::LoadResolve, id, self.config.load_delay);
        self.bus.emit(LoadStateChangedEvent {
            video_id: id,
            state: LoadState::Loading,
        });
        true
    }

    // === Transport passthroughs ===

    pub fn toggle_play(&mut self) -> bool {
        self.playback.toggle_play()
    }

    pub fn seek(&mut self, time: f64) {
        self.playback.seek(time);
    }

    pub fn set_volume(&mut self, volume: i32) {
        self.playback.set_volume(volume);
    }

    pub fn toggle_mute(&mut self) {
        self.playback.toggle_mute();
    }

    pub fn set_playback_rate(&mut self, rate: PlaybackRate) {
        self.playback.set_playback_rate(rate);
    }

    pub fn set_quality(&mut self, quality: VideoQuality) {
        self.playback.set_quality(quality);
    }

    pub fn toggle_fullscreen(&mut self) {
        self.playback
            .toggle_fullscreen(self.platform.fullscreen.as_mut());
    }

    pub fn sync_fullscreen(&mut self) {
        self.playback
            .sync_fullscreen(self.platform.fullscreen.as_ref());
    }

    /// Pointer/keyboard activity reached the player chrome.
    pub fn activity(&mut self) {
        self.playback.activity();
    }

    pub fn set_active_tab(&mut self, tab: ContentTab) {
        self.active_tab = tab;
    }

    // === Tick ===

    /// Pump due timers. Call from the host loop.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Pump due timers against an explicit clock (tests drive this
    /// directly).
    pub fn tick_at(&mut self, now: Instant) {
        for task in self.scheduler.pop_due(now) {
            if Some(task.video) != self.playback.current_video_id() {
                trace!(
                    "Dropping stale {:?} timer tagged with video {}",
                    task.kind, task.video
                );
                continue;
            }
            match task.kind {
                TimerKind::LoadResolve => self.finish_load(task.video),
                TimerKind::AutoAdvance => {
                    if let Some(next) = self.next_video(task.video) {
                        info!("Auto-advancing: {} → {}", task.video, next);
                        self.select_video(next);
                    }
                }
                // Controls hiding is owned by the controller's own timer
                TimerKind::ControlsHide => {}
            }
        }

        if self.playback.tick_controls(now)
            && let Some(id) = self.playback.current_video_id()
        {
            self.bus.emit(ControlsHiddenEvent { video_id: id });
        }
    }

    /// Resolve the pending load through the media backend.
    fn finish_load(&mut self, id: VideoId) {
        let Some(video) = self.curriculum.video(id) else {
            warn!("finish_load: video {} vanished from curriculum", id);
            return;
        };
        match self.media.resolve(video) {
            Ok(info) => {
                self.playback.mark_ready(info);
                self.bus.emit(LoadStateChangedEvent {
                    video_id: id,
                    state: LoadState::Ready,
                });
            }
            Err(err) => {
                self.playback.mark_error(&err);
                self.platform
                    .notifier
                    .toast(ToastKind::Error, &format!("Failed to load video: {}", err));
                self.bus.emit(LoadStateChangedEvent {
                    video_id: id,
                    state: LoadState::Error,
                });
            }
        }
    }

    /// Tear down: cancel every pending timer. The session is inert
    /// afterwards but state remains readable.
    pub fn shutdown(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        debug!("Session shut down ({} pending task(s) cancelled)", cancelled);
    }

    #[cfg(test)]
    pub(crate) fn scheduler_mut(&mut self) -> &mut TaskScheduler {
        &mut self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use crate::core::event_bus::downcast_event;
    use crate::core::media::{MediaInfo, MediaLoadError, StaticMedia};
    use crate::entities::catalog::{ModuleId, demo_course};
    use crate::platform::MemoryStorage;

    /// Backend whose outcomes are scripted per resolve call; defaults to
    /// success once the script runs dry.
    struct ScriptedMedia {
        outcomes: RefCell<VecDeque<Result<f64, MediaLoadError>>>,
    }

    impl ScriptedMedia {
        fn new(outcomes: Vec<Result<f64, MediaLoadError>>) -> Self {
            Self {
                outcomes: RefCell::new(outcomes.into()),
            }
        }
    }

    impl MediaBackend for ScriptedMedia {
        fn resolve(
            &self,
            _video: &crate::entities::catalog::Video,
        ) -> Result<MediaInfo, MediaLoadError> {
            match self.outcomes.borrow_mut().pop_front() {
                Some(Ok(secs)) => Ok(MediaInfo {
                    duration_secs: secs,
                }),
                Some(Err(e)) => Err(e),
                None => Ok(MediaInfo {
                    duration_secs: 300.0,
                }),
            }
        }
    }

    fn session() -> CourseSession {
        CourseSession::new(
            demo_course(),
            Box::new(StaticMedia),
            Platform::headless(),
            SessionConfig::default(),
        )
        .unwrap()
    }

    fn session_with_media(media: Box<dyn MediaBackend>) -> CourseSession {
        let mut s = session();
        s.media = media;
        s
    }

    /// Fire everything currently pending, regardless of its delay.
    fn run_timers(session: &mut CourseSession) {
        session.tick_at(Instant::now() + Duration::from_secs(60));
    }

    fn selected_ids(session: &CourseSession) -> Vec<VideoId> {
        session
            .bus()
            .poll()
            .iter()
            .filter_map(|e| downcast_event::<VideoSelectedEvent>(e).map(|s| s.video_id))
            .collect()
    }

    #[test]
    fn test_opens_on_first_video_and_loads() {
        let mut s = session();
        assert_eq!(s.current_video_id(), Some(VideoId(1)));
        assert_eq!(s.playback().load_state(), LoadState::Loading);

        run_timers(&mut s);
        assert_eq!(s.playback().load_state(), LoadState::Ready);
        // "04:12" from the demo catalog
        assert_eq!(s.playback().duration(), 252.0);
    }

    #[test]
    fn test_rejects_malformed_course() {
        let mut course = demo_course();
        course.modules[0].videos.clear();
        let result = CourseSession::new(
            course,
            Box::new(StaticMedia),
            Platform::headless(),
            SessionConfig::default(),
        );
        assert!(matches!(result, Err(CatalogError::EmptyModule { .. })));
    }

    #[test]
    fn test_select_unknown_video_is_noop() {
        let mut s = session();
        assert!(!s.select_video(VideoId(42)));
        assert_eq!(s.current_video_id(), Some(VideoId(1)));
    }

    #[test]
    fn test_selection_resets_tab() {
        let mut s = session();
        s.set_active_tab(ContentTab::Discussion);
        s.select_video(VideoId(2));
        assert_eq!(s.active_tab(), ContentTab::Overview);
    }

    #[test]
    fn test_adjacency_within_and_across_modules() {
        let s = session();
        assert_eq!(s.next_video(VideoId(1)), Some(VideoId(2)));
        // Last of module 1 → first of module 2
        assert_eq!(s.next_video(VideoId(3)), Some(VideoId(4)));
        // Last of last module → terminal
        assert_eq!(s.next_video(VideoId(6)), None);
    }

    #[test]
    fn test_progress_after_two_completions() {
        let mut s = session();
        run_timers(&mut s);
        s.complete_current(); // video 1
        // Manual selection cancels the pending auto-advance from video 1
        s.select_video(VideoId(2));
        run_timers(&mut s);
        assert_eq!(s.current_video_id(), Some(VideoId(2)));
        s.complete_current();

        let m1 = s.module_progress(ModuleId(1)).unwrap();
        assert_eq!((m1.completed, m1.total, m1.percentage), (2, 3, 67));
        assert_eq!(s.overall_progress(), 33);
    }

    #[test]
    fn test_auto_advance_crosses_module_boundary() {
        let mut s = session();
        s.select_video(VideoId(3));
        run_timers(&mut s);
        assert_eq!(s.playback().load_state(), LoadState::Ready);

        s.complete_current();
        run_timers(&mut s); // fires the advance
        assert_eq!(s.current_video_id(), Some(VideoId(4)));
        run_timers(&mut s);
        assert_eq!(s.playback().load_state(), LoadState::Ready);
    }

    #[test]
    fn test_completion_is_idempotent_and_advance_fires_once() {
        let mut s = session();
        run_timers(&mut s);
        let _ = s.bus().poll();

        s.complete_current();
        s.complete_current();
        s.complete_current();

        let events = s.bus().poll();
        let completions = events
            .iter()
            .filter(|e| downcast_event::<VideoCompletedEvent>(e).is_some())
            .count();
        let advances = events
            .iter()
            .filter(|e| downcast_event::<AutoAdvanceScheduledEvent>(e).is_some())
            .count();
        assert_eq!(completions, 1);
        assert_eq!(advances, 1);
        assert_eq!(s.curriculum().completed_count(), 1);
    }

    #[test]
    fn test_stale_auto_advance_is_cancelled_by_selection() {
        let mut s = session();
        s.select_video(VideoId(3));
        run_timers(&mut s);
        s.complete_current(); // schedules advance to 4
        let _ = s.bus().poll();

        // User clicks video 6 before the advance fires
        s.select_video(VideoId(6));
        run_timers(&mut s);

        assert_eq!(s.current_video_id(), Some(VideoId(6)));
        assert_eq!(s.playback().load_state(), LoadState::Ready);
        // No spurious jump through 4
        assert_eq!(selected_ids(&s), vec![VideoId(6)]);
    }

    #[test]
    fn test_stale_tagged_timer_dropped_at_fire_time() {
        let mut s = session();
        s.select_video(VideoId(2));
        // A leftover task tagged with a video that is no longer active
        s.scheduler_mut()
            .schedule(TimerKind::AutoAdvance, VideoId(1), Duration::ZERO);
        run_timers(&mut s);
        // The stale advance (1 → 2) must not have re-selected anything
        assert_eq!(s.current_video_id(), Some(VideoId(2)));
        assert_eq!(s.playback().load_state(), LoadState::Ready);
    }

    #[test]
    fn test_autoplay_off_schedules_nothing() {
        let mut s = session();
        s.set_autoplay(false);
        run_timers(&mut s);
        s.complete_current();
        assert!(!s.scheduler_mut().is_pending(TimerKind::AutoAdvance));

        run_timers(&mut s);
        assert_eq!(s.current_video_id(), Some(VideoId(1)));
    }

    #[test]
    fn test_disabling_autoplay_cancels_pending_advance() {
        let mut s = session();
        run_timers(&mut s);
        s.complete_current();
        assert!(s.scheduler_mut().is_pending(TimerKind::AutoAdvance));
        s.set_autoplay(false);
        assert!(!s.scheduler_mut().is_pending(TimerKind::AutoAdvance));
    }

    #[test]
    fn test_load_error_then_retry_recovers() {
        let mut s = session_with_media(Box::new(ScriptedMedia::new(vec![
            Err(MediaLoadError::Network("connection reset".to_string())),
            Ok(622.0),
        ])));
        s.select_video(VideoId(5));
        run_timers(&mut s);
        assert_eq!(s.playback().load_state(), LoadState::Error);
        assert!(s.playback().error_msg().unwrap().contains("connection reset"));

        assert!(s.retry());
        assert_eq!(s.playback().load_state(), LoadState::Loading);
        run_timers(&mut s);
        assert_eq!(s.playback().load_state(), LoadState::Ready);
        assert_eq!(s.playback().duration(), 622.0);
    }

    #[test]
    fn test_retry_outside_error_state_is_rejected() {
        let mut s = session();
        assert!(!s.retry());
        run_timers(&mut s);
        assert!(!s.retry());
    }

    #[test]
    fn test_load_error_leaves_completion_untouched() {
        let mut s = session_with_media(Box::new(ScriptedMedia::new(vec![Ok(300.0)])));
        run_timers(&mut s);
        s.complete_current();
        let completed_before = s.curriculum().completed_count();

        s.scheduler_mut().cancel_all(); // drop the pending advance
        s.media = Box::new(ScriptedMedia::new(vec![Err(MediaLoadError::Unavailable)]));
        s.select_video(VideoId(2));
        run_timers(&mut s);
        assert_eq!(s.playback().load_state(), LoadState::Error);
        assert_eq!(s.curriculum().completed_count(), completed_before);
    }

    #[test]
    fn test_course_completed_event_on_last_video() {
        let mut s = session();
        s.set_autoplay(false);
        for id in 1..=6 {
            s.select_video(VideoId(id));
            run_timers(&mut s);
            s.complete_current();
        }
        assert_eq!(s.overall_progress(), 100);

        let events = s.bus().poll();
        let completed = events
            .iter()
            .filter(|e| downcast_event::<CourseCompletedEvent>(e).is_some())
            .count();
        assert_eq!(completed, 1);
    }

    #[test]
    fn test_progress_survives_session_restart() {
        use crate::platform::Storage as _;

        let mut first = session();
        run_timers(&mut first);
        first.complete_current();
        first.select_video(VideoId(2));
        run_timers(&mut first);
        first.complete_current();
        let raw = first.platform.storage.get("course_progress_1").unwrap();

        // Seed a fresh store with what the first session flushed
        let mut storage = MemoryStorage::new();
        storage.set("course_progress_1", &raw);
        let s = CourseSession::new(
            demo_course(),
            Box::new(StaticMedia),
            Platform {
                storage: Box::new(storage),
                ..Platform::headless()
            },
            SessionConfig::default(),
        )
        .unwrap();
        assert_eq!(s.curriculum().completed_count(), 2);
        assert_eq!(s.overall_progress(), 33);
    }

    #[test]
    fn test_controls_hidden_event_reaches_bus() {
        let mut s = session();
        run_timers(&mut s);
        s.toggle_play();
        s.activity();
        let _ = s.bus().poll();

        s.tick_at(Instant::now() + Duration::from_secs(10));
        let events = s.bus().poll();
        assert!(
            events
                .iter()
                .any(|e| downcast_event::<ControlsHiddenEvent>(e).is_some())
        );
        assert!(!s.playback().controls_visible());
    }

    #[test]
    fn test_shutdown_cancels_pending_timers() {
        let mut s = session();
        run_timers(&mut s);
        s.complete_current(); // pending advance
        s.shutdown();
        run_timers(&mut s);
        assert_eq!(s.current_video_id(), Some(VideoId(1)));
    }
}
