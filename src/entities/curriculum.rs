//! Curriculum tree: immutable catalog plus the growing set of completed
//! videos.
//!
//! **Architecture**: the curriculum owns the course records and the
//! completion set; it does NOT own the storage backend. Methods that flush
//! receive `&mut dyn Storage` from the session, which is the only writer.
//!
//! Completion is derived by membership test against the set - never
//! duplicated onto the `Video` records - and is append-only: there is no
//! "uncomplete" operation anywhere in the contract.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::entities::catalog::{CatalogError, Course, Module, ModuleId, Video, VideoId};
use crate::platform::Storage;

/// Where a video sits in the curriculum. Indices are positions in the
/// ordered module/video lists, used for adjacency lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoLocation {
    pub module_index: usize,
    pub video_index: usize,
    pub module_id: ModuleId,
}

/// Per-module completion summary for progress bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleProgress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

/// Persisted progress blob, stored under `course_progress_<courseId>`.
#[derive(Debug, Serialize, Deserialize)]
struct ProgressBlob {
    #[serde(rename = "completedVideoIds")]
    completed_video_ids: Vec<VideoId>,
}

pub struct Curriculum {
    course: Course,
    /// Video id → location, in curriculum order.
    index: IndexMap<VideoId, VideoLocation>,
    completed: BTreeSet<VideoId>,
    storage_key: String,
}

impl Curriculum {
    /// Build a curriculum for a validated course, hydrating completion from
    /// the persisted store.
    ///
    /// Fails only on structural catalog errors (empty course/module,
    /// duplicate ids). Malformed persisted data degrades to an empty set.
    pub fn new(course: Course, storage: &dyn Storage) -> Result<Self, CatalogError> {
        course.validate()?;

        let mut index = IndexMap::with_capacity(course.video_count());
        for (module_index, module) in course.modules.iter().enumerate() {
            for (video_index, video) in module.videos.iter().enumerate() {
                index.insert(
                    video.id,
                    VideoLocation {
                        module_index,
                        video_index,
                        module_id: module.id,
                    },
                );
            }
        }

        let storage_key = format!("course_progress_{}", course.id);
        let completed = Self::hydrate(storage.get(&storage_key), &index, &storage_key);
        debug!(
            "Curriculum ready: course {} ({} videos, {} already completed)",
            course.id,
            index.len(),
            completed.len()
        );

        Ok(Self {
            course,
            index,
            completed,
            storage_key,
        })
    }

    /// Decode the persisted blob. Malformed JSON or unknown video ids are
    /// warned about and dropped, never fatal.
    fn hydrate(
        raw: Option<String>,
        index: &IndexMap<VideoId, VideoLocation>,
        key: &str,
    ) -> BTreeSet<VideoId> {
        let Some(raw) = raw else {
            return BTreeSet::new();
        };
        let blob: ProgressBlob = match serde_json::from_str(&raw) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Persisted progress under '{}' is corrupt ({}), starting fresh", key, e);
                return BTreeSet::new();
            }
        };
        let mut set = BTreeSet::new();
        for id in blob.completed_video_ids {
            if index.contains_key(&id) {
                set.insert(id);
            } else {
                warn!("Persisted progress references unknown video {}, dropping", id);
            }
        }
        set
    }

    fn flush(&self, storage: &mut dyn Storage) {
        let blob = ProgressBlob {
            completed_video_ids: self.completed.iter().copied().collect(),
        };
        match serde_json::to_string(&blob) {
            Ok(json) => storage.set(&self.storage_key, &json),
            Err(e) => warn!("Failed to serialize progress: {}", e),
        }
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.course.modules.iter().find(|m| m.id == id)
    }

    pub fn video(&self, id: VideoId) -> Option<&Video> {
        let loc = self.find_video(id)?;
        Some(&self.course.modules[loc.module_index].videos[loc.video_index])
    }

    pub fn find_video(&self, id: VideoId) -> Option<VideoLocation> {
        self.index.get(&id).copied()
    }

    /// First video of the first module. Validation guarantees it exists.
    pub fn first_video(&self) -> VideoId {
        self.course.modules[0].videos[0].id
    }

    pub fn is_completed(&self, id: VideoId) -> bool {
        self.completed.contains(&id)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Mark a video complete. Idempotent: returns true only when the call
    /// actually changed state, so callers can react to real transitions
    /// (auto-advance) without firing on repeats. Flushes to storage on every
    /// real mutation.
    pub fn mark_complete(&mut self, id: VideoId, storage: &mut dyn Storage) -> bool {
        if !self.index.contains_key(&id) {
            warn!("mark_complete: video {} not in curriculum", id);
            return false;
        }
        if !self.completed.insert(id) {
            trace!("Video {} already completed", id);
            return false;
        }
        self.flush(storage);
        debug!(
            "Video {} completed ({}/{})",
            id,
            self.completed.len(),
            self.index.len()
        );
        true
    }

    /// Completion summary for one module.
    pub fn module_progress(&self, id: ModuleId) -> Option<ModuleProgress> {
        let module = self.module(id)?;
        let total = module.videos.len();
        let completed = module
            .videos
            .iter()
            .filter(|v| self.completed.contains(&v.id))
            .count();
        Some(ModuleProgress {
            completed,
            total,
            percentage: percent(completed, total),
        })
    }

    /// Overall completion over the flattened video list. A straight
    /// completed/total across all modules, so larger modules weigh more -
    /// NOT an average of per-module percentages.
    pub fn overall_progress(&self) -> u8 {
        percent(self.completed.len(), self.index.len())
    }
}

/// Integer percentage, rounding half-up.
fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::catalog::demo_course;
    use crate::platform::MemoryStorage;

    fn curriculum() -> (Curriculum, MemoryStorage) {
        let storage = MemoryStorage::new();
        let curriculum = Curriculum::new(demo_course(), &storage).unwrap();
        (curriculum, storage)
    }

    #[test]
    fn test_module_progress_rounds_half_up() {
        let (mut c, mut storage) = curriculum();
        assert!(c.mark_complete(VideoId(1), &mut storage));
        assert!(c.mark_complete(VideoId(2), &mut storage));

        // 2/3 completed = 66.67 → 67
        let progress = c.module_progress(ModuleId(1)).unwrap();
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.percentage, 67);

        // Overall is over all 6 videos: 2/6 = 33.3 → 33
        assert_eq!(c.overall_progress(), 33);
    }

    #[test]
    fn test_progress_bounds() {
        let (mut c, mut storage) = curriculum();
        assert_eq!(c.module_progress(ModuleId(1)).unwrap().percentage, 0);
        for id in 1..=6 {
            c.mark_complete(VideoId(id), &mut storage);
        }
        assert_eq!(c.module_progress(ModuleId(1)).unwrap().percentage, 100);
        assert_eq!(c.module_progress(ModuleId(2)).unwrap().percentage, 100);
        assert_eq!(c.overall_progress(), 100);
    }

    #[test]
    fn test_overall_is_not_average_of_modules() {
        let mut course = demo_course();
        // Make module 2 much larger: 3 + 9 videos
        for i in 7..=12 {
            course.modules[1].videos.push(crate::entities::catalog::Video {
                id: VideoId(i),
                title: format!("Extra {}", i),
                duration_label: "05:00".to_string(),
            });
        }
        let mut storage = MemoryStorage::new();
        let mut c = Curriculum::new(course, &storage).unwrap();
        for id in 1..=3 {
            c.mark_complete(VideoId(id), &mut storage);
        }
        // Module 1 is 100%, module 2 is 0%. Average would say 50.
        assert_eq!(c.overall_progress(), 25); // 3/12
    }

    #[test]
    fn test_mark_complete_is_idempotent() {
        let (mut c, mut storage) = curriculum();
        assert!(c.mark_complete(VideoId(4), &mut storage));
        assert!(!c.mark_complete(VideoId(4), &mut storage));
        assert_eq!(c.completed_count(), 1);
    }

    #[test]
    fn test_mark_complete_unknown_video_is_noop() {
        let (mut c, mut storage) = curriculum();
        assert!(!c.mark_complete(VideoId(99), &mut storage));
        assert_eq!(c.completed_count(), 0);
    }

    #[test]
    fn test_find_video_locations() {
        let (c, _) = curriculum();
        let loc = c.find_video(VideoId(4)).unwrap();
        assert_eq!(loc.module_index, 1);
        assert_eq!(loc.video_index, 0);
        assert_eq!(loc.module_id, ModuleId(2));
        assert!(c.find_video(VideoId(99)).is_none());
    }

    #[test]
    fn test_progress_persists_and_rehydrates() {
        let mut storage = MemoryStorage::new();
        {
            let mut c = Curriculum::new(demo_course(), &storage).unwrap();
            c.mark_complete(VideoId(1), &mut storage);
            c.mark_complete(VideoId(5), &mut storage);
        }
        let raw = storage.get("course_progress_1").unwrap();
        assert!(raw.contains("completedVideoIds"));

        let c = Curriculum::new(demo_course(), &storage).unwrap();
        assert!(c.is_completed(VideoId(1)));
        assert!(c.is_completed(VideoId(5)));
        assert_eq!(c.completed_count(), 2);
    }

    #[test]
    fn test_corrupt_persisted_progress_degrades_to_empty() {
        let mut storage = MemoryStorage::new();
        storage.set("course_progress_1", "{broken!");
        let c = Curriculum::new(demo_course(), &storage).unwrap();
        assert_eq!(c.completed_count(), 0);
    }

    #[test]
    fn test_unknown_persisted_ids_are_dropped() {
        let mut storage = MemoryStorage::new();
        storage.set("course_progress_1", r#"{"completedVideoIds":[2,42,6]}"#);
        let c = Curriculum::new(demo_course(), &storage).unwrap();
        assert_eq!(c.completed_count(), 2);
        assert!(c.is_completed(VideoId(2)));
        assert!(!c.is_completed(VideoId(42)));
    }
}
