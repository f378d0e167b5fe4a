//! Course catalog records and loading.
//!
//! Catalog data (course → ordered modules → ordered videos) is loaded once
//! per session and treated as immutable. Insertion order IS curriculum order.
//!
//! Completion status is never stored on these records - the curriculum keeps
//! it in a separate set so there is a single source of truth.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(CourseId);
id_newtype!(ModuleId);
id_newtype!(VideoId);

/// A single lesson video. Duration is a display label ("12:34"); the numeric
/// duration is resolved by the media backend at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub title: String,
    #[serde(rename = "duration")]
    pub duration_label: String,
}

/// An ordered group of videos within a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub instructor: String,
    pub modules: Vec<Module>,
}

impl Course {
    /// Total number of videos across all modules.
    pub fn video_count(&self) -> usize {
        self.modules.iter().map(|m| m.videos.len()).sum()
    }

    /// Fail-fast structural checks, run when the course enters a session.
    ///
    /// A course with zero modules or a module with zero videos makes the
    /// progress math undefined; duplicate video ids make adjacency and
    /// membership ambiguous. All three are configuration errors, not
    /// runtime cases to tolerate.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.modules.is_empty() {
            return Err(CatalogError::EmptyCourse { course: self.id });
        }
        let mut seen = std::collections::HashSet::new();
        for module in &self.modules {
            if module.videos.is_empty() {
                return Err(CatalogError::EmptyModule { module: module.id });
            }
            for video in &module.videos {
                if !seen.insert(video.id) {
                    return Err(CatalogError::DuplicateVideo { video: video.id });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("course {course} not found in catalog")]
    CourseNotFound { course: CourseId },

    #[error("course {course} has no modules")]
    EmptyCourse { course: CourseId },

    #[error("module {module} has no videos")]
    EmptyModule { module: ModuleId },

    #[error("duplicate video id {video} in catalog")]
    DuplicateVideo { video: VideoId },

    #[error("catalog file is empty")]
    EmptyCatalog,

    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read-only catalog source.
pub trait Catalog {
    fn course(&self, id: CourseId) -> Result<Course, CatalogError>;
}

/// Catalog backed by a JSON file: either a single course object or an array
/// of courses.
pub struct JsonCatalog {
    path: PathBuf,
    courses: Vec<Course>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    One(Course),
    Many(Vec<Course>),
}

impl JsonCatalog {
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let courses = match serde_json::from_str::<CatalogFile>(&raw)? {
            CatalogFile::One(course) => vec![course],
            CatalogFile::Many(courses) => courses,
        };
        if courses.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }
        debug!(
            "Loaded catalog {} ({} course(s))",
            path.display(),
            courses.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            courses,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First course in file order.
    pub fn first(&self) -> &Course {
        &self.courses[0]
    }
}

impl Catalog for JsonCatalog {
    fn course(&self, id: CourseId) -> Result<Course, CatalogError> {
        self.courses
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| {
                warn!("Course {} not in catalog {}", id, self.path.display());
                CatalogError::CourseNotFound { course: id }
            })
    }
}

/// Built-in demo course used when no catalog file is given.
pub fn demo_course() -> Course {
    let video = |id: u32, title: &str, duration: &str| Video {
        id: VideoId(id),
        title: title.to_string(),
        duration_label: duration.to_string(),
    };
    Course {
        id: CourseId(1),
        title: "Modern Web Development".to_string(),
        instructor: "Sarah Mitchell".to_string(),
        modules: vec![
            Module {
                id: ModuleId(1),
                title: "Getting Started".to_string(),
                videos: vec![
                    video(1, "Course Overview", "04:12"),
                    video(2, "Setting Up Your Environment", "11:38"),
                    video(3, "Your First Page", "09:05"),
                ],
            },
            Module {
                id: ModuleId(2),
                title: "Styling and Layout".to_string(),
                videos: vec![
                    video(4, "CSS Fundamentals", "13:47"),
                    video(5, "Flexbox in Practice", "10:22"),
                    video(6, "Responsive Design", "15:01"),
                ],
            },
        ],
    }
}
