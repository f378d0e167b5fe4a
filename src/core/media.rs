//! Media source seam between the engine and a real playback backend.
//!
//! The engine never decodes anything. When a load-resolution timer fires,
//! the session asks the backend for the video's media metadata; the result
//! drives the `loading → ready | error` transition. A production backend
//! would wrap the platform media element / demuxer here and report its real
//! failures (network, codec) through [`MediaLoadError`].

use log::warn;

use crate::entities::catalog::Video;
use crate::utils::timecode;

/// Metadata the controller needs to present a loaded video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub duration_secs: f64,
}

/// Load failure scoped to a single video. Recoverable via `retry()`; never
/// affects completion state or other videos.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MediaLoadError {
    #[error("network error: {0}")]
    Network(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("media source unavailable")]
    Unavailable,
}

pub trait MediaBackend {
    fn resolve(&self, video: &Video) -> Result<MediaInfo, MediaLoadError>;
}

/// Deterministic backend that resolves duration from catalog metadata alone.
/// Never fails; an unparseable duration label degrades to zero with a
/// warning rather than a load error.
#[derive(Debug, Default)]
pub struct StaticMedia;

impl MediaBackend for StaticMedia {
    fn resolve(&self, video: &Video) -> Result<MediaInfo, MediaLoadError> {
        let duration_secs = match timecode::parse_label(&video.duration_label) {
            Some(secs) => secs,
            None => {
                warn!(
                    "Video {} has unparseable duration label '{}'",
                    video.id, video.duration_label
                );
                0.0
            }
        };
        Ok(MediaInfo { duration_secs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::catalog::{VideoId, demo_course};

    #[test]
    fn test_static_media_resolves_label() {
        let course = demo_course();
        let video = &course.modules[0].videos[0]; // "04:12"
        let info = StaticMedia.resolve(video).unwrap();
        assert_eq!(info.duration_secs, 252.0);
    }

    #[test]
    fn test_static_media_tolerates_bad_label() {
        let video = crate::entities::catalog::Video {
            id: VideoId(9),
            title: "Broken".to_string(),
            duration_label: "???".to_string(),
        };
        let info = StaticMedia.resolve(&video).unwrap();
        assert_eq!(info.duration_secs, 0.0);
    }
}
