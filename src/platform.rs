//! Host capability seams: storage, fullscreen, notifications, translations.
//!
//! The engine never touches platform globals directly - everything it needs
//! from the host goes through these traits so the core stays testable
//! headlessly. Headless implementations are provided for all of them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

// ========== Persistent key-value storage ==========

/// Synchronous persistent key-value store. Progress is persisted here as a
/// flat JSON blob per course.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory store for tests and `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
    }
}

/// File-backed store: one JSON object per file, keys → string values.
///
/// Reads the whole file on open and rewrites it on every `set`. A missing or
/// malformed file degrades to an empty map - persistence problems are never
/// fatal to a session.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    map: HashMap<String, String>,
}

impl JsonFileStorage {
    pub fn open(path: PathBuf) -> Self {
        let map = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(
                        "Progress store {} is corrupt ({}), starting empty",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(_) => {
                debug!("No progress store at {}, starting empty", path.display());
                HashMap::new()
            }
        };
        Self { path, map }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) {
        match serde_json::to_string_pretty(&self.map) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    error!("Failed to write progress store {}: {}", self.path.display(), e);
                }
            }
            Err(e) => error!("Failed to serialize progress store: {}", e),
        }
    }
}

impl Storage for JsonFileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_string(), value.to_string());
        self.flush();
    }
}

// ========== Fullscreen capability ==========

/// Fullscreen capability abstraction. `enter`/`exit` return whether the
/// platform accepted the request; `is_active` is the reconciliation source
/// when the platform changes state behind the app's back (e.g. Esc).
pub trait Fullscreen {
    fn enter(&mut self) -> bool;
    fn exit(&mut self) -> bool;
    fn is_active(&self) -> bool;
}

/// Headless fullscreen: tracks a flag, always succeeds.
#[derive(Debug, Default)]
pub struct HeadlessFullscreen {
    active: bool,
}

impl HeadlessFullscreen {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fullscreen for HeadlessFullscreen {
    fn enter(&mut self) -> bool {
        self.active = true;
        true
    }

    fn exit(&mut self) -> bool {
        self.active = false;
        true
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

// ========== Toast notifications ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

/// Fire-and-forget user notification. Informational only - engine
/// correctness never depends on a toast being shown.
pub trait Notifier {
    fn toast(&self, kind: ToastKind, message: &str);
}

/// Routes toasts to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn toast(&self, kind: ToastKind, message: &str) {
        match kind {
            ToastKind::Info | ToastKind::Success => info!("[toast] {}", message),
            ToastKind::Error => warn!("[toast] {}", message),
        }
    }
}

// ========== Display text lookup ==========

/// Display-text lookup for the host UI. Unknown keys fall through to the key
/// itself so a missing entry is visible, not a crash.
pub trait Translator {
    fn text<'a>(&'a self, key: &'a str) -> &'a str;
}

/// Built-in English table.
#[derive(Debug, Default)]
pub struct StaticTranslator;

impl Translator for StaticTranslator {
    fn text<'a>(&'a self, key: &'a str) -> &'a str {
        match key {
            "player.playing" => "Playing",
            "player.paused" => "Paused",
            "player.loading" => "Loading...",
            "player.error" => "Playback error",
            "player.idle" => "No video",
            "player.muted" => "muted",
            "player.fullscreen" => "fullscreen",
            "course.progress" => "Course progress",
            "course.completed" => "Course completed!",
            "lesson.completed" => "Lesson completed",
            "shell.goodbye" => "Bye.",
            "shell.unknown" => "Unknown command (try 'help')",
            _ => key,
        }
    }
}

// ========== Bundle ==========

/// Host capabilities handed to a session.
pub struct Platform {
    pub storage: Box<dyn Storage>,
    pub fullscreen: Box<dyn Fullscreen>,
    pub notifier: Box<dyn Notifier>,
}

impl Platform {
    /// Everything in-process: memory storage, flag fullscreen, log toasts.
    pub fn headless() -> Self {
        Self {
            storage: Box::new(MemoryStorage::new()),
            fullscreen: Box::new(HeadlessFullscreen::new()),
            notifier: Box::new(LogNotifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_round_trip() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get("k"), None);
        storage.set("k", "v");
        assert_eq!(storage.get("k"), Some("v".to_string()));
        storage.set("k", "v2");
        assert_eq!(storage.get("k"), Some("v2".to_string()));
    }

    #[test]
    fn test_file_storage_survives_corrupt_file() {
        let dir = std::env::temp_dir().join("corso_test_storage");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("corrupt.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut storage = JsonFileStorage::open(path.clone());
        assert_eq!(storage.get("k"), None);

        storage.set("k", "v");
        let reopened = JsonFileStorage::open(path.clone());
        assert_eq!(reopened.get("k"), Some("v".to_string()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_headless_fullscreen_tracks_state() {
        let mut fs = HeadlessFullscreen::new();
        assert!(!fs.is_active());
        assert!(fs.enter());
        assert!(fs.is_active());
        assert!(fs.exit());
        assert!(!fs.is_active());
    }

    #[test]
    fn test_translator_falls_through_on_unknown_key() {
        let t = StaticTranslator;
        assert_eq!(t.text("player.paused"), "Paused");
        assert_eq!(t.text("no.such.key"), "no.such.key");
    }
}
