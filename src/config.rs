//! Application path configuration.
//!
//! Resolution order: CLI `--config-dir` override, then `CORSO_CONFIG_DIR`
//! environment variable, then the platform config/data directories.

use std::path::PathBuf;

use log::debug;

const APP_DIR: &str = "corso";

/// Resolved application directories.
#[derive(Debug, Clone)]
pub struct PathConfig {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl PathConfig {
    pub fn from_env_and_cli(cli_override: Option<PathBuf>) -> Self {
        if let Some(dir) = cli_override.or_else(|| std::env::var_os("CORSO_CONFIG_DIR").map(PathBuf::from)) {
            debug!("Using config dir override: {}", dir.display());
            return Self {
                config_dir: dir.clone(),
                data_dir: dir,
            };
        }

        let config_dir = dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        let data_dir = dirs_next::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self {
            config_dir,
            data_dir,
        }
    }
}

/// Create the application directories if missing.
pub fn ensure_dirs(paths: &PathConfig) -> std::io::Result<()> {
    std::fs::create_dir_all(&paths.config_dir)?;
    std::fs::create_dir_all(&paths.data_dir)?;
    Ok(())
}

pub fn config_file(name: &str, paths: &PathConfig) -> PathBuf {
    paths.config_dir.join(name)
}

pub fn data_file(name: &str, paths: &PathConfig) -> PathBuf {
    paths.data_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override_wins() {
        let dir = PathBuf::from("/tmp/corso-test-config");
        let paths = PathConfig::from_env_and_cli(Some(dir.clone()));
        assert_eq!(paths.config_dir, dir);
        assert_eq!(paths.data_dir, dir);
    }

    #[test]
    fn test_file_helpers_join() {
        let paths = PathConfig {
            config_dir: PathBuf::from("/cfg"),
            data_dir: PathBuf::from("/data"),
        };
        assert_eq!(config_file("a.json", &paths), PathBuf::from("/cfg/a.json"));
        assert_eq!(data_file("b.json", &paths), PathBuf::from("/data/b.json"));
    }
}
