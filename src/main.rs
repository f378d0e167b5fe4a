use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use corso::cli::Args;
use corso::config;
use corso::core::media::StaticMedia;
use corso::core::session::{CourseSession, SessionConfig};
use corso::entities::catalog::{Catalog, CourseId, JsonCatalog, VideoId, demo_course};
use corso::platform::{
    HeadlessFullscreen, JsonFileStorage, LogNotifier, MemoryStorage, Platform, StaticTranslator,
    Storage,
};
use corso::shell::Shell;
use log::{debug, info};

fn init_logging(args: &Args, paths: &config::PathConfig) {
    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        // File logging with the specified verbosity level
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file("corso.log", paths));

        let file = std::fs::File::create(&log_path).expect("Failed to create log file");

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!(
            "Logging to file: {} (level: {:?})",
            log_path.display(),
            log_level
        );
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
}

fn load_course(args: &Args) -> anyhow::Result<corso::entities::catalog::Course> {
    match &args.catalog {
        Some(path) => {
            let catalog = JsonCatalog::open(path)
                .with_context(|| format!("opening catalog {}", path.display()))?;
            let course = match args.course {
                Some(id) => catalog.course(CourseId(id))?,
                None => catalog.first().clone(),
            };
            info!("Opening course '{}' from {}", course.title, path.display());
            Ok(course)
        }
        None => {
            info!("No catalog given, using the built-in demo course");
            Ok(demo_course())
        }
    }
}

fn open_storage(args: &Args, paths: &config::PathConfig) -> Box<dyn Storage> {
    if args.ephemeral {
        debug!("Ephemeral run: progress kept in memory only");
        return Box::new(MemoryStorage::new());
    }
    let path: PathBuf = config::data_file("progress.json", paths);
    info!("Progress store: {}", path.display());
    Box::new(JsonFileStorage::open(path))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let paths = config::PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&paths) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    init_logging(&args, &paths);

    info!("Corso course player starting...");
    debug!("Command-line args: {:?}", args);
    info!("Config path: {}", paths.config_dir.display());
    info!("Data path: {}", paths.data_dir.display());

    let course = load_course(&args)?;

    let platform = Platform {
        storage: open_storage(&args, &paths),
        fullscreen: Box::new(HeadlessFullscreen::new()),
        notifier: Box::new(LogNotifier),
    };
    let session_config = SessionConfig {
        autoplay: !args.no_autoplay,
        ..SessionConfig::default()
    };

    let mut session = CourseSession::new(course, Box::new(StaticMedia), platform, session_config)
        .context("course failed validation")?;

    if let Some(id) = args.start_video
        && !session.select_video(VideoId(id))
    {
        eprintln!("Warning: video {} not found, starting from the beginning", id);
    }

    Shell::new(session, Box::new(StaticTranslator)).run()?;

    info!("Application exiting");
    Ok(())
}
