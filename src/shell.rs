//! Interactive transport shell driving a course session.
//!
//! A reader thread feeds stdin lines over a channel; the main loop ticks the
//! session at ~30Hz so timers (load resolution, auto-advance, controls
//! auto-hide) fire while the prompt is idle, and drains the event bus after
//! every pass.

use std::io::{BufRead, Write};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use log::debug;

use crate::core::event_bus::downcast_event;
use crate::core::playback::{LoadState, PlaybackRate, VideoQuality};
use crate::core::session::{ContentTab, CourseSession};
use crate::core::session_events::{
    AutoAdvanceScheduledEvent, CourseCompletedEvent, LoadStateChangedEvent, VideoCompletedEvent,
    VideoSelectedEvent,
};
use crate::entities::catalog::VideoId;
use crate::platform::Translator;
use crate::utils::timecode;

const TICK_INTERVAL: Duration = Duration::from_millis(33);

pub struct Shell {
    session: CourseSession,
    translator: Box<dyn Translator>,
}

impl Shell {
    pub fn new(session: CourseSession, translator: Box<dyn Translator>) -> Self {
        Self {
            session,
            translator,
        }
    }

    /// Run the interactive loop until `quit` or EOF.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.print_header();
        self.print_list();
        println!("Type 'help' for commands.");

        let lines = spawn_stdin_reader();
        self.prompt();

        loop {
            match lines.recv_timeout(TICK_INTERVAL) {
                Ok(line) => {
                    let keep_going = self.handle_command(line.trim());
                    self.session.tick();
                    self.drain_events();
                    if !keep_going {
                        break;
                    }
                    self.prompt();
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.session.tick();
                    self.drain_events();
                }
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("stdin closed, leaving shell loop");
                    break;
                }
            }
        }

        self.session.shutdown();
        println!("{}", self.translator.text("shell.goodbye"));
        Ok(())
    }

    fn prompt(&self) {
        print!("corso> ");
        let _ = std::io::stdout().flush();
    }

    /// Dispatch one command line. Returns false to leave the loop.
    pub fn handle_command(&mut self, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }
        // Any typed command counts as player activity
        self.session.activity();

        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or_default();
        let arg = parts.next();

        match cmd {
            "help" | "h" | "?" => self.print_help(),
            "list" | "l" => self.print_list(),
            "status" => self.print_status(),
            "progress" | "prog" => self.print_progress(),

            "select" | "s" => match arg.and_then(|a| a.parse::<u32>().ok()) {
                Some(id) => {
                    if !self.session.select_video(VideoId(id)) {
                        println!("No video with id {}", id);
                    }
                }
                None => println!("Usage: select <video-id>"),
            },
            "play" | "pause" | "p" => {
                if self.session.toggle_play() {
                    self.print_status();
                } else {
                    println!("{}", self.load_state_label());
                }
            }
            "seek" => match arg.and_then(parse_time) {
                Some(secs) => {
                    self.session.seek(secs);
                    self.print_status();
                }
                None => println!("Usage: seek <seconds|mm:ss>"),
            },
            "vol" | "volume" => match arg.and_then(|a| a.parse::<i32>().ok()) {
                Some(v) => {
                    self.session.set_volume(v);
                    self.print_status();
                }
                None => println!("Usage: vol <0-100>"),
            },
            "mute" | "m" => {
                self.session.toggle_mute();
                self.print_status();
            }
            "rate" => match arg.and_then(PlaybackRate::parse) {
                Some(rate) => {
                    self.session.set_playback_rate(rate);
                    self.print_status();
                }
                None => println!("Usage: rate <0.75|1|1.25|1.5|2>"),
            },
            "quality" | "q" => match arg.and_then(VideoQuality::parse) {
                Some(quality) => {
                    self.session.set_quality(quality);
                    self.print_status();
                }
                None => println!("Usage: quality <1080p|720p|480p|360p>"),
            },
            "fs" | "fullscreen" => {
                self.session.toggle_fullscreen();
                self.print_status();
            }
            "tab" => match arg.and_then(ContentTab::parse) {
                Some(tab) => self.session.set_active_tab(tab),
                None => println!("Usage: tab <overview|notes|resources|discussion>"),
            },
            "complete" | "c" => self.session.complete_current(),
            "next" | "n" => {
                let next = self
                    .session
                    .current_video_id()
                    .and_then(|id| self.session.next_video(id));
                match next {
                    Some(id) => {
                        self.session.select_video(id);
                    }
                    None => println!("End of course."),
                }
            }
            "retry" | "r" => {
                if !self.session.retry() {
                    println!("Nothing to retry.");
                }
            }
            "autoplay" => match arg {
                Some("on") => self.session.set_autoplay(true),
                Some("off") => self.session.set_autoplay(false),
                _ => println!(
                    "Autoplay is {}. Usage: autoplay <on|off>",
                    if self.session.autoplay() { "on" } else { "off" }
                ),
            },
            "quit" | "exit" => return false,
            _ => println!("{}", self.translator.text("shell.unknown")),
        }
        true
    }

    fn drain_events(&mut self) {
        for event in self.session.bus().poll() {
            if let Some(e) = downcast_event::<VideoSelectedEvent>(&event) {
                let title = self.video_title(e.video_id);
                println!("▶ Now on: {} (video {})", title, e.video_id);
                continue;
            }
            if let Some(e) = downcast_event::<LoadStateChangedEvent>(&event) {
                match e.state {
                    LoadState::Ready => {
                        let duration = self.session.playback().duration();
                        println!("  Ready ({})", timecode::format_secs(duration));
                    }
                    LoadState::Error => {
                        let msg = self
                            .session
                            .playback()
                            .error_msg()
                            .unwrap_or("unknown error");
                        println!(
                            "  {}: {} (type 'retry')",
                            self.translator.text("player.error"),
                            msg
                        );
                    }
                    LoadState::Loading => {
                        println!("  {}", self.translator.text("player.loading"));
                    }
                    LoadState::Idle => {}
                }
                continue;
            }
            if let Some(e) = downcast_event::<VideoCompletedEvent>(&event) {
                println!(
                    "✓ {} - {} {}%",
                    self.translator.text("lesson.completed"),
                    self.translator.text("course.progress"),
                    e.overall_percent
                );
                continue;
            }
            if let Some(e) = downcast_event::<AutoAdvanceScheduledEvent>(&event) {
                println!("  Up next: {}", self.video_title(e.to));
                continue;
            }
            if downcast_event::<CourseCompletedEvent>(&event).is_some() {
                println!("★ {}", self.translator.text("course.completed"));
            }
        }
    }

    fn video_title(&self, id: VideoId) -> String {
        self.session
            .curriculum()
            .video(id)
            .map(|v| v.title.clone())
            .unwrap_or_else(|| format!("video {}", id))
    }

    fn load_state_label(&self) -> &str {
        match self.session.playback().load_state() {
            LoadState::Idle => self.translator.text("player.idle"),
            LoadState::Loading => self.translator.text("player.loading"),
            LoadState::Ready => self.translator.text("player.paused"),
            LoadState::Error => self.translator.text("player.error"),
        }
    }

    fn print_header(&self) {
        let course = self.session.curriculum().course();
        println!("{} — {}", course.title, course.instructor);
    }

    fn print_list(&self) {
        let current = self.session.current_video_id();
        let curriculum = self.session.curriculum();
        for module in &curriculum.course().modules {
            let Some(progress) = curriculum.module_progress(module.id) else {
                continue;
            };
            println!("{} [{}%]", module.title, progress.percentage);
            for video in &module.videos {
                let done = if curriculum.is_completed(video.id) { "✓" } else { " " };
                let here = if current == Some(video.id) { "▶" } else { " " };
                println!(
                    " {}{} {:>3}  {}  ({})",
                    here, done, video.id, video.title, video.duration_label
                );
            }
        }
    }

    fn print_status(&self) {
        let playback = self.session.playback();
        let state = match playback.load_state() {
            LoadState::Ready if playback.is_playing() => self.translator.text("player.playing"),
            LoadState::Ready => self.translator.text("player.paused"),
            LoadState::Loading => self.translator.text("player.loading"),
            LoadState::Error => self.translator.text("player.error"),
            LoadState::Idle => self.translator.text("player.idle"),
        };
        let mut extras = String::new();
        if playback.is_muted() {
            extras.push_str(" [");
            extras.push_str(self.translator.text("player.muted"));
            extras.push(']');
        }
        if playback.is_fullscreen() {
            extras.push_str(" [");
            extras.push_str(self.translator.text("player.fullscreen"));
            extras.push(']');
        }
        println!(
            "{} {}/{} vol {} {} {}{}",
            state,
            timecode::format_secs(playback.current_time()),
            timecode::format_secs(playback.duration()),
            playback.volume(),
            playback.playback_rate(),
            playback.quality(),
            extras
        );
    }

    fn print_progress(&self) {
        let curriculum = self.session.curriculum();
        for module in &curriculum.course().modules {
            let Some(p) = curriculum.module_progress(module.id) else {
                continue;
            };
            println!(
                "{:<28} {:>2}/{} [{}%]",
                module.title, p.completed, p.total, p.percentage
            );
        }
        println!(
            "{}: {}%",
            self.translator.text("course.progress"),
            curriculum.overall_progress()
        );
    }

    fn print_help(&self) {
        println!("Commands:");
        println!("  list (l)            course outline with progress");
        println!("  select (s) <id>     switch to a video");
        println!("  play / pause (p)    toggle playback");
        println!("  seek <t>            seek to seconds or mm:ss");
        println!("  vol <0-100>         set volume (0 mutes)");
        println!("  mute (m)            toggle mute");
        println!("  rate <r>            0.75 | 1 | 1.25 | 1.5 | 2");
        println!("  quality (q) <q>     1080p | 720p | 480p | 360p");
        println!("  fs                  toggle fullscreen");
        println!("  tab <name>          overview | notes | resources | discussion");
        println!("  complete (c)        mark current video complete");
        println!("  next (n)            jump to the next video");
        println!("  retry (r)           retry a failed load");
        println!("  autoplay <on|off>   auto-advance after completion");
        println!("  progress / status   progress summary / player state");
        println!("  quit                leave");
    }
}

/// Parse a seek argument: plain seconds or a mm:ss label.
fn parse_time(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().or_else(|| timecode::parse_label(s))
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::StaticMedia;
    use crate::core::session::SessionConfig;
    use crate::entities::catalog::demo_course;
    use crate::platform::{Platform, StaticTranslator};

    fn shell() -> Shell {
        let session = CourseSession::new(
            demo_course(),
            Box::new(StaticMedia),
            Platform::headless(),
            SessionConfig::default(),
        )
        .unwrap();
        Shell::new(session, Box::new(StaticTranslator))
    }

    #[test]
    fn test_select_command_switches_video() {
        let mut shell = shell();
        assert!(shell.handle_command("select 4"));
        assert_eq!(shell.session.current_video_id(), Some(VideoId(4)));
    }

    #[test]
    fn test_volume_and_mute_commands() {
        let mut shell = shell();
        shell.handle_command("vol 15");
        assert_eq!(shell.session.playback().volume(), 15);
        shell.handle_command("mute");
        assert!(shell.session.playback().is_muted());
    }

    #[test]
    fn test_quit_leaves_loop() {
        let mut shell = shell();
        assert!(!shell.handle_command("quit"));
        assert!(shell.handle_command("definitely-not-a-command"));
    }

    #[test]
    fn test_parse_time_accepts_both_forms() {
        assert_eq!(parse_time("90"), Some(90.0));
        assert_eq!(parse_time("1:30"), Some(90.0));
        assert_eq!(parse_time("abc"), None);
    }
}
