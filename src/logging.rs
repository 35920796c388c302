use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    sync::mpsc::{self, Sender},
    thread::{self, JoinHandle},
};

/* =========================
   LEVELS
   ========================= */

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub debug: bool,
    pub console: bool,
    pub file: Option<PathBuf>,
}

/* =========================
   LOGGER
   ========================= */

/// Logging context handed to every component by reference.
///
/// Console lines go to stderr as `[NAME] LEVEL: message`. When a log file is
/// configured, timestamped lines are queued to a writer thread that appends
/// them to the file.
pub struct Logger {
    name: &'static str,
    debug: bool,
    console: bool,
    tx: Option<Sender<String>>,
    writer: Option<JoinHandle<()>>,
}

impl Logger {
    pub fn new(name: &'static str, settings: &LogSettings) -> Self {
        let mut logger = Self {
            name,
            debug: settings.debug,
            console: settings.console,
            tx: None,
            writer: None,
        };

        let Some(path) = settings.file.clone() else {
            return logger;
        };

        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(e) => {
                logger.warn(format!("failed to open log file {}: {e}", path.display()));
                return logger;
            }
        };

        let (tx, rx) = mpsc::channel::<String>();
        let writer = thread::spawn(move || {
            let mut file = file;
            while let Ok(line) = rx.recv() {
                let _ = writeln!(file, "{line}");
                let _ = file.flush();
            }
        });

        logger.tx = Some(tx);
        logger.writer = Some(writer);
        logger
    }

    /// A logger that drops everything.
    pub fn disabled() -> Self {
        Self {
            name: "CLI",
            debug: false,
            console: false,
            tx: None,
            writer: None,
        }
    }

    #[inline]
    pub fn should_log(&self, level: Level) -> bool {
        level != Level::Debug || self.debug
    }

    pub fn log(&self, level: Level, msg: String) {
        if !self.should_log(level) {
            return;
        }

        if self.console {
            eprintln!("[{}] {}: {}", self.name, level.as_str(), msg);
        }

        if let Some(tx) = &self.tx {
            let _ = tx.send(format!("{} [{}] {}", timestamp(), level.as_str(), msg));
        }
    }

    pub fn debug(&self, msg: String) {
        self.log(Level::Debug, msg);
    }

    pub fn info(&self, msg: String) {
        self.log(Level::Info, msg);
    }

    pub fn warn(&self, msg: String) {
        self.log(Level::Warn, msg);
    }

    pub fn error(&self, msg: String) {
        self.log(Level::Error, msg);
    }

    /// Closes the file channel and waits for queued lines to be written.
    pub fn finish(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.tx.take());
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn timestamp() -> String {
    let now = chrono::Local::now();
    now.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/* =========================
   MACROS
   ========================= */

#[macro_export]
macro_rules! debug {
    ($log:expr, $($arg:tt)*) => {{
        let log: &$crate::logging::Logger = $log;
        if log.should_log($crate::logging::Level::Debug) {
            log.debug(format!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! info {
    ($log:expr, $($arg:tt)*) => {{
        let log: &$crate::logging::Logger = $log;
        log.info(format!($($arg)*));
    }};
}

#[macro_export]
macro_rules! warn {
    ($log:expr, $($arg:tt)*) => {{
        let log: &$crate::logging::Logger = $log;
        log.warn(format!($($arg)*));
    }};
}

#[macro_export]
macro_rules! error {
    ($log:expr, $($arg:tt)*) => {{
        let log: &$crate::logging::Logger = $log;
        log.error(format!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_file_sink_receives_lines_after_finish() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.log");
        let settings = LogSettings {
            debug: false,
            console: false,
            file: Some(path.clone()),
        };

        let log = Logger::new("CLI", &settings);
        crate::info!(&log, "rewrote {} images", 3);
        crate::error!(&log, "permission error accessing {}", "a.png");
        log.finish();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[INFO] rewrote 3 images"));
        assert!(lines[1].ends_with("[ERROR] permission error accessing a.png"));
    }

    #[test]
    fn test_debug_lines_require_debug_mode() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.log");

        let quiet = Logger::new(
            "CLI",
            &LogSettings { debug: false, console: false, file: Some(path.clone()) },
        );
        crate::debug!(&quiet, "hidden");
        quiet.finish();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");

        let verbose = Logger::new(
            "CLI",
            &LogSettings { debug: true, console: false, file: Some(path.clone()) },
        );
        crate::debug!(&verbose, "shown");
        verbose.finish();
        assert!(fs::read_to_string(&path).unwrap().contains("[DEBUG] shown"));
    }

    #[test]
    fn test_log_file_is_appended() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.log");
        fs::write(&path, "previous run\n").unwrap();

        let log = Logger::new(
            "CLI",
            &LogSettings { debug: false, console: false, file: Some(path.clone()) },
        );
        crate::warn!(&log, "second run");
        drop(log);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("previous run\n"));
        assert!(contents.contains("[WARN] second run"));
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Warn < Level::Error);
        assert_eq!(Level::Warn.as_str(), "WARN");
    }
}
