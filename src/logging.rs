use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{runtime::ConfigErrors, Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use thiserror::Error;

/// A unique identifier for one tally or recount run, used to correlate its log lines.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RunId(pub usize);

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RunId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> RunId {
        static RUN_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RunId(RUN_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to load logging config {path}: {message}")]
    File { path: String, message: String },
    #[error("Invalid console logging config: {0}")]
    Console(#[from] ConfigErrors),
    #[error(transparent)]
    AlreadyInitialised(#[from] log::SetLoggerError),
}

const CONSOLE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

/// Initialise log4rs from the given file, or log to the console at `info`
/// if there is no such file.
pub fn init(path: &Path) -> Result<(), LoggingError> {
    if path.exists() {
        return log4rs::init_file(path, Default::default()).map_err(|e| LoggingError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        });
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    Ok(())
}
