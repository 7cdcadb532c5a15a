//! Routes `log` records to the browser console (stderr on native targets).

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::OnceLock;

static LOGGER: OnceLock<ConsoleLogger> = OnceLock::new();

#[derive(Debug)]
pub struct ConsoleLogger {
    level: LevelFilter,
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        write_line(record.level(), &line);
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
fn write_line(level: Level, line: &str) {
    if level <= Level::Warn {
        zoon::eprintln!("{}", line);
    } else {
        zoon::println!("{}", line);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn write_line(_level: Level, line: &str) {
    eprintln!("{line}");
}

/// Installs the console logger. Later calls keep the first logger.
pub fn init(level: LevelFilter) {
    let logger = LOGGER.get_or_init(|| ConsoleLogger { level });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}
