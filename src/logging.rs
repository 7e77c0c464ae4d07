use log::LevelFilter;
use simplelog::{Config, WriteLogger};
use std::fs::File;
use std::path::Path;

pub const DEFAULT_LOG_FILE: &str = "aether-search.log";

/// Routes `log` output to `path`. Failing to create the file leaves logging
/// disabled instead of aborting.
pub fn init_logging(path: impl AsRef<Path>, level: LevelFilter) {
    if let Ok(file) = File::create(path.as_ref()) {
        if WriteLogger::init(level, Config::default(), file).is_ok() {
            log::info!("Logger initialized ({}).", path.as_ref().display());
        }
    }
}
