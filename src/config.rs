use crate::Error;
use crate::save::{DirtyPolicy, SaveConfig};
use std::env;
use std::time::Duration;

pub const DELAY_ENV: &str = "NOTEKEEP_SAVE_DELAY_MS";
pub const DIRTY_ENV: &str = "NOTEKEEP_CLEAR_DIRTY";
pub const LOG_ENV: &str = "NOTEKEEP_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub save: SaveConfig,
    pub use_color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { save: SaveConfig::default(), use_color: true }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();
        if let Some(raw) = lookup(DELAY_ENV) {
            config.save.delay = parse_delay(&raw)?;
        }
        if let Some(raw) = lookup(DIRTY_ENV) {
            config.save.dirty_policy = parse_dirty_policy(&raw)?;
        }
        config.use_color = lookup("NO_COLOR").is_none();
        Ok(config)
    }
}

pub fn parse_delay(raw: &str) -> Result<Duration, Error> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| Error::InvalidArgument(format!("save delay must be milliseconds, got {raw:?}")))
}

pub fn parse_dirty_policy(raw: &str) -> Result<DirtyPolicy, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "before" | "before-persist" => Ok(DirtyPolicy::BeforePersist),
        "after" | "after-persist" => Ok(DirtyPolicy::AfterPersist),
        other => Err(Error::InvalidArgument(format!(
            "dirty policy must be 'before' or 'after', got {other:?}"
        ))),
    }
}
