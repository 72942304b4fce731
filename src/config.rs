use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

pub const DATA_DIR_ENV: &str = "SUBTRACK_DATA_DIR";
pub const ADVISOR_DELAY_ENV: &str = "SUBTRACK_ADVISOR_DELAY_MS";
pub const DEBUG_ENV: &str = "SUBTRACK_DEBUG";

const DEFAULT_DATA_DIR: &str = "subtrack-data";
const DEFAULT_ADVISOR_DELAY_MS: u64 = 2_000;

/// Runtime configuration resolved from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub advisor_delay: Duration,
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            advisor_delay: Duration::from_millis(DEFAULT_ADVISOR_DELAY_MS),
            debug: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let advisor_delay = match lookup(ADVISOR_DELAY_ENV) {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| format!("{ADVISOR_DELAY_ENV} must be milliseconds, got '{raw}'"))?,
            ),
            None => defaults.advisor_delay,
        };

        let debug = lookup(DEBUG_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            data_dir,
            advisor_delay,
            debug,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("subtrack.sqlite3")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}
