use crate::error::{PrefsError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_DEBOUNCE_MS: u64 = 800;
const DEFAULT_POLL_SYSTEM_THEME_MS: u64 = 2000;
const DEFAULT_USER: &str = "default";

/// Runtime configuration, stored as `config.json` in the data directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrefsConfig {
    /// Quiet period before a debounced write fires.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Key of the preference document to sync.
    #[serde(default = "default_user")]
    pub user: String,

    /// How often long-running hosts re-detect the OS color scheme.
    #[serde(default = "default_poll_system_theme_ms")]
    pub poll_system_theme_ms: u64,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

fn default_poll_system_theme_ms() -> u64 {
    DEFAULT_POLL_SYSTEM_THEME_MS
}

/// The user names a file under `preferences/`, so it must be a single plain
/// path component.
fn validate_user(user: &str) -> Result<()> {
    if user.is_empty() {
        return Err(PrefsError::Config("User cannot be empty".to_string()));
    }
    if user == "." || user.contains("..") || user.contains(['/', '\\']) {
        return Err(PrefsError::Config(format!("Invalid user name: {}", user)));
    }
    Ok(())
}

fn validate_poll_interval(millis: u64) -> Result<()> {
    if millis == 0 {
        return Err(PrefsError::Config(
            "poll-system-theme-ms must be positive".to_string(),
        ));
    }
    Ok(())
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            user: default_user(),
            poll_system_theme_ms: DEFAULT_POLL_SYSTEM_THEME_MS,
        }
    }
}

impl PrefsConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&config_path)?;
        let config: Self = serde_json::from_str(&content)?;
        validate_user(&config.user)?;
        validate_poll_interval(config.poll_system_theme_ms)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_system_theme(&self) -> Duration {
        Duration::from_millis(self.poll_system_theme_ms)
    }

    /// Reads a setting by its CLI name (`debounce-ms`, `user`, `poll-system-theme-ms`).
    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            "debounce-ms" => Ok(self.debounce_ms.to_string()),
            "user" => Ok(self.user.clone()),
            "poll-system-theme-ms" => Ok(self.poll_system_theme_ms.to_string()),
            _ => Err(PrefsError::Config(format!("Unknown config key: {}", key))),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let millis = || {
            value
                .parse::<u64>()
                .map_err(|_| PrefsError::Config(format!("Expected milliseconds, got: {}", value)))
        };
        match key {
            "debounce-ms" => self.debounce_ms = millis()?,
            "poll-system-theme-ms" => {
                let every = millis()?;
                validate_poll_interval(every)?;
                self.poll_system_theme_ms = every;
            }
            "user" => {
                let user = value.trim();
                validate_user(user)?;
                self.user = user.to_string();
            }
            _ => return Err(PrefsError::Config(format!("Unknown config key: {}", key))),
        }
        Ok(())
    }

    pub const KEYS: [&'static str; 3] = ["debounce-ms", "user", "poll-system-theme-ms"];
}
