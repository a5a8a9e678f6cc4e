use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use cadence_types::Preload;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    executor: ExecutorConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    bridge: BridgeConfig,
}

#[derive(Deserialize, Default, Clone)]
struct ExecutorConfig {
    thread_name: Option<String>,
    time_update_interval_ms: Option<u64>,
}

#[derive(Deserialize, Default, Clone)]
struct PlaybackConfig {
    initial_volume: Option<f32>,
    initial_playback_rate: Option<f32>,
    preload: Option<String>,
}

#[derive(Deserialize, Default, Clone)]
struct BridgeConfig {
    blocking_wait_timeout_secs: Option<u64>,
}

/// Pipeline tunables: embedded defaults overlaid with an optional user file.
#[derive(Clone)]
pub struct PipelineConfig {
    executor: ExecutorConfig,
    playback: PlaybackConfig,
    bridge: BridgeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let base = embedded();
        Self {
            executor: base.executor,
            playback: base.playback,
            bridge: base.bridge,
        }
    }
}

impl PipelineConfig {
    /// Embedded defaults merged with `<config dir>/cadence/config.toml` when it
    /// exists. A missing or broken user file is logged and ignored.
    pub fn load() -> Self {
        let mut config = Self::default();
        if let Some(path) = user_config_path() {
            if path.exists() {
                match read_file(&path) {
                    Ok(user) => config.merge(user),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring config {}: {}", path.display(), e)
                    }
                }
            }
        }
        config
    }

    /// Embedded defaults merged with the file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge(read_file(path)?);
        Ok(config)
    }

    /// Embedded defaults merged with `contents`.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge(toml::from_str(contents)?);
        Ok(config)
    }

    pub fn thread_name(&self) -> String {
        self.executor
            .thread_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "cadence-pipeline".to_string())
    }

    /// Periodic time-update cadence (clamped to 10ms..10s).
    pub fn time_update_interval(&self) -> Duration {
        let ms = self
            .executor
            .time_update_interval_ms
            .unwrap_or(250)
            .clamp(10, 10_000);
        Duration::from_millis(ms)
    }

    pub fn initial_volume(&self) -> f32 {
        let volume = self.playback.initial_volume.unwrap_or(1.0);
        if volume.is_nan() {
            return 1.0;
        }
        volume.clamp(0.0, 1.0)
    }

    pub fn initial_playback_rate(&self) -> f32 {
        let rate = self.playback.initial_playback_rate.unwrap_or(0.0);
        if rate.is_nan() {
            return 0.0;
        }
        rate.max(0.0)
    }

    pub fn preload(&self) -> Preload {
        self.playback
            .preload
            .as_deref()
            .and_then(Preload::parse)
            .unwrap_or_default()
    }

    /// Timeout for the blocking start/seek/stop helpers (clamped to 1s..10min).
    pub fn blocking_wait_timeout(&self) -> Duration {
        let secs = self
            .bridge
            .blocking_wait_timeout_secs
            .unwrap_or(30)
            .clamp(1, 600);
        Duration::from_secs(secs)
    }

    fn merge(&mut self, user: ConfigFile) {
        if user.executor.thread_name.is_some() {
            self.executor.thread_name = user.executor.thread_name;
        }
        if user.executor.time_update_interval_ms.is_some() {
            self.executor.time_update_interval_ms = user.executor.time_update_interval_ms;
        }
        if user.playback.initial_volume.is_some() {
            self.playback.initial_volume = user.playback.initial_volume;
        }
        if user.playback.initial_playback_rate.is_some() {
            self.playback.initial_playback_rate = user.playback.initial_playback_rate;
        }
        if user.playback.preload.is_some() {
            self.playback.preload = user.playback.preload;
        }
        if user.bridge.blocking_wait_timeout_secs.is_some() {
            self.bridge.blocking_wait_timeout_secs = user.bridge.blocking_wait_timeout_secs;
        }
    }
}

fn embedded() -> ConfigFile {
    toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
        log::error!(target: "config", "embedded config.toml is malformed: {}", e);
        ConfigFile::default()
    })
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cadence").join("config.toml"))
}
