//! Game tunables, loadable from a JSON file. Missing fields fall back to defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_maze_width() -> u32 {
    18
}

fn default_maze_height() -> u32 {
    9
}

fn default_time_budget_secs() -> u32 {
    30
}

fn default_starting_lives() -> u32 {
    3
}

fn default_keys() -> u32 {
    1
}

fn default_casual_keys() -> u32 {
    3
}

fn default_ready_attempts() -> u32 {
    5
}

fn default_disarm_settle_ms() -> u64 {
    600
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_maze_width")]
    pub maze_width: u32,
    #[serde(default = "default_maze_height")]
    pub maze_height: u32,
    /// Seconds on the clock for every maze.
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u32,
    #[serde(default = "default_starting_lives")]
    pub starting_lives: u32,
    /// Keys handed out at the start of a normal-mode maze.
    #[serde(default = "default_keys")]
    pub default_keys: u32,
    #[serde(default = "default_casual_keys")]
    pub casual_keys: u32,
    /// `ready` handshakes sent before the view gives up waiting for a maze.
    #[serde(default = "default_ready_attempts")]
    pub ready_attempts: u32,
    #[serde(default = "default_disarm_settle_ms")]
    pub disarm_settle_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            maze_width: default_maze_width(),
            maze_height: default_maze_height(),
            time_budget_secs: default_time_budget_secs(),
            starting_lives: default_starting_lives(),
            default_keys: default_keys(),
            casual_keys: default_casual_keys(),
            ready_attempts: default_ready_attempts(),
            disarm_settle_ms: default_disarm_settle_ms(),
        }
    }
}

impl GameConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads `path` if it exists; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn starting_keys(&self, casual: bool) -> u32 {
        if casual {
            self.casual_keys
        } else {
            self.default_keys
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = GameConfig::from_json(r#"{ "time_budget_secs": 45 }"#).unwrap();
        assert_eq!(cfg.time_budget_secs, 45);
        assert_eq!(cfg.maze_width, 18);
        assert_eq!(cfg.starting_lives, 3);
    }

    #[test]
    fn mode_keys() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.starting_keys(false), 1);
        assert_eq!(cfg.starting_keys(true), 3);
    }

    #[test]
    fn missing_file_is_default() {
        let cfg = GameConfig::load(Path::new("/definitely/not/here/config.json")).unwrap();
        assert_eq!(cfg, GameConfig::default());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            GameConfig::from_json("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }
}
