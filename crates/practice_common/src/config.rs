//! Practice service configuration.
//!
//! Config file: ~/.config/practice/config.toml or /etc/practice/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, localhost only by default
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Maximum accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file; falls back to the per-user data directory
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

/// Reward catalog settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// CSV file with `Title` and `URL` columns; built-in items when unset
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

/// Session registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Sessions untouched for this long are dropped
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_sessions() -> usize {
    1024
}

fn default_idle_timeout() -> u64 {
    3600
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// Argon2id cost parameters for stored password hashes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_memory_kib")]
    pub argon2_memory_kib: u32,

    #[serde(default = "default_iterations")]
    pub argon2_iterations: u32,

    #[serde(default = "default_lanes")]
    pub argon2_lanes: u32,
}

fn default_memory_kib() -> u32 {
    19_456
}

fn default_iterations() -> u32 {
    2
}

fn default_lanes() -> u32 {
    1
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_kib: default_memory_kib(),
            argon2_iterations: default_iterations(),
            argon2_lanes: default_lanes(),
        }
    }
}

impl SecurityConfig {
    /// Build Argon2 parameters, rejecting combinations the algorithm refuses
    pub fn argon2_params(&self) -> Result<argon2::Params> {
        argon2::Params::new(
            self.argon2_memory_kib,
            self.argon2_iterations,
            self.argon2_lanes,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid argon2 parameters: {}", e))
    }
}

/// Question generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsConfig {
    /// Random draws before falling back to picking among unused pairs
    #[serde(default = "default_max_draw_attempts")]
    pub max_draw_attempts: u32,
}

fn default_max_draw_attempts() -> u32 {
    1000
}

impl Default for QuestionsConfig {
    fn default() -> Self {
        Self {
            max_draw_attempts: default_max_draw_attempts(),
        }
    }
}

/// Main practice service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PracticeConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub rewards: RewardsConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub questions: QuestionsConfig,
}

impl PracticeConfig {
    /// Get default user config path: ~/.config/practice/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg)
        } else {
            let home = std::env::var("HOME").context("Cannot determine home directory")?;
            Path::new(&home).join(".config")
        };

        Ok(config_dir.join("practice").join("config.toml"))
    }

    /// Get system config path: /etc/practice/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/practice/config.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (must exist)
    /// 2. User config (~/.config/practice/config.toml)
    /// 3. System config (/etc/practice/config.toml)
    /// 4. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_from(&system_path);
        }

        Ok(Self::default())
    }

    /// Parse and validate a single config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: PracticeConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sessions.max_sessions == 0 {
            anyhow::bail!("sessions.max_sessions must be at least 1");
        }
        if self.sessions.idle_timeout_secs == 0 {
            anyhow::bail!("sessions.idle_timeout_secs must be at least 1");
        }
        if self.questions.max_draw_attempts == 0 {
            anyhow::bail!("questions.max_draw_attempts must be at least 1");
        }
        if self.server.max_body_bytes == 0 {
            anyhow::bail!("server.max_body_bytes must be at least 1");
        }
        self.security.argon2_params()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = PracticeConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:8501");
        assert_eq!(config.sessions.max_sessions, 1024);
        assert!(config.storage.db_path.is_none());
        assert!(config.rewards.catalog_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[server]\nbind = \"0.0.0.0:9000\"\n\n[storage]\ndb_path = \"/tmp/p.db\"\n",
        )
        .unwrap();

        let config = PracticeConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.server.max_body_bytes, 64 * 1024);
        assert_eq!(config.storage.db_path, Some(PathBuf::from("/tmp/p.db")));
        assert_eq!(config.security.argon2_iterations, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sessions]\nmax_sessions = 0\n").unwrap();
        assert!(PracticeConfig::load(Some(path.as_path())).is_err());

        let mut config = PracticeConfig::default();
        config.security.argon2_memory_kib = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(PracticeConfig::load(Some(dir.path().join("absent.toml").as_path())).is_err());
    }
}
