//! Settings for the `bizledger` binary.
//!
//! Values come from an optional TOML file (`config/bizledger.toml` unless
//! `--config` says otherwise) and are overridden by `BIZLEDGER__*`
//! environment variables, e.g. `BIZLEDGER__DATABASE__KIND=sqlite` together
//! with `BIZLEDGER__DATABASE__PATH=/var/lib/bizledger.db`.
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_CONFIG_PATH: &str = "config/bizledger.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    /// Tracing level for the binary and the engine.
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite { path: String },
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite {
            path: "./bizledger.db".to_string(),
        }
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Self::Memory => String::from("sqlite::memory:"),
            Self::Sqlite { path } => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// How long an operation waits for the locks of its accounts.
    pub lock_timeout_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lock_timeout_ms: u64::try_from(engine::DEFAULT_LOCK_TIMEOUT.as_millis())
                .unwrap_or(5_000),
        }
    }
}

impl EngineSettings {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub engine: EngineSettings,
}

fn environment() -> Environment {
    Environment::with_prefix("BIZLEDGER").separator("__")
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_PATH)).required(false))
            .add_source(environment())
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_a_local_sqlite_file() {
        let settings = Settings::default();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database.url(), "sqlite:./bizledger.db?mode=rwc");
        assert_eq!(settings.engine.lock_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn file_values_override_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                r#"
                [app]
                level = "debug"

                [database]
                kind = "memory"

                [engine]
                lock_timeout_ms = 250
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.database.url(), "sqlite::memory:");
        assert_eq!(settings.engine.lock_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn environment_selects_the_database_file() {
        let vars = config::Map::from([
            ("BIZLEDGER__DATABASE__KIND".to_string(), "sqlite".to_string()),
            (
                "BIZLEDGER__DATABASE__PATH".to_string(),
                "/tmp/ledger.db".to_string(),
            ),
        ]);
        let settings: Settings = Config::builder()
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.database.url(), "sqlite:/tmp/ledger.db?mode=rwc");
    }
}
