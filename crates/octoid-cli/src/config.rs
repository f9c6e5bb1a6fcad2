use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use octoid_store::HashConfig;
use octoid_store_postgres::PostgresConfig;

const DEFAULT_CONFIG_FILE: &str = "octoid.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: PostgresConfig,
    #[serde(default)]
    pub hashing: HashConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.hashing.build().map_err(|e| format!("hashing: {e}"))?;
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }
}

/// Loads the config file (if any), applies `OCTOID__SECTION__KEY` environment
/// overrides and validates the result.
///
/// An explicitly given path must exist; the default `octoid.toml` is optional.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut builder = Config::builder();
    match path {
        Some(p) => {
            builder = builder.add_source(File::from(p.to_path_buf()));
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path));
            }
        }
    }
    // Environment variable overrides, e.g., OCTOID__STORAGE__URL=postgres://...
    builder = builder.add_source(
        Environment::with_prefix("OCTOID")
            .try_parsing(true)
            .separator("__"),
    );
    let cfg = builder.build().context("config build error")?;
    let merged: AppConfig = cfg
        .try_deserialize()
        .context("config deserialize error")?;
    merged.validate().map_err(anyhow::Error::msg)?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use octoid_store::HashAlgorithm;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.hashing.algorithm, HashAlgorithm::Bcrypt);
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
            [storage]
            url = "postgres://octoid:pw@db:5432/octoid"
            pool_size = 3

            [hashing]
            algorithm = "argon2id"

            [logging]
            level = "debug"
            "#,
        );
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.storage.url, "postgres://octoid:pw@db:5432/octoid");
        assert_eq!(config.storage.pool_size, 3);
        assert_eq!(config.storage.connect_timeout_ms, 5000);
        assert_eq!(config.hashing.algorithm, HashAlgorithm::Argon2id);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_config("[hashing]\nbcrypt_cost = 99\n");
        assert!(load_config(Some(file.path())).is_err());

        let file = write_config("[logging]\nlevel = \"loud\"\n");
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("logging.level"));

        let file = write_config("[storage]\npool_size = 0\n");
        assert!(load_config(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
