use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use leadgen_classifiers::config::ForestConfig;
use leadgen_classifiers::io::artifacts::ArtifactStore;
use leadgen_tabular::config::AttentionConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServiceConfig {
    pub version: String,
    /// Directory holding the source CSVs and every model artifact.
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Prefix the scoring routes are nested under; empty mounts them at the root.
    pub api_prefix: String,
    pub forest: ForestConfig,
    pub attention: AttentionConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            version: clap::crate_version!().to_string(),
            data_dir: PathBuf::from("data"),
            host: String::from("0.0.0.0"),
            port: 8000,
            api_prefix: String::from("/api/ml-scoring"),
            forest: ForestConfig::default(),
            attention: AttentionConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Read a JSON config, keeping defaults for missing or invalid fields.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        let config_json = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        Self::from_json(&config_json)
    }

    pub fn from_json(config_json: &str) -> Result<Self> {
        let partial: serde_json::Value =
            serde_json::from_str(config_json).context("Config file is not valid JSON")?;
        let mut config = ServiceConfig::default();

        macro_rules! load_or_default {
            ($field:ident) => {
                if let Some(val) = partial.get(stringify!($field)) {
                    if let Ok(parsed) = serde_json::from_value(val.clone()) {
                        config.$field = parsed;
                    } else {
                        log::warn!(
                            "Config Invalid value for '{}', using default: {:?}",
                            stringify!($field), config.$field
                        );
                    }
                } else {
                    log::warn!(
                        "Config Missing field '{}', using default: {:?}",
                        stringify!($field), config.$field
                    );
                }
            };
        }

        load_or_default!(data_dir);
        load_or_default!(host);
        load_or_default!(port);
        load_or_default!(api_prefix);
        load_or_default!(forest);
        load_or_default!(attention);

        Ok(config)
    }

    /// Defaults or the given file, then `.env` and process environment overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `PORT`, `LEADGEN_HOST` and `LEADGEN_DATA_DIR` from `lookup`.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => log::warn!("Ignoring invalid PORT value '{}'", port),
            }
        }
        if let Some(host) = lookup("LEADGEN_HOST") {
            self.host = host;
        }
        if let Some(dir) = lookup("LEADGEN_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }

    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.data_dir)
    }
}
