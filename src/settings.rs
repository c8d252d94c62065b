use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::compliance::NormalizeOptions;
use crate::error::{Error, Result};

/// Looked up as `n8n_cleaner.{toml,json,yaml,...}` in the working directory.
const DEFAULT_CONFIG_NAME: &str = "n8n_cleaner";
const ENV_PREFIX: &str = "N8N_CLEANER";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Records handed to the thread pool at a time.
    pub chunk_size: usize,
    pub threads: Option<usize>,
    pub node_name_placeholder: String,
    pub node_type_placeholder: String,
    pub fill_recommended: bool,
}

impl Settings {
    /// Defaults, then the settings file (`path`, or the default name if it
    /// exists), then `N8N_CLEANER_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let builder = Config::builder()
            .set_default("log_level", "info")?
            .set_default("chunk_size", 500)?
            .set_default("node_name_placeholder", "Unnamed Node")?
            .set_default("node_type_placeholder", "unknown")?
            .set_default("fill_recommended", false)?;

        let builder = match path {
            Some(p) => builder.add_source(File::from(p)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        if settings.chunk_size == 0 {
            return Err(Error::InvalidInput("chunk_size must be at least 1".into()));
        }
        if settings.threads == Some(0) {
            return Err(Error::InvalidInput("threads must be at least 1".into()));
        }
        Ok(settings)
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            node_name_placeholder: self.node_name_placeholder.clone(),
            node_type_placeholder: self.node_type_placeholder.clone(),
            fill_recommended: self.fill_recommended,
        }
    }
}
