//! Configuration management for the CLI

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `RIDEPRED_MODEL_DIR`
const ENV_PREFIX: &str = "RIDEPRED";

/// CLI configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Artifact store directory
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Default output format (table or json)
    #[serde(default)]
    pub format: Option<String>,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            format: None,
            log_json: false,
        }
    }
}

impl CliConfig {
    /// Load configuration from the user config file and environment
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path().ok().as_deref())
    }

    /// Layer an optional JSON file under the environment
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            );
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        match &self.format {
            Some(name) => OutputFormat::from_str(name, true)
                .map_err(|e| anyhow::anyhow!("Invalid output format {:?}: {}", name, e)),
            None => Ok(OutputFormat::default()),
        }
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("ridepred").join("config.json"))
    }
}
