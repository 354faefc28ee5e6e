use std::path::PathBuf;

use anyhow::{Context, Result};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::*;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimConfig {
    pub log_level: u64,
    /// Cycles after which an undrained workload is an error.
    pub timeout: u64,
    /// Where to write the run summary as JSON.
    pub stats_json: Option<PathBuf>,
}

pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> Result<Self> {
        match section {
            Some(value) => value
                .clone()
                .try_into()
                .with_context(|| format!("cannot deserialize {}", std::any::type_name::<Self>())),
            None => {
                warn!("config section for {} not found", std::any::type_name::<Self>());
                Ok(Self::default())
            }
        }
    }
}

impl Config for SimConfig {}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            log_level: 0,
            timeout: 1_000_000,
            stats_json: None,
        }
    }
}
