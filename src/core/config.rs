use std::fs::read_to_string;
use std::path::Path;

use anyhow::{Context, Result};
use serde_derive::{Deserialize, Serialize};
use toml::from_str;

use crate::core::common::{LoggingOptions, PipelineOptions};

#[derive(Default, Deserialize, Debug, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub pipeline_options: PipelineOptions,
    pub logging_options: LoggingOptions,
}

impl Config {
    pub fn load(filename: impl AsRef<Path>) -> Result<Config> {
        let filename = filename.as_ref();
        let config = read_to_string(filename).with_context(|| format!("reading `{}`", filename.display()))?;
        let config: Config = from_str(&config).with_context(|| format!("parsing `{}`", filename.display()))?;
        Ok(config)
    }
}
