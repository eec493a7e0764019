use crate::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

mod filter;
mod general;
mod log;
mod output;
mod source;

pub use filter::Filter;
pub use general::General;
pub use log::Log;
pub use output::{Format, Output};
pub use source::Source;

/// Runtime configuration, loaded from a TOML file. Every section and field
/// is optional.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    general: General,
    #[serde(default)]
    source: Source,
    #[serde(default)]
    filter: Filter,
    #[serde(default)]
    output: Output,
    #[serde(default)]
    log: Log,
}

impl Config {
    pub fn load(path: &dyn AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    pub fn check(&self) -> Result<()> {
        self.general.check()?;
        self.filter.check()?;
        self.output.check()
    }

    pub fn general(&self) -> &General {
        &self.general
    }

    pub fn general_mut(&mut self) -> &mut General {
        &mut self.general
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut Source {
        &mut self.source
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut Output {
        &mut self.output
    }

    pub fn log(&self) -> &Log {
        &self.log
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }
}

fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    let value = String::deserialize(deserializer)?;
    value
        .parse::<humantime::Duration>()
        .map(Into::into)
        .map_err(serde::de::Error::custom)
}

fn optional_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Duration>, D::Error> {
    duration(deserializer).map(Some)
}
