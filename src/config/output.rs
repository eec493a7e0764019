use crate::render::DEFAULT_PRECISION;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const MAX_PRECISION: usize = 17;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct Output {
    #[serde(default)]
    format: Format,
    /// Write to this file instead of stdout.
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default = "precision")]
    precision: usize,
    #[serde(default)]
    clamp_negative: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            format: Format::default(),
            path: None,
            precision: precision(),
            clamp_negative: false,
        }
    }
}

impl Output {
    pub fn check(&self) -> Result<()> {
        if self.precision > MAX_PRECISION {
            return Err(Error::Config(format!(
                "precision of {} is too large. Maximum precision is: {MAX_PRECISION}",
                self.precision
            )));
        }

        Ok(())
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn clamp_negative(&self) -> bool {
        self.clamp_negative
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }
}

fn precision() -> usize {
    DEFAULT_PRECISION
}
