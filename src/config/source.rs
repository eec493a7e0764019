use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Source {
    /// Root of the procfs tree to read.
    #[serde(default = "procfs")]
    procfs: PathBuf,
}

impl Default for Source {
    fn default() -> Self {
        Self { procfs: procfs() }
    }
}

impl Source {
    pub fn procfs(&self) -> &Path {
        &self.procfs
    }

    pub fn set_procfs(&mut self, procfs: PathBuf) {
        self.procfs = procfs;
    }
}

fn procfs() -> PathBuf {
    PathBuf::from("/proc")
}
