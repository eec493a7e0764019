use crate::{Error, Result};
use serde::Deserialize;

/// Instance selection and ranking applied to every result.
#[derive(Debug, Deserialize)]
pub struct Filter {
    /// Instance name patterns. A pattern must match the whole name.
    #[serde(default)]
    instances: Vec<String>,
    /// Keep the top N instances per metric, or the bottom N if negative.
    #[serde(default)]
    rank: i64,
    /// Apply the name patterns after ranking instead of before.
    #[serde(default)]
    rank_first: bool,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    /// Comma separated metrics whose rankings select the instances of their
    /// domains.
    #[serde(default)]
    predicate: Option<String>,
    #[serde(default)]
    totals: Vec<String>,
    #[serde(default = "ignore_transient")]
    ignore_transient: bool,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            rank: 0,
            rank_first: false,
            min: None,
            max: None,
            predicate: None,
            totals: Vec::new(),
            ignore_transient: ignore_transient(),
        }
    }
}

impl Filter {
    pub fn check(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(Error::Config(format!(
                    "filter min ({min}) is greater than max ({max})"
                )));
            }
        }

        if !self.predicates().is_empty() && self.rank == 0 {
            return Err(Error::Config("a predicate requires a non-zero rank".into()));
        }

        Ok(())
    }

    pub fn instances(&self) -> &[String] {
        &self.instances
    }

    pub fn rank(&self) -> i64 {
        self.rank
    }

    pub fn rank_first(&self) -> bool {
        self.rank_first
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn predicates(&self) -> Vec<&str> {
        self.predicate
            .iter()
            .flat_map(|p| p.split(','))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    pub fn totals(&self) -> &[String] {
        &self.totals
    }

    pub fn ignore_transient(&self) -> bool {
        self.ignore_transient
    }
}

fn ignore_transient() -> bool {
    true
}
