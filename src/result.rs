use crate::{InstanceId, MetricKind, Value};
use serde::Serialize;
use std::time::SystemTime;

/// One displayable value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultEntry {
    pub metric: String,
    /// `None` for scalar metrics and for synthesized totals.
    pub instance: Option<InstanceId>,
    /// Instance display name. `None` for scalar metrics and transient
    /// instances.
    pub name: Option<String>,
    pub value: Value,
    pub kind: MetricKind,
    /// The counter could not be turned into a rate and carries its raw
    /// value.
    pub absolute: bool,
}

impl ResultEntry {
    /// Scalar metrics and totals carry no instance id.
    pub fn is_scalar(&self) -> bool {
        self.instance.is_none()
    }
}

/// The output of a single tick, handed to renderers.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledResult {
    pub timestamp: SystemTime,
    /// Ticks missed since the previous result was rendered.
    pub missed: u64,
    pub entries: Vec<ResultEntry>,
}

impl SampledResult {
    pub fn new(timestamp: SystemTime, entries: Vec<ResultEntry>) -> Self {
        Self {
            timestamp,
            missed: 0,
            entries,
        }
    }

    /// Entries for a single metric, in result order.
    pub fn metric<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ResultEntry> + 'a {
        self.entries.iter().filter(move |e| e.metric == name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
