use crate::{InstanceId, MetricDescriptor, Result, Value};
use async_trait::async_trait;

mod procfs;

#[cfg(test)]
pub(crate) mod mock;

pub use procfs::ProcSource;

/// Provides raw metric values to the engine.
///
/// Both `fetch` failures the engine expects, `SourceUnavailable` and
/// `SourceTimeout`, are treated as missed ticks rather than fatal errors.
#[async_trait]
pub trait MetricSource: Send {
    /// Describe a metric by name. Fails with `UnknownMetric` if the source
    /// does not provide it.
    fn describe(&self, name: &str) -> Result<MetricDescriptor>;

    /// Fetch the current values of the named metrics.
    async fn fetch(&mut self, names: &[String]) -> Result<Fetch>;
}

/// One raw reading as reported by a source.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchedValue {
    pub metric: String,
    pub instance: Option<InstanceId>,
    pub name: Option<String>,
    pub value: Value,
}

/// The result of a single fetch. Values are kept in the order the source
/// reported them, which is the order instances are displayed in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fetch {
    pub values: Vec<FetchedValue>,
}

impl Fetch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reading for a scalar metric.
    pub fn scalar(&mut self, metric: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.push(FetchedValue {
            metric: metric.into(),
            instance: None,
            name: None,
            value: value.into(),
        });
        self
    }

    /// Add a reading for one instance of a multi-instance metric.
    pub fn instance(
        &mut self,
        metric: impl Into<String>,
        id: InstanceId,
        name: Option<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.values.push(FetchedValue {
            metric: metric.into(),
            instance: Some(id),
            name,
            value: value.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
