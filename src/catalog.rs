use crate::{Error, MetricSource, Result};
use serde::Serialize;
use std::collections::HashMap;

/// The semantic kind of a metric. Fixed at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonically increasing. Displayed as a per-second rate.
    Counter,
    /// Instantaneous value. Displayed as-is.
    Gauge,
    /// Strings and other non-numeric or rarely changing values.
    Discrete,
}

/// Index of a metric within its catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricId(usize);

impl MetricId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetricDescriptor {
    name: String,
    kind: MetricKind,
    has_instances: bool,
    domain: Option<String>,
}

impl MetricDescriptor {
    pub fn new(name: impl Into<String>, kind: MetricKind, has_instances: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            has_instances,
            domain: None,
        }
    }

    /// Label the instance domain this metric reports over. Metrics with the
    /// same domain share instance ids.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn has_instances(&self) -> bool {
        self.has_instances
    }

    pub fn instance_domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }
}

/// Static registry of the metrics being sampled, in registration order.
#[derive(Debug, Default)]
pub struct MetricCatalog {
    metrics: Vec<MetricDescriptor>,
    index: HashMap<String, MetricId>,
}

impl MetricCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog for `names` using the descriptors the source reports.
    pub fn from_source<S: MetricSource + ?Sized>(
        source: &S,
        names: &[impl AsRef<str>],
    ) -> Result<Self> {
        let mut catalog = Self::new();

        for name in names {
            catalog.register_descriptor(source.describe(name.as_ref())?)?;
        }

        Ok(catalog)
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: MetricKind,
        has_instances: bool,
    ) -> Result<MetricId> {
        self.register_descriptor(MetricDescriptor::new(name, kind, has_instances))
    }

    pub fn register_descriptor(&mut self, descriptor: MetricDescriptor) -> Result<MetricId> {
        if self.index.contains_key(descriptor.name()) {
            return Err(Error::DuplicateMetric(descriptor.name().to_string()));
        }

        let id = MetricId(self.metrics.len());
        self.index.insert(descriptor.name().to_string(), id);
        self.metrics.push(descriptor);

        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Result<&MetricDescriptor> {
        self.id(name).map(|id| &self.metrics[id.0])
    }

    pub fn id(&self, name: &str) -> Result<MetricId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownMetric(name.to_string()))
    }

    pub fn get(&self, id: MetricId) -> Option<&MetricDescriptor> {
        self.metrics.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricId, &MetricDescriptor)> {
        self.metrics
            .iter()
            .enumerate()
            .map(|(idx, descriptor)| (MetricId(idx), descriptor))
    }

    pub fn names(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
