use crate::{Error, InstanceId, MetricCatalog, MetricId, MetricKind, Result, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// The value to display for one (metric, instance) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct RateResult {
    pub value: Value,
    /// Set when a counter is reported as its raw value because there was no
    /// usable baseline: first sample, a newly (re)appeared instance, or a
    /// clock that did not move forward.
    pub absolute: bool,
}

type Key = (MetricId, Option<InstanceId>);

#[derive(Debug, Clone, PartialEq)]
struct Reading {
    value: Value,
    kind: MetricKind,
}

#[derive(Debug)]
struct Sample {
    timestamp: SystemTime,
    readings: HashMap<Key, Reading>,
}

impl Sample {
    fn new(timestamp: SystemTime) -> Self {
        Self {
            timestamp,
            readings: HashMap::new(),
        }
    }
}

/// Holds the current and previous raw readings and turns counters into
/// per-second rates. Only two samples are ever retained.
pub struct SampleStore {
    catalog: Arc<MetricCatalog>,
    current: Option<Sample>,
    previous: Option<Sample>,
}

impl SampleStore {
    pub fn new(catalog: Arc<MetricCatalog>) -> Self {
        Self {
            catalog,
            current: None,
            previous: None,
        }
    }

    /// Rotate the current sample into the previous slot and start a new,
    /// empty sample. Called once per tick before any values are recorded.
    pub fn begin_sample(&mut self, timestamp: SystemTime) {
        self.previous = self.current.replace(Sample::new(timestamp));
    }

    pub fn record_value(
        &mut self,
        metric: &str,
        instance: Option<InstanceId>,
        value: Value,
    ) -> Result<()> {
        let id = self.catalog.id(metric)?;
        self.record(id, instance, value)
    }

    pub(crate) fn record(
        &mut self,
        metric: MetricId,
        instance: Option<InstanceId>,
        value: Value,
    ) -> Result<()> {
        let kind = self
            .catalog
            .get(metric)
            .map(|m| m.kind())
            .ok_or_else(|| Error::UnknownMetric(format!("#{}", metric.index())))?;

        let current = self.current.as_mut().ok_or(Error::NoSampleInProgress)?;
        current
            .readings
            .insert((metric, instance), Reading { value, kind });

        Ok(())
    }

    /// Compute the displayable value for a metric instance in the current
    /// sample. Returns `Ok(None)` if the current sample has no reading for it.
    pub fn compute_rate(
        &self,
        metric: &str,
        instance: Option<InstanceId>,
    ) -> Result<Option<RateResult>> {
        let id = self.catalog.id(metric)?;
        Ok(self.rate(id, instance))
    }

    pub(crate) fn rate(&self, metric: MetricId, instance: Option<InstanceId>) -> Option<RateResult> {
        let current = self.current.as_ref()?;
        let reading = current.readings.get(&(metric, instance))?;

        if reading.kind != MetricKind::Counter {
            return Some(RateResult {
                value: reading.value.clone(),
                absolute: false,
            });
        }

        let absolute = RateResult {
            value: reading.value.clone(),
            absolute: true,
        };

        let Some(previous) = self.previous.as_ref() else {
            return Some(absolute);
        };

        let Some(baseline) = previous.readings.get(&(metric, instance)) else {
            return Some(absolute);
        };

        // a clock that went backwards or stood still gives no usable rate
        let elapsed = match current.timestamp.duration_since(previous.timestamp) {
            Ok(elapsed) if !elapsed.is_zero() => elapsed.as_secs_f64(),
            _ => return Some(absolute),
        };

        match reading.value.delta(&baseline.value) {
            Some(delta) => Some(RateResult {
                value: Value::Float(delta / elapsed),
                absolute: false,
            }),
            None => Some(absolute),
        }
    }

    /// The reading in the current sample, without rate conversion.
    pub(crate) fn current(&self, metric: MetricId, instance: Option<InstanceId>) -> Option<RateResult> {
        let reading = self.current.as_ref()?.readings.get(&(metric, instance))?;

        Some(RateResult {
            value: reading.value.clone(),
            absolute: false,
        })
    }

    pub fn timestamp(&self) -> Option<SystemTime> {
        self.current.as_ref().map(|s| s.timestamp)
    }

    /// Time between the previous and the current sample, if both exist and
    /// the clock moved forward.
    pub fn elapsed(&self) -> Option<Duration> {
        let current = self.current.as_ref()?;
        let previous = self.previous.as_ref()?;
        current.timestamp.duration_since(previous.timestamp).ok()
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.previous = None;
    }
}
