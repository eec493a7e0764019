use crate::{
    Error, Fetch, Instance, InstanceId, InstanceTracker, MetricCatalog, MetricId, RateResult,
    Result, ResultEntry, ResultFilter, SampleStore, SampledResult, Value,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace, warn};

/// The sampling context for one metric source: the catalog, one instance
/// tracker per multi-instance metric, the sample store and the result
/// filter. Independent sources need independent engines.
pub struct Engine {
    catalog: Arc<MetricCatalog>,
    trackers: HashMap<MetricId, InstanceTracker>,
    store: SampleStore,
    filter: ResultFilter,
    raw: HashSet<MetricId>,
}

impl Engine {
    pub fn new(catalog: MetricCatalog, filter: ResultFilter) -> Result<Self> {
        filter.validate(&catalog)?;

        let catalog = Arc::new(catalog);

        let trackers = catalog
            .iter()
            .filter(|(_, m)| m.has_instances())
            .map(|(id, _)| (id, InstanceTracker::new()))
            .collect();

        Ok(Self {
            store: SampleStore::new(catalog.clone()),
            catalog,
            trackers,
            filter,
            raw: HashSet::new(),
        })
    }

    /// Report the current value of `metric` instead of a rate.
    pub fn raw(mut self, metric: &str) -> Result<Self> {
        let id = self.catalog.id(metric)?;
        self.raw.insert(id);
        Ok(self)
    }

    /// Report current values for every metric. No rates are computed.
    pub fn raw_all(mut self) -> Self {
        self.raw.extend(self.catalog.iter().map(|(id, _)| id));
        self
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn tracker(&self, metric: &str) -> Result<Option<&InstanceTracker>> {
        let id = self.catalog.id(metric)?;
        Ok(self.trackers.get(&id))
    }

    /// Names of all catalog metrics, in catalog order.
    pub fn names(&self) -> Vec<String> {
        self.catalog.names()
    }

    /// Turn one fetch into one result.
    ///
    /// The fetch is validated against the catalog before the store is
    /// touched, so a rejected fetch never leaves a partially written sample.
    pub fn ingest(&mut self, timestamp: SystemTime, fetch: Fetch) -> Result<SampledResult> {
        let mut observed: HashMap<MetricId, Vec<(InstanceId, Option<String>)>> = HashMap::new();
        let mut readings: Vec<(MetricId, Option<InstanceId>, Value)> = Vec::with_capacity(fetch.len());
        let mut seen: HashSet<(MetricId, Option<InstanceId>)> = HashSet::with_capacity(fetch.len());

        for value in fetch.values {
            let id = self.catalog.id(&value.metric)?;
            let has_instances = self
                .catalog
                .get(id)
                .map(|m| m.has_instances())
                .ok_or_else(|| Error::UnknownMetric(value.metric.clone()))?;

            // the first reading of an instance wins
            if !seen.insert((id, value.instance)) {
                debug!("{}: duplicate reading, dropping", value.metric);
                continue;
            }

            match (has_instances, value.instance) {
                (true, Some(instance)) => {
                    observed.entry(id).or_default().push((instance, value.name));
                    readings.push((id, Some(instance), value.value));
                }
                (false, None) => readings.push((id, None, value.value)),
                (true, None) => {
                    warn!("{}: value without an instance, dropping", value.metric);
                }
                (false, Some(instance)) => {
                    warn!("{}: unexpected instance {instance}, dropping", value.metric);
                }
            }
        }

        let mut live: HashMap<MetricId, Vec<Instance>> = HashMap::with_capacity(self.trackers.len());

        for (id, tracker) in self.trackers.iter_mut() {
            let instances = observed.remove(id).unwrap_or_default();
            live.insert(*id, tracker.reconcile(instances));
        }

        self.store.begin_sample(timestamp);

        for (id, instance, value) in readings {
            self.store.record(id, instance, value)?;
        }

        let mut entries = Vec::new();

        for (id, metric) in self.catalog.iter() {
            if metric.has_instances() {
                for instance in live.get(&id).into_iter().flatten() {
                    if let Some(rate) = self.reading(id, Some(instance.id)) {
                        entries.push(ResultEntry {
                            metric: metric.name().to_string(),
                            instance: Some(instance.id),
                            name: instance.name.clone(),
                            value: rate.value,
                            kind: metric.kind(),
                            absolute: rate.absolute,
                        });
                    }
                }
            } else if let Some(rate) = self.reading(id, None) {
                entries.push(ResultEntry {
                    metric: metric.name().to_string(),
                    instance: None,
                    name: None,
                    value: rate.value,
                    kind: metric.kind(),
                    absolute: rate.absolute,
                });
            }
        }

        trace!("sample produced {} entries", entries.len());

        let entries = self.filter.apply(&self.catalog, &entries)?;

        Ok(SampledResult::new(timestamp, entries))
    }

    fn reading(&self, metric: MetricId, instance: Option<InstanceId>) -> Option<RateResult> {
        if self.raw.contains(&metric) {
            self.store.current(metric, instance)
        } else {
            self.store.rate(metric, instance)
        }
    }

    /// Forget all instance identities and both retained samples. The next
    /// sample is treated as the first.
    pub fn reset(&mut self) {
        for tracker in self.trackers.values_mut() {
            tracker.reset();
        }
        self.store.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::net_bytes;
    use crate::MetricKind;
    use std::time::{Duration, UNIX_EPOCH};

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    fn engine(filter: ResultFilter) -> Engine {
        let mut catalog = MetricCatalog::new();
        catalog.register("net.bytes", MetricKind::Counter, true).unwrap();
        catalog.register("mem.util.free", MetricKind::Gauge, false).unwrap();
        Engine::new(catalog, filter).unwrap()
    }

    fn values(result: &SampledResult) -> Vec<(&str, Option<&str>, Value)> {
        result
            .entries
            .iter()
            .map(|e| (e.metric.as_str(), e.name.as_deref(), e.value.clone()))
            .collect()
    }

    #[test]
    fn test_two_sample_scenario() {
        let mut engine = engine(ResultFilter::new());

        let first = engine.ingest(at(0), net_bytes(1000, 500)).unwrap();
        assert!(first.entries.iter().all(|e| e.absolute));
        assert_eq!(
            values(&first),
            vec![
                ("net.bytes", Some("eth0"), Value::Unsigned(1000)),
                ("net.bytes", Some("eth1"), Value::Unsigned(500)),
            ]
        );

        let second = engine.ingest(at(1), net_bytes(1500, 500)).unwrap();
        assert_eq!(
            values(&second),
            vec![
                ("net.bytes", Some("eth0"), Value::Float(500.0)),
                ("net.bytes", Some("eth1"), Value::Float(0.0)),
            ]
        );
    }

    #[test]
    fn test_two_sample_scenario_ranked() {
        let mut engine = engine(ResultFilter::new().rank(1));

        engine.ingest(at(0), net_bytes(1000, 500)).unwrap();
        let second = engine.ingest(at(1), net_bytes(1500, 500)).unwrap();

        assert_eq!(
            values(&second),
            vec![("net.bytes", Some("eth0"), Value::Float(500.0))]
        );
    }

    #[test]
    fn test_instance_disappears_and_returns() {
        let mut engine = engine(ResultFilter::new());

        engine.ingest(at(0), net_bytes(1000, 500)).unwrap();

        let mut only_eth1 = Fetch::new();
        only_eth1.instance("net.bytes", InstanceId(2), Some("eth1".into()), 600u64);
        let second = engine.ingest(at(1), only_eth1).unwrap();

        assert_eq!(values(&second), vec![("net.bytes", Some("eth1"), Value::Float(100.0))]);

        let third = engine.ingest(at(2), net_bytes(9000, 700)).unwrap();
        let eth0 = third.entries.iter().find(|e| e.name.as_deref() == Some("eth0")).unwrap();

        // not diffed against the first sample
        assert!(eth0.absolute);
        assert_eq!(eth0.value, Value::Unsigned(9000));

        let eth1 = third.entries.iter().find(|e| e.name.as_deref() == Some("eth1")).unwrap();
        assert_eq!(eth1.value, Value::Float(100.0));
    }

    #[test]
    fn test_scalar_values() {
        let mut engine = engine(ResultFilter::new());

        let mut fetch = Fetch::new();
        fetch.scalar("mem.util.free", 1024u64);

        let result = engine.ingest(at(0), fetch).unwrap();
        assert_eq!(values(&result), vec![("mem.util.free", None, Value::Unsigned(1024))]);
        assert!(!result.entries[0].absolute);
    }

    #[test]
    fn test_unknown_metric_leaves_store_untouched() {
        let mut engine = engine(ResultFilter::new());

        engine.ingest(at(0), net_bytes(1000, 500)).unwrap();

        let mut fetch = net_bytes(1500, 500);
        fetch.scalar("disk.all.read", 1u64);
        assert!(matches!(engine.ingest(at(1), fetch), Err(Error::UnknownMetric(_))));

        // the next good sample still diffs against the first
        let result = engine.ingest(at(2), net_bytes(2000, 500)).unwrap();
        assert_eq!(result.entries[0].value, Value::Float(500.0));
    }

    #[test]
    fn test_mismatched_instance_is_dropped() {
        let mut engine = engine(ResultFilter::new());

        let mut fetch = Fetch::new();
        fetch.instance("mem.util.free", InstanceId(1), None, 1u64);
        fetch.scalar("net.bytes", 1u64);

        let result = engine.ingest(at(0), fetch).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut engine = engine(ResultFilter::new());

        engine.ingest(at(0), net_bytes(1000, 500)).unwrap();
        engine.reset();

        let result = engine.ingest(at(1), net_bytes(1500, 500)).unwrap();
        assert!(result.entries.iter().all(|e| e.absolute));
        assert_eq!(
            engine.tracker("net.bytes").unwrap().unwrap().live(),
            &[InstanceId(1), InstanceId(2)]
        );
    }

    #[test]
    fn test_duplicate_instance_keeps_first_reading() {
        let mut catalog = MetricCatalog::new();
        catalog.register("net.bytes", MetricKind::Gauge, true).unwrap();
        let mut engine = Engine::new(catalog, ResultFilter::new()).unwrap();

        let mut fetch = Fetch::new();
        fetch
            .instance("net.bytes", InstanceId(1), Some("eth0".into()), 100u64)
            .instance("net.bytes", InstanceId(1), Some("eth0-dup".into()), 999u64);

        let result = engine.ingest(at(0), fetch).unwrap();
        assert_eq!(values(&result), vec![("net.bytes", Some("eth0"), Value::Unsigned(100))]);
    }

    #[test]
    fn test_raw_counter() {
        let mut catalog = MetricCatalog::new();
        catalog.register("net.bytes", MetricKind::Counter, true).unwrap();
        catalog.register("net.packets", MetricKind::Counter, true).unwrap();

        let mut engine = Engine::new(catalog, ResultFilter::new())
            .unwrap()
            .raw("net.bytes")
            .unwrap();

        let packets = |fetch: &mut Fetch, eth0: u64| {
            fetch.instance("net.packets", InstanceId(1), Some("eth0".into()), eth0);
        };

        let mut first = net_bytes(1000, 500);
        packets(&mut first, 10);
        let first = engine.ingest(at(0), first).unwrap();
        assert!(first.metric("net.bytes").all(|e| !e.absolute));

        let mut second = net_bytes(1500, 500);
        packets(&mut second, 30);
        let second = engine.ingest(at(1), second).unwrap();

        let bytes: Vec<_> = second.metric("net.bytes").map(|e| e.value.clone()).collect();
        assert_eq!(bytes, vec![Value::Unsigned(1500), Value::Unsigned(500)]);

        // other counters are still rates
        let packets: Vec<_> = second.metric("net.packets").map(|e| e.value.clone()).collect();
        assert_eq!(packets, vec![Value::Float(20.0)]);

        assert!(matches!(
            Engine::new(MetricCatalog::new(), ResultFilter::new()).unwrap().raw("net.bytes"),
            Err(Error::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_raw_all() {
        let mut engine = engine(ResultFilter::new()).raw_all();

        engine.ingest(at(0), net_bytes(1000, 500)).unwrap();
        let second = engine.ingest(at(1), net_bytes(1500, 500)).unwrap();

        assert_eq!(
            values(&second),
            vec![
                ("net.bytes", Some("eth0"), Value::Unsigned(1500)),
                ("net.bytes", Some("eth1"), Value::Unsigned(500)),
            ]
        );
    }

    #[test]
    fn test_invalid_filter() {
        let mut catalog = MetricCatalog::new();
        catalog.register("kernel.uname.release", MetricKind::Discrete, false).unwrap();

        let result = Engine::new(catalog, ResultFilter::new().total("kernel.uname.release"));
        assert!(matches!(result, Err(Error::NotAggregatable(_))));
    }
}
