//! Filtering and ranking of a tick's results.
//!
//! Everything here is a pure function over a slice of [`ResultEntry`]s. None
//! of it touches the sample store or the instance trackers.

use crate::config::Filter as FilterConfig;
use crate::{Error, InstanceId, MetricCatalog, MetricKind, ResultEntry, Result, Value};
use regex::Regex;
use std::collections::{HashMap, HashSet};

pub const TOTAL: &str = "total";

/// A set of anchored instance name patterns. A name is kept if any pattern
/// matches it completely.
#[derive(Clone, Debug)]
pub struct NamePattern {
    regexes: Vec<Regex>,
}

impl NamePattern {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let regexes = patterns
            .iter()
            .map(|p| Regex::new(&format!(r"\A(?:{})\z", p.as_ref())))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { regexes })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regexes.iter().any(|r| r.is_match(name))
    }
}

/// Keep scalar entries and the instances whose display name matches.
/// Nameless (transient) instances never match.
pub fn filter_by_name(entries: &[ResultEntry], pattern: &NamePattern) -> Vec<ResultEntry> {
    entries
        .iter()
        .filter(|e| e.is_scalar() || e.name.as_deref().is_some_and(|n| pattern.matches(n)))
        .cloned()
        .collect()
}

/// Drop numeric values outside `[min, max]`. Text values are exempt.
pub fn filter_by_threshold(
    entries: &[ResultEntry],
    min: Option<f64>,
    max: Option<f64>,
) -> Vec<ResultEntry> {
    entries
        .iter()
        .filter(|e| within(e, min, max))
        .cloned()
        .collect()
}

fn within(entry: &ResultEntry, min: Option<f64>, max: Option<f64>) -> bool {
    let Some(value) = entry.value.as_f64() else {
        return true;
    };

    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

/// Drop instances reported without a display name.
pub fn drop_transient(entries: &[ResultEntry]) -> Vec<ResultEntry> {
    entries
        .iter()
        .filter(|e| e.instance.is_none() || e.name.is_some())
        .cloned()
        .collect()
}

/// Keep the top (or bottom) `n` instances of every metric, ordered by value.
/// The sort is stable so ties keep their source order. Metrics with text
/// values are passed through untouched.
pub fn rank(entries: &[ResultEntry], n: usize, descending: bool) -> Vec<ResultEntry> {
    let mut ranked = Vec::with_capacity(entries.len());

    for group in group_by_metric(entries) {
        ranked.extend(rank_group(group, n, descending));
    }

    ranked
}

fn rank_group(mut group: Vec<&ResultEntry>, n: usize, descending: bool) -> Vec<ResultEntry> {
    if group.iter().any(|e| !e.value.is_numeric()) {
        return group.into_iter().cloned().collect();
    }

    group.sort_by(|a, b| {
        let a = a.value.as_f64().unwrap_or(f64::NAN);
        let b = b.value.as_f64().unwrap_or(f64::NAN);

        if descending {
            b.total_cmp(&a)
        } else {
            a.total_cmp(&b)
        }
    });

    group.into_iter().take(n).cloned().collect()
}

/// Sum all values of `metric` into a single `total` pseudo-instance.
/// Returns `Ok(None)` if the metric has no entries.
pub fn aggregate_total(entries: &[ResultEntry], metric: &str) -> Result<Option<ResultEntry>> {
    let mut matching = entries.iter().filter(|e| e.metric == metric).peekable();

    let Some(first) = matching.peek() else {
        return Ok(None);
    };

    if first.kind == MetricKind::Discrete {
        return Err(Error::NotAggregatable(metric.to_string()));
    }

    let kind = first.kind;
    let mut sum = 0.0;
    let mut absolute = false;

    for entry in matching {
        if let Some(v) = entry.value.as_f64() {
            sum += v;
        }
        absolute |= entry.absolute;
    }

    Ok(Some(ResultEntry {
        metric: metric.to_string(),
        instance: None,
        name: Some(TOTAL.to_string()),
        value: Value::Float(sum),
        kind,
        absolute,
    }))
}

/// Rank each predicate metric, then restrict every other metric of a
/// predicate's instance domain to the instances that made the cut for any
/// predicate of that domain. Metrics outside those domains are ranked on
/// their own.
pub fn rank_by_predicate<S: AsRef<str>>(
    entries: &[ResultEntry],
    catalog: &MetricCatalog,
    predicates: &[S],
    n: usize,
    descending: bool,
) -> Result<Vec<ResultEntry>> {
    let mut chosen: HashMap<&str, Vec<ResultEntry>> = HashMap::new();
    let mut keep: HashMap<&str, HashSet<InstanceId>> = HashMap::new();

    for predicate in predicates {
        let predicate = predicate.as_ref();
        check_predicate(catalog, predicate)?;

        let ranked = rank_group(
            entries.iter().filter(|e| e.metric == predicate).collect(),
            n,
            descending,
        );

        if let Some(domain) = catalog.lookup(predicate)?.instance_domain() {
            keep.entry(domain)
                .or_default()
                .extend(ranked.iter().filter_map(|e| e.instance));
        }

        chosen.insert(predicate, ranked);
    }

    let mut ranked = Vec::with_capacity(entries.len());

    for group in group_by_metric(entries) {
        let metric = group[0].metric.as_str();

        if let Some(chosen) = chosen.remove(metric) {
            ranked.extend(chosen);
            continue;
        }

        let union = catalog
            .lookup(metric)
            .ok()
            .and_then(|d| d.instance_domain())
            .and_then(|domain| keep.get(domain));

        match union {
            Some(keep) => ranked.extend(
                group
                    .into_iter()
                    .filter(|e| e.instance.is_some_and(|i| keep.contains(&i)))
                    .cloned(),
            ),
            None => ranked.extend(rank_group(group, n, descending)),
        }
    }

    Ok(ranked)
}

fn check_predicate(catalog: &MetricCatalog, predicate: &str) -> Result<()> {
    let descriptor = catalog.lookup(predicate)?;

    if !descriptor.has_instances() {
        return Err(Error::Config(format!(
            "predicate metric must have instances: {predicate}"
        )));
    }

    if descriptor.kind() == MetricKind::Discrete {
        return Err(Error::Config(format!(
            "predicate metric values must be numeric: {predicate}"
        )));
    }

    Ok(())
}

/// Groups entries by metric, keeping the order in which metrics first appear.
fn group_by_metric(entries: &[ResultEntry]) -> Vec<Vec<&ResultEntry>> {
    let mut order: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<&ResultEntry>> = Vec::new();

    for entry in entries {
        let idx = *order.entry(entry.metric.as_str()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[idx].push(entry);
    }

    groups
}

/// The configured filtering pipeline applied to every tick:
///
/// 1. transient instances are dropped (unless kept)
/// 2. instance names are matched (after ranking when `rank_first` is set)
/// 3. thresholds are applied (predicate metrics after their ranking)
/// 4. totals are computed
/// 5. instances are ranked, by predicate if any are configured
///
/// Totals are placed after their metric's entries.
#[derive(Clone, Debug, Default)]
pub struct ResultFilter {
    names: Option<NamePattern>,
    rank_first: bool,
    min: Option<f64>,
    max: Option<f64>,
    rank: i64,
    predicates: Vec<String>,
    totals: Vec<String>,
    keep_transient: bool,
}

impl ResultFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FilterConfig, catalog: &MetricCatalog) -> Result<Self> {
        let mut filter = Self::new()
            .rank(config.rank())
            .rank_first(config.rank_first())
            .threshold(config.min(), config.max())
            .keep_transient(!config.ignore_transient());

        if !config.instances().is_empty() {
            filter = filter.instances(config.instances())?;
        }

        for predicate in config.predicates() {
            filter = filter.predicate(predicate);
        }

        for metric in config.totals() {
            filter = filter.total(metric);
        }

        filter.validate(catalog)?;

        Ok(filter)
    }

    pub fn instances<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.names = Some(NamePattern::new(patterns)?);
        Ok(self)
    }

    pub fn rank_first(mut self, rank_first: bool) -> Self {
        self.rank_first = rank_first;
        self
    }

    pub fn threshold(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Positive values keep the top `n` instances, negative values the
    /// bottom `n`. Zero disables ranking.
    pub fn rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }

    /// Rank instances by `metric`. May be given more than once.
    pub fn predicate(mut self, metric: impl Into<String>) -> Self {
        self.predicates.push(metric.into());
        self
    }

    pub fn total(mut self, metric: impl Into<String>) -> Self {
        self.totals.push(metric.into());
        self
    }

    pub fn keep_transient(mut self, keep: bool) -> Self {
        self.keep_transient = keep;
        self
    }

    /// Check referenced metrics against the catalog.
    pub fn validate(&self, catalog: &MetricCatalog) -> Result<()> {
        for predicate in &self.predicates {
            check_predicate(catalog, predicate)?;
        }

        for metric in &self.totals {
            if catalog.lookup(metric)?.kind() == MetricKind::Discrete {
                return Err(Error::NotAggregatable(metric.clone()));
            }
        }

        Ok(())
    }

    pub fn apply(&self, catalog: &MetricCatalog, entries: &[ResultEntry]) -> Result<Vec<ResultEntry>> {
        let mut entries = if self.keep_transient {
            entries.to_vec()
        } else {
            drop_transient(entries)
        };

        if let (Some(names), false) = (&self.names, self.rank_first) {
            entries = filter_by_name(&entries, names);
        }

        let predicates: &[String] = if self.rank != 0 { &self.predicates } else { &[] };
        let is_predicate = |e: &ResultEntry| predicates.contains(&e.metric);

        if self.min.is_some() || self.max.is_some() {
            entries.retain(|e| is_predicate(e) || within(e, self.min, self.max));
        }

        let mut totals = Vec::new();
        for metric in &self.totals {
            if let Some(total) = aggregate_total(&entries, metric)? {
                totals.push(total);
            }
        }

        if self.rank != 0 {
            let n = self.rank.unsigned_abs() as usize;
            let descending = self.rank > 0;

            entries = if predicates.is_empty() {
                rank(&entries, n, descending)
            } else {
                let mut ranked = rank_by_predicate(&entries, catalog, predicates, n, descending)?;
                ranked.retain(|e| !is_predicate(e) || within(e, self.min, self.max));
                ranked
            };
        }

        if let (Some(names), true) = (&self.names, self.rank_first) {
            entries = filter_by_name(&entries, names);
        }

        Ok(append_totals(entries, totals))
    }
}

fn append_totals(entries: Vec<ResultEntry>, mut totals: Vec<ResultEntry>) -> Vec<ResultEntry> {
    if totals.is_empty() {
        return entries;
    }

    let mut out = Vec::with_capacity(entries.len() + totals.len());

    for group in group_by_metric(&entries) {
        let metric = group[0].metric.clone();
        out.extend(group.into_iter().cloned());

        if let Some(idx) = totals.iter().position(|t| t.metric == metric) {
            out.push(totals.remove(idx));
        }
    }

    out.extend(totals);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(metric: &str, id: u32, name: &str, value: f64) -> ResultEntry {
        ResultEntry {
            metric: metric.to_string(),
            instance: Some(InstanceId(id)),
            name: Some(name.to_string()),
            value: Value::Float(value),
            kind: MetricKind::Counter,
            absolute: false,
        }
    }

    fn scalar(metric: &str, value: Value, kind: MetricKind) -> ResultEntry {
        ResultEntry {
            metric: metric.to_string(),
            instance: None,
            name: None,
            value,
            kind,
            absolute: false,
        }
    }

    fn net_bytes() -> Vec<ResultEntry> {
        vec![
            entry("net.bytes", 1, "eth0", 500.0),
            entry("net.bytes", 2, "eth1", 0.0),
        ]
    }

    fn names(entries: &[ResultEntry]) -> Vec<&str> {
        entries.iter().filter_map(|e| e.name.as_deref()).collect()
    }

    fn catalog() -> MetricCatalog {
        use crate::MetricDescriptor;

        let mut catalog = MetricCatalog::new();
        for name in ["net.in", "net.out"] {
            catalog
                .register_descriptor(
                    MetricDescriptor::new(name, MetricKind::Counter, true).domain("network.interface"),
                )
                .unwrap();
        }
        catalog
            .register_descriptor(MetricDescriptor::new("cpu.user", MetricKind::Counter, true).domain("cpu"))
            .unwrap();
        catalog
            .register("kernel.uname.release", MetricKind::Discrete, false)
            .unwrap();
        catalog
    }

    #[test]
    fn test_rank_top_one() {
        let ranked = rank(&net_bytes(), 1, true);

        assert_eq!(ranked, vec![entry("net.bytes", 1, "eth0", 500.0)]);
    }

    #[test]
    fn test_rank_bottom() {
        let ranked = rank(&net_bytes(), 1, false);

        assert_eq!(names(&ranked), vec!["eth1"]);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let entries = vec![
            entry("disk.read", 1, "sda", 10.0),
            entry("disk.read", 2, "sdb", 20.0),
            entry("disk.read", 3, "sdc", 10.0),
            entry("disk.read", 4, "sdd", 10.0),
        ];

        let ranked = rank(&entries, 3, true);
        assert_eq!(names(&ranked), vec!["sdb", "sda", "sdc"]);
    }

    #[test]
    fn test_rank_per_metric() {
        let mut entries = net_bytes();
        entries.push(entry("net.packets", 1, "eth0", 1.0));
        entries.push(entry("net.packets", 2, "eth1", 9.0));

        let ranked = rank(&entries, 1, true);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].metric, "net.bytes");
        assert_eq!(ranked[0].name.as_deref(), Some("eth0"));
        assert_eq!(ranked[1].metric, "net.packets");
        assert_eq!(ranked[1].name.as_deref(), Some("eth1"));
    }

    #[test]
    fn test_rank_leaves_text_alone() {
        let entries = vec![scalar("kernel.uname.release", Value::from("6.8.0"), MetricKind::Discrete)];

        assert_eq!(rank(&entries, 1, true), entries);
    }

    #[test]
    fn test_filter_by_name_is_anchored() {
        let entries = vec![
            entry("net.bytes", 1, "eth0", 1.0),
            entry("net.bytes", 2, "veth0", 1.0),
            entry("net.bytes", 3, "eth0.100", 1.0),
        ];

        let pattern = NamePattern::new(&["eth0"]).unwrap();
        assert_eq!(names(&filter_by_name(&entries, &pattern)), vec!["eth0"]);

        let pattern = NamePattern::new(&["eth.*"]).unwrap();
        assert_eq!(names(&filter_by_name(&entries, &pattern)), vec!["eth0", "eth0.100"]);
    }

    #[test]
    fn test_filter_by_name_alternation_is_anchored() {
        let entries = vec![
            entry("net.bytes", 1, "lo", 1.0),
            entry("net.bytes", 2, "eth0", 1.0),
            entry("net.bytes", 3, "eth1", 1.0),
        ];

        let pattern = NamePattern::new(&["lo|eth1"]).unwrap();
        assert_eq!(names(&filter_by_name(&entries, &pattern)), vec!["lo", "eth1"]);
    }

    #[test]
    fn test_filter_by_name_is_idempotent() {
        let pattern = NamePattern::new(&["eth1", "lo"]).unwrap();

        let once = filter_by_name(&net_bytes(), &pattern);
        let twice = filter_by_name(&once, &pattern);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_by_name_keeps_scalars_and_drops_transient() {
        let mut entries = net_bytes();
        entries.push(scalar("mem.util.free", Value::Unsigned(5), MetricKind::Gauge));
        entries.push(ResultEntry {
            name: None,
            ..entry("net.bytes", 3, "", 1.0)
        });

        let pattern = NamePattern::new(&[".*"]).unwrap();
        let filtered = filter_by_name(&entries, &pattern);

        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|e| e.instance != Some(InstanceId(3))));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(NamePattern::new(&["eth("]), Err(Error::InvalidPattern(_))));
    }

    #[test]
    fn test_threshold_exempts_text() {
        let mut entries = net_bytes();
        entries.push(scalar("kernel.uname.release", Value::from("6.8.0"), MetricKind::Discrete));

        let filtered = filter_by_threshold(&entries, Some(100.0), None);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].name.as_deref(), Some("eth0"));
        assert_eq!(filtered[1].metric, "kernel.uname.release");

        let filtered = filter_by_threshold(&entries, None, Some(0.0));
        assert_eq!(filtered[0].name.as_deref(), Some("eth1"));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let filtered = filter_by_threshold(&net_bytes(), Some(0.0), Some(500.0));
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_aggregate_total() {
        let total = aggregate_total(&net_bytes(), "net.bytes").unwrap().unwrap();

        assert_eq!(total.name.as_deref(), Some(TOTAL));
        assert_eq!(total.instance, None);
        assert_eq!(total.value, Value::Float(500.0));

        assert_eq!(aggregate_total(&net_bytes(), "net.packets").unwrap(), None);
    }

    #[test]
    fn test_aggregate_total_rejects_discrete() {
        let entries = vec![scalar("kernel.uname.release", Value::from("6.8.0"), MetricKind::Discrete)];

        assert!(matches!(
            aggregate_total(&entries, "kernel.uname.release"),
            Err(Error::NotAggregatable(_))
        ));
    }

    #[test]
    fn test_rank_by_predicate() {
        let catalog = catalog();
        let entries = vec![
            entry("net.in", 1, "eth0", 10.0),
            entry("net.in", 2, "eth1", 30.0),
            entry("net.in", 3, "eth2", 20.0),
            entry("net.out", 1, "eth0", 99.0),
            entry("net.out", 2, "eth1", 1.0),
            entry("net.out", 3, "eth2", 2.0),
            entry("cpu.user", 0, "cpu0", 1.0),
            entry("cpu.user", 1, "cpu1", 2.0),
        ];

        let ranked = rank_by_predicate(&entries, &catalog, &["net.in"], 2, true).unwrap();

        let net_in: Vec<_> = ranked.iter().filter(|e| e.metric == "net.in").collect();
        let net_out: Vec<_> = ranked.iter().filter(|e| e.metric == "net.out").collect();
        let cpu: Vec<_> = ranked.iter().filter(|e| e.metric == "cpu.user").collect();

        assert_eq!(net_in.iter().map(|e| e.instance.unwrap().0).collect::<Vec<_>>(), vec![2, 3]);
        // net.out follows the predicate's choice, not its own values
        assert_eq!(net_out.iter().map(|e| e.instance.unwrap().0).collect::<Vec<_>>(), vec![2, 3]);
        // cpu.user is in another domain and ranked on its own
        assert_eq!(cpu.len(), 2);
        assert_eq!(cpu[0].name.as_deref(), Some("cpu1"));
    }

    #[test]
    fn test_rank_by_several_predicates() {
        use crate::MetricDescriptor;

        let mut catalog = catalog();
        catalog
            .register_descriptor(
                MetricDescriptor::new("net.errors", MetricKind::Counter, true).domain("network.interface"),
            )
            .unwrap();

        let entries = vec![
            entry("net.in", 1, "eth0", 10.0),
            entry("net.in", 2, "eth1", 30.0),
            entry("net.in", 3, "eth2", 20.0),
            entry("net.out", 1, "eth0", 99.0),
            entry("net.out", 2, "eth1", 1.0),
            entry("net.out", 3, "eth2", 2.0),
            entry("net.errors", 1, "eth0", 0.0),
            entry("net.errors", 2, "eth1", 0.0),
            entry("net.errors", 3, "eth2", 5.0),
            entry("cpu.user", 0, "cpu0", 1.0),
            entry("cpu.user", 1, "cpu1", 2.0),
        ];

        let ranked = rank_by_predicate(&entries, &catalog, &["net.in", "net.out"], 1, true).unwrap();

        let ids = |metric: &str| -> Vec<u32> {
            ranked
                .iter()
                .filter(|e| e.metric == metric)
                .map(|e| e.instance.unwrap().0)
                .collect()
        };

        // each predicate keeps its own top instance
        assert_eq!(ids("net.in"), vec![2]);
        assert_eq!(ids("net.out"), vec![1]);
        // the rest of the domain shows the union, in its own order
        assert_eq!(ids("net.errors"), vec![1, 2]);
        assert_eq!(ids("cpu.user"), vec![1]);
    }

    #[test]
    fn test_pipeline_several_predicates() {
        let catalog = catalog();
        let entries = vec![
            entry("net.in", 1, "eth0", 10.0),
            entry("net.in", 2, "eth1", 30.0),
            entry("net.out", 1, "eth0", 99.0),
            entry("net.out", 2, "eth1", 1.0),
        ];

        let out = ResultFilter::new()
            .rank(1)
            .predicate("net.in")
            .predicate("net.out")
            .threshold(Some(20.0), None)
            .apply(&catalog, &entries)
            .unwrap();

        let found: Vec<_> = out
            .iter()
            .map(|e| (e.metric.as_str(), e.name.as_deref().unwrap_or_default()))
            .collect();

        assert_eq!(found, vec![("net.in", "eth1"), ("net.out", "eth0")]);

        assert!(matches!(
            ResultFilter::new()
                .predicate("net.in")
                .predicate("kernel.uname.release")
                .validate(&catalog),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_predicate_must_be_numeric_with_instances() {
        let catalog = catalog();

        assert!(matches!(
            ResultFilter::new().predicate("kernel.uname.release").validate(&catalog),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ResultFilter::new().predicate("net.missing").validate(&catalog),
            Err(Error::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_pipeline_rank_and_totals() {
        let catalog = catalog();
        let entries = vec![
            entry("net.in", 1, "eth0", 10.0),
            entry("net.in", 2, "eth1", 30.0),
            entry("net.in", 3, "eth2", 20.0),
        ];

        let filter = ResultFilter::new().rank(1).total("net.in");
        let out = filter.apply(&catalog, &entries).unwrap();

        assert_eq!(names(&out), vec!["eth1", TOTAL]);
        assert_eq!(out[1].value, Value::Float(60.0));
    }

    #[test]
    fn test_pipeline_drops_transient_by_default() {
        let catalog = catalog();
        let mut entries = net_bytes();
        entries.push(ResultEntry {
            name: None,
            ..entry("net.bytes", 3, "", 1.0)
        });

        let out = ResultFilter::new().apply(&catalog, &entries).unwrap();
        assert_eq!(out.len(), 2);

        let out = ResultFilter::new()
            .keep_transient(true)
            .apply(&catalog, &entries)
            .unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_pipeline_rank_first() {
        let catalog = catalog();
        let entries = vec![
            entry("net.in", 1, "eth0", 10.0),
            entry("net.in", 2, "lo", 30.0),
        ];

        // filter then rank: eth0 survives
        let out = ResultFilter::new()
            .rank(1)
            .instances(&["eth.*"])
            .unwrap()
            .apply(&catalog, &entries)
            .unwrap();
        assert_eq!(names(&out), vec!["eth0"]);

        // rank then filter: lo wins the ranking and is then filtered away
        let out = ResultFilter::new()
            .rank(1)
            .rank_first(true)
            .instances(&["eth.*"])
            .unwrap()
            .apply(&catalog, &entries)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_pipeline_predicate_threshold_after_rank() {
        let catalog = catalog();
        let entries = vec![
            entry("net.in", 1, "eth0", 10.0),
            entry("net.in", 2, "eth1", 30.0),
            entry("net.out", 1, "eth0", 500.0),
            entry("net.out", 2, "eth1", 500.0),
        ];

        let out = ResultFilter::new()
            .rank(2)
            .predicate("net.in")
            .threshold(Some(20.0), None)
            .apply(&catalog, &entries)
            .unwrap();

        let net_in: Vec<_> = out.iter().filter(|e| e.metric == "net.in").collect();
        let net_out: Vec<_> = out.iter().filter(|e| e.metric == "net.out").collect();

        assert_eq!(net_in.len(), 1);
        assert_eq!(net_out.len(), 2);
    }

    #[test]
    fn test_pipeline_does_not_mutate_input() {
        let catalog = catalog();
        let entries = net_bytes();

        let _ = ResultFilter::new().rank(1).apply(&catalog, &entries).unwrap();

        assert_eq!(entries, net_bytes());
    }
}
