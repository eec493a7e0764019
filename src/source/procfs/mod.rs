//! A metric source backed by the Linux procfs.

use super::*;
use crate::{Error, MetricKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

mod parse;

use parse::{parse_loadavg, parse_meminfo, parse_net_dev, parse_stat, CpuTimes, Stat};

const DEFAULT_HZ: u64 = 100;

/// Consecutive fetches an interface may be missing before its id is
/// forgotten.
const INTERFACE_RETENTION: u64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum ProcFile {
    Stat,
    Meminfo,
    NetDev,
    Loadavg,
    Release,
}

impl ProcFile {
    fn path(&self) -> &'static str {
        match self {
            Self::Stat => "stat",
            Self::Meminfo => "meminfo",
            Self::NetDev => "net/dev",
            Self::Loadavg => "loadavg",
            Self::Release => "sys/kernel/osrelease",
        }
    }
}

struct ProcMetric {
    name: &'static str,
    kind: MetricKind,
    domain: Option<&'static str>,
    file: ProcFile,
}

macro_rules! metric {
    ($name:literal, $kind:ident, $file:ident) => {
        ProcMetric {
            name: $name,
            kind: MetricKind::$kind,
            domain: None,
            file: ProcFile::$file,
        }
    };
    ($name:literal, $kind:ident, $file:ident, $domain:literal) => {
        ProcMetric {
            name: $name,
            kind: MetricKind::$kind,
            domain: Some($domain),
            file: ProcFile::$file,
        }
    };
}

static METRICS: &[ProcMetric] = &[
    metric!("kernel.all.cpu.user", Counter, Stat),
    metric!("kernel.all.cpu.nice", Counter, Stat),
    metric!("kernel.all.cpu.sys", Counter, Stat),
    metric!("kernel.all.cpu.idle", Counter, Stat),
    metric!("kernel.all.cpu.wait.total", Counter, Stat),
    metric!("kernel.all.cpu.irq", Counter, Stat),
    metric!("kernel.all.cpu.steal", Counter, Stat),
    metric!("kernel.percpu.cpu.user", Counter, Stat, "kernel.cpu"),
    metric!("kernel.percpu.cpu.sys", Counter, Stat, "kernel.cpu"),
    metric!("kernel.percpu.cpu.idle", Counter, Stat, "kernel.cpu"),
    metric!("kernel.all.pswitch", Counter, Stat),
    metric!("kernel.all.intr", Counter, Stat),
    metric!("kernel.all.sysfork", Counter, Stat),
    metric!("kernel.all.running", Gauge, Stat),
    metric!("kernel.all.blocked", Gauge, Stat),
    metric!("hinv.ncpu", Gauge, Stat),
    metric!("kernel.all.load", Gauge, Loadavg, "kernel.loadavg"),
    metric!("mem.util.total", Gauge, Meminfo),
    metric!("mem.util.free", Gauge, Meminfo),
    metric!("mem.util.available", Gauge, Meminfo),
    metric!("mem.util.buffers", Gauge, Meminfo),
    metric!("mem.util.cached", Gauge, Meminfo),
    metric!("network.interface.in.bytes", Counter, NetDev, "network.interface"),
    metric!("network.interface.in.packets", Counter, NetDev, "network.interface"),
    metric!("network.interface.in.errors", Counter, NetDev, "network.interface"),
    metric!("network.interface.in.drops", Counter, NetDev, "network.interface"),
    metric!("network.interface.out.bytes", Counter, NetDev, "network.interface"),
    metric!("network.interface.out.packets", Counter, NetDev, "network.interface"),
    metric!("network.interface.out.errors", Counter, NetDev, "network.interface"),
    metric!("network.interface.out.drops", Counter, NetDev, "network.interface"),
    metric!("kernel.uname.release", Discrete, Release),
];

fn find(name: &str) -> Result<&'static ProcMetric> {
    METRICS
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| Error::UnknownMetric(name.to_string()))
}

/// The file contents read for one fetch, parsed on demand.
#[derive(Default)]
struct Files {
    stat: Option<Stat>,
    meminfo: Option<HashMap<String, u64>>,
    net_dev: Option<Vec<parse::InterfaceStats>>,
    loadavg: Option<[f64; 3]>,
    release: Option<String>,
}

struct Interface {
    id: InstanceId,
    last_seen: u64,
}

/// Reads system metrics from a procfs mount.
///
/// Network interfaces get an instance id the first time they are seen. The
/// id sticks to the interface name while the interface keeps showing up. An
/// interface missing from [`INTERFACE_RETENTION`] fetches in a row is
/// forgotten and gets a fresh id if it comes back. Ids are never reused.
pub struct ProcSource {
    root: PathBuf,
    hz: u64,
    interfaces: HashMap<String, Interface>,
    next_interface: u32,
    fetches: u64,
}

impl ProcSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let hz = match sysconf::raw::sysconf(sysconf::raw::SysconfVariable::ScClkTck) {
            Ok(hz) if hz > 0 => hz as u64,
            _ => {
                warn!("failed to get system clock tick rate, assuming {DEFAULT_HZ}");
                DEFAULT_HZ
            }
        };

        Self::with_tick_rate(root, hz)
    }

    pub fn with_tick_rate(root: impl Into<PathBuf>, hz: u64) -> Self {
        Self {
            root: root.into(),
            hz: hz.max(1),
            interfaces: HashMap::new(),
            next_interface: 0,
            fetches: 0,
        }
    }

    /// Names of every metric this source provides.
    pub fn metrics() -> impl Iterator<Item = &'static str> {
        METRICS.iter().map(|m| m.name)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read(&self, file: ProcFile) -> Result<String> {
        let path = self.root.join(file.path());

        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", path.display())))
    }

    async fn load(&self, names: &[String]) -> Result<Files> {
        let mut needed = Vec::new();

        for name in names {
            let file = find(name)?.file;
            if !needed.contains(&file) {
                needed.push(file);
            }
        }

        let mut files = Files::default();

        for file in needed {
            let data = self.read(file).await?;

            match file {
                ProcFile::Stat => files.stat = Some(parse_stat(&data)),
                ProcFile::Meminfo => files.meminfo = Some(parse_meminfo(&data)),
                ProcFile::NetDev => files.net_dev = Some(parse_net_dev(&data)),
                ProcFile::Loadavg => files.loadavg = parse_loadavg(&data),
                ProcFile::Release => files.release = Some(data.trim().to_string()),
            }
        }

        Ok(files)
    }

    fn interface_id(&mut self, name: &str) -> InstanceId {
        if let Some(interface) = self.interfaces.get_mut(name) {
            interface.last_seen = self.fetches;
            return interface.id;
        }

        let id = InstanceId(self.next_interface);
        self.next_interface = self.next_interface.wrapping_add(1);

        debug!("new network interface: {name} (instance {id})");

        self.interfaces.insert(
            name.to_string(),
            Interface {
                id,
                last_seen: self.fetches,
            },
        );

        id
    }

    fn expire_interfaces(&mut self) {
        let fetches = self.fetches;

        self.interfaces.retain(|name, interface| {
            let expired = fetches - interface.last_seen >= INTERFACE_RETENTION;
            if expired {
                debug!("forgetting network interface: {name} (instance {})", interface.id);
            }
            !expired
        });
    }

    fn millis(&self, ticks: u64) -> u64 {
        ticks.saturating_mul(1000) / self.hz
    }

    fn cpu(&self, fetch: &mut Fetch, metric: &str, times: &CpuTimes, instance: Option<u32>) {
        let state = metric.rsplit_once(".cpu.").map(|(_, s)| s).unwrap_or_default();

        let ticks = match state {
            "user" => times.user,
            "nice" => times.nice,
            "sys" => times.system,
            "idle" => times.idle,
            "wait.total" => times.iowait,
            "irq" => times.irq.wrapping_add(times.softirq),
            "steal" => times.steal,
            _ => return,
        };

        match instance {
            Some(cpu) => {
                fetch.instance(metric, InstanceId(cpu), Some(format!("cpu{cpu}")), self.millis(ticks));
            }
            None => {
                fetch.scalar(metric, self.millis(ticks));
            }
        }
    }

    fn extract(&mut self, fetch: &mut Fetch, metric: &str, files: &Files) {
        if metric.starts_with("kernel.all.cpu.") {
            if let Some(total) = files.stat.as_ref().and_then(|s| s.total) {
                self.cpu(fetch, metric, &total, None);
            }
        } else if metric.starts_with("kernel.percpu.cpu.") {
            for (cpu, times) in files.stat.iter().flat_map(|s| s.percpu.iter()) {
                self.cpu(fetch, metric, times, Some(*cpu));
            }
        } else if let Some(field) = metric.strip_prefix("mem.util.") {
            let key = match field {
                "total" => "MemTotal",
                "free" => "MemFree",
                "available" => "MemAvailable",
                "buffers" => "Buffers",
                "cached" => "Cached",
                _ => return,
            };

            if let Some(value) = files.meminfo.as_ref().and_then(|m| m.get(key)) {
                fetch.scalar(metric, *value);
            }
        } else if let Some(field) = metric.strip_prefix("network.interface.") {
            for stats in files.net_dev.iter().flatten() {
                let value = match field {
                    "in.bytes" => stats.rx_bytes,
                    "in.packets" => stats.rx_packets,
                    "in.errors" => stats.rx_errors,
                    "in.drops" => stats.rx_drops,
                    "out.bytes" => stats.tx_bytes,
                    "out.packets" => stats.tx_packets,
                    "out.errors" => stats.tx_errors,
                    "out.drops" => stats.tx_drops,
                    _ => return,
                };

                let id = self.interface_id(&stats.name);
                fetch.instance(metric, id, Some(stats.name.clone()), value);
            }
        } else if metric == "kernel.all.load" {
            if let Some(load) = files.loadavg {
                for (minutes, value) in [1, 5, 15].into_iter().zip(load) {
                    fetch.instance(metric, InstanceId(minutes), Some(format!("{minutes} minute")), value);
                }
            }
        } else if metric == "kernel.uname.release" {
            if let Some(release) = &files.release {
                fetch.scalar(metric, release.as_str());
            }
        } else if let Some(stat) = &files.stat {
            let value = match metric {
                "kernel.all.pswitch" => stat.ctxt,
                "kernel.all.intr" => stat.intr,
                "kernel.all.sysfork" => stat.processes,
                "kernel.all.running" => stat.running,
                "kernel.all.blocked" => stat.blocked,
                "hinv.ncpu" => Some(stat.percpu.len() as u64),
                _ => None,
            };

            if let Some(value) = value {
                fetch.scalar(metric, value);
            }
        }
    }
}

#[async_trait]
impl MetricSource for ProcSource {
    fn describe(&self, name: &str) -> Result<MetricDescriptor> {
        let metric = find(name)?;

        let descriptor = MetricDescriptor::new(metric.name, metric.kind, metric.domain.is_some());

        Ok(match metric.domain {
            Some(domain) => descriptor.domain(domain),
            None => descriptor,
        })
    }

    async fn fetch(&mut self, names: &[String]) -> Result<Fetch> {
        self.fetches += 1;

        let files = self.load(names).await?;

        let mut fetch = Fetch::new();

        for name in names {
            self.extract(&mut fetch, name, &files);
        }

        if files.net_dev.is_some() {
            self.expire_interfaces();
        }

        Ok(fetch)
    }
}
