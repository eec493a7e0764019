//! Parsers for the procfs files the source reads. Each takes the full file
//! contents and skips lines it does not understand.

use std::collections::HashMap;

const CPU_FIELDS: usize = 8;

/// Time spent in each CPU state, in clock ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    fn parse(fields: &[&str]) -> Option<Self> {
        let mut values = [0u64; CPU_FIELDS];

        // older kernels report fewer states; missing ones read as zero
        for (idx, field) in fields.iter().take(CPU_FIELDS).enumerate() {
            values[idx] = field.parse().ok()?;
        }

        Some(Self {
            user: values[0],
            nice: values[1],
            system: values[2],
            idle: values[3],
            iowait: values[4],
            irq: values[5],
            softirq: values[6],
            steal: values[7],
        })
    }
}

/// The parts of `/proc/stat` the source exposes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stat {
    pub total: Option<CpuTimes>,
    pub percpu: Vec<(u32, CpuTimes)>,
    pub intr: Option<u64>,
    pub ctxt: Option<u64>,
    pub processes: Option<u64>,
    pub running: Option<u64>,
    pub blocked: Option<u64>,
}

pub fn parse_stat(data: &str) -> Stat {
    let mut stat = Stat::default();

    for line in data.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();

        let Some((header, rest)) = parts.split_first() else {
            continue;
        };

        let first = || rest.first().and_then(|v| v.parse::<u64>().ok());

        match *header {
            "cpu" => stat.total = CpuTimes::parse(rest),
            "intr" => stat.intr = first(),
            "ctxt" => stat.ctxt = first(),
            "processes" => stat.processes = first(),
            "procs_running" => stat.running = first(),
            "procs_blocked" => stat.blocked = first(),
            header => {
                if let Some(Ok(id)) = header.strip_prefix("cpu").map(|id| id.parse::<u32>()) {
                    if let Some(times) = CpuTimes::parse(rest) {
                        stat.percpu.push((id, times));
                    }
                }
            }
        }
    }

    stat
}

/// Parse `/proc/meminfo` into a map of field name to value in KiB.
pub fn parse_meminfo(data: &str) -> HashMap<String, u64> {
    let mut fields = HashMap::new();

    for line in data.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };

        if let Some(Ok(value)) = rest.split_whitespace().next().map(|v| v.parse::<u64>()) {
            fields.insert(key.trim().to_string(), value);
        }
    }

    fields
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterfaceStats {
    pub name: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_drops: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_drops: u64,
}

/// Parse `/proc/net/dev`. Interfaces are returned in file order.
pub fn parse_net_dev(data: &str) -> Vec<InterfaceStats> {
    let mut interfaces = Vec::new();

    // the first two lines are column headers
    for line in data.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<u64> = match rest.split_whitespace().map(|v| v.parse()).collect() {
            Ok(values) => values,
            Err(_) => continue,
        };

        if values.len() < 12 {
            continue;
        }

        interfaces.push(InterfaceStats {
            name: name.trim().to_string(),
            rx_bytes: values[0],
            rx_packets: values[1],
            rx_errors: values[2],
            rx_drops: values[3],
            tx_bytes: values[8],
            tx_packets: values[9],
            tx_errors: values[10],
            tx_drops: values[11],
        });
    }

    interfaces
}

/// Parse the 1, 5 and 15 minute load averages from `/proc/loadavg`.
pub fn parse_loadavg(data: &str) -> Option<[f64; 3]> {
    let mut parts = data.split_whitespace().map(|v| v.parse::<f64>());

    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(one)), Some(Ok(five)), Some(Ok(fifteen))) => Some([one, five, fifteen]),
        _ => None,
    }
}
