//! A scripted metric source for tests.

use super::*;
use crate::{Error, MetricCatalog};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) enum Step {
    Fetch(Fetch),
    Fail(Error),
    /// Sleep before answering, to simulate a slow source.
    Slow(Duration, Fetch),
}

pub(crate) struct ScriptedSource {
    catalog: MetricCatalog,
    steps: VecDeque<Step>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(catalog: MetricCatalog) -> Self {
        Self {
            catalog,
            steps: VecDeque::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn then(mut self, step: Step) -> Self {
        self.steps.push_back(step);
        self
    }

    /// Shared counter of `fetch` calls, readable after the source has been
    /// moved into a scheduler.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl MetricSource for ScriptedSource {
    fn describe(&self, name: &str) -> Result<MetricDescriptor> {
        self.catalog.lookup(name).cloned()
    }

    async fn fetch(&mut self, _names: &[String]) -> Result<Fetch> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.steps.pop_front() {
            Some(Step::Fetch(fetch)) => Ok(fetch),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Slow(delay, fetch)) => {
                tokio::time::sleep(delay).await;
                Ok(fetch)
            }
            None => Err(Error::SourceUnavailable("script exhausted".into())),
        }
    }
}

/// A fetch of `net.bytes` for eth0 (id 1) and eth1 (id 2).
pub(crate) fn net_bytes(eth0: u64, eth1: u64) -> Fetch {
    let mut fetch = Fetch::new();
    fetch
        .instance("net.bytes", InstanceId(1), Some("eth0".into()), eth0)
        .instance("net.bytes", InstanceId(2), Some("eth1".into()), eth1);
    fetch
}
