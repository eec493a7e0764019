use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Opaque instance identifier. Stable within a single metric source
/// connection, but not across reconnects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live member of an instance domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instance {
    pub id: InstanceId,
    /// `None` for transient instances.
    pub name: Option<String>,
}

/// Tracks the instances of one multi-instance metric across samples.
///
/// The id is the identity key; display names are not assumed to be unique.
/// Names stay cached after an instance leaves the live set so a reappearing
/// id keeps its name even if the source omits it.
#[derive(Debug, Default)]
pub struct InstanceTracker {
    names: HashMap<InstanceId, Option<String>>,
    live: Vec<InstanceId>,
}

impl InstanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the live set with the freshly observed instances and return it
    /// in the order the source reported them.
    pub fn reconcile<I, N>(&mut self, observed: I) -> Vec<Instance>
    where
        I: IntoIterator<Item = (InstanceId, Option<N>)>,
        N: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut live = Vec::new();
        let mut instances = Vec::new();

        for (id, name) in observed {
            if !seen.insert(id) {
                continue;
            }

            let cached = self.names.entry(id).or_insert(None);

            if let Some(name) = name {
                *cached = Some(name.into());
            }

            live.push(id);
            instances.push(Instance {
                id,
                name: cached.clone(),
            });
        }

        for id in self.live.iter().filter(|id| !seen.contains(id)) {
            debug!("instance {id} departed");
        }

        let previous: HashSet<&InstanceId> = self.live.iter().collect();
        for id in live.iter().filter(|id| !previous.contains(id)) {
            debug!("instance {id} appeared");
        }

        self.live = live;

        instances
    }

    pub fn name(&self, id: InstanceId) -> Option<&str> {
        self.names.get(&id).and_then(|n| n.as_deref())
    }

    pub fn is_live(&self, id: InstanceId) -> bool {
        self.live.contains(&id)
    }

    pub fn live(&self) -> &[InstanceId] {
        &self.live
    }

    /// Forget everything. Used after the source reconnects, since ids are not
    /// stable across connections.
    pub fn reset(&mut self) {
        self.names.clear();
        self.live.clear();
    }
}
