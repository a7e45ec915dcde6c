use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use async_trait::async_trait;

use pulsegraph_common::{EntityKind, Pulse};

use crate::store::{GraphCounts, IndicatorStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPulse {
    pub name: String,
    pub description: String,
    pub created: String,
}

/// Full contents of a [`MemoryGraph`], comparable across writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphSnapshot {
    pub pulses: BTreeMap<String, StoredPulse>,
    pub nodes: BTreeSet<(EntityKind, String)>,
    pub edges: BTreeSet<(EntityKind, String, String)>,
}

/// In-process graph with the same merge semantics as the Cypher statements.
/// Used for `--dry-run` imports and for tests that need no database.
#[derive(Default)]
pub struct MemoryGraph {
    state: Mutex<GraphSnapshot>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GraphSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.state().clone()
    }

    pub fn pulse(&self, id: &str) -> Option<StoredPulse> {
        self.state().pulses.get(id).cloned()
    }

    pub fn has_node(&self, kind: EntityKind, value: &str) -> bool {
        self.state().nodes.contains(&(kind, value.to_string()))
    }

    pub fn has_edge(&self, kind: EntityKind, value: &str, pulse_id: &str) -> bool {
        self.state()
            .edges
            .contains(&(kind, value.to_string(), pulse_id.to_string()))
    }
}

#[async_trait]
impl IndicatorStore for MemoryGraph {
    async fn upsert_pulse(&self, pulse: &Pulse) -> Result<()> {
        self.state().pulses.insert(
            pulse.id.clone(),
            StoredPulse {
                name: pulse.name.clone(),
                description: pulse.description_or_empty().to_string(),
                created: pulse.created.clone(),
            },
        );
        Ok(())
    }

    async fn upsert_indicator(&self, kind: EntityKind, value: &str, pulse_id: &str) -> Result<()> {
        let mut state = self.state();
        state.nodes.insert((kind, value.to_string()));
        // MATCH on the pulse: no pulse, no edge.
        if state.pulses.contains_key(pulse_id) {
            state
                .edges
                .insert((kind, value.to_string(), pulse_id.to_string()));
        }
        Ok(())
    }

    async fn counts(&self) -> Result<GraphCounts> {
        let state = self.state();
        let mut by_kind: BTreeMap<EntityKind, u64> =
            EntityKind::ALL.iter().map(|k| (*k, 0)).collect();
        for (kind, _) in &state.nodes {
            *by_kind.entry(*kind).or_default() += 1;
        }

        Ok(GraphCounts {
            pulses: state.pulses.len() as u64,
            associations: state.edges.len() as u64,
            by_kind,
        })
    }
}
