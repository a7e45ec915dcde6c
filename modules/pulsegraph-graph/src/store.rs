// Write-side seam between the upsert algorithm and a concrete graph.
//
// GraphWriter is the Neo4j implementation; MemoryGraph backs dry runs and
// tests. Both must give MERGE semantics: nodes keyed by (kind, value),
// pulses keyed by id, at most one edge per (indicator, pulse) pair.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use pulsegraph_common::{EntityKind, Pulse};

#[async_trait]
pub trait IndicatorStore: Send + Sync {
    /// Create-or-match the Pulse node by id and overwrite name, description, created.
    async fn upsert_pulse(&self, pulse: &Pulse) -> Result<()>;

    /// Create-or-match the indicator node by its identity attribute, then
    /// create-or-match its ASSOCIATED_WITH edge to the pulse.
    async fn upsert_indicator(&self, kind: EntityKind, value: &str, pulse_id: &str) -> Result<()>;

    /// Current node and edge totals.
    async fn counts(&self) -> Result<GraphCounts>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphCounts {
    pub pulses: u64,
    pub associations: u64,
    pub by_kind: BTreeMap<EntityKind, u64>,
}

impl GraphCounts {
    pub fn indicators(&self) -> u64 {
        self.by_kind.values().sum()
    }
}

impl std::fmt::Display for GraphCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Graph Contents ===")?;
        writeln!(f, "Pulses:        {}", self.pulses)?;
        writeln!(f, "Indicators:    {}", self.indicators())?;
        writeln!(f, "Associations:  {}", self.associations)?;
        writeln!(f, "\nBy kind:")?;
        for kind in EntityKind::ALL {
            let n = self.by_kind.get(&kind).copied().unwrap_or(0);
            writeln!(f, "  {:<15} {}", kind.label(), n)?;
        }
        Ok(())
    }
}
