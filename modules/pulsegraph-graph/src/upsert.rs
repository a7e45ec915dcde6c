use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::debug;

use pulsegraph_common::{Classification, EntityKind, Pulse};

use crate::store::IndicatorStore;

/// Per-pulse (or accumulated) write counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PulseWriteStats {
    pub indicators_seen: u64,
    pub indicators_written: u64,
    pub unsupported: u64,
    pub malformed: u64,
    pub by_kind: BTreeMap<EntityKind, u64>,
}

impl PulseWriteStats {
    pub fn absorb(&mut self, other: &PulseWriteStats) {
        self.indicators_seen += other.indicators_seen;
        self.indicators_written += other.indicators_written;
        self.unsupported += other.unsupported;
        self.malformed += other.malformed;
        for (kind, n) in &other.by_kind {
            *self.by_kind.entry(*kind).or_default() += n;
        }
    }

    fn record_written(&mut self, kind: EntityKind) {
        self.indicators_written += 1;
        *self.by_kind.entry(kind).or_default() += 1;
    }
}

/// Write one pulse and its indicators.
///
/// The pulse node goes first so indicator edges have something to attach to.
/// Each indicator is its own statement: unsupported types and records with
/// no type or no value are skipped, and a store error stops here without undoing the
/// indicators already written.
pub async fn write_pulse<S: IndicatorStore + ?Sized>(
    store: &S,
    pulse: &Pulse,
) -> Result<PulseWriteStats> {
    store
        .upsert_pulse(pulse)
        .await
        .with_context(|| format!("upsert pulse {}", pulse.id))?;

    let mut stats = PulseWriteStats::default();

    for record in &pulse.indicators {
        stats.indicators_seen += 1;

        if !record.has_kind() {
            stats.malformed += 1;
            debug!(pulse_id = pulse.id.as_str(), "Skipping indicator with no type");
            continue;
        }

        let kind = match record.classify() {
            Classification::Entity(kind) => kind,
            Classification::Unsupported => {
                stats.unsupported += 1;
                debug!(
                    pulse_id = pulse.id.as_str(),
                    kind = record.kind.as_str(),
                    "Skipping unsupported indicator type"
                );
                continue;
            }
        };

        let Some(value) = record.identity_value() else {
            stats.malformed += 1;
            debug!(
                pulse_id = pulse.id.as_str(),
                kind = kind.label(),
                "Skipping indicator with no value"
            );
            continue;
        };

        store
            .upsert_indicator(kind, value, &pulse.id)
            .await
            .with_context(|| format!("upsert {kind} {value:?} for pulse {}", pulse.id))?;
        stats.record_written(kind);
    }

    Ok(stats)
}
