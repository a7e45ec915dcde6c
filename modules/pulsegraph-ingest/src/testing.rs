// Test mocks for the import pipeline.
//
// - MockFeed (PulseFeed): replays a fixed pulse list with a chosen stop reason
// - FailingStore (IndicatorStore): MemoryGraph that errors on one poisoned value
//
// Plus small constructors for pulses.

use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use otx_client::{FetchReport, FetchStop, OtxError};
use pulsegraph_common::{EntityKind, IndicatorRecord, Pulse};
use pulsegraph_graph::{GraphCounts, IndicatorStore, MemoryGraph};

use crate::traits::PulseFeed;

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

pub fn pulse(id: &str, indicators: &[(&str, &str)]) -> Pulse {
    Pulse {
        id: id.to_string(),
        name: format!("Pulse {id}"),
        description: None,
        created: "2024-01-01".to_string(),
        indicators: indicators
            .iter()
            .map(|(kind, value)| IndicatorRecord::new(kind, value))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// MockFeed
// ---------------------------------------------------------------------------

enum MockStop {
    Exhausted,
    Failed { page: u32 },
}

/// Returns the same pulses on every call. Records each `max_pages` it was asked for.
pub struct MockFeed {
    pulses: Vec<Pulse>,
    stop: MockStop,
    requests: Mutex<Vec<u32>>,
}

impl MockFeed {
    pub fn new(pulses: Vec<Pulse>) -> Self {
        Self {
            pulses,
            stop: MockStop::Exhausted,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// End the fetch as if `page` ran out of attempts.
    pub fn failing_at(mut self, page: u32) -> Self {
        self.stop = MockStop::Failed { page };
        self
    }

    pub fn requests(&self) -> Vec<u32> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PulseFeed for MockFeed {
    async fn fetch_all(&self, max_pages: u32) -> FetchReport {
        self.requests.lock().unwrap().push(max_pages);

        let pages_fetched = u32::from(!self.pulses.is_empty());
        let stop = match self.stop {
            MockStop::Exhausted => FetchStop::Exhausted {
                page: pages_fetched + 1,
            },
            MockStop::Failed { page } => FetchStop::Failed {
                page,
                attempts: 3,
                error: OtxError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                },
            },
        };

        FetchReport {
            pulses: self.pulses.clone(),
            pages_fetched,
            stop,
        }
    }
}

// ---------------------------------------------------------------------------
// FailingStore
// ---------------------------------------------------------------------------

/// In-memory store that refuses to write one indicator value, standing in
/// for a dropped connection mid-run.
pub struct FailingStore {
    pub inner: MemoryGraph,
    poison: String,
}

impl FailingStore {
    pub fn new(poison: &str) -> Self {
        Self {
            inner: MemoryGraph::new(),
            poison: poison.to_string(),
        }
    }
}

#[async_trait]
impl IndicatorStore for FailingStore {
    async fn upsert_pulse(&self, pulse: &Pulse) -> Result<()> {
        self.inner.upsert_pulse(pulse).await
    }

    async fn upsert_indicator(&self, kind: EntityKind, value: &str, pulse_id: &str) -> Result<()> {
        if value == self.poison {
            bail!("connection reset while writing {value}");
        }
        self.inner.upsert_indicator(kind, value, pulse_id).await
    }

    async fn counts(&self) -> Result<GraphCounts> {
        self.inner.counts().await
    }
}
