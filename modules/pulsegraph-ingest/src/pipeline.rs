use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use otx_client::{FetchReport, FetchStop};
use pulsegraph_common::EntityKind;
use pulsegraph_graph::{write_pulse, IndicatorStore, PulseWriteStats};

use crate::traits::PulseFeed;

/// Aggregate counts for one import run.
#[derive(Debug)]
pub struct RunStats {
    pub pages_fetched: u32,
    pub pulses_fetched: usize,
    pub pulses_written: usize,
    pub writes: PulseWriteStats,
    pub fetch_stop: FetchStop,
}

impl RunStats {
    fn new(pages_fetched: u32, pulses_fetched: usize, fetch_stop: FetchStop) -> Self {
        Self {
            pages_fetched,
            pulses_fetched,
            pulses_written: 0,
            writes: PulseWriteStats::default(),
            fetch_stop,
        }
    }

    pub fn indicators_seen(&self) -> u64 {
        self.writes.indicators_seen
    }

    pub fn indicators_written(&self) -> u64 {
        self.writes.indicators_written
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Import Run Complete ===")?;
        writeln!(f, "Pages fetched:       {}", self.pages_fetched)?;
        writeln!(f, "Fetch ended:         {}", self.fetch_stop)?;
        writeln!(f, "Pulses fetched:      {}", self.pulses_fetched)?;
        writeln!(f, "Pulses written:      {}", self.pulses_written)?;
        writeln!(f, "Indicators seen:     {}", self.writes.indicators_seen)?;
        writeln!(f, "Indicators written:  {}", self.writes.indicators_written)?;
        writeln!(f, "Unsupported types:   {}", self.writes.unsupported)?;
        writeln!(f, "Missing values:      {}", self.writes.malformed)?;
        writeln!(f, "\nBy kind:")?;
        for kind in EntityKind::ALL {
            let n = self.writes.by_kind.get(&kind).copied().unwrap_or(0);
            writeln!(f, "  {:<15} {}", kind.label(), n)?;
        }
        Ok(())
    }
}

/// A store failure ended the run. Carries how far the run got.
#[derive(Debug, Error)]
#[error(
    "import aborted after {} of {} pulses written; pulse {pulse_id} failed",
    .stats.pulses_written,
    .stats.pulses_fetched
)]
pub struct RunAborted {
    pub stats: RunStats,
    pub pulse_id: String,
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

/// Fetch every pulse from the feed, then write them one at a time in
/// fetch order.
pub struct Pipeline {
    feed: Arc<dyn PulseFeed>,
    store: Arc<dyn IndicatorStore>,
    max_pages: u32,
}

impl Pipeline {
    pub fn new(feed: Arc<dyn PulseFeed>, store: Arc<dyn IndicatorStore>, max_pages: u32) -> Self {
        Self {
            feed,
            store,
            max_pages,
        }
    }

    pub async fn run(&self) -> Result<RunStats, RunAborted> {
        let FetchReport {
            pulses,
            pages_fetched,
            stop,
        } = self.feed.fetch_all(self.max_pages).await;

        match &stop {
            FetchStop::Failed { page, error, .. } => warn!(
                page,
                error = %error,
                pulses = pulses.len(),
                "Fetch phase ended on a failed page; importing pulses gathered so far"
            ),
            _ => info!(pulses = pulses.len(), pages_fetched, "Fetch phase complete ({stop})"),
        }

        let mut stats = RunStats::new(pages_fetched, pulses.len(), stop);

        for pulse in &pulses {
            match write_pulse(self.store.as_ref(), pulse).await {
                Ok(written) => {
                    stats.pulses_written += 1;
                    stats.writes.absorb(&written);
                    info!(
                        pulse_id = pulse.id.as_str(),
                        name = pulse.name.as_str(),
                        indicators = written.indicators_seen,
                        written = written.indicators_written,
                        "Pulse imported"
                    );
                }
                Err(e) => {
                    error!(
                        pulse_id = pulse.id.as_str(),
                        pulses_written = stats.pulses_written,
                        error = %format!("{e:#}"),
                        "Graph write failed, aborting run"
                    );
                    return Err(RunAborted {
                        stats,
                        pulse_id: pulse.id.clone(),
                        source: e.into(),
                    });
                }
            }
        }

        Ok(stats)
    }
}
