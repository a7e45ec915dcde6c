use pulsegraph_common::Pulse;
use serde::Deserialize;

use crate::OtxError;

/// One page of `/pulses/subscribed`. A missing `results` array reads as empty.
#[derive(Debug, Deserialize)]
pub(crate) struct PulsePage {
    #[serde(default)]
    pub results: Vec<Pulse>,
}

/// Why the fetch loop stopped requesting pages.
#[derive(Debug)]
pub enum FetchStop {
    /// A page came back with no results. Normal end of feed.
    Exhausted { page: u32 },
    /// Every attempt for a page failed. Pulses from earlier pages are kept.
    Failed {
        page: u32,
        attempts: u32,
        error: OtxError,
    },
    /// All requested pages returned data.
    PageLimit,
}

impl FetchStop {
    pub fn is_failure(&self) -> bool {
        matches!(self, FetchStop::Failed { .. })
    }
}

impl std::fmt::Display for FetchStop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStop::Exhausted { page } => write!(f, "feed exhausted at page {page}"),
            FetchStop::Failed {
                page,
                attempts,
                error,
            } => write!(f, "page {page} failed after {attempts} attempts: {error}"),
            FetchStop::PageLimit => write!(f, "page limit reached"),
        }
    }
}

/// Result of a full paginated fetch: the pulses in feed order plus how it ended.
#[derive(Debug)]
pub struct FetchReport {
    pub pulses: Vec<Pulse>,
    pub pages_fetched: u32,
    pub stop: FetchStop,
}
