// Trait seam for the feed side of the pipeline.
//
// OtxClient is the production feed; testing::MockFeed replays canned
// fetch results so the driver can be exercised without a network.
// The store side lives in pulsegraph_graph::IndicatorStore.

use async_trait::async_trait;

use otx_client::{FetchReport, OtxClient};

#[async_trait]
pub trait PulseFeed: Send + Sync {
    /// Fetch up to `max_pages` pages of pulses, in feed order.
    async fn fetch_all(&self, max_pages: u32) -> FetchReport;
}

#[async_trait]
impl PulseFeed for OtxClient {
    async fn fetch_all(&self, max_pages: u32) -> FetchReport {
        self.fetch_all_pulses(max_pages).await
    }
}
