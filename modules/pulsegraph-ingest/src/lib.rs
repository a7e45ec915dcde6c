pub mod pipeline;
pub mod summary;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use pipeline::{Pipeline, RunAborted, RunStats};
pub use summary::{summarize, FeedSummary};
pub use traits::PulseFeed;
