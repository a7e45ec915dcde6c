pub mod client;
pub mod memory;
pub mod store;
pub mod upsert;
pub mod writer;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use client::GraphClient;
pub use memory::MemoryGraph;
pub use store::{GraphCounts, IndicatorStore};
pub use upsert::{write_pulse, PulseWriteStats};
pub use writer::GraphWriter;

pub use neo4rs::query;
