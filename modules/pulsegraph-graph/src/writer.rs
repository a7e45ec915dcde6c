use anyhow::Result;
use async_trait::async_trait;
use neo4rs::query;
use tracing::debug;

use pulsegraph_common::{EntityKind, Pulse};

use crate::store::{GraphCounts, IndicatorStore};
use crate::GraphClient;

/// Write-side wrapper for the graph. Every statement is a fixed MERGE with
/// values bound as parameters.
pub struct GraphWriter {
    client: GraphClient,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Create or update a Pulse node. MERGE on id; the remaining fields are
    /// overwritten so the latest import wins.
    pub async fn upsert_pulse(&self, pulse: &Pulse) -> Result<(), neo4rs::Error> {
        let q = query(
            "MERGE (p:Pulse {id: $id})
             SET p.name = $name,
                 p.description = $description,
                 p.created = $created",
        )
        .param("id", pulse.id.as_str())
        .param("name", pulse.name.as_str())
        .param("description", pulse.description_or_empty())
        .param("created", pulse.created.as_str());

        self.client.graph.run(q).await?;
        debug!(pulse_id = pulse.id.as_str(), "Pulse node upserted");
        Ok(())
    }

    /// Merge an indicator node on its identity attribute and link it to the
    /// pulse. Nothing else on an existing indicator node is touched.
    pub async fn upsert_indicator(
        &self,
        kind: EntityKind,
        value: &str,
        pulse_id: &str,
    ) -> Result<(), neo4rs::Error> {
        let q = query(indicator_statement(kind))
            .param("value", value)
            .param("pulse_id", pulse_id);

        self.client.graph.run(q).await?;
        debug!(kind = kind.label(), value, pulse_id, "Indicator linked to pulse");
        Ok(())
    }

    /// Count pulses, indicator nodes per kind, and ASSOCIATED_WITH edges.
    pub async fn counts(&self) -> Result<GraphCounts, neo4rs::Error> {
        let mut counts = GraphCounts {
            pulses: self.count("MATCH (p:Pulse) RETURN count(p) AS n").await?,
            associations: self
                .count("MATCH ()-[r:ASSOCIATED_WITH]->(:Pulse) RETURN count(r) AS n")
                .await?,
            ..GraphCounts::default()
        };

        for kind in EntityKind::ALL {
            let n = self.count(count_statement(kind)).await?;
            counts.by_kind.insert(kind, n);
        }

        Ok(counts)
    }

    async fn count(&self, cypher: &str) -> Result<u64, neo4rs::Error> {
        let mut stream = self.client.graph.execute(query(cypher)).await?;
        let n = match stream.next().await? {
            Some(row) => row
                .get::<i64>("n")
                .map_err(neo4rs::Error::DeserializationError)?,
            None => 0,
        };
        Ok(n.max(0) as u64)
    }
}

/// One MERGE statement per entity kind. Labels and identity keys cannot be
/// bound as parameters, so they come from this closed table.
fn indicator_statement(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Ip => {
            "MERGE (n:IP {address: $value})
             WITH n
             MATCH (p:Pulse {id: $pulse_id})
             MERGE (n)-[:ASSOCIATED_WITH]->(p)"
        }
        EntityKind::Domain => {
            "MERGE (n:Domain {name: $value})
             WITH n
             MATCH (p:Pulse {id: $pulse_id})
             MERGE (n)-[:ASSOCIATED_WITH]->(p)"
        }
        EntityKind::Url => {
            "MERGE (n:URL {url: $value})
             WITH n
             MATCH (p:Pulse {id: $pulse_id})
             MERGE (n)-[:ASSOCIATED_WITH]->(p)"
        }
        EntityKind::Hostname => {
            "MERGE (n:Hostname {name: $value})
             WITH n
             MATCH (p:Pulse {id: $pulse_id})
             MERGE (n)-[:ASSOCIATED_WITH]->(p)"
        }
        EntityKind::BitcoinAddress => {
            "MERGE (n:BitcoinAddress {addr: $value})
             WITH n
             MATCH (p:Pulse {id: $pulse_id})
             MERGE (n)-[:ASSOCIATED_WITH]->(p)"
        }
        EntityKind::FileHash => {
            "MERGE (n:FileHash {hash: $value})
             WITH n
             MATCH (p:Pulse {id: $pulse_id})
             MERGE (n)-[:ASSOCIATED_WITH]->(p)"
        }
        EntityKind::Cve => {
            "MERGE (n:CVE {id: $value})
             WITH n
             MATCH (p:Pulse {id: $pulse_id})
             MERGE (n)-[:ASSOCIATED_WITH]->(p)"
        }
        EntityKind::YaraRule => {
            "MERGE (n:YARARule {rule: $value})
             WITH n
             MATCH (p:Pulse {id: $pulse_id})
             MERGE (n)-[:ASSOCIATED_WITH]->(p)"
        }
    }
}

fn count_statement(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Ip => "MATCH (n:IP) RETURN count(n) AS n",
        EntityKind::Domain => "MATCH (n:Domain) RETURN count(n) AS n",
        EntityKind::Url => "MATCH (n:URL) RETURN count(n) AS n",
        EntityKind::Hostname => "MATCH (n:Hostname) RETURN count(n) AS n",
        EntityKind::BitcoinAddress => "MATCH (n:BitcoinAddress) RETURN count(n) AS n",
        EntityKind::FileHash => "MATCH (n:FileHash) RETURN count(n) AS n",
        EntityKind::Cve => "MATCH (n:CVE) RETURN count(n) AS n",
        EntityKind::YaraRule => "MATCH (n:YARARule) RETURN count(n) AS n",
    }
}

#[async_trait]
impl IndicatorStore for GraphWriter {
    async fn upsert_pulse(&self, pulse: &Pulse) -> Result<()> {
        Ok(self.upsert_pulse(pulse).await?)
    }

    async fn upsert_indicator(&self, kind: EntityKind, value: &str, pulse_id: &str) -> Result<()> {
        Ok(self.upsert_indicator(kind, value, pulse_id).await?)
    }

    async fn counts(&self) -> Result<GraphCounts> {
        Ok(self.counts().await?)
    }
}
