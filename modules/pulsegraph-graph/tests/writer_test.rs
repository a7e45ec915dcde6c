#![cfg(feature = "test-utils")]

// Graph writer integration tests against a real Neo4j.
//
// Requirements: Docker (for Neo4j via testcontainers)
//
// Run with: cargo test -p pulsegraph-graph --features test-utils --test writer_test

use pulsegraph_common::{EntityKind, IndicatorRecord, Pulse};
use pulsegraph_graph::{query, write_pulse, GraphClient, GraphWriter};

async fn setup() -> (impl std::any::Any, GraphClient) {
    pulsegraph_graph::testutil::neo4j_container().await
}

fn pulse(id: &str, name: &str, indicators: Vec<IndicatorRecord>) -> Pulse {
    Pulse {
        id: id.into(),
        name: name.into(),
        description: None,
        created: "2024-01-01".into(),
        indicators,
    }
}

async fn read_pulse_prop(client: &GraphClient, id: &str, prop: &str) -> String {
    let cypher = format!("MATCH (p:Pulse {{id: $id}}) RETURN p.{prop} AS val");
    let q = query(&cypher).param("id", id);
    let mut stream = client.inner().execute(q).await.expect("query failed");
    match stream.next().await.expect("stream failed") {
        Some(row) => row.get::<String>("val").unwrap_or_default(),
        None => String::new(),
    }
}

#[tokio::test]
async fn scenario_one_pulse_one_ip_one_edge() {
    let (_c, client) = setup().await;
    let writer = GraphWriter::new(client.clone());

    let p1 = pulse(
        "p1",
        "Test",
        vec![
            IndicatorRecord::new("IPv4", "1.2.3.4"),
            IndicatorRecord::new("bogus", "x"),
        ],
    );
    let stats = write_pulse(&writer, &p1).await.expect("write failed");
    assert_eq!(stats.indicators_written, 1);
    assert_eq!(stats.unsupported, 1);

    let counts = writer.counts().await.expect("counts failed");
    assert_eq!(counts.pulses, 1);
    assert_eq!(counts.indicators(), 1);
    assert_eq!(counts.by_kind[&EntityKind::Ip], 1);
    assert_eq!(counts.associations, 1);

    assert_eq!(read_pulse_prop(&client, "p1", "name").await, "Test");
    assert_eq!(read_pulse_prop(&client, "p1", "description").await, "");
}

#[tokio::test]
async fn reimport_is_idempotent() {
    let (_c, client) = setup().await;
    let writer = GraphWriter::new(client);

    let p = pulse(
        "p1",
        "Test",
        vec![
            IndicatorRecord::new("domain", "evil.example"),
            IndicatorRecord::new("FileHash-SHA256", "abc123"),
            IndicatorRecord::new("CVE", "CVE-2024-1234"),
        ],
    );

    write_pulse(&writer, &p).await.expect("first write failed");
    let once = writer.counts().await.expect("counts failed");

    write_pulse(&writer, &p).await.expect("second write failed");
    let twice = writer.counts().await.expect("counts failed");

    assert_eq!(once, twice);
    assert_eq!(twice.associations, 3);
}

#[tokio::test]
async fn shared_indicator_resolves_to_one_node() {
    let (_c, client) = setup().await;
    let writer = GraphWriter::new(client);

    let a = pulse("a", "A", vec![IndicatorRecord::new("hostname", "c2.example")]);
    let b = pulse("b", "B", vec![IndicatorRecord::new("Hostname", "c2.example")]);
    write_pulse(&writer, &a).await.expect("write a failed");
    write_pulse(&writer, &b).await.expect("write b failed");

    let counts = writer.counts().await.expect("counts failed");
    assert_eq!(counts.by_kind[&EntityKind::Hostname], 1);
    assert_eq!(counts.associations, 2);
}

#[tokio::test]
async fn latest_import_wins_for_pulse_fields() {
    let (_c, client) = setup().await;
    let writer = GraphWriter::new(client.clone());

    writer
        .upsert_pulse(&pulse("p1", "Old name", vec![]))
        .await
        .expect("upsert failed");
    writer
        .upsert_pulse(&Pulse {
            description: Some("updated".into()),
            created: "2024-06-01".into(),
            ..pulse("p1", "New name", vec![])
        })
        .await
        .expect("upsert failed");

    assert_eq!(read_pulse_prop(&client, "p1", "name").await, "New name");
    assert_eq!(read_pulse_prop(&client, "p1", "description").await, "updated");
    assert_eq!(read_pulse_prop(&client, "p1", "created").await, "2024-06-01");
    assert_eq!(writer.counts().await.expect("counts failed").pulses, 1);
}

#[tokio::test]
async fn values_with_quotes_are_stored_verbatim() {
    let (_c, client) = setup().await;
    let writer = GraphWriter::new(client.clone());

    let rule = "rule x { strings: $a = \"it's\" condition: $a }";
    let p = pulse("p1", "Yara", vec![IndicatorRecord::new("YARA", rule)]);
    write_pulse(&writer, &p).await.expect("write failed");

    let q = query("MATCH (n:YARARule)-[:ASSOCIATED_WITH]->(:Pulse {id: $id}) RETURN n.rule AS rule")
        .param("id", "p1");
    let mut stream = client.inner().execute(q).await.expect("query failed");
    let row = stream.next().await.expect("stream failed").expect("no row");
    let stored: String = row.get("rule").expect("missing rule");
    assert_eq!(stored, rule);
}
