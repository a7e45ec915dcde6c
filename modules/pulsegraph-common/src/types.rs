use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

// --- Feed Types ---

/// A named collection of indicators as returned by the OTX pulse feed.
///
/// `id` is the identity key. `created` is kept as the feed's opaque
/// timestamp string and written to the graph verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    pub id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub created: String,
    #[serde(default, deserialize_with = "indicator_list")]
    pub indicators: Vec<IndicatorRecord>,
}

impl Pulse {
    /// Description as written to the graph: absent and `null` both become "".
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Raw feed representation of one IOC. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    #[serde(rename = "type", default, deserialize_with = "string_or_empty")]
    pub kind: String,
    #[serde(rename = "indicator", default, deserialize_with = "string_or_none")]
    pub value: Option<String>,
}

impl IndicatorRecord {
    pub fn new(kind: &str, value: &str) -> Self {
        Self {
            kind: kind.to_string(),
            value: Some(value.to_string()),
        }
    }

    /// Stand-in for an entry the feed sent in a shape we cannot read.
    pub fn malformed() -> Self {
        Self {
            kind: String::new(),
            value: None,
        }
    }

    /// A record with no type string cannot be classified or reported as
    /// an unsupported type.
    pub fn has_kind(&self) -> bool {
        !self.kind.trim().is_empty()
    }

    /// The value used as the node's identity attribute, or `None` when the
    /// record carries no usable value. Non-blank values pass through untouched.
    pub fn identity_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.trim().is_empty())
    }

    pub fn classify(&self) -> Classification {
        classify(&self.kind)
    }
}

// --- Lenient field decoding ---
//
// One bad field or record must not fail the page it arrived on. Strings are
// kept; null, numbers and other shapes read as missing.

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseString {
    Text(String),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseRecord {
    Record(IndicatorRecord),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseList {
    List(Vec<LooseRecord>),
    Other(IgnoredAny),
}

fn string_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match LooseString::deserialize(deserializer)? {
        LooseString::Text(s) => Some(s),
        LooseString::Other(_) => None,
    })
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(string_or_none(deserializer)?.unwrap_or_default())
}

fn indicator_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<IndicatorRecord>, D::Error> {
    let records = match LooseList::deserialize(deserializer)? {
        LooseList::List(records) => records,
        LooseList::Other(_) => return Ok(Vec::new()),
    };

    Ok(records
        .into_iter()
        .map(|record| match record {
            LooseRecord::Record(record) => record,
            LooseRecord::Other(_) => IndicatorRecord::malformed(),
        })
        .collect())
}

// --- Entity Kinds ---

/// Graph node type an indicator is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Ip,
    Domain,
    Url,
    Hostname,
    BitcoinAddress,
    FileHash,
    Cve,
    YaraRule,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Ip,
        EntityKind::Domain,
        EntityKind::Url,
        EntityKind::Hostname,
        EntityKind::BitcoinAddress,
        EntityKind::FileHash,
        EntityKind::Cve,
        EntityKind::YaraRule,
    ];

    /// Node label in the graph.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Ip => "IP",
            EntityKind::Domain => "Domain",
            EntityKind::Url => "URL",
            EntityKind::Hostname => "Hostname",
            EntityKind::BitcoinAddress => "BitcoinAddress",
            EntityKind::FileHash => "FileHash",
            EntityKind::Cve => "CVE",
            EntityKind::YaraRule => "YARARule",
        }
    }

    /// Property that holds the node's identity value.
    pub fn identity_key(self) -> &'static str {
        match self {
            EntityKind::Ip => "address",
            EntityKind::Domain => "name",
            EntityKind::Url => "url",
            EntityKind::Hostname => "name",
            EntityKind::BitcoinAddress => "addr",
            EntityKind::FileHash => "hash",
            EntityKind::Cve => "id",
            EntityKind::YaraRule => "rule",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// --- Classification ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Entity(EntityKind),
    Unsupported,
}

impl Classification {
    pub fn kind(self) -> Option<EntityKind> {
        match self {
            Classification::Entity(kind) => Some(kind),
            Classification::Unsupported => None,
        }
    }
}

/// Every hash algorithm OTX reports ("FileHash-MD5", "FileHash-SHA256", ...)
/// shares this prefix.
const FILE_HASH_PREFIX: &str = "filehash";

/// Map a feed indicator type string onto an entity kind.
///
/// Matching is case-insensitive. The file-hash prefix test runs before the
/// exact-match table; anything else is `Unsupported`.
pub fn classify(type_str: &str) -> Classification {
    let normalized = type_str.to_lowercase();

    if normalized.starts_with(FILE_HASH_PREFIX) {
        return Classification::Entity(EntityKind::FileHash);
    }

    match normalized.as_str() {
        "ipv4" => Classification::Entity(EntityKind::Ip),
        "domain" => Classification::Entity(EntityKind::Domain),
        "url" => Classification::Entity(EntityKind::Url),
        "hostname" => Classification::Entity(EntityKind::Hostname),
        "bitcoinaddress" => Classification::Entity(EntityKind::BitcoinAddress),
        "cve" => Classification::Entity(EntityKind::Cve),
        "yara" => Classification::Entity(EntityKind::YaraRule),
        _ => Classification::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_types_classify_case_insensitively() {
        assert_eq!(classify("IPv4"), Classification::Entity(EntityKind::Ip));
        assert_eq!(classify("ipv4"), Classification::Entity(EntityKind::Ip));
        assert_eq!(classify("domain"), Classification::Entity(EntityKind::Domain));
        assert_eq!(classify("URL"), Classification::Entity(EntityKind::Url));
        assert_eq!(classify("hostname"), Classification::Entity(EntityKind::Hostname));
        assert_eq!(
            classify("BitcoinAddress"),
            Classification::Entity(EntityKind::BitcoinAddress)
        );
        assert_eq!(classify("CVE"), Classification::Entity(EntityKind::Cve));
        assert_eq!(classify("YARA"), Classification::Entity(EntityKind::YaraRule));
    }

    #[test]
    fn file_hash_matches_by_prefix() {
        for t in ["filehash_md5", "FileHash-SHA256", "filehash", "FileHash-SHA1", "FileHash-PEHASH"] {
            assert_eq!(classify(t), Classification::Entity(EntityKind::FileHash), "{t}");
        }
    }

    #[test]
    fn unknown_types_are_unsupported() {
        for t in ["bogus", "IPv6", "email", "", "hash-filehash", "ipv4 ", "Mutex", "CIDR", "domains"] {
            assert_eq!(classify(t), Classification::Unsupported, "{t:?}");
        }
    }

    #[test]
    fn every_kind_has_distinct_label() {
        let labels: std::collections::HashSet<_> =
            EntityKind::ALL.iter().map(|k| k.label()).collect();
        assert_eq!(labels.len(), EntityKind::ALL.len());
    }

    #[test]
    fn pulse_deserializes_with_optional_fields() {
        let json = serde_json::json!({
            "id": "p1",
            "name": "Test",
            "created": "2024-01-01",
            "indicators": [
                {"type": "IPv4", "indicator": "1.2.3.4"},
                {"type": "bogus"}
            ]
        });
        let pulse: Pulse = serde_json::from_value(json).unwrap();
        assert_eq!(pulse.description_or_empty(), "");
        assert_eq!(pulse.indicators.len(), 2);
        assert_eq!(pulse.indicators[0].identity_value(), Some("1.2.3.4"));
        assert_eq!(pulse.indicators[1].identity_value(), None);
    }

    #[test]
    fn null_description_reads_as_empty() {
        let json = serde_json::json!({"id": "p2", "description": null});
        let pulse: Pulse = serde_json::from_value(json).unwrap();
        assert_eq!(pulse.description_or_empty(), "");
        assert!(pulse.indicators.is_empty());
    }

    #[test]
    fn bad_fields_read_as_missing_instead_of_failing() {
        let json = serde_json::json!({
            "id": "p3",
            "name": null,
            "created": 1704067200,
            "description": ["not", "text"],
            "indicators": [
                {"type": "IPv4", "indicator": "1.2.3.4"},
                {"type": null, "indicator": "x"},
                {"type": "domain", "indicator": 123},
                "not-a-record",
                {"type": "CVE", "indicator": "CVE-2024-0001"}
            ]
        });
        let pulse: Pulse = serde_json::from_value(json).unwrap();

        assert_eq!(pulse.name, "");
        assert_eq!(pulse.created, "");
        assert_eq!(pulse.description_or_empty(), "");
        assert_eq!(pulse.indicators.len(), 5);

        assert_eq!(pulse.indicators[0].identity_value(), Some("1.2.3.4"));
        assert!(!pulse.indicators[1].has_kind());
        assert_eq!(pulse.indicators[2].kind, "domain");
        assert_eq!(pulse.indicators[2].identity_value(), None);
        assert_eq!(pulse.indicators[3], IndicatorRecord::malformed());
        assert_eq!(pulse.indicators[4].identity_value(), Some("CVE-2024-0001"));
    }

    #[test]
    fn null_indicator_list_reads_as_empty() {
        let json = serde_json::json!({"id": "p4", "indicators": null});
        let pulse: Pulse = serde_json::from_value(json).unwrap();
        assert!(pulse.indicators.is_empty());
    }

    #[test]
    fn blank_value_has_no_identity() {
        let record = IndicatorRecord::new("domain", "   ");
        assert_eq!(record.identity_value(), None);
    }
}
