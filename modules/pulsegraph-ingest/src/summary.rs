use std::collections::{BTreeMap, HashMap};

use pulsegraph_common::{EntityKind, Pulse};

const UNTITLED: &str = "Untitled Pulse";

/// Report-only view of a fetch: what came back, never written anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// (name, indicator count) per pulse, in feed order.
    pub pulses: Vec<(String, usize)>,
    pub total_indicators: usize,
    /// Raw feed type strings in first-seen order.
    pub by_type: Vec<(String, usize)>,
    pub by_kind: BTreeMap<EntityKind, usize>,
    pub unsupported: usize,
}

pub fn summarize(pulses: &[Pulse]) -> FeedSummary {
    let mut summary = FeedSummary::default();
    let mut type_index: HashMap<&str, usize> = HashMap::new();

    for pulse in pulses {
        let name = if pulse.name.is_empty() {
            UNTITLED.to_string()
        } else {
            pulse.name.clone()
        };
        summary.pulses.push((name, pulse.indicators.len()));
        summary.total_indicators += pulse.indicators.len();

        for record in &pulse.indicators {
            match type_index.get(record.kind.as_str()) {
                Some(&i) => summary.by_type[i].1 += 1,
                None => {
                    type_index.insert(record.kind.as_str(), summary.by_type.len());
                    summary.by_type.push((record.kind.clone(), 1));
                }
            }

            match record.classify().kind() {
                Some(kind) => *summary.by_kind.entry(kind).or_default() += 1,
                None => summary.unsupported += 1,
            }
        }
    }

    summary
}

impl std::fmt::Display for FeedSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nTotal pulses fetched: {}", self.pulses.len())?;
        writeln!(f, "\nSubscribed Pulse Details:")?;
        for (name, count) in &self.pulses {
            writeln!(f, " - {name} ({count} indicators)")?;
        }
        writeln!(f, "\nTotal Indicators: {}", self.total_indicators)?;
        writeln!(f, "\nIndicator Type Breakdown:")?;
        for (ioc_type, count) in &self.by_type {
            let label = if ioc_type.is_empty() { "(none)" } else { ioc_type };
            writeln!(f, " - {label}: {count}")?;
        }
        writeln!(f, "\nGraph Kind Breakdown:")?;
        for kind in EntityKind::ALL {
            let n = self.by_kind.get(&kind).copied().unwrap_or(0);
            writeln!(f, " - {}: {}", kind.label(), n)?;
        }
        writeln!(f, " - unsupported: {}", self.unsupported)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsegraph_common::IndicatorRecord;

    fn pulse(id: &str, name: &str, indicators: Vec<IndicatorRecord>) -> Pulse {
        Pulse {
            id: id.into(),
            name: name.into(),
            description: None,
            created: String::new(),
            indicators,
        }
    }

    #[test]
    fn counts_raw_types_in_first_seen_order() {
        let pulses = vec![
            pulse(
                "a",
                "Alpha",
                vec![
                    IndicatorRecord::new("URL", "http://x"),
                    IndicatorRecord::new("IPv4", "1.1.1.1"),
                    IndicatorRecord::new("URL", "http://y"),
                ],
            ),
            pulse(
                "b",
                "",
                vec![
                    IndicatorRecord::new("FileHash-MD5", "00"),
                    IndicatorRecord::new("email", "a@b.c"),
                ],
            ),
        ];

        let s = summarize(&pulses);
        assert_eq!(s.total_indicators, 5);
        assert_eq!(
            s.pulses,
            vec![("Alpha".to_string(), 3), ("Untitled Pulse".to_string(), 2)]
        );
        assert_eq!(
            s.by_type,
            vec![
                ("URL".to_string(), 2),
                ("IPv4".to_string(), 1),
                ("FileHash-MD5".to_string(), 1),
                ("email".to_string(), 1),
            ]
        );
        assert_eq!(s.by_kind[&EntityKind::Url], 2);
        assert_eq!(s.by_kind[&EntityKind::FileHash], 1);
        assert_eq!(s.unsupported, 1);
    }

    #[test]
    fn type_strings_are_counted_case_sensitively() {
        let pulses = vec![pulse(
            "a",
            "A",
            vec![
                IndicatorRecord::new("IPv4", "1.1.1.1"),
                IndicatorRecord::new("ipv4", "2.2.2.2"),
            ],
        )];

        let s = summarize(&pulses);
        assert_eq!(s.by_type.len(), 2);
        assert_eq!(s.by_kind[&EntityKind::Ip], 2);
    }

    #[test]
    fn empty_fetch_summarizes_to_zero() {
        let s = summarize(&[]);
        assert_eq!(s, FeedSummary::default());
        assert!(s.to_string().contains("Total Indicators: 0"));
    }
}
