// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pretty and JSON rendering of check results and watch reports.

use colored::*;
use hdds_qos_lang::{EntityKind, EntityQos, PollReport};
use serde_json::{json, Value};

/// Per-kind policy listing for `check`.
pub fn format_entity_qos(qos: &EntityQos, kinds: &[EntityKind], delimiter: char) -> String {
    let mut out = String::new();
    for &kind in kinds {
        let Some(set) = qos.get(kind) else {
            continue;
        };
        out.push_str(&format!(
            "{} {} policy(ies)\n",
            format!("{}:", kind).cyan().bold(),
            set.len()
        ));
        for expr in set.to_expressions(delimiter) {
            out.push_str(&format!("  -q {}\n", expr));
        }
    }
    out
}

/// Warning lines for policies dropped from the selected kinds.
pub fn format_dropped(qos: &EntityQos, kinds: &[EntityKind]) -> Vec<String> {
    qos.dropped
        .iter()
        .filter(|d| kinds.contains(&d.kind))
        .map(|d| format!("{} The {}.", "warning:".yellow().bold(), d))
        .collect()
}

pub fn entity_qos_json(qos: &EntityQos, kinds: &[EntityKind], delimiter: char) -> Value {
    let entities: serde_json::Map<String, Value> = kinds
        .iter()
        .filter_map(|&kind| {
            qos.get(kind)
                .map(|set| (kind.to_string(), json!(set.to_expressions(delimiter))))
        })
        .collect();
    let dropped: Vec<Value> = qos
        .dropped
        .iter()
        .filter(|d| kinds.contains(&d.kind))
        .map(|d| json!({ "scope": d.scope, "kind": d.kind }))
        .collect();

    json!({ "entities": entities, "dropped": dropped })
}

/// One line per event of a watch report.
pub fn format_report(report: &PollReport) -> Vec<String> {
    let mut lines = Vec::new();

    for record in &report.appeared {
        lines.push(format!(
            "{} {} {} ({})",
            "+".green().bold(),
            record.kind.to_string().green(),
            record.key,
            record.name.cyan()
        ));
        if let Some(participant) = &record.participant_key {
            lines.push(format!("    {}", format!("participant: {}", participant).dimmed()));
        }
        for value in record.qos.iter() {
            lines.push(format!("    {}", value.to_string().dimmed()));
        }
    }

    for change in &report.changes {
        let fields = if change.fields.is_empty() {
            String::new()
        } else {
            format!(" [{}]", change.fields.join(", "))
        };
        lines.push(format!("{} {}{}", "~".yellow().bold(), change, fields));
    }

    for record in &report.disposed {
        lines.push(format!(
            "{} {} {} ({}) disposed",
            "-".red().bold(),
            record.kind.to_string().red(),
            record.key,
            record.name
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdds_qos_lang::{filter_selected, EntitySelector, ParseOptions, PolicySet, Snapshot};
    use hdds_qos_lang::{DiscoveryKind, EntityRecord};

    fn plain() {
        colored::control::set_override(false);
    }

    fn sample() -> EntityQos {
        let set = PolicySet::parse(
            &["Durability.TransientLocal", "Partition [a, b]"],
            &ParseOptions::default(),
        )
        .unwrap();
        filter_selected(&set, EntitySelector::All)
    }

    #[test]
    fn test_format_entity_qos() {
        plain();
        let kinds = [EntityKind::Publisher, EntityKind::Reader];
        let text = format_entity_qos(&sample(), &kinds, ',');
        assert_eq!(
            text,
            concat!(
                "publisher: 1 policy(ies)\n",
                "  -q Partition [a, b]\n",
                "reader: 1 policy(ies)\n",
                "  -q Durability.TransientLocal\n",
            )
        );
    }

    #[test]
    fn test_format_dropped_limited_to_kinds() {
        plain();
        let lines = format_dropped(&sample(), &[EntityKind::Publisher]);
        assert_eq!(
            lines,
            vec![
                "warning: The Durability.TransientLocal is not applicable for publisher, \
                 will be ignored."
            ]
        );
    }

    #[test]
    fn test_entity_qos_json() {
        let value = entity_qos_json(&sample(), &[EntityKind::Writer], ',');
        assert_eq!(value["entities"]["writer"], json!(["Durability.TransientLocal"]));
        assert_eq!(value["dropped"][0]["scope"], json!("Partition"));
        assert_eq!(value["dropped"][0]["kind"], json!("writer"));
    }

    #[test]
    fn test_format_report() {
        plain();
        let qos = |e: &str| PolicySet::parse(&[e], &ParseOptions::default()).unwrap();
        let mut snapshot = Snapshot::new();
        let first = snapshot.apply(vec![EntityRecord::new(
            "w1",
            DiscoveryKind::Publication,
            "Square",
            qos("Deadline 1"),
        )]);
        let lines = format_report(&first);
        assert_eq!(lines, vec!["+ publication w1 (Square)", "    Deadline 1"]);

        let second = snapshot.apply(vec![EntityRecord::new(
            "w1",
            DiscoveryKind::Publication,
            "Square",
            qos("Deadline 2"),
        )]);
        let lines = format_report(&second);
        assert_eq!(
            lines,
            vec!["~ publication w1 (Square): Deadline: Deadline 1 -> Deadline 2 [deadline]"]
        );
    }
}
