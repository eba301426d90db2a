// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::doc_markdown)] // Test documentation
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::items_after_statements)] // Test helpers
#![allow(clippy::too_many_lines)] // Example/test code
#![allow(clippy::redundant_closure_for_method_calls)] // Test code clarity

//! Discovery snapshot integration tests
//!
//! Change tracking through `Snapshot::observe` and JSON-fed poll batches.

use hdds_qos_lang::{
    DiscoveryKind, EntityRecord, InstanceKey, KeyState, ParseOptions, PolicySet, PolicyValue,
    Snapshot,
};

fn qos(exprs: &[&str]) -> PolicySet {
    PolicySet::parse(exprs, &ParseOptions::default()).unwrap()
}

// ============================================================================
// observe() properties
// ============================================================================

#[test]
fn test_reliability_change_sequence() {
    let mut snapshot = Snapshot::new();
    let k1 = InstanceKey::from("K1");

    let kind = DiscoveryKind::Publication;
    let first = snapshot.observe(&k1, kind, "Square", &qos(&["Reliability.Reliable 10"]));
    assert!(first.is_empty());

    let second = snapshot.observe(&k1, kind, "Square", &qos(&["Reliability.Reliable 20"]));
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].family, "Reliability");
    let old: PolicyValue = "Reliability.Reliable 10".parse().unwrap();
    let new: PolicyValue = "Reliability.Reliable 20".parse().unwrap();
    assert_eq!(second[0].old, Some(old));
    assert_eq!(second[0].new, Some(new));
    assert_eq!(second[0].key, k1);
    assert_eq!(second[0].name, "Square");
}

#[test]
fn test_first_sighting_always_empty() {
    let sets = [
        qos(&[]),
        qos(&["Deadline 5", "Partition [a]"]),
        qos(&["DurabilityService 1, History.KeepLast 2, 3, 4, 5"]),
    ];
    for (idx, set) in sets.iter().enumerate() {
        let mut snapshot = Snapshot::new();
        let key = InstanceKey::new(format!("k{}", idx));
        for kind in DiscoveryKind::ALL {
            assert!(snapshot.observe(&key, kind, "t", set).is_empty());
        }
    }
}

#[test]
fn test_identical_sets_never_report() {
    let mut snapshot = Snapshot::new();
    let key = InstanceKey::from("01.0f.ac.10");
    let set = qos(&[
        "Reliability.Reliable seconds=1",
        "History.KeepLast 4",
        "Userdata payload, with; text",
        "Partition [a, b]",
    ]);
    snapshot.observe(&key, DiscoveryKind::Subscription, "t", &set);
    for _ in 0..3 {
        let same = set.clone();
        assert!(snapshot.observe(&key, DiscoveryKind::Subscription, "t", &same).is_empty());
    }
}

#[test]
fn test_one_field_change_names_family_and_field() {
    let base = ["ResourceLimits 10, 2, 5", "History.KeepLast 4", "Deadline 100"];
    let variants = [
        (
            ["ResourceLimits 10, 3, 5", "History.KeepLast 4", "Deadline 100"],
            "ResourceLimits",
            "max_instances",
        ),
        (
            ["ResourceLimits 10, 2, 5", "History.KeepLast 5", "Deadline 100"],
            "History",
            "depth",
        ),
        (
            ["ResourceLimits 10, 2, 5", "History.KeepLast 4", "Deadline 101"],
            "Deadline",
            "deadline",
        ),
    ];
    for (changed, family, field) in variants {
        let mut snapshot = Snapshot::new();
        let key = InstanceKey::from("k");
        snapshot.observe(&key, DiscoveryKind::Publication, "t", &qos(&base));
        let events = snapshot.observe(&key, DiscoveryKind::Publication, "t", &qos(&changed));
        assert_eq!(events.len(), 1, "{}", family);
        assert_eq!(events[0].family, family);
        assert_eq!(events[0].fields, vec![field]);
    }
}

#[test]
fn test_dispose_then_reappear() {
    let mut snapshot = Snapshot::new();
    let key = InstanceKey::from("k");
    snapshot.observe(&key, DiscoveryKind::Participant, "node", &qos(&["EntityName a"]));
    assert_eq!(snapshot.state(&key, DiscoveryKind::Participant), KeyState::Tracked);

    assert!(snapshot.dispose(&key));
    assert_eq!(snapshot.state(&key, DiscoveryKind::Participant), KeyState::Disposed);
    assert!(snapshot.get(&key).is_none());
    assert!(snapshot.is_empty());

    let renamed = qos(&["EntityName b"]);
    let events = snapshot.observe(&key, DiscoveryKind::Participant, "node", &renamed);
    assert!(events.is_empty());
    assert_eq!(snapshot.state(&key, DiscoveryKind::Participant), KeyState::Tracked);
}

#[test]
fn test_dispose_unknown_key_and_reset() {
    let mut snapshot = Snapshot::new();
    let key = InstanceKey::from("ghost");
    assert_eq!(snapshot.state(&key, DiscoveryKind::Publication), KeyState::Unseen);

    assert!(!snapshot.dispose(&key));
    assert_eq!(snapshot.state(&key, DiscoveryKind::Publication), KeyState::Disposed);

    snapshot.reset();
    assert_eq!(snapshot.state(&key, DiscoveryKind::Publication), KeyState::Unseen);
}

// ============================================================================
// JSON poll batches
// ============================================================================

#[test]
fn test_json_batches() {
    let batches = [
        r#"[{"key":"p1","kind":"participant","name":"node-a","qos":["EntityName node-a"]},
            {"key":"w1","kind":"publication","name":"Square","participant_key":"p1",
             "qos":["Reliability.Reliable","History.KeepLast 1"]}]"#,
        r#"[{"key":"w1","kind":"publication","name":"Square","participant_key":"p1",
             "qos":["Reliability.Reliable","History.KeepLast 8"]}]"#,
        r#"[{"key":"w1","kind":"publication","name":"Square","disposed":true}]"#,
    ];

    let mut snapshot = Snapshot::new();
    let reports: Vec<_> = batches
        .iter()
        .map(|line| {
            let records = EntityRecord::parse_batch(line).unwrap();
            snapshot.apply(records)
        })
        .collect();

    assert_eq!(reports[0].appeared.len(), 2);
    assert_eq!(
        reports[0].appeared[1].participant_key,
        Some(InstanceKey::from("p1"))
    );
    assert_eq!(reports[1].changes.len(), 1);
    assert_eq!(reports[1].changes[0].fields, vec!["depth"]);
    assert_eq!(reports[2].disposed.len(), 1);
    assert_eq!(snapshot.len(), 1);
}

#[test]
fn test_bad_qos_in_record_is_rejected() {
    let line = r#"[{"key":"w1","kind":"publication","qos":["History.KeepLast"]}]"#;
    let parsed: Result<Vec<EntityRecord>, _> = serde_json::from_str(line);
    assert!(parsed.is_err());
}
