// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapshot diff engine for discovered entities.
//!
//! The [`Snapshot`] remembers the last policy set seen for every instance
//! key and reports what changed on each new observation:
//!
//! - first sighting: stored, no change events
//! - later sighting: one [`ChangeEvent`] per family whose value differs
//! - dispose: entry removed, so a later sighting counts as a first one
//!
//! Observation never fails; unexpected input is treated as a first sighting.

use crate::set::PolicySet;
use crate::value::PolicyValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Opaque identity of a discovered entity instance (GUID text in practice).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceKey(String);

impl InstanceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for InstanceKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Built-in discovery record kinds.
///
/// Unrelated to [`crate::catalog::EntityKind`]; these classify what a
/// discovery source reports, not what a policy set targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryKind {
    Participant,
    Subscription,
    Publication,
}

impl DiscoveryKind {
    pub const ALL: [DiscoveryKind; 3] = [
        DiscoveryKind::Participant,
        DiscoveryKind::Subscription,
        DiscoveryKind::Publication,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DiscoveryKind::Participant => "participant",
            DiscoveryKind::Subscription => "subscription",
            DiscoveryKind::Publication => "publication",
        }
    }
}

impl fmt::Display for DiscoveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoveryKind {
    type Err = String;

    /// Accepts singular or plural names, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.strip_suffix('s').unwrap_or(&lower) {
            "participant" => Ok(DiscoveryKind::Participant),
            "subscription" => Ok(DiscoveryKind::Subscription),
            "publication" => Ok(DiscoveryKind::Publication),
            _ => Err(format!("Unknown discovery kind: {}", s)),
        }
    }
}

/// One entity as reported by a discovery source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub key: InstanceKey,
    pub kind: DiscoveryKind,
    /// Topic name for endpoints, participant name otherwise.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_key: Option<InstanceKey>,
    #[serde(default)]
    pub qos: PolicySet,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disposed: bool,
}

impl EntityRecord {
    pub fn new(
        key: impl Into<InstanceKey>,
        kind: DiscoveryKind,
        name: impl Into<String>,
        qos: PolicySet,
    ) -> Self {
        Self {
            key: key.into(),
            kind,
            name: name.into(),
            participant_key: None,
            qos,
            disposed: false,
        }
    }

    /// Parse one poll batch: a JSON array of records.
    ///
    /// Only text that is not a JSON array fails. A record that does not
    /// decode (missing key, unknown kind, unparsable QoS expression) is
    /// skipped with a warning and the rest of the batch is kept.
    pub fn parse_batch(json: &str) -> serde_json::Result<Vec<EntityRecord>> {
        let raw: Vec<serde_json::Value> = serde_json::from_str(json)?;
        let records = raw
            .into_iter()
            .enumerate()
            .filter_map(|(idx, value)| match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed record #{}: {}", idx, e);
                    None
                }
            })
            .collect();
        Ok(records)
    }
}

/// A policy family whose value differs between two observations.
///
/// `old`/`new` is `None` when the family was absent on that side. `fields`
/// names the changed fields when both sides share a scope; a variant switch
/// or an added/removed family lists none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub key: InstanceKey,
    pub kind: DiscoveryKind,
    pub name: String,
    pub family: &'static str,
    pub old: Option<PolicyValue>,
    pub new: Option<PolicyValue>,
    pub fields: Vec<&'static str>,
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<PolicyValue>| {
            v.as_ref()
                .map_or_else(|| "<absent>".to_string(), |v| v.to_string())
        };
        write!(
            f,
            "{} {} ({}): {}: {} -> {}",
            self.kind,
            self.key,
            self.name,
            self.family,
            show(&self.old),
            show(&self.new)
        )
    }
}

/// Lifecycle state of one key as seen by the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Never seen under this kind.
    Unseen,
    Tracked,
    /// Reported disposed and not observed since. No policy set is kept.
    Disposed,
}

#[derive(Debug, Clone)]
struct TrackedEntity {
    kind: DiscoveryKind,
    name: String,
    qos: PolicySet,
}

/// Last observed policy set per instance key.
///
/// Owned by a single polling loop; not shared between threads.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: HashMap<InstanceKey, TrackedEntity>,
    disposed: HashSet<InstanceKey>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation and return the families that changed.
    ///
    /// The first sighting of a key (or of a key under a different kind)
    /// returns an empty list.
    pub fn observe(
        &mut self,
        key: &InstanceKey,
        kind: DiscoveryKind,
        name: &str,
        qos: &PolicySet,
    ) -> Vec<ChangeEvent> {
        if let Some(tracked) = self.entries.get_mut(key).filter(|t| t.kind == kind) {
            let events = diff(key, kind, name, &tracked.qos, qos);
            if !events.is_empty() {
                tracing::debug!("{} {} changed {} QoS families", kind, key, events.len());
                tracked.qos = qos.clone();
            }
            if tracked.name != name {
                tracked.name = name.to_string();
            }
            return events;
        }

        tracing::debug!("Tracking {} {} ({})", kind, key, name);
        self.disposed.remove(key);
        self.entries.insert(
            key.clone(),
            TrackedEntity {
                kind,
                name: name.to_string(),
                qos: qos.clone(),
            },
        );
        Vec::new()
    }

    /// Forget a key and mark it disposed; returns whether it was tracked.
    pub fn dispose(&mut self, key: &InstanceKey) -> bool {
        self.disposed.insert(key.clone());
        match self.entries.remove(key) {
            Some(tracked) => {
                tracing::info!("{} {} ({}) disposed", tracked.kind, key, tracked.name);
                true
            }
            None => false,
        }
    }

    /// Process one poll batch in order.
    pub fn apply<I>(&mut self, records: I) -> PollReport
    where
        I: IntoIterator<Item = EntityRecord>,
    {
        let mut report = PollReport::default();
        for record in records {
            if record.disposed {
                self.dispose(&record.key);
                report.disposed.push(record);
                continue;
            }
            if self.state(&record.key, record.kind) != KeyState::Tracked {
                self.observe(&record.key, record.kind, &record.name, &record.qos);
                report.appeared.push(record);
            } else {
                let events = self.observe(&record.key, record.kind, &record.name, &record.qos);
                report.changes.extend(events);
            }
        }
        report
    }

    /// State of `key` as tracked under `kind`.
    pub fn state(&self, key: &InstanceKey, kind: DiscoveryKind) -> KeyState {
        match self.entries.get(key) {
            Some(tracked) if tracked.kind == kind => KeyState::Tracked,
            _ if self.disposed.contains(key) => KeyState::Disposed,
            _ => KeyState::Unseen,
        }
    }

    /// Last stored policy set of `key`.
    pub fn get(&self, key: &InstanceKey) -> Option<&PolicySet> {
        self.entries.get(key).map(|t| &t.qos)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry and every disposed mark.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.disposed.clear();
    }
}

fn diff(
    key: &InstanceKey,
    kind: DiscoveryKind,
    name: &str,
    old: &PolicySet,
    new: &PolicySet,
) -> Vec<ChangeEvent> {
    let families: BTreeSet<&'static str> = old.families().chain(new.families()).collect();

    families
        .into_iter()
        .filter_map(|family| {
            let before = old.get(family);
            let after = new.get(family);
            if before == after {
                return None;
            }
            let fields = match (before, after) {
                (Some(b), Some(a)) => b.changed_fields(a),
                _ => Vec::new(),
            };
            Some(ChangeEvent {
                key: key.clone(),
                kind,
                name: name.to_string(),
                family,
                old: before.cloned(),
                new: after.cloned(),
                fields,
            })
        })
        .collect()
}

/// Outcome of [`Snapshot::apply`] for one poll batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollReport {
    /// Records seen for the first time.
    pub appeared: Vec<EntityRecord>,
    pub changes: Vec<ChangeEvent>,
    /// Records reported disposed by the source.
    pub disposed: Vec<EntityRecord>,
}

impl PollReport {
    pub fn is_empty(&self) -> bool {
        self.appeared.is_empty() && self.changes.is_empty() && self.disposed.is_empty()
    }
}
