// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Applicability filter.
//!
//! Narrows a [`PolicySet`] to the policies an entity kind can host. Dropped
//! policies become warnings; filtering never fails.

use crate::catalog::EntityKind;
use crate::set::PolicySet;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A policy left out because the target kind cannot host it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DroppedPolicy {
    pub scope: &'static str,
    pub kind: EntityKind,
}

impl fmt::Display for DroppedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is not applicable for {}, will be ignored",
            self.scope, self.kind
        )
    }
}

/// Result of [`filter_for`].
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    pub set: PolicySet,
    pub dropped: Vec<DroppedPolicy>,
}

/// Keep only the policies applicable to `kind`.
///
/// The input set is left untouched, so filtering one set for several kinds
/// gives independent results.
pub fn filter_for(set: &PolicySet, kind: EntityKind) -> Filtered {
    let mut kept = set.clone();
    let dropped = kept
        .split_off_where(|value| value.descriptor().is_applicable(kind))
        .into_iter()
        .map(|value| {
            let dropped = DroppedPolicy {
                scope: value.scope(),
                kind,
            };
            tracing::warn!("{}", dropped);
            dropped
        })
        .collect();

    Filtered { set: kept, dropped }
}

/// Which entity kinds a policy set targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntitySelector {
    #[default]
    All,
    Only(EntityKind),
}

impl EntitySelector {
    pub fn kinds(self) -> Vec<EntityKind> {
        match self {
            EntitySelector::All => EntityKind::ALL.to_vec(),
            EntitySelector::Only(kind) => vec![kind],
        }
    }
}

impl fmt::Display for EntitySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntitySelector::All => f.write_str("all"),
            EntitySelector::Only(kind) => write!(f, "{}", kind),
        }
    }
}

impl FromStr for EntitySelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.strip_prefix("qos-").unwrap_or(&lower) {
            "all" => Ok(EntitySelector::All),
            _ => s.parse().map(EntitySelector::Only),
        }
    }
}

/// Filtered policy sets per entity kind.
///
/// A slot is `None` when its kind was not selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityQos {
    pub topic: Option<PolicySet>,
    pub publisher: Option<PolicySet>,
    pub subscriber: Option<PolicySet>,
    pub writer: Option<PolicySet>,
    pub reader: Option<PolicySet>,
    /// Every policy dropped while filling the slots.
    pub dropped: Vec<DroppedPolicy>,
}

impl EntityQos {
    pub fn get(&self, kind: EntityKind) -> Option<&PolicySet> {
        match kind {
            EntityKind::Topic => self.topic.as_ref(),
            EntityKind::Publisher => self.publisher.as_ref(),
            EntityKind::Subscriber => self.subscriber.as_ref(),
            EntityKind::Writer => self.writer.as_ref(),
            EntityKind::Reader => self.reader.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: EntityKind) -> &mut Option<PolicySet> {
        match kind {
            EntityKind::Topic => &mut self.topic,
            EntityKind::Publisher => &mut self.publisher,
            EntityKind::Subscriber => &mut self.subscriber,
            EntityKind::Writer => &mut self.writer,
            EntityKind::Reader => &mut self.reader,
        }
    }

    /// Store the filtered form of `set` in the slot of `kind`.
    pub fn fill(&mut self, kind: EntityKind, set: &PolicySet) {
        let Filtered { set, dropped } = filter_for(set, kind);
        *self.slot_mut(kind) = Some(set);
        self.dropped.extend(dropped);
    }

    /// Filled slots, in entity construction order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &PolicySet)> {
        EntityKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|set| (kind, set)))
    }
}

/// Filter `set` for every kind the selector names.
pub fn filter_selected(set: &PolicySet, selector: EntitySelector) -> EntityQos {
    let mut qos = EntityQos::default();
    for kind in selector.kinds() {
        qos.fill(kind, set);
    }
    qos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ParseOptions;

    fn build(exprs: &[&str]) -> PolicySet {
        PolicySet::parse(exprs, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_reader_keeps_durability() {
        let set = build(&["Durability.TransientLocal"]);
        let filtered = filter_for(&set, EntityKind::Reader);
        assert_eq!(filtered.set, set);
        assert!(filtered.dropped.is_empty());
    }

    #[test]
    fn test_publisher_drops_durability() {
        let set = build(&["Durability.TransientLocal"]);
        let filtered = filter_for(&set, EntityKind::Publisher);
        assert!(filtered.set.is_empty());
        assert_eq!(
            filtered.dropped,
            vec![DroppedPolicy {
                scope: "Durability.TransientLocal",
                kind: EntityKind::Publisher
            }]
        );
        assert_eq!(
            filtered.dropped[0].to_string(),
            "Durability.TransientLocal is not applicable for publisher, will be ignored"
        );
    }

    #[test]
    fn test_filter_is_subset_and_independent() {
        let set = build(&["Partition [a]", "History.KeepLast 3", "EntityName x"]);
        for kind in EntityKind::ALL {
            let filtered = filter_for(&set, kind);
            for value in filtered.set.iter() {
                assert_eq!(set.get(value.family()), Some(value));
            }
            assert_eq!(filtered.set.len() + filtered.dropped.len(), set.len());
        }
        let writer = filter_for(&set, EntityKind::Writer);
        let publisher = filter_for(&set, EntityKind::Publisher);
        assert!(writer.set.contains_family("History"));
        assert!(publisher.set.contains_family("Partition"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!("all".parse::<EntitySelector>(), Ok(EntitySelector::All));
        assert_eq!("qos-all".parse::<EntitySelector>(), Ok(EntitySelector::All));
        assert_eq!(
            "qos-datawriter".parse::<EntitySelector>(),
            Ok(EntitySelector::Only(EntityKind::Writer))
        );
        assert!("participant".parse::<EntitySelector>().is_err());
    }

    #[test]
    fn test_filter_selected_all() {
        let set = build(&["Partition [a]", "OwnershipStrength 5"]);
        let qos = filter_selected(&set, EntitySelector::All);
        assert!(qos.publisher.as_ref().unwrap().contains_family("Partition"));
        assert!(qos.writer.as_ref().unwrap().contains_family("OwnershipStrength"));
        assert!(qos.topic.as_ref().unwrap().is_empty());
        assert_eq!(qos.iter().count(), 5);
        // Partition dropped for 3 kinds, OwnershipStrength for 4.
        assert_eq!(qos.dropped.len(), 7);
    }

    #[test]
    fn test_filter_selected_single_kind() {
        let set = build(&["Partition [a]"]);
        let qos = filter_selected(&set, EntitySelector::Only(EntityKind::Subscriber));
        assert!(qos.topic.is_none());
        assert_eq!(qos.get(EntityKind::Subscriber), Some(&set));
        assert!(qos.dropped.is_empty());
    }
}
