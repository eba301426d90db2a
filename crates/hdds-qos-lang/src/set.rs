// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Policy set builder.
//!
//! A [`PolicySet`] holds at most one [`PolicyValue`] per family. Building
//! from expressions is all-or-nothing: the first parse error or duplicate
//! family aborts and no partial set is returned.

use crate::error::{QosError, Result};
use crate::expression::{self, ParseOptions};
use crate::value::PolicyValue;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Policies keyed by family, iterated in family name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicySet {
    policies: BTreeMap<&'static str, PolicyValue>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every expression and combine the results.
    ///
    /// # Example
    ///
    /// ```
    /// use hdds_qos_lang::{ParseOptions, PolicySet};
    ///
    /// let set = PolicySet::parse(
    ///     &["Reliability.Reliable", "History.KeepLast 10"],
    ///     &ParseOptions::default(),
    /// )?;
    /// assert_eq!(set.len(), 2);
    /// # Ok::<(), hdds_qos_lang::QosError>(())
    /// ```
    pub fn parse<S: AsRef<str>>(expressions: &[S], options: &ParseOptions) -> Result<Self> {
        let mut set = Self::new();
        for text in expressions {
            set.add(expression::parse_expression(text.as_ref(), options)?)?;
        }
        tracing::debug!("Built QoS policy set with {} policies", set.len());
        Ok(set)
    }

    /// Combine already-resolved values, rejecting duplicate families.
    pub fn from_values<I: IntoIterator<Item = PolicyValue>>(values: I) -> Result<Self> {
        let mut set = Self::new();
        for value in values {
            set.add(value)?;
        }
        Ok(set)
    }

    /// Add one value; fails if its family is already present.
    pub fn add(&mut self, value: PolicyValue) -> Result<()> {
        let family = value.family();
        if self.policies.contains_key(family) {
            return Err(QosError::DuplicateFamily {
                family: family.to_string(),
                expression: value.to_string(),
            });
        }
        self.policies.insert(family, value);
        Ok(())
    }

    /// Value of a family (`Reliability`, `History`, ...), case-insensitive.
    pub fn get(&self, family: &str) -> Option<&PolicyValue> {
        self.policies.get(family).or_else(|| {
            self.policies
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(family))
                .map(|(_, value)| value)
        })
    }

    pub fn contains_family(&self, family: &str) -> bool {
        self.get(family).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolicyValue> {
        self.policies.values()
    }

    pub fn to_ordered_list(&self) -> Vec<PolicyValue> {
        self.iter().cloned().collect()
    }

    pub fn families(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.policies.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Canonical expression text of every policy, in iteration order.
    pub fn to_expressions(&self, delimiter: char) -> Vec<String> {
        self.iter().map(|v| v.render(delimiter)).collect()
    }

    /// Keep the values matching `keep`, returning the removed ones.
    pub(crate) fn split_off_where<F>(&mut self, mut keep: F) -> Vec<PolicyValue>
    where
        F: FnMut(&PolicyValue) -> bool,
    {
        let (kept, removed): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut self.policies)
            .into_iter()
            .partition(|(_, value)| keep(value));
        self.policies = kept;
        removed.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a PolicySet {
    type Item = &'a PolicyValue;
    type IntoIter = std::collections::btree_map::Values<'a, &'static str, PolicyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.policies.values()
    }
}

impl Serialize for PolicySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for PolicySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let values = Vec::<PolicyValue>::deserialize(deserializer)?;
        PolicySet::from_values(values).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(exprs: &[&str]) -> Result<PolicySet> {
        PolicySet::parse(exprs, &ParseOptions::default())
    }

    #[test]
    fn test_build_two_families() {
        let set = build(&["Reliability.Reliable", "History.KeepLast 10"]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("reliability").unwrap().scope(), "Reliability.Reliable");
        assert_eq!(set.get("History").unwrap().scope(), "History.KeepLast");
    }

    #[test]
    fn test_duplicate_family_rejected() {
        let err = build(&["History.KeepAll", "history.keeplast   5"]).unwrap_err();
        assert_eq!(
            err,
            QosError::DuplicateFamily {
                family: "History".to_string(),
                expression: "History.KeepLast 5".to_string()
            }
        );
    }

    #[test]
    fn test_first_error_aborts() {
        let err = build(&["Reliability.Reliable", "Hello", "History.KeepLast"]).unwrap_err();
        assert!(matches!(err, QosError::UnknownPolicy { .. }));
    }

    #[test]
    fn test_empty_input_gives_empty_set() {
        let set = build(&[]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_iteration_order_is_deterministic() {
        let a = build(&["Reliability.Reliable", "Deadline", "History.KeepAll"]).unwrap();
        let b = build(&["History.KeepAll", "Reliability.Reliable", "Deadline"]).unwrap();
        assert_eq!(a, b);
        let families: Vec<_> = a.families().collect();
        assert_eq!(families, vec!["Deadline", "History", "Reliability"]);
    }

    #[test]
    fn test_serde_round_trip() {
        let set = build(&["Partition [a]", "Durability.TransientLocal"]).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["Durability.TransientLocal","Partition [a]"]"#);
        let back: PolicySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);

        let dup: std::result::Result<PolicySet, _> =
            serde_json::from_str(r#"["History.KeepAll","History.KeepLast 1"]"#);
        assert!(dup.is_err());
    }

    #[test]
    fn test_split_off_where() {
        let mut set = build(&["Partition [a]", "Durability.Volatile"]).unwrap();
        let removed = set.split_off_where(|v| v.family() != "Partition");
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].family(), "Partition");
        assert_eq!(set.len(), 1);
    }
}
