// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resolved policy values.
//!
//! A [`PolicyValue`] pairs a catalog descriptor with one [`FieldValue`] per
//! declared field. Its `Display` form is the canonical expression text, and
//! parsing that text yields an equal value.

use crate::catalog::{Literal, PolicyDescriptor, DURATION_INFINITE};
use crate::expression::{self, ParseOptions};
use crate::error::QosError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Value of one policy field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    /// Nanoseconds, [`DURATION_INFINITE`] for infinity.
    Duration(i64),
    Sequence(Vec<String>),
    Policy(Box<PolicyValue>),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<i64> {
        match self {
            FieldValue::Duration(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[String]> {
        match self {
            FieldValue::Sequence(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_policy(&self) -> Option<&PolicyValue> {
        match self {
            FieldValue::Policy(v) => Some(v),
            _ => None,
        }
    }

    fn render(&self, delimiter: char, out: &mut String) {
        match self {
            FieldValue::Int(v) => out.push_str(&v.to_string()),
            FieldValue::Float(v) => out.push_str(&v.to_string()),
            FieldValue::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
            FieldValue::Str(s) => push_quoted(s, delimiter, out),
            FieldValue::Bytes(b) => out.push_str(&String::from_utf8_lossy(b)),
            FieldValue::Duration(ns) if *ns == DURATION_INFINITE => out.push_str("infinity"),
            FieldValue::Duration(ns) => out.push_str(&ns.to_string()),
            FieldValue::Sequence(items) => {
                out.push('[');
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push(delimiter);
                        out.push(' ');
                    }
                    push_quoted(item, delimiter, out);
                }
                out.push(']');
            }
            FieldValue::Policy(inner) => out.push_str(&inner.render(delimiter)),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(expression::DEFAULT_DELIMITER, &mut out);
        f.write_str(&out)
    }
}

impl From<Literal> for FieldValue {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Int(v) => FieldValue::Int(v),
            Literal::Bool(v) => FieldValue::Bool(v),
            Literal::Duration(v) => FieldValue::Duration(v),
        }
    }
}

/// Quote a string when it would not survive re-tokenizing verbatim.
///
/// Parsed strings never hold both quote characters, so one of them is
/// always free to wrap the text.
fn push_quoted(s: &str, delimiter: char, out: &mut String) {
    let needs_quotes = s.is_empty()
        || s.trim() != s
        || s.contains(|c: char| c == delimiter || "[];=\"'".contains(c))
        || s.contains("  ");
    if !needs_quotes {
        out.push_str(s);
        return;
    }
    let quote = if s.contains('"') { '\'' } else { '"' };
    out.push(quote);
    out.push_str(s);
    out.push(quote);
}

/// A resolved policy: its catalog descriptor plus ordered field values.
///
/// Two values are equal iff their scopes and all field values are equal.
#[derive(Debug, Clone)]
pub struct PolicyValue {
    descriptor: &'static PolicyDescriptor,
    values: Vec<FieldValue>,
}

impl PolicyValue {
    /// Values must be aligned to `descriptor.fields`; the parser guarantees it.
    pub(crate) fn from_parts(
        descriptor: &'static PolicyDescriptor,
        values: Vec<FieldValue>,
    ) -> Self {
        debug_assert_eq!(descriptor.fields.len(), values.len());
        Self { descriptor, values }
    }

    pub fn descriptor(&self) -> &'static PolicyDescriptor {
        self.descriptor
    }

    pub fn scope(&self) -> &'static str {
        self.descriptor.scope
    }

    pub fn family(&self) -> &'static str {
        self.descriptor.family
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Field names paired with their values, in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.descriptor
            .fields
            .iter()
            .map(|spec| spec.name)
            .zip(self.values.iter())
    }

    /// Look up a field value by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Names of fields whose values differ from `other`.
    ///
    /// Empty when the scopes differ: a variant switch replaces the whole
    /// policy rather than individual fields.
    pub fn changed_fields(&self, other: &PolicyValue) -> Vec<&'static str> {
        if self.scope() != other.scope() {
            return Vec::new();
        }
        self.fields()
            .zip(other.values.iter())
            .filter(|((_, old), new)| old != new)
            .map(|((name, _), _)| name)
            .collect()
    }

    /// Canonical expression text using `delimiter` between arguments.
    pub fn render(&self, delimiter: char) -> String {
        let mut out = String::from(self.scope());
        if self.values.is_empty() {
            return out;
        }
        if let [FieldValue::Bytes(data)] = self.values.as_slice() {
            if !data.is_empty() {
                out.push(' ');
                out.push_str(&String::from_utf8_lossy(data));
            }
            return out;
        }
        out.push(' ');
        for (idx, value) in self.values.iter().enumerate() {
            if idx > 0 {
                out.push(delimiter);
                out.push(' ');
            }
            value.render(delimiter, &mut out);
        }
        out
    }
}

impl PartialEq for PolicyValue {
    fn eq(&self, other: &Self) -> bool {
        self.scope() == other.scope() && self.values == other.values
    }
}

impl fmt::Display for PolicyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(expression::DEFAULT_DELIMITER))
    }
}

impl FromStr for PolicyValue {
    type Err = QosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        expression::parse_expression(s, &ParseOptions::default())
    }
}

impl Serialize for PolicyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PolicyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
