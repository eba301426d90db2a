// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Policy catalog: the static table of every known QoS policy.
//!
//! Each entry declares the policy scope, its grammar, its ordered field
//! schema with defaults, and the entity kinds that may host it. The parser,
//! the applicability filter and the help renderer all read this table; no
//! policy-specific knowledge lives anywhere else.
//!
//! Applicability follows DDS v1.4 Sec.2.2.3 (the "Concerns" column of the
//! QoS policy table).

use crate::error::{QosError, Result};
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DDS infinite duration (nanoseconds).
pub const DURATION_INFINITE: i64 = i64::MAX;

/// Resource limit value meaning "no limit".
pub const LENGTH_UNLIMITED: i64 = -1;

/// Optional namespace prefix accepted in front of every policy name.
const NAMESPACE_PREFIX: &str = "policy.";

/// Entity kinds a policy set can be validated against.
///
/// Unrelated to [`crate::snapshot::DiscoveryKind`], which classifies
/// built-in discovery records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Topic,
    Publisher,
    Subscriber,
    Writer,
    Reader,
}

impl EntityKind {
    /// All entity kinds, in entity construction order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Topic,
        EntityKind::Publisher,
        EntityKind::Subscriber,
        EntityKind::Writer,
        EntityKind::Reader,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Topic => "topic",
            EntityKind::Publisher => "publisher",
            EntityKind::Subscriber => "subscriber",
            EntityKind::Writer => "writer",
            EntityKind::Reader => "reader",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Accepts `topic`, `publisher`, `subscriber`, `writer`/`datawriter`,
    /// `reader`/`datareader`, optionally prefixed with `qos-`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("qos-").unwrap_or(&lower);
        match name {
            "topic" => Ok(EntityKind::Topic),
            "publisher" => Ok(EntityKind::Publisher),
            "subscriber" => Ok(EntityKind::Subscriber),
            "writer" | "datawriter" => Ok(EntityKind::Writer),
            "reader" | "datareader" => Ok(EntityKind::Reader),
            _ => Err(format!("Unknown entity kind: {}", s)),
        }
    }
}

/// Declared type of a policy field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Str,
    Bytes,
    /// Nanoseconds; accepts a bare integer or `unit=N;unit=M` parts.
    Duration,
    StrSequence,
    /// Embedded policy of the named family.
    Policy(&'static str),
}

impl FieldType {
    /// Human-readable type name used in diagnostics and help output.
    pub fn label(self) -> &'static str {
        match self {
            FieldType::Int => "integer",
            FieldType::Float => "float",
            FieldType::Bool => "boolean",
            FieldType::Str => "string",
            FieldType::Bytes => "bytes",
            FieldType::Duration => "duration",
            FieldType::StrSequence => "sequence<string>",
            FieldType::Policy(_) => "policy",
        }
    }
}

/// Compile-time default value of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Duration(i64),
}

/// One named, typed field of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub default: Option<Literal>,
}

impl FieldSpec {
    const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            default: None,
        }
    }

    const fn with_default(name: &'static str, ty: FieldType, default: Literal) -> Self {
        Self {
            name,
            ty,
            default: Some(default),
        }
    }
}

/// Argument grammar of a policy; selects the parser branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// No arguments at all.
    Flag,
    /// Delimited scalar arguments, one per field; trailing defaults allowed.
    Flat,
    /// A single bracketed list of strings.
    Sequence,
    /// Flat fields with one embedded sub-policy expression.
    Nested,
    /// Exactly two boolean arguments.
    BooleanPair,
    /// Raw remaining text captured verbatim as bytes.
    Payload,
}

/// Static description of one policy (one variant of a family).
#[derive(Debug, PartialEq, Eq)]
pub struct PolicyDescriptor {
    /// Dotted scope, e.g. `Reliability.Reliable`.
    pub scope: &'static str,
    /// Family (scope root), e.g. `Reliability`.
    pub family: &'static str,
    pub grammar: Grammar,
    pub fields: &'static [FieldSpec],
    pub applicable_to: &'static [EntityKind],
}

impl PolicyDescriptor {
    /// Variant part of the scope (`Reliable` for `Reliability.Reliable`).
    pub fn variant(&self) -> Option<&'static str> {
        self.scope.split_once('.').map(|(_, variant)| variant)
    }

    pub fn is_applicable(&self, kind: EntityKind) -> bool {
        self.applicable_to.contains(&kind)
    }

    /// Default values aligned to `fields`; `None` marks a required field.
    pub fn defaults(&self) -> Vec<Option<FieldValue>> {
        self.fields
            .iter()
            .map(|f| f.default.map(FieldValue::from))
            .collect()
    }

    /// Minimum argument count: every field up to the last one without a default.
    pub fn required_arity(&self) -> usize {
        self.fields
            .iter()
            .rposition(|f| f.default.is_none())
            .map_or(0, |idx| idx + 1)
    }
}

use EntityKind::{Publisher, Reader, Subscriber, Topic, Writer};

const TOPIC_WRITER_READER: &[EntityKind] = &[Topic, Writer, Reader];
const TOPIC_WRITER: &[EntityKind] = &[Topic, Writer];
const PUB_SUB: &[EntityKind] = &[Publisher, Subscriber];
const WRITER_READER: &[EntityKind] = &[Writer, Reader];
const WRITER_ONLY: &[EntityKind] = &[Writer];
const READER_ONLY: &[EntityKind] = &[Reader];
const TOPIC_ONLY: &[EntityKind] = &[Topic];
const EVERY_ENTITY: &[EntityKind] = &EntityKind::ALL;

const NO_FIELDS: &[FieldSpec] = &[];

const RELIABILITY_BEST_EFFORT: &[FieldSpec] = &[FieldSpec::with_default(
    "max_blocking_time",
    FieldType::Duration,
    Literal::Duration(0),
)];
const RELIABILITY_RELIABLE: &[FieldSpec] = &[FieldSpec::with_default(
    "max_blocking_time",
    FieldType::Duration,
    Literal::Duration(100_000_000),
)];
const HISTORY_DEPTH: &[FieldSpec] = &[FieldSpec::required("depth", FieldType::Int)];
const RESOURCE_LIMITS: &[FieldSpec] = &[
    FieldSpec::with_default("max_samples", FieldType::Int, Literal::Int(LENGTH_UNLIMITED)),
    FieldSpec::with_default("max_instances", FieldType::Int, Literal::Int(LENGTH_UNLIMITED)),
    FieldSpec::with_default(
        "max_samples_per_instance",
        FieldType::Int,
        Literal::Int(LENGTH_UNLIMITED),
    ),
];
const ACCESS_SCOPE: &[FieldSpec] = &[
    FieldSpec::required("coherent_access", FieldType::Bool),
    FieldSpec::required("ordered_access", FieldType::Bool),
];
const LIFESPAN: &[FieldSpec] = &[FieldSpec::with_default(
    "lifespan",
    FieldType::Duration,
    Literal::Duration(DURATION_INFINITE),
)];
const DEADLINE: &[FieldSpec] = &[FieldSpec::with_default(
    "deadline",
    FieldType::Duration,
    Literal::Duration(DURATION_INFINITE),
)];
const LATENCY_BUDGET: &[FieldSpec] = &[FieldSpec::with_default(
    "budget",
    FieldType::Duration,
    Literal::Duration(0),
)];
const OWNERSHIP_STRENGTH: &[FieldSpec] = &[FieldSpec::required("strength", FieldType::Int)];
const LIVELINESS: &[FieldSpec] = &[FieldSpec::with_default(
    "lease_duration",
    FieldType::Duration,
    Literal::Duration(DURATION_INFINITE),
)];
const TIME_BASED_FILTER: &[FieldSpec] = &[FieldSpec::with_default(
    "filter_time",
    FieldType::Duration,
    Literal::Duration(0),
)];
const PARTITION: &[FieldSpec] = &[FieldSpec::required("partitions", FieldType::StrSequence)];
const TRANSPORT_PRIORITY: &[FieldSpec] = &[FieldSpec::with_default(
    "priority",
    FieldType::Int,
    Literal::Int(0),
)];
const WRITER_DATA_LIFECYCLE: &[FieldSpec] = &[FieldSpec::with_default(
    "autodispose",
    FieldType::Bool,
    Literal::Bool(true),
)];
const READER_DATA_LIFECYCLE: &[FieldSpec] = &[
    FieldSpec::with_default(
        "autopurge_nowriter_samples_delay",
        FieldType::Duration,
        Literal::Duration(DURATION_INFINITE),
    ),
    FieldSpec::with_default(
        "autopurge_disposed_samples_delay",
        FieldType::Duration,
        Literal::Duration(DURATION_INFINITE),
    ),
];
const DURABILITY_SERVICE: &[FieldSpec] = &[
    FieldSpec::required("cleanup_delay", FieldType::Duration),
    FieldSpec::required("history", FieldType::Policy("History")),
    FieldSpec::required("max_samples", FieldType::Int),
    FieldSpec::required("max_instances", FieldType::Int),
    FieldSpec::required("max_samples_per_instance", FieldType::Int),
];
const PAYLOAD: &[FieldSpec] = &[FieldSpec::required("data", FieldType::Bytes)];
const ENTITY_NAME: &[FieldSpec] = &[FieldSpec::required("name", FieldType::Str)];
const PROPERTY: &[FieldSpec] = &[
    FieldSpec::required("key", FieldType::Str),
    FieldSpec::required("value", FieldType::Str),
];

macro_rules! policy {
    ($scope:literal, $family:literal, $grammar:ident, $fields:expr, $applicable:expr) => {
        PolicyDescriptor {
            scope: $scope,
            family: $family,
            grammar: Grammar::$grammar,
            fields: $fields,
            applicable_to: $applicable,
        }
    };
}

/// Every known policy, grouped by family.
pub static CATALOG: &[PolicyDescriptor] = &[
    policy!(
        "Reliability.BestEffort",
        "Reliability",
        Flat,
        RELIABILITY_BEST_EFFORT,
        TOPIC_WRITER_READER
    ),
    policy!("Reliability.Reliable", "Reliability", Flat, RELIABILITY_RELIABLE, TOPIC_WRITER_READER),
    policy!("Durability.Volatile", "Durability", Flag, NO_FIELDS, TOPIC_WRITER_READER),
    policy!("Durability.TransientLocal", "Durability", Flag, NO_FIELDS, TOPIC_WRITER_READER),
    policy!("Durability.Transient", "Durability", Flag, NO_FIELDS, TOPIC_WRITER_READER),
    policy!("Durability.Persistent", "Durability", Flag, NO_FIELDS, TOPIC_WRITER_READER),
    policy!("History.KeepAll", "History", Flag, NO_FIELDS, TOPIC_WRITER_READER),
    policy!("History.KeepLast", "History", Flat, HISTORY_DEPTH, TOPIC_WRITER_READER),
    policy!("ResourceLimits", "ResourceLimits", Flat, RESOURCE_LIMITS, TOPIC_WRITER_READER),
    policy!(
        "PresentationAccessScope.Instance",
        "PresentationAccessScope",
        BooleanPair,
        ACCESS_SCOPE,
        PUB_SUB
    ),
    policy!(
        "PresentationAccessScope.Topic",
        "PresentationAccessScope",
        BooleanPair,
        ACCESS_SCOPE,
        PUB_SUB
    ),
    policy!(
        "PresentationAccessScope.Group",
        "PresentationAccessScope",
        BooleanPair,
        ACCESS_SCOPE,
        PUB_SUB
    ),
    policy!("Lifespan", "Lifespan", Flat, LIFESPAN, TOPIC_WRITER),
    policy!("Deadline", "Deadline", Flat, DEADLINE, TOPIC_WRITER_READER),
    policy!("LatencyBudget", "LatencyBudget", Flat, LATENCY_BUDGET, TOPIC_WRITER_READER),
    policy!("Ownership.Shared", "Ownership", Flag, NO_FIELDS, TOPIC_WRITER_READER),
    policy!("Ownership.Exclusive", "Ownership", Flag, NO_FIELDS, TOPIC_WRITER_READER),
    policy!("OwnershipStrength", "OwnershipStrength", Flat, OWNERSHIP_STRENGTH, WRITER_ONLY),
    policy!("Liveliness.Automatic", "Liveliness", Flat, LIVELINESS, TOPIC_WRITER_READER),
    policy!("Liveliness.ManualByParticipant", "Liveliness", Flat, LIVELINESS, TOPIC_WRITER_READER),
    policy!("Liveliness.ManualByTopic", "Liveliness", Flat, LIVELINESS, TOPIC_WRITER_READER),
    policy!("TimeBasedFilter", "TimeBasedFilter", Flat, TIME_BASED_FILTER, READER_ONLY),
    policy!("Partition", "Partition", Sequence, PARTITION, PUB_SUB),
    policy!("TransportPriority", "TransportPriority", Flat, TRANSPORT_PRIORITY, TOPIC_WRITER),
    policy!(
        "DestinationOrder.ByReceptionTimestamp",
        "DestinationOrder",
        Flag,
        NO_FIELDS,
        TOPIC_WRITER_READER
    ),
    policy!(
        "DestinationOrder.BySourceTimestamp",
        "DestinationOrder",
        Flag,
        NO_FIELDS,
        TOPIC_WRITER_READER
    ),
    policy!("WriterDataLifecycle", "WriterDataLifecycle", Flat, WRITER_DATA_LIFECYCLE, WRITER_ONLY),
    policy!("ReaderDataLifecycle", "ReaderDataLifecycle", Flat, READER_DATA_LIFECYCLE, READER_ONLY),
    policy!("DurabilityService", "DurabilityService", Nested, DURABILITY_SERVICE, TOPIC_WRITER),
    policy!("IgnoreLocal.Nothing", "IgnoreLocal", Flag, NO_FIELDS, WRITER_READER),
    policy!("IgnoreLocal.Participant", "IgnoreLocal", Flag, NO_FIELDS, WRITER_READER),
    policy!("IgnoreLocal.Process", "IgnoreLocal", Flag, NO_FIELDS, WRITER_READER),
    policy!("Userdata", "Userdata", Payload, PAYLOAD, WRITER_READER),
    policy!("Groupdata", "Groupdata", Payload, PAYLOAD, PUB_SUB),
    policy!("Topicdata", "Topicdata", Payload, PAYLOAD, TOPIC_ONLY),
    policy!("EntityName", "EntityName", Flat, ENTITY_NAME, EVERY_ENTITY),
    policy!("Property", "Property", Flat, PROPERTY, WRITER_READER),
];

/// Strip the optional `Policy.` namespace prefix (case-insensitive).
pub(crate) fn strip_namespace(name: &str) -> &str {
    match name.get(..NAMESPACE_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(NAMESPACE_PREFIX) => {
            &name[NAMESPACE_PREFIX.len()..]
        }
        _ => name,
    }
}

/// Resolve a policy name to its descriptor.
///
/// Resolution is case-insensitive and tries, in order: the full scope
/// (`Reliability.Reliable`), then a bare variant name (`reliable`) when it
/// is unique across families. A family name that has several variants is
/// reported as ambiguous with every variant listed.
pub fn lookup(name: &str) -> Result<&'static PolicyDescriptor> {
    let name = strip_namespace(name.trim());

    if let Some(desc) = CATALOG.iter().find(|d| d.scope.eq_ignore_ascii_case(name)) {
        return Ok(desc);
    }

    let family_variants: Vec<&PolicyDescriptor> = CATALOG
        .iter()
        .filter(|d| d.family.eq_ignore_ascii_case(name))
        .collect();
    if !family_variants.is_empty() {
        return Err(QosError::AmbiguousPolicy {
            name: name.to_string(),
            candidates: family_variants.iter().map(|d| d.scope.to_string()).collect(),
        });
    }

    let matches: Vec<&PolicyDescriptor> = CATALOG
        .iter()
        .filter(|d| d.variant().is_some_and(|v| v.eq_ignore_ascii_case(name)))
        .collect();

    match matches.as_slice() {
        [single] => Ok(*single),
        [] => Err(QosError::UnknownPolicy {
            name: name.to_string(),
        }),
        many => Err(QosError::AmbiguousPolicy {
            name: name.to_string(),
            candidates: many.iter().map(|d| d.scope.to_string()).collect(),
        }),
    }
}

/// Whether `name` spells out a full scope or a family name.
///
/// Bare variant names (`reliable`, `topic`) do not count.
pub fn is_explicit_name(name: &str) -> bool {
    let name = strip_namespace(name.trim());
    CATALOG
        .iter()
        .any(|d| d.scope.eq_ignore_ascii_case(name) || d.family.eq_ignore_ascii_case(name))
}

/// Default field values of a policy, aligned to its fields.
pub fn defaults(name: &str) -> Result<Vec<Option<FieldValue>>> {
    lookup(name).map(PolicyDescriptor::defaults)
}

/// Descriptors of one family, in catalog order.
pub fn family(name: &str) -> impl Iterator<Item = &'static PolicyDescriptor> + '_ {
    CATALOG
        .iter()
        .filter(move |d| d.family.eq_ignore_ascii_case(name))
}
