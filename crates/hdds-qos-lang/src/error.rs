// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors returned while parsing, building and applying QoS policy sets.

use crate::catalog::EntityKind;
use thiserror::Error;

/// Errors produced by the expression parser, the policy set builder and
/// entity construction.
///
/// Parse and build errors abort the whole expression set: no partial
/// `PolicySet` is ever returned alongside one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QosError {
    /// Expression text was empty after trimming.
    #[error("Empty QoS expression")]
    EmptyExpression,

    /// Name does not resolve to any catalog entry.
    #[error("Unknown QoS policy: {name}")]
    UnknownPolicy { name: String },

    /// Bare variant name matches more than one family.
    #[error("Ambiguous QoS policy '{name}': could be {}", candidates.join(", "))]
    AmbiguousPolicy {
        name: String,
        candidates: Vec<String>,
    },

    /// Wrong number of arguments for a fixed-arity policy.
    #[error("{scope} expects {expected} argument(s), got {got}")]
    Arity {
        scope: String,
        expected: usize,
        got: usize,
    },

    /// Zero-argument policy was given trailing text.
    #[error("{scope} takes no arguments, got '{rest}'")]
    TrailingArguments { scope: String, rest: String },

    /// Argument could not be converted to the declared field type.
    #[error("Invalid value '{raw}' for field '{field}' (expected {expected})")]
    TypeConversion {
        field: String,
        raw: String,
        expected: String,
    },

    /// Boolean argument is not a recognized literal.
    #[error("Invalid boolean '{token}' (expected true/false, yes/no, on/off or 1/0)")]
    InvalidBoolean { token: String },

    /// Embedded History policy is missing, malformed or of another family.
    #[error("Invalid History sub-policy: {context}")]
    InvalidSubPolicy { context: String },

    /// Two expressions target the same policy family.
    #[error("Duplicate {family} policy: '{expression}' conflicts with an earlier expression")]
    DuplicateFamily { family: String, expression: String },

    /// Entity construction refused the filtered policy set.
    #[error("QoS rejected while creating {kind}: {reason}")]
    PolicyRejected { kind: EntityKind, reason: String },
}

/// Convenient alias for results using [`QosError`].
pub type Result<T> = std::result::Result<T, QosError>;
