// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS QoS Expression Language
//!
//! Parses textual DDS QoS policy expressions, narrows them per entity kind,
//! and tracks how the QoS of discovered entities changes over time.
//!
//! # Features
//!
//! - **Policy Catalog**: one static table drives grammar, defaults and applicability
//! - **Expression Parser**: `History.KeepLast 10`, `Partition [a, b]`, nested `DurabilityService`
//! - **Applicability Filter**: drops policies an entity kind cannot host, with warnings
//! - **Snapshot Diff**: per-family change events between discovery polls
//!
//! # Quick Start
//!
//! ```
//! use hdds_qos_lang::{filter_for, EntityKind, ParseOptions, PolicySet};
//!
//! let set = PolicySet::parse(
//!     &["Durability.TransientLocal", "Partition [sensors]"],
//!     &ParseOptions::default(),
//! )?;
//!
//! let reader = filter_for(&set, EntityKind::Reader);
//! assert!(reader.set.contains_family("Durability"));
//! assert_eq!(reader.dropped.len(), 1);
//! # Ok::<(), hdds_qos_lang::QosError>(())
//! ```
//!
//! # Expression Syntax
//!
//! ```text
//! -q Durability.TransientLocal
//! -q History.KeepLast 10
//! -q ResourceLimits 100, 10, 10
//! -q DurabilityService 10, History.KeepLast 20, 30, 40, 50
//! -q Deadline seconds=1;milliseconds=500
//! -q Userdata raw bytes, taken verbatim
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod expression;
pub mod filter;
pub mod help;
pub mod session;
pub mod set;
pub mod snapshot;
pub mod value;

pub use catalog::{
    lookup, EntityKind, PolicyDescriptor, CATALOG, DURATION_INFINITE, LENGTH_UNLIMITED,
};
pub use config::{ConfigError, QosConfig};
pub use error::{QosError, Result};
pub use expression::{
    group_occurrences, group_tokens, parse_expression, ParseOptions, DEFAULT_DELIMITER,
};
pub use filter::{filter_for, filter_selected, DroppedPolicy, EntityQos, EntitySelector, Filtered};
pub use help::{qos_help, qos_help_message};
pub use session::{create_entities, DiscoverySource, EntityFactory, Watcher};
pub use set::PolicySet;
pub use snapshot::{
    ChangeEvent, DiscoveryKind, EntityRecord, InstanceKey, KeyState, PollReport, Snapshot,
};
pub use value::{FieldValue, PolicyValue};
