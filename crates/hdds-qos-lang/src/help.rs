// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Usage text generated from the catalog.

use crate::catalog::{self, FieldType, PolicyDescriptor, CATALOG};

/// Worked examples shown above the usage list.
pub const QOS_EXAMPLES: &str = "\
e.g.:
    -q Durability.TransientLocal
    -q History.KeepLast 10
    -q ReaderDataLifecycle 10, 20
    -q DurabilityService 10, History.KeepLast 20, 30, 40, 50
    -q Partition [sensors, actuators]
    -q Deadline seconds=1;milliseconds=500";

fn field_usage(name: &str, ty: FieldType) -> String {
    match ty {
        FieldType::Policy(family) => {
            let variants: Vec<String> = catalog::family(family).map(policy_signature).collect();
            format!("[{}]", variants.join(" / "))
        }
        other => format!("[{}<{}>]", name, other.label()),
    }
}

/// Scope followed by its field placeholders.
fn policy_signature(desc: &PolicyDescriptor) -> String {
    if desc.fields.is_empty() {
        return desc.scope.to_string();
    }
    let fields: Vec<String> = desc
        .fields
        .iter()
        .map(|f| field_usage(f.name, f.ty))
        .collect();
    format!("{} {}", desc.scope, fields.join(", "))
}

/// One `-q` usage line per catalog entry, in catalog order.
pub fn qos_help() -> Vec<String> {
    CATALOG
        .iter()
        .map(|desc| format!("-q {}", policy_signature(desc)))
        .collect()
}

/// Examples plus the full usage list.
pub fn qos_help_message() -> String {
    format!(
        "{}\n\nAvailable QoS and usage are:\n{}",
        QOS_EXAMPLES,
        qos_help().join("\n")
    )
}
