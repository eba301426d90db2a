// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host-side collaborators: entity construction and discovery polling.
//!
//! The core never talks to a DDS stack itself. Hosts plug one in through
//! [`EntityFactory`] and [`DiscoverySource`]; [`Watcher`] drives a source
//! through a [`Snapshot`] from a single polling loop.

use crate::catalog::EntityKind;
use crate::error::{QosError, Result};
use crate::filter::EntityQos;
use crate::set::PolicySet;
use crate::snapshot::{DiscoveryKind, EntityRecord, PollReport, Snapshot};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default pause between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Creates DDS entities from filtered policy sets.
pub trait EntityFactory {
    type Entity;
    type Error: fmt::Display;

    /// Create one entity; an error means the set was refused as a whole.
    fn create_entity(
        &mut self,
        kind: EntityKind,
        qos: &PolicySet,
    ) -> std::result::Result<Self::Entity, Self::Error>;
}

/// Create every entity with a filled slot, in construction order.
///
/// Stops at the first refusal, reported as [`QosError::PolicyRejected`].
pub fn create_entities<F: EntityFactory>(
    factory: &mut F,
    qos: &EntityQos,
) -> Result<Vec<(EntityKind, F::Entity)>> {
    let mut created = Vec::new();
    for (kind, set) in qos.iter() {
        let entity = factory
            .create_entity(kind, set)
            .map_err(|e| QosError::PolicyRejected {
                kind,
                reason: e.to_string(),
            })?;
        tracing::debug!("Created {} with {} policies", kind, set.len());
        created.push((kind, entity));
    }
    Ok(created)
}

/// Supplies built-in discovery records.
pub trait DiscoverySource {
    /// Records received since the last call; empty when nothing is new.
    /// Must not block.
    fn poll_records(&mut self, kind: DiscoveryKind) -> Vec<EntityRecord>;

    /// Block until new records may be available or `timeout` elapses.
    fn wait_with_timeout(&mut self, timeout: Duration);

    /// True once the source will never produce records again.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Polling loop state: a source plus the snapshot it feeds.
pub struct Watcher<S> {
    source: S,
    snapshot: Snapshot,
    kinds: Vec<DiscoveryKind>,
    interval: Duration,
}

impl<S: DiscoverySource> Watcher<S> {
    /// Watch every discovery kind at the default interval.
    pub fn new(source: S) -> Self {
        Self {
            source,
            snapshot: Snapshot::new(),
            kinds: DiscoveryKind::ALL.to_vec(),
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_kinds(mut self, kinds: Vec<DiscoveryKind>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Poll each watched kind once and diff the results.
    pub fn poll_once(&mut self) -> PollReport {
        let mut report = PollReport::default();
        for &kind in &self.kinds {
            let records = self.source.poll_records(kind);
            if records.is_empty() {
                continue;
            }
            let batch = self.snapshot.apply(records);
            report.appeared.extend(batch.appeared);
            report.changes.extend(batch.changes);
            report.disposed.extend(batch.disposed);
        }
        report
    }

    /// Poll until `running` clears or the source is exhausted.
    ///
    /// Non-empty reports go to `sink`. Returns the number of poll cycles.
    pub fn run<F>(&mut self, running: &AtomicBool, mut sink: F) -> usize
    where
        F: FnMut(&PollReport),
    {
        let mut cycles = 0;
        while running.load(Ordering::SeqCst) {
            let report = self.poll_once();
            cycles += 1;
            if !report.is_empty() {
                sink(&report);
            }
            if self.source.is_exhausted() || !running.load(Ordering::SeqCst) {
                break;
            }
            self.source.wait_with_timeout(self.interval);
        }
        tracing::debug!("Watcher stopped after {} cycles", cycles);
        cycles
    }
}
