// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery source replaying recorded poll batches.
//!
//! Input is JSON lines: each non-empty line is one poll, an array of
//! `EntityRecord` objects. Lines starting with `#` are comments. A line that
//! is not an array is an error; a bad record inside an array is skipped.

use anyhow::Context;
use hdds_qos_lang::{DiscoveryKind, DiscoverySource, EntityRecord};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

pub struct ReplaySource {
    current: Vec<EntityRecord>,
    pending: VecDeque<Vec<EntityRecord>>,
}

impl ReplaySource {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read records file {}", path.display()))?;
        Self::from_jsonl(&content)
            .with_context(|| format!("Invalid records file {}", path.display()))
    }

    pub fn from_jsonl(content: &str) -> anyhow::Result<Self> {
        let mut pending = VecDeque::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let batch =
                EntityRecord::parse_batch(line).with_context(|| format!("line {}", idx + 1))?;
            pending.push_back(batch);
        }
        tracing::debug!("Loaded {} recorded polls", pending.len());

        Ok(Self {
            current: pending.pop_front().unwrap_or_default(),
            pending,
        })
    }

    pub fn remaining_polls(&self) -> usize {
        self.pending.len()
    }
}

impl DiscoverySource for ReplaySource {
    fn poll_records(&mut self, kind: DiscoveryKind) -> Vec<EntityRecord> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.current)
            .into_iter()
            .partition(|r| r.kind == kind);
        self.current = rest;
        matching
    }

    /// Sleeps for the interval, then moves to the next recorded poll.
    fn wait_with_timeout(&mut self, timeout: Duration) {
        if self.pending.is_empty() {
            self.current.clear();
            return;
        }
        std::thread::sleep(timeout);
        self.current = self.pending.pop_front().unwrap_or_default();
    }

    fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdds_qos_lang::Watcher;
    use std::io::Write;
    use std::sync::atomic::AtomicBool;

    const RECORDS: &str = r#"
# first poll
[{"key":"p1","kind":"participant"},{"key":"w1","kind":"publication","qos":["History.KeepLast 1"]}]

[{"key":"w1","kind":"publication","name":"Square","qos":["History.KeepLast 2"]}]
[{"key":"w1","kind":"publication","name":"Square","disposed":true}]
"#;

    #[test]
    fn test_replay_through_watcher() {
        let source = ReplaySource::from_jsonl(RECORDS).unwrap();
        assert_eq!(source.remaining_polls(), 2);

        let mut watcher = Watcher::new(source).with_interval(Duration::from_millis(1));
        let running = AtomicBool::new(true);
        let mut reports = Vec::new();
        let cycles = watcher.run(&running, |r| reports.push(r.clone()));

        assert_eq!(cycles, 3);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].appeared.len(), 2);
        assert_eq!(reports[1].changes.len(), 1);
        assert_eq!(reports[2].disposed.len(), 1);
    }

    #[test]
    fn test_unwatched_kinds_do_not_stall() {
        let source = ReplaySource::from_jsonl(RECORDS).unwrap();
        let mut watcher = Watcher::new(source)
            .with_kinds(vec![DiscoveryKind::Participant])
            .with_interval(Duration::from_millis(1));
        let running = AtomicBool::new(true);
        let mut appeared = 0;
        let cycles = watcher.run(&running, |r| appeared += r.appeared.len());
        assert_eq!(cycles, 3);
        assert_eq!(appeared, 1);
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let err = ReplaySource::from_jsonl("[]\n{\"key\":\"p1\"}").err().unwrap();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_malformed_record_skipped() {
        let content = concat!(
            r#"[{"key":"w1","kind":"publication","qos":["History.KeepLast many"]},"#,
            r#"{"key":"w2","kind":"publication","name":"Circle"}]"#
        );
        let mut source = ReplaySource::from_jsonl(content).unwrap();
        let records = source.poll_records(DiscoveryKind::Publication);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key.as_str(), "w2");
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", RECORDS).unwrap();
        let source = ReplaySource::open(file.path()).unwrap();
        assert_eq!(source.remaining_polls(), 2);

        assert!(ReplaySource::open(Path::new("/nonexistent/records.jsonl")).is_err());
    }
}
