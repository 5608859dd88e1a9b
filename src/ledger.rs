//! Append-only violation ledger
//!
//! Events are kept in detection order. Appending is the only mutation; counts are
//! always recomputed from the stored events rather than tracked separately.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Severity, ViolationEvent, ViolationKind};

/// Ordered record of one session's violation events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLedger {
    events: Vec<ViolationEvent>,
}

impl EventLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, event: ViolationEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[ViolationEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Running count per kind; kinds with no events are omitted
    pub fn counts_by_kind(&self) -> BTreeMap<ViolationKind, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Count per severity; severities with no events are omitted
    pub fn counts_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn count_of(&self, kind: ViolationKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Most recent event of `kind` detected at or after `since`
    pub fn latest_since(&self, kind: ViolationKind, since: DateTime<Utc>) -> Option<&ViolationEvent> {
        self.events
            .iter()
            .rev()
            .take_while(|e| e.timestamp >= since)
            .find(|e| e.kind == kind)
    }
}
