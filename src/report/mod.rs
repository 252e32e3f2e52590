//! Run reports
//!
//! [`ReportBuilder`] accumulates one [`DeviceOutcome`] per processed device
//! and computes every total as it goes. [`SyncReport`] is the finished,
//! immutable snapshot; rendering never re-derives totals.

pub mod render;

use chrono::{DateTime, Utc};
use inventory::{ComponentKind, DeviceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ReportOptions;
use crate::engine::{KindOutcome, SyncMode};
use crate::error::{ErrorKind, SyncError};

pub use render::render_text;

/// Per-kind counters summed over all devices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTotals {
    pub added: usize,
    pub removed: usize,
    pub protected: usize,
    pub forced: usize,
    pub pending_add: usize,
    pub pending_remove: usize,
    pub drifted: usize,
}

impl KindTotals {
    fn record(&mut self, outcome: &KindOutcome) {
        self.added += outcome.added.len();
        self.removed += outcome.removed.len();
        self.protected += outcome.protected.len();
        self.forced += outcome.forced.len();
        self.pending_add += outcome.pending_add.len();
        self.pending_remove += outcome.pending_remove.len();
        self.drifted += outcome.drift.len();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Succeeded,
    Failed,
}

/// One entry of the run's error list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub device: String,
    pub error: ErrorKind,
    pub message: String,
    /// Set for store failures a later run may not hit again
    #[serde(default)]
    pub transient: bool,
}

/// Result of processing one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOutcome {
    pub device: String,
    pub device_id: DeviceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    pub status: DeviceStatus,
    /// Empty for failed devices: their transaction was rolled back
    #[serde(default)]
    pub kinds: Vec<KindOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEntry>,
}

impl DeviceOutcome {
    pub fn succeeded(
        device: &inventory::Device,
        device_type: impl Into<String>,
        kinds: Vec<KindOutcome>,
    ) -> Self {
        Self {
            device: device.name.clone(),
            device_id: device.id,
            device_type: Some(device_type.into()),
            status: DeviceStatus::Succeeded,
            kinds,
            error: None,
        }
    }

    pub fn failed(device: &inventory::Device, error: &SyncError) -> Self {
        Self {
            device: device.name.clone(),
            device_id: device.id,
            device_type: None,
            status: DeviceStatus::Failed,
            kinds: Vec::new(),
            error: Some(ErrorEntry {
                device: device.name.clone(),
                error: error.kind(),
                message: error.report_message(),
                transient: error.store_transience().unwrap_or(false),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeviceStatus::Succeeded
    }

    /// Applied changes in mutating modes, pending ones in diff mode
    pub fn has_changes(&self, mode: SyncMode) -> bool {
        self.kinds.iter().any(|outcome| {
            if mode.mutates() {
                outcome.has_applied_changes()
            } else {
                outcome.has_pending_changes()
            }
        })
    }

    pub fn kind(&self, kind: ComponentKind) -> Option<&KindOutcome> {
        self.kinds.iter().find(|outcome| outcome.kind == kind)
    }
}

/// Immutable summary of a run
///
/// Apart from `started_at` and `finished_at`, two runs over unchanged
/// inventory state produce equal reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub kinds: Vec<ComponentKind>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub devices_with_changes: usize,
    /// Selected devices never started because the run was cancelled
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<String>,
    pub totals: BTreeMap<ComponentKind, KindTotals>,
    pub devices: Vec<DeviceOutcome>,
    pub errors: Vec<ErrorEntry>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Totals for a kind; zero for kinds not requested
    pub fn totals_for(&self, kind: ComponentKind) -> KindTotals {
        self.totals.get(&kind).copied().unwrap_or_default()
    }

    pub fn device(&self, name: &str) -> Option<&DeviceOutcome> {
        self.devices.iter().find(|outcome| outcome.device == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self, options: &ReportOptions) -> String {
        render::render_text(self, options)
    }
}

/// Accumulator for a run in progress
#[derive(Debug)]
pub struct ReportBuilder {
    mode: SyncMode,
    kinds: Vec<ComponentKind>,
    started_at: DateTime<Utc>,
    succeeded: usize,
    failed: usize,
    devices_with_changes: usize,
    totals: BTreeMap<ComponentKind, KindTotals>,
    devices: Vec<DeviceOutcome>,
}

impl ReportBuilder {
    pub fn new(mode: SyncMode, kinds: &[ComponentKind]) -> Self {
        Self {
            mode,
            kinds: kinds.to_vec(),
            started_at: Utc::now(),
            succeeded: 0,
            failed: 0,
            devices_with_changes: 0,
            totals: kinds.iter().map(|&kind| (kind, KindTotals::default())).collect(),
            devices: Vec::new(),
        }
    }

    /// Record one processed device
    pub fn accumulate(&mut self, outcome: DeviceOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }

        if outcome.has_changes(self.mode) {
            self.devices_with_changes += 1;
        }

        for kind_outcome in &outcome.kinds {
            self.totals
                .entry(kind_outcome.kind)
                .or_default()
                .record(kind_outcome);
        }

        self.devices.push(outcome);
    }

    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Snapshot the run
    ///
    /// Devices and errors are sorted by device name then id, so the
    /// report does not depend on processing order.
    pub fn finalize(self, skipped: usize, cancelled: Option<String>) -> SyncReport {
        let mut devices = self.devices;
        devices.sort_by(|a, b| (&a.device, a.device_id).cmp(&(&b.device, b.device_id)));

        let errors = devices
            .iter()
            .filter_map(|outcome| outcome.error.clone())
            .collect();

        SyncReport {
            mode: self.mode,
            kinds: self.kinds,
            started_at: self.started_at,
            finished_at: Utc::now(),
            processed: self.succeeded + self.failed,
            succeeded: self.succeeded,
            failed: self.failed,
            devices_with_changes: self.devices_with_changes,
            skipped,
            cancelled,
            totals: self.totals,
            devices,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory::{Device, StoreError};

    const IFACE: ComponentKind = ComponentKind::Interface;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn added(device: &Device, items: &[&str]) -> DeviceOutcome {
        let mut outcome = KindOutcome::new(IFACE);
        outcome.added = names(items);
        DeviceOutcome::succeeded(device, "Cisco C9300-48P", vec![outcome])
    }

    #[test]
    fn test_totals_zeroed_for_requested_kinds() {
        let report = ReportBuilder::new(SyncMode::Sync, &[IFACE, ComponentKind::PowerPort])
            .finalize(0, None);

        assert_eq!(report.totals.len(), 2);
        assert_eq!(report.totals_for(ComponentKind::PowerPort), KindTotals::default());
        assert_eq!(report.processed, 0);
        assert!(report.is_success());
    }

    #[test]
    fn test_accumulate_counts_and_sorts() {
        let mut builder = ReportBuilder::new(SyncMode::Add, &[IFACE]);
        builder.accumulate(added(&Device::new(2, "sw-b"), &["Gi1/0/2", "Gi1/0/3"]));
        builder.accumulate(DeviceOutcome::failed(
            &Device::new(3, "sw-c"),
            &SyncError::Store(StoreError::Connectivity("timeout".into())),
        ));
        builder.accumulate(added(&Device::new(1, "sw-a"), &[]));
        assert_eq!(builder.processed(), 3);

        let report = builder.finalize(0, None);

        assert_eq!((report.processed, report.succeeded, report.failed), (3, 2, 1));
        assert_eq!(report.devices_with_changes, 1);
        assert_eq!(report.totals_for(IFACE).added, 2);
        let order: Vec<&str> = report.devices.iter().map(|d| d.device.as_str()).collect();
        assert_eq!(order, vec!["sw-a", "sw-b", "sw-c"]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].error, ErrorKind::StoreError);
        assert!(report.errors[0].transient);
        assert!(report.errors[0].message.ends_with("timeout (transient)"));
        assert!(!report.is_success());
    }

    #[test]
    fn test_diff_mode_counts_pending_changes() {
        let mut outcome = KindOutcome::new(IFACE);
        outcome.pending_remove = names(&["Gi1/0/9"]);
        let device = DeviceOutcome::succeeded(&Device::new(1, "sw-a"), "x", vec![outcome]);

        assert!(device.has_changes(SyncMode::Diff));
        assert!(!device.has_changes(SyncMode::Add));
    }

    #[test]
    fn test_json_shape() {
        let mut builder = ReportBuilder::new(SyncMode::Remove, &[IFACE]);
        builder.accumulate(DeviceOutcome::failed(
            &Device::new(5, "edge-05"),
            &SyncError::NoDeviceType {
                device: "edge-05".into(),
            },
        ));
        let report = builder.finalize(2, Some("time limit reached".into()));

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["mode"], "remove");
        assert_eq!(value["kinds"][0], "interfaces");
        assert_eq!(value["totals"]["interfaces"]["removed"], 0);
        assert_eq!(value["errors"][0]["device"], "edge-05");
        assert_eq!(value["errors"][0]["error"], "NoDeviceType");
        assert_eq!(value["errors"][0]["transient"], false);
        assert_eq!(value["devices"][0]["status"], "failed");
        assert_eq!(value["skipped"], 2);
        assert_eq!(value["cancelled"], "time limit reached");

        let back: SyncReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }
}
