//! Sync executor - applies a device diff inside one transaction

use inventory::{
    ComponentKind, Device, DeviceTransaction, InventoryWriter, LiveComponent, NewComponent,
    with_device_transaction,
};
use serde::{Deserialize, Serialize};

use super::SyncMode;
use super::differ::{AttributeDrift, DeviceDiff, KindDiff};
use super::protection::{self, ProtectionPolicy};
use crate::config::SyncOptions;
use crate::error::{Result, SyncError};

/// Options for applying a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    pub protection: ProtectionPolicy,
    /// Delete protected components too
    pub force: bool,
    /// Status given to new interfaces
    pub interface_status: Option<String>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            protection: ProtectionPolicy::default(),
            force: false,
            interface_status: Some("Active".to_string()),
        }
    }
}

impl From<&SyncOptions> for ApplyOptions {
    fn from(opts: &SyncOptions) -> Self {
        Self {
            protection: opts.protection(),
            force: opts.force,
            interface_status: opts.interface_status().map(str::to_string),
        }
    }
}

/// What happened (or would happen) to one kind on one device
///
/// All name lists are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindOutcome {
    pub kind: ComponentKind,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Extra components kept because they are protected
    pub protected: Vec<String>,
    /// Protected components deleted because of force
    pub forced: Vec<String>,
    /// Missing components not created in this mode
    pub pending_add: Vec<String>,
    /// Extra components not deleted in this mode
    pub pending_remove: Vec<String>,
    pub drift: Vec<AttributeDrift>,
}

impl KindOutcome {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            added: Vec::new(),
            removed: Vec::new(),
            protected: Vec::new(),
            forced: Vec::new(),
            pending_add: Vec::new(),
            pending_remove: Vec::new(),
            drift: Vec::new(),
        }
    }

    pub fn has_applied_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending_add.is_empty() || !self.pending_remove.is_empty()
    }
}

/// Outcome of diff mode: nothing is touched and no transaction is opened
///
/// Pending removals exclude components the policy would keep, unless
/// force is set.
pub fn preview(diff: &DeviceDiff, options: &ApplyOptions) -> Vec<KindOutcome> {
    diff.kinds
        .iter()
        .map(|kind_diff| {
            let mut outcome = KindOutcome::new(kind_diff.kind);
            outcome.drift.clone_from(&kind_diff.to_update);
            outcome.pending_add = kind_diff.to_add_names();

            let (removable, protected) =
                protection::partition(&kind_diff.to_remove, options.protection);
            if options.force {
                outcome.pending_remove = kind_diff.to_remove_names();
            } else {
                outcome.pending_remove = names_of(&removable);
                outcome.protected = names_of(&protected);
            }

            outcome
        })
        .collect()
}

/// Apply a device diff under `mode`
///
/// Every requested kind is mutated inside one transaction with at most one
/// bulk create and one bulk delete per kind. Any error rolls back the whole
/// device.
pub fn apply<W: InventoryWriter + ?Sized>(
    store: &W,
    diff: &DeviceDiff,
    mode: SyncMode,
    options: &ApplyOptions,
) -> Result<Vec<KindOutcome>> {
    if !mode.mutates() {
        return Ok(preview(diff, options));
    }

    if !diff.has_changes() {
        log::debug!("{} is already in sync", diff.device.name);
        return Ok(preview(diff, options)
            .into_iter()
            .map(|outcome| KindOutcome {
                pending_add: Vec::new(),
                pending_remove: Vec::new(),
                ..outcome
            })
            .collect());
    }

    with_device_transaction(store, &diff.device, |tx| {
        diff.kinds
            .iter()
            .map(|kind_diff| apply_kind(&mut *tx, &diff.device, kind_diff, mode, options))
            .collect()
    })
}

fn apply_kind(
    tx: &mut dyn DeviceTransaction,
    device: &Device,
    kind_diff: &KindDiff,
    mode: SyncMode,
    options: &ApplyOptions,
) -> Result<KindOutcome> {
    let kind = kind_diff.kind;
    let mut outcome = KindOutcome::new(kind);
    outcome.drift.clone_from(&kind_diff.to_update);

    if mode.adds() {
        if !kind_diff.to_add.is_empty() {
            let items: Vec<NewComponent> = kind_diff
                .to_add
                .iter()
                .map(|template| {
                    NewComponent::from_template(template, options.interface_status.as_deref())
                })
                .collect();
            let expected = items.len();

            let created = tx.bulk_create(kind, items)?;
            if created != expected {
                log::warn!("{}: created {created} of {expected} {kind}", device.name);
            }
            outcome.added = kind_diff.to_add_names();
            log::info!("{}: added {expected} {kind}", device.name);
        }
    } else {
        outcome.pending_add = kind_diff.to_add_names();
    }

    if !mode.removes() {
        outcome.pending_remove = kind_diff.to_remove_names();
        return Ok(outcome);
    }

    let (removable, protected) =
        protection::partition(&kind_diff.to_remove, options.protection);

    for component in &protected {
        let reasons: Vec<String> = protection::protection_reasons(component, options.protection)
            .iter()
            .map(ToString::to_string)
            .collect();
        if options.force {
            log::warn!(
                "{}: force-removing protected {kind} {} ({})",
                device.name,
                component.name,
                reasons.join(", ")
            );
        } else {
            log::warn!(
                "{}: keeping protected {kind} {} ({})",
                device.name,
                component.name,
                reasons.join(", ")
            );
        }
    }

    let targets: Vec<&LiveComponent> = if options.force {
        outcome.forced = names_of(&protected);
        kind_diff.to_remove.iter().collect()
    } else {
        outcome.protected = names_of(&protected);
        removable
    };

    if !options.force {
        ensure_unprotected(device, kind, &targets, options.protection)?;
    }

    if !targets.is_empty() {
        let names = names_of(&targets);
        let deleted = tx.bulk_delete(kind, &names)?;
        if deleted != names.len() {
            log::warn!(
                "{}: deleted {deleted} of {} {kind}; some were already gone",
                device.name,
                names.len()
            );
        }
        log::info!("{}: removed {} {kind}", device.name, names.len());
        outcome.removed = names;
    }

    Ok(outcome)
}

/// Refuse to delete anything the policy protects
fn ensure_unprotected(
    device: &Device,
    kind: ComponentKind,
    targets: &[&LiveComponent],
    policy: ProtectionPolicy,
) -> Result<()> {
    let violations: Vec<String> = targets
        .iter()
        .filter(|component| protection::is_protected(component, policy))
        .map(|component| component.name.clone())
        .collect();

    if violations.is_empty() {
        return Ok(());
    }

    log::error!(
        "{}: refusing to remove protected {kind}: {}",
        device.name,
        violations.join(", ")
    );
    Err(SyncError::ProtectedComponentViolation {
        device: device.name.clone(),
        kind,
        names: violations,
    })
}

fn names_of(components: &[&LiveComponent]) -> Vec<String> {
    components.iter().map(|c| c.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::differ::compute_device_diff;
    use inventory::{
        CallCounts, ComponentAttributes, DeviceType, FailurePoint, LiveState, MemoryInventory,
        TemplateComponent,
    };

    const IFACE: ComponentKind = ComponentKind::Interface;
    const BAY: ComponentKind = ComponentKind::DeviceBay;

    fn iface_template(name: &str) -> TemplateComponent {
        TemplateComponent::new(name, ComponentAttributes::interface("1000base-t"))
    }

    fn iface(name: &str) -> LiveComponent {
        LiveComponent::new(name, ComponentAttributes::interface("1000base-t"))
    }

    fn addressed(name: &str) -> LiveComponent {
        iface(name).with_state(LiveState {
            addresses: vec!["10.0.0.1/24".into()],
            ..LiveState::default()
        })
    }

    /// Device with template {Gi1/0/1, Gi1/0/2, Gi1/0/3, Bay 1} and live
    /// {Gi1/0/1, Gi1/0/9, mgmt0 (addressed), Bay 2}
    fn fixture() -> (MemoryInventory, Device) {
        let store = MemoryInventory::new();
        let device_type = DeviceType::new(1, "Cisco", "C9300-48P");
        store.add_device_type(device_type.clone());
        for name in ["Gi1/0/1", "Gi1/0/2", "Gi1/0/3"] {
            store.add_template(device_type.id, iface_template(name));
        }
        store.add_template(
            device_type.id,
            TemplateComponent::new("Bay 1", ComponentAttributes::DeviceBay),
        );

        let device = Device::new(7, "access-07").with_type(device_type.id);
        store.add_device(device.clone());
        store.add_live(device.id, iface("Gi1/0/1"));
        store.add_live(device.id, iface("Gi1/0/9"));
        store.add_live(device.id, addressed("mgmt0"));
        store.add_live(device.id, LiveComponent::new("Bay 2", ComponentAttributes::DeviceBay));

        (store, device)
    }

    fn diff_of(store: &MemoryInventory, device: &Device) -> DeviceDiff {
        compute_device_diff(store, device, &[IFACE, BAY], true).unwrap()
    }

    fn outcome(outcomes: &[KindOutcome], kind: ComponentKind) -> &KindOutcome {
        outcomes.iter().find(|o| o.kind == kind).unwrap()
    }

    #[test]
    fn test_add_uses_one_bulk_call_per_kind() {
        let (store, device) = fixture();
        let diff = diff_of(&store, &device);

        let outcomes = apply(&store, &diff, SyncMode::Add, &ApplyOptions::default()).unwrap();

        let interfaces = outcome(&outcomes, IFACE);
        assert_eq!(interfaces.added, vec!["Gi1/0/2", "Gi1/0/3"]);
        assert_eq!(interfaces.pending_remove, vec!["Gi1/0/9", "mgmt0"]);
        assert!(interfaces.removed.is_empty());
        assert_eq!(outcome(&outcomes, BAY).added, vec!["Bay 1"]);

        assert_eq!(store.call_counts(device.id, IFACE).creates, 1);
        assert_eq!(store.call_counts(device.id, IFACE).deletes, 0);
        assert_eq!(
            store.live_names(device.id, IFACE),
            vec!["Gi1/0/1", "Gi1/0/2", "Gi1/0/3", "Gi1/0/9", "mgmt0"]
        );
        let created = store.live_component(device.id, IFACE, "Gi1/0/2").unwrap();
        assert_eq!(created.status.as_deref(), Some("Active"));
    }

    #[test]
    fn test_empty_interface_status_leaves_status_unset() {
        let (store, device) = fixture();
        let diff = diff_of(&store, &device);
        let options = ApplyOptions::from(&SyncOptions {
            interface_status: String::new(),
            ..SyncOptions::new(SyncMode::Add, [IFACE, BAY])
        });
        assert_eq!(options.interface_status, None);

        apply(&store, &diff, SyncMode::Add, &options).unwrap();

        let created = store.live_component(device.id, IFACE, "Gi1/0/2").unwrap();
        assert_eq!(created.status, None);
    }

    #[test]
    fn test_remove_keeps_protected() {
        let (store, device) = fixture();
        let diff = diff_of(&store, &device);

        let outcomes = apply(&store, &diff, SyncMode::Remove, &ApplyOptions::default()).unwrap();

        let interfaces = outcome(&outcomes, IFACE);
        assert_eq!(interfaces.removed, vec!["Gi1/0/9"]);
        assert_eq!(interfaces.protected, vec!["mgmt0"]);
        assert!(interfaces.forced.is_empty());
        assert_eq!(interfaces.pending_add, vec!["Gi1/0/2", "Gi1/0/3"]);
        assert_eq!(store.live_names(device.id, IFACE), vec!["Gi1/0/1", "mgmt0"]);
        assert_eq!(store.live_names(device.id, BAY), Vec::<String>::new());
        assert_eq!(store.call_counts(device.id, IFACE).deletes, 1);
    }

    #[test]
    fn test_force_removes_protected_and_reports_forced() {
        let (store, device) = fixture();
        let diff = diff_of(&store, &device);
        let options = ApplyOptions {
            force: true,
            ..ApplyOptions::default()
        };

        let outcomes = apply(&store, &diff, SyncMode::Sync, &options).unwrap();

        let interfaces = outcome(&outcomes, IFACE);
        assert_eq!(interfaces.removed, vec!["Gi1/0/9", "mgmt0"]);
        assert_eq!(interfaces.forced, vec!["mgmt0"]);
        assert!(interfaces.protected.is_empty());
        assert_eq!(
            store.live_names(device.id, IFACE),
            vec!["Gi1/0/1", "Gi1/0/2", "Gi1/0/3"]
        );
    }

    #[test]
    fn test_diff_mode_touches_nothing() {
        let (store, device) = fixture();
        let diff = diff_of(&store, &device);

        let outcomes = apply(&store, &diff, SyncMode::Diff, &ApplyOptions::default()).unwrap();

        let interfaces = outcome(&outcomes, IFACE);
        assert_eq!(interfaces.pending_add, vec!["Gi1/0/2", "Gi1/0/3"]);
        assert_eq!(interfaces.pending_remove, vec!["Gi1/0/9"]);
        assert_eq!(interfaces.protected, vec!["mgmt0"]);
        assert!(!interfaces.has_applied_changes());
        assert_eq!(store.call_counts(device.id, IFACE), CallCounts::default());
        assert_eq!(store.live_names(device.id, IFACE).len(), 3);
    }

    #[test]
    fn test_failure_rolls_back_every_kind() {
        let (store, device) = fixture();
        let diff = diff_of(&store, &device);
        store.inject_failure(device.id, FailurePoint::Delete);

        let err = apply(&store, &diff, SyncMode::Sync, &ApplyOptions::default()).unwrap_err();

        assert!(matches!(err, SyncError::Store(_)));
        assert_eq!(store.call_counts(device.id, IFACE).creates, 1);
        assert_eq!(
            store.live_names(device.id, IFACE),
            vec!["Gi1/0/1", "Gi1/0/9", "mgmt0"]
        );
        assert_eq!(store.live_names(device.id, BAY), vec!["Bay 2"]);
    }

    #[test]
    fn test_commit_failure_leaves_device_unchanged() {
        let (store, device) = fixture();
        let diff = diff_of(&store, &device);
        store.inject_failure(device.id, FailurePoint::Commit);

        assert!(apply(&store, &diff, SyncMode::Add, &ApplyOptions::default()).is_err());
        assert_eq!(store.live_names(device.id, BAY), vec!["Bay 2"]);
    }

    #[test]
    fn test_in_sync_device_opens_no_transaction() {
        let (store, device) = fixture();
        let options = ApplyOptions {
            force: true,
            ..ApplyOptions::default()
        };
        apply(&store, &diff_of(&store, &device), SyncMode::Sync, &options).unwrap();

        store.inject_failure(device.id, FailurePoint::Commit);
        let outcomes = apply(&store, &diff_of(&store, &device), SyncMode::Sync, &options).unwrap();

        assert!(outcomes.iter().all(|o| !o.has_applied_changes() && !o.has_pending_changes()));
    }

    #[test]
    fn test_guard_rejects_protected_targets() {
        let device = Device::new(1, "edge-01");
        let mgmt = addressed("mgmt0");
        let err = ensure_unprotected(&device, IFACE, &[&mgmt], ProtectionPolicy::default())
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::ProtectedComponentViolation { ref names, .. } if names == &["mgmt0"]
        ));
    }
}
