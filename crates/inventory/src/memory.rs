//! In-process inventory store
//!
//! `MemoryInventory` keeps devices, device types and components in memory
//! behind a lock. Transactions stage their mutations and apply them under a
//! single write lock on commit, so a device is never observed half-updated.
//! Faults can be injected per device to exercise failure handling.

use crate::error::{Result, StoreError};
use crate::selection::SelectionCriteria;
use crate::store::{DeviceTransaction, InventoryReader, InventoryWriter};
use crate::types::{
    ComponentKind, Device, DeviceId, DeviceType, DeviceTypeId, LiveComponent, NewComponent,
    TemplateComponent,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Where an injected fault fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    /// Any read of the device's type or components
    Read,
    /// `bulk_create` on the device
    Create,
    /// `bulk_delete` on the device
    Delete,
    /// Commit of the device's transaction
    Commit,
}

/// Number of bulk calls issued for one (device, kind)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub creates: usize,
    pub deletes: usize,
}

#[derive(Debug, Default)]
struct State {
    devices: BTreeMap<DeviceId, Device>,
    device_types: BTreeMap<DeviceTypeId, DeviceType>,
    templates: HashMap<(DeviceTypeId, ComponentKind), Vec<TemplateComponent>>,
    live: HashMap<(DeviceId, ComponentKind), Vec<LiveComponent>>,
}

/// In-memory implementation of the inventory store interfaces
#[derive(Debug, Default)]
pub struct MemoryInventory {
    state: RwLock<State>,
    faults: Mutex<HashMap<DeviceId, HashSet<FailurePoint>>>,
    calls: Mutex<HashMap<(DeviceId, ComponentKind), CallCounts>>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> MutexGuard<'_, HashMap<DeviceId, HashSet<FailurePoint>>> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn calls(&self) -> MutexGuard<'_, HashMap<(DeviceId, ComponentKind), CallCounts>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Population
    // ========================================================================

    pub fn add_device_type(&self, device_type: DeviceType) {
        self.write_state()
            .device_types
            .insert(device_type.id, device_type);
    }

    /// Declare a template component on a device type
    pub fn add_template(&self, device_type: DeviceTypeId, template: TemplateComponent) {
        self.write_state()
            .templates
            .entry((device_type, template.kind()))
            .or_default()
            .push(template);
    }

    pub fn add_device(&self, device: Device) {
        self.write_state().devices.insert(device.id, device);
    }

    /// Record a live component on a device, replacing one with the same name
    pub fn add_live(&self, device: DeviceId, component: LiveComponent) {
        let mut state = self.write_state();
        let components = state.live.entry((device, component.kind())).or_default();
        components.retain(|c| c.name != component.name);
        components.push(component);
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Sorted names of a device's live components of one kind
    pub fn live_names(&self, device: DeviceId, kind: ComponentKind) -> Vec<String> {
        let mut names: Vec<String> = self
            .read_state()
            .live
            .get(&(device, kind))
            .map(|components| components.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn live_component(
        &self,
        device: DeviceId,
        kind: ComponentKind,
        name: &str,
    ) -> Option<LiveComponent> {
        self.read_state()
            .live
            .get(&(device, kind))
            .and_then(|components| components.iter().find(|c| c.name == name).cloned())
    }

    /// Bulk calls issued so far for a device and kind
    pub fn call_counts(&self, device: DeviceId, kind: ComponentKind) -> CallCounts {
        self.calls().get(&(device, kind)).copied().unwrap_or_default()
    }

    // ========================================================================
    // Fault Injection
    // ========================================================================

    /// Make every operation at `point` fail for `device`
    pub fn inject_failure(&self, device: DeviceId, point: FailurePoint) {
        self.faults().entry(device).or_default().insert(point);
    }

    pub fn clear_failures(&self) {
        self.faults().clear();
    }

    fn check_fault(&self, device: DeviceId, point: FailurePoint) -> Result<()> {
        let tripped = self
            .faults()
            .get(&device)
            .is_some_and(|points| points.contains(&point));

        if !tripped {
            return Ok(());
        }

        let message = format!("injected {point:?} failure for device {device}");
        Err(match point {
            FailurePoint::Commit => StoreError::Transaction(message),
            _ => StoreError::Connectivity(message),
        })
    }
}

impl InventoryReader for MemoryInventory {
    fn get_assigned_type(&self, device: &Device) -> Result<Option<DeviceType>> {
        self.check_fault(device.id, FailurePoint::Read)?;

        let state = self.read_state();
        Ok(device
            .device_type
            .and_then(|id| state.device_types.get(&id).cloned()))
    }

    fn list_template_components(
        &self,
        device_type: &DeviceType,
        kind: ComponentKind,
    ) -> Result<Vec<TemplateComponent>> {
        Ok(self
            .read_state()
            .templates
            .get(&(device_type.id, kind))
            .cloned()
            .unwrap_or_default())
    }

    fn list_live_components(
        &self,
        device: &Device,
        kind: ComponentKind,
    ) -> Result<Vec<LiveComponent>> {
        self.check_fault(device.id, FailurePoint::Read)?;

        Ok(self
            .read_state()
            .live
            .get(&(device.id, kind))
            .cloned()
            .unwrap_or_default())
    }

    fn resolve_devices(&self, criteria: &SelectionCriteria) -> Result<Vec<Device>> {
        Ok(self
            .read_state()
            .devices
            .values()
            .filter(|device| criteria.matches(device))
            .cloned()
            .collect())
    }
}

impl InventoryWriter for MemoryInventory {
    fn begin(&self, device: &Device) -> Result<Box<dyn DeviceTransaction + '_>> {
        if !self.read_state().devices.contains_key(&device.id) {
            return Err(StoreError::NotFound(format!("device {}", device.id)));
        }

        Ok(Box::new(MemoryTransaction {
            store: self,
            device: device.id,
            creates: Vec::new(),
            deletes: Vec::new(),
        }))
    }
}

/// Staged mutations for one device
struct MemoryTransaction<'a> {
    store: &'a MemoryInventory,
    device: DeviceId,
    creates: Vec<(ComponentKind, Vec<NewComponent>)>,
    deletes: Vec<(ComponentKind, Vec<String>)>,
}

impl MemoryTransaction<'_> {
    fn staged_deletes(&self, kind: ComponentKind) -> impl Iterator<Item = &String> {
        self.deletes
            .iter()
            .filter(move |(k, _)| *k == kind)
            .flat_map(|(_, names)| names)
    }

    fn staged_creates(&self, kind: ComponentKind) -> impl Iterator<Item = &NewComponent> {
        self.creates
            .iter()
            .filter(move |(k, _)| *k == kind)
            .flat_map(|(_, items)| items)
    }
}

impl DeviceTransaction for MemoryTransaction<'_> {
    fn bulk_create(&mut self, kind: ComponentKind, items: Vec<NewComponent>) -> Result<usize> {
        self.store.calls().entry((self.device, kind)).or_default().creates += 1;
        self.store.check_fault(self.device, FailurePoint::Create)?;

        let deleted: HashSet<&String> = self.staged_deletes(kind).collect();
        let mut taken: HashSet<String> = self
            .store
            .read_state()
            .live
            .get(&(self.device, kind))
            .map(|components| {
                components
                    .iter()
                    .filter(|c| !deleted.contains(&c.name))
                    .map(|c| c.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        taken.extend(self.staged_creates(kind).map(|item| item.name.clone()));

        for item in &items {
            if item.kind() != kind {
                return Err(StoreError::Constraint(format!(
                    "{} is a {} component, not {kind}",
                    item.name,
                    item.kind()
                )));
            }
            if !taken.insert(item.name.clone()) {
                return Err(StoreError::Constraint(format!(
                    "{kind} {} already exists on device {}",
                    item.name, self.device
                )));
            }
        }

        let count = items.len();
        self.creates.push((kind, items));
        Ok(count)
    }

    fn bulk_delete(&mut self, kind: ComponentKind, names: &[String]) -> Result<usize> {
        self.store.calls().entry((self.device, kind)).or_default().deletes += 1;
        self.store.check_fault(self.device, FailurePoint::Delete)?;

        let already: HashSet<&String> = self.staged_deletes(kind).collect();
        let existing: HashSet<String> = self
            .store
            .read_state()
            .live
            .get(&(self.device, kind))
            .map(|components| components.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();

        let targets: Vec<String> = names
            .iter()
            .filter(|name| existing.contains(*name) && !already.contains(name))
            .cloned()
            .collect();

        let count = targets.len();
        self.deletes.push((kind, targets));
        Ok(count)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let Self {
            store,
            device,
            creates,
            deletes,
        } = *self;

        store.check_fault(device, FailurePoint::Commit)?;

        let mut state = store.write_state();

        for (kind, names) in deletes {
            if let Some(components) = state.live.get_mut(&(device, kind)) {
                components.retain(|c| !names.contains(&c.name));
            }
        }

        for (kind, items) in creates {
            state
                .live
                .entry((device, kind))
                .or_default()
                .extend(items.into_iter().map(NewComponent::into_live));
        }

        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        log::debug!(
            "Discarding {} staged create batch(es) and {} delete batch(es) for device {}",
            self.creates.len(),
            self.deletes.len(),
            self.device
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ComponentAttributes;

    fn fixture() -> (MemoryInventory, Device) {
        let store = MemoryInventory::new();
        let device_type = DeviceType::new(1, "Arista", "DCS-7050SX3-48YC8");
        store.add_device_type(device_type.clone());
        let device = Device::new(1, "leaf1").with_type(device_type.id);
        store.add_device(device.clone());
        store.add_live(
            device.id,
            LiveComponent::new("Ethernet1", ComponentAttributes::interface("25gbase-x-sfp28")),
        );
        (store, device)
    }

    fn new_interface(name: &str) -> NewComponent {
        NewComponent::from_template(
            &TemplateComponent::new(name, ComponentAttributes::interface("25gbase-x-sfp28")),
            Some("Active"),
        )
    }

    #[test]
    fn test_staged_changes_invisible_until_commit() {
        let (store, device) = fixture();
        let mut tx = store.begin(&device).unwrap();

        tx.bulk_create(ComponentKind::Interface, vec![new_interface("Ethernet2")])
            .unwrap();
        assert_eq!(
            store.live_names(device.id, ComponentKind::Interface),
            vec!["Ethernet1".to_string()]
        );

        tx.commit().unwrap();
        assert_eq!(
            store.live_names(device.id, ComponentKind::Interface),
            vec!["Ethernet1".to_string(), "Ethernet2".to_string()]
        );
        let created = store
            .live_component(device.id, ComponentKind::Interface, "Ethernet2")
            .unwrap();
        assert_eq!(created.status.as_deref(), Some("Active"));
    }

    #[test]
    fn test_dropped_transaction_changes_nothing() {
        let (store, device) = fixture();
        {
            let mut tx = store.begin(&device).unwrap();
            tx.bulk_delete(ComponentKind::Interface, &["Ethernet1".to_string()])
                .unwrap();
        }
        assert_eq!(
            store.live_names(device.id, ComponentKind::Interface),
            vec!["Ethernet1".to_string()]
        );
    }

    #[test]
    fn test_duplicate_create_is_constraint_error() {
        let (store, device) = fixture();
        let mut tx = store.begin(&device).unwrap();

        let err = tx
            .bulk_create(ComponentKind::Interface, vec![new_interface("Ethernet1")])
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        let err = tx
            .bulk_create(
                ComponentKind::Interface,
                vec![new_interface("Ethernet9"), new_interface("Ethernet9")],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[test]
    fn test_delete_counts_only_existing_names() {
        let (store, device) = fixture();
        let mut tx = store.begin(&device).unwrap();

        let deleted = tx
            .bulk_delete(
                ComponentKind::Interface,
                &["Ethernet1".to_string(), "Ethernet404".to_string()],
            )
            .unwrap();
        assert_eq!(deleted, 1);
        tx.commit().unwrap();
        assert!(store.live_names(device.id, ComponentKind::Interface).is_empty());
    }

    #[test]
    fn test_injected_faults() {
        let (store, device) = fixture();
        store.inject_failure(device.id, FailurePoint::Read);
        assert!(matches!(
            store.list_live_components(&device, ComponentKind::Interface),
            Err(StoreError::Connectivity(_))
        ));

        store.clear_failures();
        store.inject_failure(device.id, FailurePoint::Commit);
        let mut tx = store.begin(&device).unwrap();
        tx.bulk_create(ComponentKind::Interface, vec![new_interface("Ethernet2")])
            .unwrap();
        assert!(matches!(tx.commit(), Err(StoreError::Transaction(_))));
        assert_eq!(store.live_names(device.id, ComponentKind::Interface).len(), 1);
    }

    #[test]
    fn test_call_counts() {
        let (store, device) = fixture();
        let mut tx = store.begin(&device).unwrap();
        tx.bulk_create(
            ComponentKind::Interface,
            vec![new_interface("Ethernet2"), new_interface("Ethernet3")],
        )
        .unwrap();
        tx.commit().unwrap();

        assert_eq!(
            store.call_counts(device.id, ComponentKind::Interface),
            CallCounts {
                creates: 1,
                deletes: 0
            }
        );
    }

    #[test]
    fn test_begin_unknown_device() {
        let store = MemoryInventory::new();
        assert!(matches!(
            store.begin(&Device::new(5, "ghost")).err(),
            Some(StoreError::NotFound(_))
        ));
    }
}
