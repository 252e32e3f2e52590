//! Store interfaces and the per-device transaction scope
//!
//! These traits let the reconciliation engine run against any inventory
//! backend without depending on how devices and components are persisted.

use crate::error::Result;
use crate::selection::SelectionCriteria;
use crate::types::{
    ComponentKind, Device, DeviceType, LiveComponent, NewComponent, TemplateComponent,
};

/// Read side of an inventory store
///
/// Implementations must be shareable across worker threads.
pub trait InventoryReader: Send + Sync {
    /// Device type assigned to a device, or `None` when it has none
    fn get_assigned_type(&self, device: &Device) -> Result<Option<DeviceType>>;

    /// Template components of one kind declared on a device type
    fn list_template_components(
        &self,
        device_type: &DeviceType,
        kind: ComponentKind,
    ) -> Result<Vec<TemplateComponent>>;

    /// Components of one kind currently recorded on a device
    fn list_live_components(&self, device: &Device, kind: ComponentKind)
    -> Result<Vec<LiveComponent>>;

    /// Devices matching the selection criteria
    ///
    /// An explicit device in the criteria overrides every other filter.
    fn resolve_devices(&self, criteria: &SelectionCriteria) -> Result<Vec<Device>>;
}

/// Write side of an inventory store
pub trait InventoryWriter: Send + Sync {
    /// Open a transaction scoped to one device
    fn begin(&self, device: &Device) -> Result<Box<dyn DeviceTransaction + '_>>;
}

/// Mutations for a single device, applied atomically on commit
///
/// A transaction dropped without [`commit`](DeviceTransaction::commit)
/// must leave the store unchanged.
pub trait DeviceTransaction {
    /// Create all items of one kind in a single call
    fn bulk_create(&mut self, kind: ComponentKind, items: Vec<NewComponent>) -> Result<usize>;

    /// Delete the named components of one kind in a single call
    fn bulk_delete(&mut self, kind: ComponentKind, names: &[String]) -> Result<usize>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}

/// A store offering both read and write access
pub trait Inventory: InventoryReader + InventoryWriter {}

impl<T: InventoryReader + InventoryWriter + ?Sized> Inventory for T {}

/// Run `f` inside a transaction for `device`
///
/// Commits when `f` succeeds and rolls back when it fails. A failed
/// rollback is logged; the error from `f` is what the caller sees.
pub fn with_device_transaction<W, T, E, F>(store: &W, device: &Device, f: F) -> std::result::Result<T, E>
where
    W: InventoryWriter + ?Sized,
    E: From<crate::error::StoreError>,
    F: FnOnce(&mut dyn DeviceTransaction) -> std::result::Result<T, E>,
{
    let mut tx = store.begin(device)?;

    match f(tx.as_mut()) {
        Ok(value) => {
            tx.commit()?;
            log::debug!("Committed transaction for {}", device.name);
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                log::error!(
                    "Rollback failed for {} ({}): {rollback_err}",
                    device.name,
                    device.id
                );
            } else {
                log::debug!("Rolled back transaction for {}", device.name);
            }
            Err(err)
        }
    }
}
