//! Device planning - resolve the selection into an ordered work list

use inventory::{Device, InventoryReader, SelectionCriteria};
use std::collections::HashSet;

use crate::error::{Result, SelectionError};

/// Resolve `criteria` to the devices a run will process
///
/// Devices are de-duplicated by id and sorted by (name, id) so repeated
/// runs against unchanged data visit them in the same order.
pub fn select_devices<R: InventoryReader + ?Sized>(
    store: &R,
    criteria: &SelectionCriteria,
) -> Result<Vec<Device>> {
    if criteria.is_empty() {
        return Err(SelectionError::NoCriteria.into());
    }

    if criteria.device.is_some() && !criteria_without_device(criteria).is_empty() {
        log::info!("Explicit device selected; ignoring other selection criteria");
    }

    let mut seen = HashSet::new();
    let mut devices: Vec<Device> = store
        .resolve_devices(criteria)?
        .into_iter()
        .filter(|device| seen.insert(device.id))
        .collect();

    if devices.is_empty() {
        return Err(SelectionError::NoDevices.into());
    }

    devices.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    log::info!("Selected {} device(s)", devices.len());

    Ok(devices)
}

fn criteria_without_device(criteria: &SelectionCriteria) -> SelectionCriteria {
    SelectionCriteria {
        device: None,
        ..criteria.clone()
    }
}
