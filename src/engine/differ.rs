//! Diff computation between a device and its device type

use inventory::{
    ComponentKind, Device, DeviceType, InventoryReader, LiveComponent, TemplateComponent,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, SyncError};

/// Names shown per set when logging a diff
const LOG_NAME_LIMIT: usize = 5;

/// One attribute that differs between template and live component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDrift {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

/// Attribute differences on a component present on both sides
///
/// Informational only; the executor never applies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDrift {
    pub name: String,
    pub fields: Vec<FieldDrift>,
}

/// Partition of template and live component names for one kind
///
/// Every list is sorted by name. `to_add`, `to_remove` and `unchanged`
/// are disjoint and together cover every template and live name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindDiff {
    pub kind: ComponentKind,
    /// In the template, missing on the device
    pub to_add: Vec<TemplateComponent>,
    /// On the device, absent from the template
    pub to_remove: Vec<LiveComponent>,
    /// On both sides
    pub unchanged: Vec<String>,
    /// Subset of `unchanged` whose attributes differ
    pub to_update: Vec<AttributeDrift>,
}

impl KindDiff {
    pub fn to_add_names(&self) -> Vec<String> {
        self.to_add.iter().map(|t| t.name.clone()).collect()
    }

    pub fn to_remove_names(&self) -> Vec<String> {
        self.to_remove.iter().map(|c| c.name.clone()).collect()
    }

    /// Whether anything would be added or removed
    pub fn has_changes(&self) -> bool {
        !self.to_add.is_empty() || !self.to_remove.is_empty()
    }
}

/// Diffs for every requested kind of one device
#[derive(Debug, Clone)]
pub struct DeviceDiff {
    pub device: Device,
    pub device_type: DeviceType,
    pub kinds: Vec<KindDiff>,
}

impl DeviceDiff {
    pub fn has_changes(&self) -> bool {
        self.kinds.iter().any(KindDiff::has_changes)
    }

    pub fn get(&self, kind: ComponentKind) -> Option<&KindDiff> {
        self.kinds.iter().find(|d| d.kind == kind)
    }
}

/// Partition template and live components of one kind by exact name
///
/// Components whose attributes belong to another kind are ignored.
pub fn diff_components(
    kind: ComponentKind,
    templates: Vec<TemplateComponent>,
    live: Vec<LiveComponent>,
    detect_drift: bool,
) -> KindDiff {
    let templates = index_by_name(kind, templates, |t| (&t.name, t.kind()));
    let mut live = index_by_name(kind, live, |c| (&c.name, c.kind()));

    let mut to_add = Vec::new();
    let mut unchanged = Vec::new();
    let mut to_update = Vec::new();

    for (name, template) in templates {
        match live.remove(&name) {
            Some(instance) => {
                if detect_drift && let Some(drift) = attribute_drift(&template, &instance) {
                    to_update.push(drift);
                }
                unchanged.push(name);
            }
            None => to_add.push(template),
        }
    }

    KindDiff {
        kind,
        to_add,
        to_remove: live.into_values().collect(),
        unchanged,
        to_update,
    }
}

fn index_by_name<T>(
    kind: ComponentKind,
    items: Vec<T>,
    key: impl Fn(&T) -> (&String, ComponentKind),
) -> BTreeMap<String, T> {
    let mut indexed = BTreeMap::new();

    for item in items {
        let (name, item_kind) = key(&item);
        if item_kind != kind {
            log::warn!("Ignoring {item_kind} component {name} listed as {kind}");
            continue;
        }
        let name = name.clone();
        if indexed.insert(name.clone(), item).is_some() {
            log::warn!("Duplicate {kind} name {name}; keeping the last one");
        }
    }

    indexed
}

/// Compare label and kind-specific attributes
///
/// Only fields copied onto new components are compared. Descriptions are
/// operator configuration and are never compared. An empty template label
/// does not count as a difference.
fn attribute_drift(template: &TemplateComponent, live: &LiveComponent) -> Option<AttributeDrift> {
    let copied = template.kind().spec().fields;
    let mut fields = Vec::new();

    if !template.label.is_empty() && template.label != live.label {
        fields.push(FieldDrift {
            field: "label".to_string(),
            expected: template.label.clone(),
            actual: live.label.clone(),
        });
    }

    for ((field, expected), (_, actual)) in template
        .attributes
        .fields()
        .into_iter()
        .zip(live.attributes.fields())
        .filter(|((field, _), _)| copied.contains(field))
    {
        if expected != actual {
            fields.push(FieldDrift {
                field: field.to_string(),
                expected,
                actual,
            });
        }
    }

    (!fields.is_empty()).then(|| AttributeDrift {
        name: template.name.clone(),
        fields,
    })
}

/// Compute the diff for one device and one kind
pub fn compute_diff<R: InventoryReader + ?Sized>(
    store: &R,
    device: &Device,
    kind: ComponentKind,
    detect_drift: bool,
) -> Result<KindDiff> {
    let device_type = assigned_type(store, device)?;
    diff_kind(store, device, &device_type, kind, detect_drift)
}

/// Compute diffs for several kinds, fetching the device type once
pub fn compute_device_diff<R: InventoryReader + ?Sized>(
    store: &R,
    device: &Device,
    kinds: &[ComponentKind],
    detect_drift: bool,
) -> Result<DeviceDiff> {
    let device_type = assigned_type(store, device)?;

    let kinds = kinds
        .iter()
        .map(|&kind| diff_kind(store, device, &device_type, kind, detect_drift))
        .collect::<Result<Vec<_>>>()?;

    Ok(DeviceDiff {
        device: device.clone(),
        device_type,
        kinds,
    })
}

fn assigned_type<R: InventoryReader + ?Sized>(store: &R, device: &Device) -> Result<DeviceType> {
    store
        .get_assigned_type(device)?
        .ok_or_else(|| SyncError::NoDeviceType {
            device: device.name.clone(),
        })
}

fn diff_kind<R: InventoryReader + ?Sized>(
    store: &R,
    device: &Device,
    device_type: &DeviceType,
    kind: ComponentKind,
    detect_drift: bool,
) -> Result<KindDiff> {
    let templates = store.list_template_components(device_type, kind)?;
    let live = store.list_live_components(device, kind)?;
    Ok(diff_components(kind, templates, live, detect_drift))
}

/// Log the differences for a device
pub fn log_diff(diff: &DeviceDiff) {
    log::debug!("Differences for {} ({}):", diff.device.name, diff.device_type);

    if !diff.has_changes() {
        log::debug!("  (no changes needed)");
    }

    for kind_diff in &diff.kinds {
        log_names("+", kind_diff.kind, "to add", &kind_diff.to_add_names());
        log_names("-", kind_diff.kind, "to remove", &kind_diff.to_remove_names());

        let drifted: Vec<String> = kind_diff.to_update.iter().map(|d| d.name.clone()).collect();
        log_names("~", kind_diff.kind, "drifted", &drifted);
    }
}

fn log_names(symbol: &str, kind: ComponentKind, what: &str, names: &[String]) {
    if names.is_empty() {
        return;
    }

    log::debug!("  {symbol} {kind}: {} {what}", names.len());
    for name in names.iter().take(LOG_NAME_LIMIT) {
        log::debug!("    - {name}");
    }
    if names.len() > LOG_NAME_LIMIT {
        log::debug!("    ... and {} more", names.len() - LOG_NAME_LIMIT);
    }
}
