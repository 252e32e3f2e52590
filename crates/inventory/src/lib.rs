//! # Inventory
//!
//! Device inventory model and the narrow store interfaces used to
//! reconcile devices against their device types.
//!
//! ## Core Concepts
//!
//! - **Device / DeviceType**: equipment records and the models they instantiate
//! - **TemplateComponent**: what a device type says a device should have
//! - **LiveComponent**: what a device actually has, including the state
//!   (cables, addresses, VLANs, LAGs) that protects it from removal
//! - **ComponentKind**: the closed set of component categories
//! - **DeviceTransaction**: atomic, per-device mutations
//!
//! ## Example
//!
//! ```
//! use inventory::{
//!     with_device_transaction, ComponentAttributes, ComponentKind, Device, DeviceTransaction,
//!     DeviceType, MemoryInventory, NewComponent, StoreError, TemplateComponent,
//! };
//!
//! let store = MemoryInventory::new();
//! let switch = DeviceType::new(1, "Cisco", "C9300-48P");
//! store.add_device_type(switch.clone());
//! let device = Device::new(1, "access-01").with_type(switch.id);
//! store.add_device(device.clone());
//!
//! let template = TemplateComponent::new("Gi1/0/1", ComponentAttributes::interface("1000base-t"));
//! with_device_transaction(&store, &device, |tx| {
//!     tx.bulk_create(
//!         ComponentKind::Interface,
//!         vec![NewComponent::from_template(&template, Some("Active"))],
//!     )
//! })?;
//!
//! assert_eq!(store.live_names(device.id, ComponentKind::Interface), vec!["Gi1/0/1"]);
//! # Ok::<(), StoreError>(())
//! ```
//!
//! ## Provider Traits
//!
//! - [`InventoryReader`]: device types, templates, live components, selection
//! - [`InventoryWriter`]: opens a [`DeviceTransaction`] per device
//!
//! [`MemoryInventory`] implements both and backs the engine's tests.

pub mod error;
pub mod memory;
pub mod selection;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use error::{ErrorCategory, Result, StoreError};
pub use memory::{CallCounts, FailurePoint, MemoryInventory};
pub use selection::SelectionCriteria;
pub use store::{
    DeviceTransaction, Inventory, InventoryReader, InventoryWriter, with_device_transaction,
};
pub use types::{
    ComponentAttributes, ComponentKind, ConfiguredRule, Device, DeviceId, DeviceType,
    DeviceTypeId, KindSpec, LiveComponent, LiveState, LocationId, NewComponent, SiteId, TagId,
    TemplateComponent, UnknownKind,
};
