//! # dtsync
//!
//! Reconciles the components recorded on devices against the templates of
//! their device types.
//!
//! A run resolves a device selection, then for every device:
//! 1. diffs template and live component names per kind
//! 2. splits extra components into removable and protected
//! 3. applies additions and removals inside one device transaction
//! 4. records the outcome in a [`SyncReport`]
//!
//! One device failing never stops the others.
//!
//! ## Example
//!
//! ```
//! use dtsync::{SyncMode, SyncOptions, runner};
//! use inventory::{
//!     ComponentAttributes, ComponentKind, Device, DeviceType, MemoryInventory,
//!     SelectionCriteria, TemplateComponent,
//! };
//!
//! let store = MemoryInventory::new();
//! let model = DeviceType::new(1, "Cisco", "C9300-48P");
//! store.add_device_type(model.clone());
//! store.add_template(model.id, TemplateComponent::new("Gi1/0/1", ComponentAttributes::interface("1000base-t")));
//! store.add_device(Device::new(1, "access-01").with_type(model.id));
//!
//! let options = SyncOptions::new(SyncMode::Add, [ComponentKind::Interface]);
//! let report = runner::run(&store, &SelectionCriteria::device_types([model.id]), &options)?;
//!
//! assert_eq!(report.totals_for(ComponentKind::Interface).added, 1);
//! # Ok::<(), dtsync::SyncError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod report;
pub mod runner;

pub use config::{ReportOptions, SyncConfig, SyncOptions};
pub use engine::{ProtectionPolicy, SyncMode};
pub use error::{ErrorKind, Result, SelectionError, SyncError};
pub use report::{DeviceOutcome, KindTotals, ReportBuilder, SyncReport};
pub use runner::{CancelToken, run, run_with_cancel};
