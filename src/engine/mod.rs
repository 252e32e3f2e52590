//! Reconciliation engine
//!
//! The engine works one device at a time:
//! 1. Planning - Resolve, de-duplicate and order the devices to process
//! 2. Diffing - Partition template and live component names per kind
//! 3. Protection - Decide which extra components must be kept
//! 4. Executing - Apply additions and removals inside one device transaction

pub mod differ;
pub mod executor;
pub mod planner;
pub mod protection;

pub use differ::{AttributeDrift, DeviceDiff, FieldDrift, KindDiff, compute_device_diff, compute_diff};
pub use executor::{ApplyOptions, KindOutcome, apply, preview};
pub use planner::select_devices;
pub use protection::{ProtectionPolicy, ProtectionReason, is_protected};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a run is allowed to change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Report differences only
    #[default]
    Diff,
    /// Create missing components
    Add,
    /// Delete extra, unprotected components
    Remove,
    /// Add and remove
    Sync,
}

impl SyncMode {
    pub fn adds(self) -> bool {
        matches!(self, Self::Add | Self::Sync)
    }

    pub fn removes(self) -> bool {
        matches!(self, Self::Remove | Self::Sync)
    }

    /// Whether the mode mutates the inventory at all
    pub fn mutates(self) -> bool {
        self.adds() || self.removes()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Diff => "diff",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Sync => "sync",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = crate::error::SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diff" => Ok(Self::Diff),
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "sync" => Ok(Self::Sync),
            other => Err(crate::error::SyncError::Config(format!(
                "unknown sync mode: {other}"
            ))),
        }
    }
}
