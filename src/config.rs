use anyhow::{Context, Result};
use inventory::{ComponentKind, SelectionCriteria};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::engine::SyncMode;
use crate::engine::protection::ProtectionPolicy;
use crate::error::SyncError;

// ============================================================================
// Main Config Schema
// ============================================================================

/// A complete job description: which devices, how to sync, how to report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Devices to process
    pub selection: SelectionCriteria,

    /// Reconciliation behavior
    pub sync: SyncOptions,

    /// Report rendering
    pub report: ReportOptions,
}

impl SyncConfig {
    /// Load and validate a job description from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid sync config: {}", path.display()))
    }

    /// Parse and validate a job description from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid TOML format in sync config")?;
        config.sync.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize sync config")
    }
}

// ============================================================================
// Sync Options
// ============================================================================

/// Options controlling one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    pub mode: SyncMode,

    /// Component kinds to reconcile
    pub kinds: Vec<ComponentKind>,

    /// Keep components that have a connection
    pub protect_connected: bool,

    /// Keep components that carry configuration (addresses, VLANs, LAGs, descriptions)
    pub protect_configured: bool,

    /// Remove protected components anyway
    pub force: bool,

    /// Devices processed concurrently (1 = sequential)
    pub jobs: usize,

    /// Stop starting new devices after this many seconds (0 = no limit)
    pub time_limit_secs: u64,

    /// Report attribute drift on components present on both sides
    pub detect_drift: bool,

    /// Status given to newly created interfaces (empty = leave unset)
    pub interface_status: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::Diff,
            kinds: vec![ComponentKind::Interface],
            protect_connected: true,
            protect_configured: true,
            force: false,
            jobs: 1,
            time_limit_secs: 1800,
            detect_drift: true,
            interface_status: "Active".to_string(),
        }
    }
}

impl SyncOptions {
    /// Options for a given mode and set of kinds, everything else default
    pub fn new(mode: SyncMode, kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        Self {
            mode,
            kinds: kinds.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn protection(&self) -> ProtectionPolicy {
        ProtectionPolicy {
            protect_connected: self.protect_connected,
            protect_configured: self.protect_configured,
        }
    }

    pub fn time_limit(&self) -> Option<Duration> {
        (self.time_limit_secs > 0).then(|| Duration::from_secs(self.time_limit_secs))
    }

    pub fn interface_status(&self) -> Option<&str> {
        let status = self.interface_status.trim();
        (!status.is_empty()).then_some(status)
    }

    /// Check the options before any device is touched
    pub fn validate(&self) -> crate::Result<()> {
        if self.kinds.is_empty() {
            return Err(SyncError::Config(
                "at least one component kind is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.kinds.iter().find(|kind| !seen.insert(**kind)) {
            return Err(SyncError::Config(format!(
                "component kind listed twice: {dup}"
            )));
        }

        if self.jobs == 0 {
            return Err(SyncError::Config("jobs must be at least 1".to_string()));
        }

        Ok(())
    }
}

// ============================================================================
// Report Options
// ============================================================================

/// Options for the human-readable report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// List every device, not just those with changes or errors
    pub full_listing: bool,

    /// Colorize output
    pub color: bool,

    /// Names shown per list before "... and N more" (ignored with full_listing)
    pub list_limit: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            full_listing: false,
            color: true,
            list_limit: 5,
        }
    }
}

impl ReportOptions {
    /// Uncolored output, useful for logs and tests
    pub fn plain() -> Self {
        Self {
            color: false,
            ..Self::default()
        }
    }
}
