//! Error types for reconciliation runs
//!
//! Only [`SelectionError`] and configuration problems abort a run. Every
//! other error is local to one device and ends up in the report.

use inventory::{ComponentKind, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Problems resolving the device set, raised before any mutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no selection criteria provided")]
    NoCriteria,

    #[error("selection criteria matched no devices")]
    NoDevices,
}

/// Errors raised while reconciling devices
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("device {device} has no device type assigned")]
    NoDeviceType { device: String },

    /// Removal of a protected component was attempted without force.
    ///
    /// The executor filters protected components before deleting, so this
    /// signals a broken invariant rather than a data problem.
    #[error(
        "internal invariant violated: attempted to remove protected {kind} on {device}: {}",
        .names.join(", ")
    )]
    ProtectedComponentViolation {
        device: String,
        kind: ComponentKind,
        names: Vec<String>,
    },

    #[error("inventory store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Stable label for reports
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Selection(_) => ErrorKind::SelectionError,
            Self::NoDeviceType { .. } => ErrorKind::NoDeviceType,
            Self::ProtectedComponentViolation { .. } => ErrorKind::ProtectedComponentViolation,
            Self::Store(_) => ErrorKind::StoreError,
            Self::Config(_) => ErrorKind::ConfigError,
        }
    }

    /// Transient/persistent classification, for store failures only
    pub fn store_transience(&self) -> Option<bool> {
        match self {
            Self::Store(err) => Some(err.is_transient()),
            _ => None,
        }
    }

    /// Message for the report, with store failures marked transient or persistent
    pub fn report_message(&self) -> String {
        match self.store_transience() {
            Some(true) => format!("{self} (transient)"),
            Some(false) => format!("{self} (persistent)"),
            None => self.to_string(),
        }
    }
}

/// Error label carried by report entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    SelectionError,
    NoDeviceType,
    ProtectedComponentViolation,
    StoreError,
    ConfigError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectionError => "SelectionError",
            Self::NoDeviceType => "NoDeviceType",
            Self::ProtectedComponentViolation => "ProtectedComponentViolation",
            Self::StoreError => "StoreError",
            Self::ConfigError => "ConfigError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = SyncError::NoDeviceType {
            device: "edge-01".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NoDeviceType);
        assert_eq!(err.store_transience(), None);

        let err: SyncError = SelectionError::NoDevices.into();
        assert_eq!(err.kind(), ErrorKind::SelectionError);

        let err: SyncError = StoreError::Connectivity("timeout".into()).into();
        assert_eq!(err.kind(), ErrorKind::StoreError);
        assert_eq!(err.store_transience(), Some(true));
    }

    #[test]
    fn test_report_message_classifies_store_errors() {
        let err: SyncError = StoreError::Transaction("deadlock".into()).into();
        assert_eq!(
            err.report_message(),
            "inventory store error: transaction failure: deadlock (transient)"
        );

        let err: SyncError = StoreError::Constraint("duplicate name Gi1/0/1".into()).into();
        assert_eq!(
            err.report_message(),
            "inventory store error: constraint violation: duplicate name Gi1/0/1 (persistent)"
        );

        let err = SyncError::NoDeviceType {
            device: "edge-01".into(),
        };
        assert_eq!(err.report_message(), "device edge-01 has no device type assigned");
    }

    #[test]
    fn test_violation_message_lists_names() {
        let err = SyncError::ProtectedComponentViolation {
            device: "core-01".into(),
            kind: ComponentKind::Interface,
            names: vec!["mgmt0".into(), "Po1".into()],
        };
        assert_eq!(
            err.to_string(),
            "internal invariant violated: attempted to remove protected interfaces on core-01: mgmt0, Po1"
        );
    }

    #[test]
    fn test_error_kind_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::NoDeviceType).unwrap(),
            "\"NoDeviceType\""
        );
    }
}
