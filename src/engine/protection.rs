//! Protection evaluation for live components
//!
//! The evaluator always reports the true protection status. Force is
//! applied by the executor, never here.

use inventory::{ConfiguredRule, LiveComponent};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which protection rules are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionPolicy {
    pub protect_connected: bool,
    pub protect_configured: bool,
}

impl Default for ProtectionPolicy {
    fn default() -> Self {
        Self {
            protect_connected: true,
            protect_configured: true,
        }
    }
}

impl ProtectionPolicy {
    /// Neither rule enabled
    pub fn none() -> Self {
        Self {
            protect_connected: false,
            protect_configured: false,
        }
    }
}

/// Why a component counts as protected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionReason {
    /// Has a cable peer, or a device installed in the bay
    Connected,
    Addressed,
    VlanTagged,
    LinkAggregation,
    Described,
}

impl fmt::Display for ProtectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Connected => "connected",
            Self::Addressed => "has addresses",
            Self::VlanTagged => "has VLANs",
            Self::LinkAggregation => "in a LAG",
            Self::Described => "has a description",
        };
        f.write_str(text)
    }
}

/// Every reason the enabled rules find on `component`
///
/// Empty means the component may be removed.
pub fn protection_reasons(
    component: &LiveComponent,
    policy: ProtectionPolicy,
) -> Vec<ProtectionReason> {
    let state = &component.state;
    let mut reasons = Vec::new();

    if policy.protect_connected && state.connection.is_some() {
        reasons.push(ProtectionReason::Connected);
    }

    if policy.protect_configured {
        if component.kind().spec().configured_rule == ConfiguredRule::InterfaceState {
            if !state.addresses.is_empty() {
                reasons.push(ProtectionReason::Addressed);
            }
            if state.untagged_vlan.is_some() || !state.tagged_vlans.is_empty() {
                reasons.push(ProtectionReason::VlanTagged);
            }
            if state.lag.is_some() || !state.lag_members.is_empty() {
                reasons.push(ProtectionReason::LinkAggregation);
            }
        }
        if !component.description.trim().is_empty() {
            reasons.push(ProtectionReason::Described);
        }
    }

    reasons
}

/// Whether `component` must be kept under `policy`
pub fn is_protected(component: &LiveComponent, policy: ProtectionPolicy) -> bool {
    !protection_reasons(component, policy).is_empty()
}

/// Split components into (removable, protected), preserving order
pub fn partition<'a>(
    components: &'a [LiveComponent],
    policy: ProtectionPolicy,
) -> (Vec<&'a LiveComponent>, Vec<&'a LiveComponent>) {
    components
        .iter()
        .partition(|component| !is_protected(component, policy))
}
