//! Device selection criteria

use crate::types::{Device, DeviceId, DeviceTypeId, LocationId, SiteId, TagId};
use serde::{Deserialize, Serialize};

/// Criteria used to resolve the set of devices for a run
///
/// `device` overrides everything else. Otherwise each non-empty category
/// narrows the selection: device types, sites and locations match any
/// listed id, and tags must all be present on the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionCriteria {
    pub device_types: Vec<DeviceTypeId>,
    pub sites: Vec<SiteId>,
    pub locations: Vec<LocationId>,
    pub tags: Vec<TagId>,
    pub device: Option<DeviceId>,
}

impl SelectionCriteria {
    /// Select a single device, ignoring every other criterion
    pub fn device(id: DeviceId) -> Self {
        Self {
            device: Some(id),
            ..Self::default()
        }
    }

    pub fn device_types(ids: impl IntoIterator<Item = DeviceTypeId>) -> Self {
        Self {
            device_types: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn sites(ids: impl IntoIterator<Item = SiteId>) -> Self {
        Self {
            sites: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_tags(mut self, ids: impl IntoIterator<Item = TagId>) -> Self {
        self.tags.extend(ids);
        self
    }

    pub fn with_locations(mut self, ids: impl IntoIterator<Item = LocationId>) -> Self {
        self.locations.extend(ids);
        self
    }

    /// True when no criterion at all was provided
    pub fn is_empty(&self) -> bool {
        self.device.is_none()
            && self.device_types.is_empty()
            && self.sites.is_empty()
            && self.locations.is_empty()
            && self.tags.is_empty()
    }

    /// Check a device against the criteria
    ///
    /// Stores that cannot push filters down to a query language can use
    /// this directly.
    pub fn matches(&self, device: &Device) -> bool {
        if let Some(id) = self.device {
            return device.id == id;
        }

        if !self.device_types.is_empty()
            && !device
                .device_type
                .is_some_and(|t| self.device_types.contains(&t))
        {
            return false;
        }

        if !self.sites.is_empty() && !device.site.is_some_and(|s| self.sites.contains(&s)) {
            return false;
        }

        if !self.locations.is_empty()
            && !device.location.is_some_and(|l| self.locations.contains(&l))
        {
            return false;
        }

        self.tags.iter().all(|tag| device.tags.contains(tag))
    }
}
