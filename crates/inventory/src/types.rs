//! Core types for the device inventory model

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Identifier of a site grouping
pub type SiteId = u64;
/// Identifier of a location grouping
pub type LocationId = u64;
/// Identifier of a tag
pub type TagId = u64;

/// Unique identifier of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier of a device type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceTypeId(pub u64);

// ============================================================================
// Component Kinds
// ============================================================================

/// Category of a device component
///
/// The set is closed: every place that needs kind-specific behavior
/// matches on this enum or reads its [`KindSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    #[serde(rename = "interfaces")]
    Interface,
    #[serde(rename = "console_ports")]
    ConsolePort,
    #[serde(rename = "console_server_ports")]
    ConsoleServerPort,
    #[serde(rename = "power_ports")]
    PowerPort,
    #[serde(rename = "power_outlets")]
    PowerOutlet,
    #[serde(rename = "front_ports")]
    FrontPort,
    #[serde(rename = "rear_ports")]
    RearPort,
    #[serde(rename = "device_bays")]
    DeviceBay,
}

/// How the "configured" protection rule applies to a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfiguredRule {
    /// Addresses, VLANs, link aggregation or a description mark it configured
    InterfaceState,
    /// Only a non-empty description marks it configured
    DescriptionOnly,
}

/// Static per-kind record
#[derive(Debug)]
pub struct KindSpec {
    /// External label used in configuration and reports
    pub label: &'static str,
    /// Human-readable name
    pub display_name: &'static str,
    /// Attribute fields copied from a template onto a new live component
    pub fields: &'static [&'static str],
    /// Which state counts as "configured"
    pub configured_rule: ConfiguredRule,
}

const INTERFACE_SPEC: KindSpec = KindSpec {
    label: "interfaces",
    display_name: "Interfaces",
    fields: &["name", "type", "label", "description", "mgmt_only"],
    configured_rule: ConfiguredRule::InterfaceState,
};

const CONSOLE_PORT_SPEC: KindSpec = KindSpec {
    label: "console_ports",
    display_name: "Console Ports",
    fields: &["name", "type", "label", "description"],
    configured_rule: ConfiguredRule::DescriptionOnly,
};

const CONSOLE_SERVER_PORT_SPEC: KindSpec = KindSpec {
    label: "console_server_ports",
    display_name: "Console Server Ports",
    fields: &["name", "type", "label", "description"],
    configured_rule: ConfiguredRule::DescriptionOnly,
};

const POWER_PORT_SPEC: KindSpec = KindSpec {
    label: "power_ports",
    display_name: "Power Ports",
    fields: &[
        "name",
        "type",
        "label",
        "description",
        "maximum_draw",
        "allocated_draw",
    ],
    configured_rule: ConfiguredRule::DescriptionOnly,
};

const POWER_OUTLET_SPEC: KindSpec = KindSpec {
    label: "power_outlets",
    display_name: "Power Outlets",
    fields: &["name", "type", "label", "description", "feed_leg"],
    configured_rule: ConfiguredRule::DescriptionOnly,
};

const FRONT_PORT_SPEC: KindSpec = KindSpec {
    label: "front_ports",
    display_name: "Front Ports",
    fields: &["name", "type", "label", "description", "rear_port_position"],
    configured_rule: ConfiguredRule::DescriptionOnly,
};

const REAR_PORT_SPEC: KindSpec = KindSpec {
    label: "rear_ports",
    display_name: "Rear Ports",
    fields: &["name", "type", "label", "description", "positions"],
    configured_rule: ConfiguredRule::DescriptionOnly,
};

const DEVICE_BAY_SPEC: KindSpec = KindSpec {
    label: "device_bays",
    display_name: "Device Bays",
    fields: &["name", "label", "description"],
    configured_rule: ConfiguredRule::DescriptionOnly,
};

impl ComponentKind {
    /// Every kind, in reporting order
    pub const ALL: [Self; 8] = [
        Self::Interface,
        Self::ConsolePort,
        Self::ConsoleServerPort,
        Self::PowerPort,
        Self::PowerOutlet,
        Self::FrontPort,
        Self::RearPort,
        Self::DeviceBay,
    ];

    /// The static record describing this kind
    pub fn spec(self) -> &'static KindSpec {
        match self {
            Self::Interface => &INTERFACE_SPEC,
            Self::ConsolePort => &CONSOLE_PORT_SPEC,
            Self::ConsoleServerPort => &CONSOLE_SERVER_PORT_SPEC,
            Self::PowerPort => &POWER_PORT_SPEC,
            Self::PowerOutlet => &POWER_OUTLET_SPEC,
            Self::FrontPort => &FRONT_PORT_SPEC,
            Self::RearPort => &REAR_PORT_SPEC,
            Self::DeviceBay => &DEVICE_BAY_SPEC,
        }
    }

    /// External label (e.g. "interfaces")
    pub fn label(self) -> &'static str {
        self.spec().label
    }

    /// Human-readable name (e.g. "Console Ports")
    pub fn display_name(self) -> &'static str {
        self.spec().display_name
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown component kind label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown component kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ComponentKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

// ============================================================================
// Devices and Device Types
// ============================================================================

/// A physical equipment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// Assigned device type; a device without one cannot be synchronized
    #[serde(default)]
    pub device_type: Option<DeviceTypeId>,
    #[serde(default)]
    pub site: Option<SiteId>,
    #[serde(default)]
    pub location: Option<LocationId>,
    #[serde(default)]
    pub tags: BTreeSet<TagId>,
}

impl Device {
    /// Create a device with no type and no grouping attributes
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: DeviceId(id),
            name: name.into(),
            device_type: None,
            site: None,
            location: None,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_type(mut self, device_type: DeviceTypeId) -> Self {
        self.device_type = Some(device_type);
        self
    }

    pub fn with_site(mut self, site: SiteId) -> Self {
        self.site = Some(site);
        self
    }

    pub fn with_location(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_tag(mut self, tag: TagId) -> Self {
        self.tags.insert(tag);
        self
    }

    /// Stable ordering key used for processing and reporting
    pub fn sort_key(&self) -> (&str, DeviceId) {
        (&self.name, self.id)
    }
}

/// A device model template, unique by manufacturer and model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: DeviceTypeId,
    pub manufacturer: String,
    pub model: String,
}

impl DeviceType {
    pub fn new(id: u64, manufacturer: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: DeviceTypeId(id),
            manufacturer: manufacturer.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.manufacturer, self.model)
    }
}

// ============================================================================
// Component Attributes
// ============================================================================

/// Kind-specific component attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentAttributes {
    Interface {
        #[serde(rename = "type")]
        port_type: String,
        #[serde(default)]
        mgmt_only: bool,
    },
    ConsolePort {
        #[serde(rename = "type", default)]
        port_type: Option<String>,
    },
    ConsoleServerPort {
        #[serde(rename = "type", default)]
        port_type: Option<String>,
    },
    PowerPort {
        #[serde(rename = "type", default)]
        port_type: Option<String>,
        #[serde(default)]
        maximum_draw: Option<u32>,
        #[serde(default)]
        allocated_draw: Option<u32>,
    },
    PowerOutlet {
        #[serde(rename = "type", default)]
        port_type: Option<String>,
        #[serde(default)]
        feed_leg: Option<String>,
    },
    FrontPort {
        #[serde(rename = "type")]
        port_type: String,
        #[serde(default = "default_position")]
        rear_port_position: u16,
    },
    RearPort {
        #[serde(rename = "type")]
        port_type: String,
        #[serde(default = "default_position")]
        positions: u16,
    },
    DeviceBay,
}

fn default_position() -> u16 {
    1
}

impl ComponentAttributes {
    /// The kind these attributes belong to
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Interface { .. } => ComponentKind::Interface,
            Self::ConsolePort { .. } => ComponentKind::ConsolePort,
            Self::ConsoleServerPort { .. } => ComponentKind::ConsoleServerPort,
            Self::PowerPort { .. } => ComponentKind::PowerPort,
            Self::PowerOutlet { .. } => ComponentKind::PowerOutlet,
            Self::FrontPort { .. } => ComponentKind::FrontPort,
            Self::RearPort { .. } => ComponentKind::RearPort,
            Self::DeviceBay => ComponentKind::DeviceBay,
        }
    }

    /// Interface attributes with the given medium type
    pub fn interface(port_type: impl Into<String>) -> Self {
        Self::Interface {
            port_type: port_type.into(),
            mgmt_only: false,
        }
    }

    /// Attribute fields as (field name, rendered value) pairs
    ///
    /// Field names match [`KindSpec::fields`]; absent optional values
    /// render as an empty string.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        fn opt<T: ToString>(value: Option<&T>) -> String {
            value.map(ToString::to_string).unwrap_or_default()
        }

        match self {
            Self::Interface {
                port_type,
                mgmt_only,
            } => vec![("type", port_type.clone()), ("mgmt_only", mgmt_only.to_string())],
            Self::ConsolePort { port_type } | Self::ConsoleServerPort { port_type } => {
                vec![("type", opt(port_type.as_ref()))]
            }
            Self::PowerPort {
                port_type,
                maximum_draw,
                allocated_draw,
            } => vec![
                ("type", opt(port_type.as_ref())),
                ("maximum_draw", opt(maximum_draw.as_ref())),
                ("allocated_draw", opt(allocated_draw.as_ref())),
            ],
            Self::PowerOutlet {
                port_type,
                feed_leg,
            } => vec![
                ("type", opt(port_type.as_ref())),
                ("feed_leg", opt(feed_leg.as_ref())),
            ],
            Self::FrontPort {
                port_type,
                rear_port_position,
            } => vec![
                ("type", port_type.clone()),
                ("rear_port_position", rear_port_position.to_string()),
            ],
            Self::RearPort {
                port_type,
                positions,
            } => vec![("type", port_type.clone()), ("positions", positions.to_string())],
            Self::DeviceBay => Vec::new(),
        }
    }
}

// ============================================================================
// Components
// ============================================================================

/// A component declared on a device type (read-only input)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateComponent {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub attributes: ComponentAttributes,
}

impl TemplateComponent {
    pub fn new(name: impl Into<String>, attributes: ComponentAttributes) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            description: String::new(),
            attributes,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.attributes.kind()
    }
}

/// State of a live component that decides whether it may be removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveState {
    /// Cable peer, or the installed child device for a device bay
    #[serde(default)]
    pub connection: Option<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub untagged_vlan: Option<u16>,
    #[serde(default)]
    pub tagged_vlans: Vec<u16>,
    /// Parent link-aggregation interface
    #[serde(default)]
    pub lag: Option<String>,
    /// Member interfaces when this interface is itself a LAG
    #[serde(default)]
    pub lag_members: Vec<String>,
}

/// A component actually recorded on a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveComponent {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub attributes: ComponentAttributes,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub state: LiveState,
}

impl LiveComponent {
    pub fn new(name: impl Into<String>, attributes: ComponentAttributes) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            description: String::new(),
            attributes,
            status: None,
            state: LiveState::default(),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.attributes.kind()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_state(mut self, state: LiveState) -> Self {
        self.state = state;
        self
    }
}

/// A live component to be created from a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComponent {
    pub name: String,
    pub label: String,
    pub description: String,
    pub attributes: ComponentAttributes,
    pub status: Option<String>,
}

impl NewComponent {
    /// Copy the template's fields; `status` only applies to interfaces
    pub fn from_template(template: &TemplateComponent, status: Option<&str>) -> Self {
        let status = match template.kind() {
            ComponentKind::Interface => status.map(str::to_string),
            _ => None,
        };

        Self {
            name: template.name.clone(),
            label: template.label.clone(),
            description: template.description.clone(),
            attributes: template.attributes.clone(),
            status,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.attributes.kind()
    }

    /// The live component this creation results in
    pub fn into_live(self) -> LiveComponent {
        LiveComponent {
            name: self.name,
            label: self.label,
            description: self.description,
            attributes: self.attributes,
            status: self.status,
            state: LiveState::default(),
        }
    }
}
