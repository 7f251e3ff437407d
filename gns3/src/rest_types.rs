use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub mod node_type {
	pub const NAT: &str = "nat";
	pub const ETHERNET_SWITCH: &str = "ethernet_switch";
	pub const VPCS: &str = "vpcs";
	pub const ROUTER: &str = "router";
	pub const FIREWALL: &str = "firewall";
	pub const MULTILAYER_SWITCH: &str = "multilayer_switch";
}

pub mod category {
	pub const MULTILAYER_SWITCH: &str = "multilayer_switch";
	pub const SWITCH: &str = "switch";
	pub const GUEST: &str = "guest";
	pub const ROUTER: &str = "router";
	pub const FIREWALL: &str = "firewall";
}

pub mod symbol {
	pub const DOCKER_GUEST: &str = ":/symbols/classic/docker_guest.svg";
	pub const QEMU_GUEST: &str = ":/symbols/classic/qemu_guest.svg";
	pub const ROUTER: &str = ":/symbols/classic/router.svg";
	pub const ETHERNET_SWITCH: &str = ":/symbols/classic/ethernet_switch.svg";
	pub const MULTILAYER_SWITCH: &str = ":/symbols/classic/multilayer_switch.svg";
	pub const FIREWALL: &str = ":/symbols/classic_firewall.svg";
	pub const CLOUD: &str = ":/symbols/classic/cloud.svg";
	pub const VPCS: &str = ":/symbols/classic/vpcs_guest.svg";

	/// Default symbol for a node created directly from its type.
	pub fn for_node_type(node_type: &str) -> String {
		let node_type = node_type.to_lowercase();
		let known = match node_type.as_str() {
			super::node_type::VPCS => VPCS,
			super::node_type::NAT => CLOUD,
			super::node_type::ROUTER => ROUTER,
			super::node_type::ETHERNET_SWITCH => ETHERNET_SWITCH,
			super::node_type::MULTILAYER_SWITCH => MULTILAYER_SWITCH,
			super::node_type::FIREWALL => FIREWALL,
			_ => return format!(":/symbols/classic/{}.svg", node_type),
		};
		known.to_owned()
	}
}

pub mod template_type {
	pub const QEMU: &str = "qemu";
	pub const IOU: &str = "iou";
	pub const DYNAMIPS: &str = "dynamips";
	pub const DOCKER: &str = "docker";

	/// Directory under `<base>/images` holding the disk images of an emulator.
	pub fn image_dir(template_type: &str) -> Option<&'static str> {
		match template_type {
			QEMU => Some("QEMU"),
			DYNAMIPS => Some("IOS"),
			IOU => Some("IOU"),
			DOCKER => Some("DOCKER"),
			_ => None,
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
	Opened,
	Closed,
}
impl fmt::Display for ProjectStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ProjectStatus::Opened => "opened",
			ProjectStatus::Closed => "closed",
		})
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
	/// The node is running.
	Started,
	/// The node is paused; its emulator still holds resources.
	Suspended,
	/// The node is not running.
	Stopped,
}
impl NodeStatus {
	pub fn active(&self) -> bool {
		matches!(self, NodeStatus::Started | NodeStatus::Suspended)
	}
}
impl fmt::Display for NodeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			NodeStatus::Started => "started",
			NodeStatus::Suspended => "suspended",
			NodeStatus::Stopped => "stopped",
		})
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Project {
	pub project_id: String,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<ProjectStatus>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filename: Option<String>,
	#[serde(default)]
	pub auto_open: bool,
	#[serde(default)]
	pub auto_close: bool,
	#[serde(default)]
	pub auto_start: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NewProject {
	pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Port {
	pub adapter_number: u32,
	pub port_number: u32,
	#[serde(default)]
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub short_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub link_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Node {
	pub node_id: String,
	pub name: String,
	pub node_type: String,
	#[serde(default)]
	pub project_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub compute_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<NodeStatus>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub symbol: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub template_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub console: Option<u16>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub console_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub console_host: Option<String>,
	#[serde(default)]
	pub x: i32,
	#[serde(default)]
	pub y: i32,
	#[serde(default)]
	pub z: i32,
	#[serde(default)]
	pub ports: Vec<Port>,
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub properties: Map<String, Value>,
}

/// Body of a node creation request.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct NewNode {
	pub name: String,
	pub node_type: String,
	pub compute_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub symbol: Option<String>,
	pub x: i32,
	pub y: i32,
	pub z: i32,
	#[serde(skip_serializing_if = "Map::is_empty")]
	pub properties: Map<String, Value>,
}
impl NewNode {
	/// Takes the node type, symbol and emulator settings from `template`,
	/// keeping name, placement and compute from `self`.
	pub fn from_template(mut self, template: &Template) -> Result<NewNode, serde_json::Error> {
		self.node_type = template.template_type.clone();
		self.symbol = template.symbol.clone();
		self.properties = template.node_properties()?;
		Ok(self)
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct NodeRef {
	pub node_id: String,
	pub adapter_number: u32,
	pub port_number: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Link {
	pub link_id: String,
	#[serde(default)]
	pub project_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub link_type: Option<String>,
	#[serde(default)]
	pub nodes: Vec<NodeRef>,
	#[serde(default)]
	pub suspend: bool,
	#[serde(default)]
	pub capturing: bool,
}

/// Body of a link creation request.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NewLink {
	pub link_type: String,
	pub suspend: bool,
	pub nodes: Vec<NodeRef>,
}
impl NewLink {
	pub const ETHERNET: &'static str = "ethernet";

	/// An ethernet link between two ports that carries no traffic until resumed.
	pub fn suspended(a_end: NodeRef, z_end: NodeRef) -> NewLink {
		NewLink {
			link_type: NewLink::ETHERNET.to_owned(),
			suspend: true,
			nodes: vec![a_end, z_end],
		}
	}
}

/// Body of a link update, used to suspend and resume links.
#[derive(Debug, Serialize, Clone, Copy)]
pub(crate) struct LinkPatch {
	pub suspend: bool,
}

/// A device blueprint. Emulator-specific settings (qemu disk images, docker image, ...)
/// travel flattened next to the common fields, as the server sends them.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Template {
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub template_id: String,
	pub name: String,
	pub template_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub compute_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub symbol: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub usage: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub first_port_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub default_name_format: Option<String>,
	#[serde(default)]
	pub builtin: bool,
	#[serde(flatten)]
	pub settings: Map<String, Value>,
}
impl Template {
	/// Emulator settings to copy into the properties of a node instantiated from this template.
	///
	/// Only qemu and docker templates carry settings that nodes need; other kinds yield an empty map.
	pub fn node_properties(&self) -> Result<Map<String, Value>, serde_json::Error> {
		let settings = Value::Object(self.settings.clone());
		let typed = match self.template_type.as_str() {
			template_type::QEMU => serde_json::to_value(serde_json::from_value::<QemuSettings>(settings)?)?,
			template_type::DOCKER => serde_json::to_value(serde_json::from_value::<DockerSettings>(settings)?)?,
			_ => return Ok(Map::new()),
		};
		match typed {
			Value::Object(map) => Ok(map),
			_ => Ok(Map::new()),
		}
	}

	pub fn set_settings<S: Serialize>(&mut self, settings: &S) -> Result<(), serde_json::Error> {
		if let Value::Object(map) = serde_json::to_value(settings)? {
			self.settings = map;
		}
		Ok(())
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct QemuSettings {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub options: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kernel_command_line: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub adapter_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub adapters: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub boot_priority: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub console_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hda_disk_interface: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ram: Option<u64>,
	#[serde(default, rename = "qemu_path", skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub port_name_format: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bios_image: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hda_disk_image: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cdrom_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DockerSettings {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub adapters: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start_command: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub console_type: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub extra_volumes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Compute {
	pub compute_id: String,
	#[serde(default)]
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub host: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub port: Option<u16>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub protocol: Option<String>,
	#[serde(default)]
	pub connected: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cpu_usage_percent: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub memory_usage_percent: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServerVersion {
	pub version: String,
	#[serde(default)]
	pub local: bool,
}
