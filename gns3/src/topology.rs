//! The desired-state network document consumed by `load`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredTopology {
	#[serde(default)]
	pub api_version: String,
	#[serde(default)]
	pub kind: String,
	pub metadata: Metadata,
	#[serde(default)]
	pub spec: NetworkSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
	/// Name of the project holding the network
	pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
	/// Paths or URLs of appliance documents to import before any node is created
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub appliances: Vec<String>,
	#[serde(default)]
	pub nodes: Vec<DesiredNode>,
	#[serde(default)]
	pub links: Vec<DesiredLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredNode {
	pub name: String,
	#[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
	pub node_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub template: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub compute_id: Option<String>,
	#[serde(default)]
	pub x: i32,
	#[serde(default)]
	pub y: i32,
	#[serde(default)]
	pub z: i32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub config: Option<StartupConfig>,
}

/// How a missing node gets created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creation<'a> {
	/// Instantiated from the named template, which decides the node type
	Template(&'a str),
	/// Created directly with the given node type
	Type(&'a str),
}

impl DesiredNode {
	/// A template reference takes precedence over an explicit type.
	pub fn creation(&self) -> Result<Creation<'_>> {
		fn nonempty(s: &Option<String>) -> Option<&str> {
			s.as_deref().filter(|s| !s.is_empty())
		}
		match (nonempty(&self.template), nonempty(&self.node_type)) {
			(Some(template), _) => Ok(Creation::Template(template)),
			(None, Some(node_type)) => Ok(Creation::Type(node_type)),
			(None, None) => Err(Error::Configuration(format!("node {:?} names neither a type nor a template", self.name))),
		}
	}

	/// Lower-cased declared type, if any.
	pub fn type_lowercase(&self) -> Option<String> {
		self.node_type.as_deref().map(str::to_lowercase)
	}
}

/// Addressing written to a VPCS node's startup file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartupConfig {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub address: String,
	#[serde(default)]
	pub netmask: String,
	#[serde(default)]
	pub gateway: String,
}
impl StartupConfig {
	pub fn render_vpcs(&self) -> String {
		format!("# Startup Configuration\nset pcname {}\nip {} {} {}\n", self.name, self.address, self.netmask, self.gateway)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
	/// Node name
	pub name: String,
	#[serde(default)]
	pub adapter: u32,
	#[serde(default)]
	pub port: u32,
}

/// An undirected link: `(a, z)` and `(z, a)` are the same link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredLink {
	#[serde(rename = "aEnd")]
	pub a_end: Endpoint,
	#[serde(rename = "zEnd")]
	pub z_end: Endpoint,
}

impl DesiredTopology {
	pub fn from_yaml_str(doc: &str) -> Result<DesiredTopology> {
		let topology: DesiredTopology = serde_yaml::from_str(doc)?;
		topology.validate()?;
		Ok(topology)
	}

	pub fn load(path: &Path) -> Result<DesiredTopology> {
		let doc = std::fs::read_to_string(path).map_err(Error::io(path))?;
		DesiredTopology::from_yaml_str(&doc)
	}

	pub fn project_name(&self) -> &str {
		&self.metadata.name
	}

	pub fn node(&self, name: &str) -> Option<&DesiredNode> {
		self.spec.nodes.iter().find(|n| n.name == name)
	}

	/// Checks what can be checked without a server: the project is named, node names are
	/// unique, every node says how to create it.
	///
	/// Link endpoints are not checked here since they may name nodes that already exist remotely.
	pub fn validate(&self) -> Result<()> {
		if self.metadata.name.is_empty() {
			return Err(Error::Configuration("metadata.name must name the project".into()));
		}
		let mut seen = HashSet::new();
		for node in &self.spec.nodes {
			if node.name.is_empty() {
				return Err(Error::Configuration("every node needs a name".into()));
			}
			if !seen.insert(node.name.as_str()) {
				return Err(Error::Configuration(format!("node {:?} is declared more than once", node.name)));
			}
			node.creation()?;
		}
		Ok(())
	}
}
