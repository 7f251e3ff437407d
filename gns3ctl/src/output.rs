use clap::ValueEnum;
use serde::Serialize;

use gns3::rt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
	/// Aligned columns with a header line
	#[default]
	Columns,
	Json,
	Yaml,
	/// One name per line
	Name,
	/// One identifier per line
	Id,
}

/// Something `get` can print.
pub trait Listing: Serialize {
	const HEADERS: &'static [&'static str];
	fn id(&self) -> &str;
	fn name(&self) -> String;
	fn row(&self) -> Vec<String>;
}

fn or_dash(value: Option<&str>) -> String {
	value.filter(|v| !v.is_empty()).unwrap_or("-").to_owned()
}

impl Listing for rt::Project {
	const HEADERS: &'static [&'static str] = &["PROJECT ID", "NAME", "STATUS"];
	fn id(&self) -> &str { &self.project_id }
	fn name(&self) -> String { self.name.clone() }
	fn row(&self) -> Vec<String> {
		vec![
			self.project_id.clone(),
			self.name.clone(),
			self.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_owned()),
		]
	}
}

impl Listing for rt::Node {
	const HEADERS: &'static [&'static str] = &["NODE ID", "NAME", "TYPE", "STATUS", "CONSOLE"];
	fn id(&self) -> &str { &self.node_id }
	fn name(&self) -> String { self.name.clone() }
	fn row(&self) -> Vec<String> {
		let console = match (&self.console_host, self.console) {
			(Some(host), Some(port)) => format!("{}:{}", host, port),
			(None, Some(port)) => port.to_string(),
			_ => "-".to_owned(),
		};
		vec![
			self.node_id.clone(),
			self.name.clone(),
			self.node_type.clone(),
			self.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_owned()),
			console,
		]
	}
}

impl Listing for rt::Link {
	const HEADERS: &'static [&'static str] = &["LINK ID", "TYPE", "SUSPENDED", "ENDPOINTS"];
	fn id(&self) -> &str { &self.link_id }
	/// Links have no name of their own; they are named after their endpoints.
	fn name(&self) -> String {
		self.nodes.iter()
			.map(|n| format!("{}/{}/{}", n.node_id, n.adapter_number, n.port_number))
			.collect::<Vec<_>>()
			.join("-")
	}
	fn row(&self) -> Vec<String> {
		vec![self.link_id.clone(), or_dash(self.link_type.as_deref()), self.suspend.to_string(), self.name()]
	}
}

impl Listing for rt::Template {
	const HEADERS: &'static [&'static str] = &["TEMPLATE ID", "NAME", "TYPE", "CATEGORY", "BUILTIN"];
	fn id(&self) -> &str { &self.template_id }
	fn name(&self) -> String { self.name.clone() }
	fn row(&self) -> Vec<String> {
		vec![
			self.template_id.clone(),
			self.name.clone(),
			self.template_type.clone(),
			or_dash(self.category.as_deref()),
			self.builtin.to_string(),
		]
	}
}

impl Listing for rt::Compute {
	const HEADERS: &'static [&'static str] = &["COMPUTE ID", "NAME", "HOST", "CONNECTED"];
	fn id(&self) -> &str { &self.compute_id }
	fn name(&self) -> String { self.name.clone() }
	fn row(&self) -> Vec<String> {
		let host = match (&self.host, self.port) {
			(Some(host), Some(port)) => format!("{}:{}", host, port),
			(Some(host), None) => host.clone(),
			_ => "-".to_owned(),
		};
		vec![self.compute_id.clone(), self.name.clone(), host, self.connected.to_string()]
	}
}

fn columns(headers: &[&str], rows: Vec<Vec<String>>) -> String {
	let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
	for row in &rows {
		for (width, cell) in widths.iter_mut().zip(row) {
			*width = (*width).max(cell.chars().count());
		}
	}
	let line = |cells: Vec<String>| -> String {
		let last = cells.len().saturating_sub(1);
		let mut out = String::new();
		for (i, (cell, width)) in cells.into_iter().zip(&widths).enumerate() {
			if i == last {
				out.push_str(&cell);
			} else {
				out.push_str(&format!("{:<width$}   ", cell, width = width));
			}
		}
		out
	};

	let mut out = line(headers.iter().map(|h| h.to_string()).collect());
	out.push('\n');
	for row in rows {
		out.push_str(&line(row));
		out.push('\n');
	}
	out
}

pub fn render<T: Listing>(items: &[T], format: OutputFormat) -> anyhow::Result<String> {
	Ok(match format {
		OutputFormat::Columns => columns(T::HEADERS, items.iter().map(Listing::row).collect()),
		OutputFormat::Json => serde_json::to_string_pretty(items)? + "\n",
		OutputFormat::Yaml => serde_yaml::to_string(items)?,
		OutputFormat::Name => items.iter().map(|i| i.name() + "\n").collect(),
		OutputFormat::Id => items.iter().map(|i| i.id().to_owned() + "\n").collect(),
	})
}

/// Nodes and links of one project, printed together.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Topology {
	pub nodes: Vec<rt::Node>,
	pub links: Vec<rt::Link>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DocumentFormat {
	#[default]
	Yaml,
	Json,
}

pub fn render_document<T: Serialize>(doc: &T, format: DocumentFormat) -> anyhow::Result<String> {
	Ok(match format {
		DocumentFormat::Json => serde_json::to_string_pretty(doc)? + "\n",
		DocumentFormat::Yaml => serde_yaml::to_string(doc)?,
	})
}
