//! In-memory stand-ins for the server and the network, for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::accessor::{find_named, RemoteState};
use crate::cache::Fetcher;
use crate::error::{Error, Kind, Result};
use crate::rest::ApiError;
use crate::rest_types as rt;

#[derive(Debug, Default)]
pub struct State {
	pub projects: Vec<rt::Project>,
	pub nodes: Vec<rt::Node>,
	pub links: Vec<rt::Link>,
	pub templates: Vec<rt::Template>,
	/// Every mutating call, as `"<operation> <subject>"`
	pub calls: Vec<String>,
	/// Node names whose creation fails
	pub fail_create_node: HashSet<String>,
	/// Node names whose start fails
	pub fail_start: HashSet<String>,
	pub fail_create_link: bool,
	/// Link ids whose deletion fails
	pub fail_delete: HashSet<String>,
	/// Link ids whose resumption fails
	pub fail_resume: HashSet<String>,
	next_id: usize,
}
impl State {
	fn next_id(&mut self) -> String {
		self.next_id += 1;
		format!("id-{}", self.next_id)
	}
}

fn refused(endpoint: impl Into<String>) -> Error {
	ApiError::new(endpoint, 409, "refused by test").into()
}

#[derive(Debug, Default)]
pub struct FakeServer {
	state: Mutex<State>,
}
impl FakeServer {
	pub fn state(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap()
	}

	pub fn calls(&self) -> Vec<String> {
		self.state().calls.clone()
	}

	pub fn calls_to(&self, operation: &str) -> Vec<String> {
		let prefix = format!("{} ", operation);
		self.calls().into_iter().filter(|c| c.starts_with(&prefix)).collect()
	}

	pub fn clear_calls(&self) {
		self.state().calls.clear();
	}

	pub fn add_project(&self, name: &str) -> rt::Project {
		let mut state = self.state();
		let project = rt::Project { project_id: state.next_id(), name: name.into(), ..Default::default() };
		state.projects.push(project.clone());
		project
	}

	pub fn add_node(&self, project_id: &str, name: &str, node_type: &str) -> rt::Node {
		let mut state = self.state();
		let node = rt::Node {
			node_id: state.next_id(),
			name: name.into(),
			node_type: node_type.into(),
			project_id: project_id.into(),
			..Default::default()
		};
		state.nodes.push(node.clone());
		node
	}

	pub fn add_link(&self, project_id: &str, a: (&str, u32, u32), z: (&str, u32, u32), suspend: bool) -> rt::Link {
		let mut state = self.state();
		let end = |(node_id, adapter_number, port_number): (&str, u32, u32)| rt::NodeRef {
			node_id: node_id.into(),
			adapter_number,
			port_number,
		};
		let link = rt::Link {
			link_id: state.next_id(),
			project_id: project_id.into(),
			link_type: Some(rt::NewLink::ETHERNET.into()),
			nodes: vec![end(a), end(z)],
			suspend,
			capturing: false,
		};
		state.links.push(link.clone());
		link
	}

	pub fn add_template(&self, template: rt::Template) -> rt::Template {
		let mut state = self.state();
		let mut template = template;
		template.template_id = state.next_id();
		state.templates.push(template.clone());
		template
	}

	pub fn link_by_id(&self, link_id: &str) -> Option<rt::Link> {
		self.state().links.iter().find(|l| l.link_id == link_id).cloned()
	}

	fn find_node(state: &State, project_id: &str, name_or_id: &str) -> Result<rt::Node> {
		find_named(state.nodes.iter().filter(|n| n.project_id == project_id).cloned(), name_or_id)
	}

	fn link_mut<'a>(state: &'a mut State, project_id: &str, link_id: &str) -> Result<&'a mut rt::Link> {
		state.links.iter_mut()
			.find(|l| l.project_id == project_id && l.link_id == link_id)
			.ok_or_else(|| Error::not_found(Kind::Link, link_id))
	}
}

#[async_trait]
impl RemoteState for FakeServer {
	async fn projects(&self) -> Result<Vec<rt::Project>> {
		Ok(self.state().projects.clone())
	}

	async fn create_project(&self, spec: &rt::NewProject) -> Result<rt::Project> {
		self.state().calls.push(format!("create_project {}", spec.name));
		Ok(self.add_project(&spec.name))
	}

	async fn delete_project(&self, name_or_id: &str) -> Result<String> {
		let mut state = self.state();
		let project = find_named(state.projects.clone(), name_or_id)?;
		state.calls.push(format!("delete_project {}", project.project_id));
		state.projects.retain(|p| p.project_id != project.project_id);
		Ok(project.project_id)
	}

	async fn open_project(&self, name_or_id: &str) -> Result<rt::Project> {
		let mut state = self.state();
		let project = state.projects.iter_mut()
			.find(|p| p.project_id == name_or_id || p.name == name_or_id)
			.ok_or_else(|| Error::not_found(Kind::Project, name_or_id))?;
		project.status = Some(rt::ProjectStatus::Opened);
		Ok(project.clone())
	}

	async fn close_project(&self, name_or_id: &str) -> Result<String> {
		let mut state = self.state();
		let project = state.projects.iter_mut()
			.find(|p| p.project_id == name_or_id || p.name == name_or_id)
			.ok_or_else(|| Error::not_found(Kind::Project, name_or_id))?;
		project.status = Some(rt::ProjectStatus::Closed);
		Ok(project.project_id.clone())
	}

	async fn nodes(&self, project_id: &str) -> Result<Vec<rt::Node>> {
		Ok(self.state().nodes.iter().filter(|n| n.project_id == project_id).cloned().collect())
	}

	async fn create_node(&self, project_id: &str, spec: &rt::NewNode) -> Result<rt::Node> {
		let mut state = self.state();
		state.calls.push(format!("create_node {}", spec.name));
		if state.fail_create_node.contains(&spec.name) {
			return Err(refused(format!("/v2/projects/{}/nodes", project_id)));
		}
		let node = rt::Node {
			node_id: state.next_id(),
			name: spec.name.clone(),
			node_type: spec.node_type.clone(),
			project_id: project_id.into(),
			compute_id: Some(spec.compute_id.clone()),
			status: Some(rt::NodeStatus::Stopped),
			symbol: spec.symbol.clone(),
			x: spec.x,
			y: spec.y,
			z: spec.z,
			properties: spec.properties.clone(),
			..Default::default()
		};
		state.nodes.push(node.clone());
		Ok(node)
	}

	async fn start_node(&self, project_id: &str, name_or_id: &str) -> Result<()> {
		let mut state = self.state();
		let node = FakeServer::find_node(&state, project_id, name_or_id)?;
		state.calls.push(format!("start_node {}", node.name));
		if state.fail_start.contains(&node.name) {
			return Err(refused(format!("/v2/projects/{}/nodes/{}/start", project_id, node.node_id)));
		}
		if let Some(n) = state.nodes.iter_mut().find(|n| n.node_id == node.node_id) {
			n.status = Some(rt::NodeStatus::Started);
		}
		Ok(())
	}

	async fn stop_node(&self, project_id: &str, name_or_id: &str) -> Result<()> {
		let mut state = self.state();
		let node = FakeServer::find_node(&state, project_id, name_or_id)?;
		state.calls.push(format!("stop_node {}", node.name));
		if let Some(n) = state.nodes.iter_mut().find(|n| n.node_id == node.node_id) {
			n.status = Some(rt::NodeStatus::Stopped);
		}
		Ok(())
	}

	async fn links(&self, project_id: &str) -> Result<Vec<rt::Link>> {
		Ok(self.state().links.iter().filter(|l| l.project_id == project_id).cloned().collect())
	}

	async fn link(&self, project_id: &str, link_id: &str) -> Result<rt::Link> {
		let mut state = self.state();
		FakeServer::link_mut(&mut state, project_id, link_id).map(|l| l.clone())
	}

	async fn create_link(&self, project_id: &str, spec: &rt::NewLink) -> Result<rt::Link> {
		let mut state = self.state();
		let ends: Vec<String> = spec.nodes.iter()
			.map(|n| format!("{}/{}/{}", n.node_id, n.adapter_number, n.port_number))
			.collect();
		let suspended = if spec.suspend { " suspended" } else { "" };
		state.calls.push(format!("create_link {}{}", ends.join("-"), suspended));
		if state.fail_create_link {
			return Err(refused(format!("/v2/projects/{}/links", project_id)));
		}
		let link = rt::Link {
			link_id: state.next_id(),
			project_id: project_id.into(),
			link_type: Some(spec.link_type.clone()),
			nodes: spec.nodes.clone(),
			suspend: spec.suspend,
			capturing: false,
		};
		state.links.push(link.clone());
		Ok(link)
	}

	async fn delete_link(&self, project_id: &str, link_id: &str) -> Result<()> {
		let mut state = self.state();
		state.calls.push(format!("delete_link {}", link_id));
		if state.fail_delete.contains(link_id) {
			return Err(refused(format!("/v2/projects/{}/links/{}", project_id, link_id)));
		}
		FakeServer::link_mut(&mut state, project_id, link_id)?;
		state.links.retain(|l| l.link_id != link_id);
		Ok(())
	}

	async fn resume_link(&self, project_id: &str, link_id: &str) -> Result<()> {
		let mut state = self.state();
		state.calls.push(format!("resume_link {}", link_id));
		if state.fail_resume.contains(link_id) {
			return Err(refused(format!("/v2/projects/{}/links/{}", project_id, link_id)));
		}
		FakeServer::link_mut(&mut state, project_id, link_id)?.suspend = false;
		Ok(())
	}

	async fn suspend_link(&self, project_id: &str, link_id: &str) -> Result<()> {
		let mut state = self.state();
		state.calls.push(format!("suspend_link {}", link_id));
		FakeServer::link_mut(&mut state, project_id, link_id)?.suspend = true;
		Ok(())
	}

	async fn templates(&self) -> Result<Vec<rt::Template>> {
		Ok(self.state().templates.clone())
	}

	async fn create_template(&self, spec: &rt::Template) -> Result<rt::Template> {
		self.state().calls.push(format!("create_template {}", spec.name));
		Ok(self.add_template(spec.clone()))
	}

	async fn delete_template(&self, name_or_id: &str) -> Result<String> {
		let mut state = self.state();
		let template = find_named(state.templates.clone(), name_or_id)?;
		state.calls.push(format!("delete_template {}", template.template_id));
		state.templates.retain(|t| t.template_id != template.template_id);
		Ok(template.template_id)
	}
}

/// Serves fixed bodies by URL and counts downloads. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
	bodies: HashMap<String, Vec<u8>>,
	/// Downloads that write these bytes and then fail with a 500
	interrupted: HashMap<String, Vec<u8>>,
	downloads: AtomicUsize,
}
impl MemoryFetcher {
	pub fn with(url: &str, body: &[u8]) -> MemoryFetcher {
		MemoryFetcher::default().and(url, body)
	}

	pub fn and(mut self, url: &str, body: &[u8]) -> MemoryFetcher {
		self.bodies.insert(url.to_owned(), body.to_vec());
		self
	}

	pub fn interrupted(mut self, url: &str, partial: &[u8]) -> MemoryFetcher {
		self.interrupted.insert(url.to_owned(), partial.to_vec());
		self
	}

	pub fn downloads(&self) -> usize {
		self.downloads.load(Ordering::SeqCst)
	}

	fn body(&self, url: &str) -> Result<&Vec<u8>> {
		self.bodies.get(url).ok_or_else(|| ApiError::new(url, 404, "Not Found").into())
	}
}

#[async_trait]
impl Fetcher for MemoryFetcher {
	async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
		self.body(url).cloned()
	}

	async fn download(&self, url: &str, dest: &Path, _buffer_size: usize) -> Result<u64> {
		if let Some(partial) = self.interrupted.get(url) {
			tokio::fs::write(dest, partial).await.map_err(Error::io(dest))?;
			return Err(ApiError::new(url, 500, "connection reset").into());
		}
		let body = self.body(url)?;
		self.downloads.fetch_add(1, Ordering::SeqCst);
		tokio::fs::write(dest, body).await.map_err(Error::io(dest))?;
		Ok(body.len() as u64)
	}
}
