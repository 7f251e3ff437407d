//! Bringing a server in line with a [`DesiredTopology`].
//!
//! A run makes sure the project, templates and nodes exist, then diffs links:
//! stale links are deleted, missing ones are created suspended, every desired
//! node is started and finally every link that should carry traffic is resumed.
//! Creating links suspended and resuming them last means no traffic flows over a
//! link before both of its nodes were asked to start.
//!
//! Nothing is deleted except links between the project's nodes that the
//! document does not mention. Running twice against an unchanged server
//! issues no create or delete calls the second time.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::accessor::RemoteState;
use crate::appliance::{ensure_template, ApplianceImporter, TemplateOutcome};
use crate::error::{Error, Result};
use crate::rest_types::{self as rt, node_type, symbol};
use crate::settings::Settings;
use crate::topology::{Creation, DesiredNode, DesiredTopology, Endpoint};

/// One side of a link, as the server identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointRef {
	pub node_id: String,
	pub adapter: u32,
	pub port: u32,
}
impl From<&rt::NodeRef> for EndpointRef {
	fn from(n: &rt::NodeRef) -> EndpointRef {
		EndpointRef { node_id: n.node_id.clone(), adapter: n.adapter_number, port: n.port_number }
	}
}
impl From<&EndpointRef> for rt::NodeRef {
	fn from(e: &EndpointRef) -> rt::NodeRef {
		rt::NodeRef { node_id: e.node_id.clone(), adapter_number: e.adapter, port_number: e.port }
	}
}

/// An ordered pair of endpoints. The same link may show up under either
/// orientation, so lookups probe the key and its [`swapped`](LinkKey::swapped) form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKey(pub EndpointRef, pub EndpointRef);
impl LinkKey {
	pub fn swapped(&self) -> LinkKey {
		LinkKey(self.1.clone(), self.0.clone())
	}

	/// Live links that do not join exactly two ports take no part in the diff.
	fn of_live(link: &rt::Link) -> Option<LinkKey> {
		match link.nodes.as_slice() {
			[a, z] => Some(LinkKey(a.into(), z.into())),
			_ => None,
		}
	}
}

/// A desired link whose endpoint names were resolved to node ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
	pub key: LinkKey,
	pub a_name: String,
	pub z_name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkPlan {
	/// Live links that are wanted, with their suspended flag
	pub kept: Vec<(String, bool)>,
	/// Ids of live links to delete
	pub stale: Vec<String>,
	pub create: Vec<ResolvedLink>,
	/// Ids of kept links to resume
	pub resume: Vec<String>,
}

#[derive(Debug, Clone)]
struct LiveState {
	link_id: String,
	suspended: bool,
}

/// Diffs live links against desired ones.
///
/// Live links are indexed under the orientation the server reports them in;
/// each desired link probes both orientations. A desired link listed more than
/// once, in either orientation, is handled once.
pub fn plan_links(live: &[rt::Link], desired: &[ResolvedLink]) -> LinkPlan {
	let mut plan = LinkPlan::default();
	let mut index: HashMap<LinkKey, LiveState> = HashMap::with_capacity(live.len());
	for link in live {
		let key = match LinkKey::of_live(link) {
			Some(key) => key,
			None => continue,
		};
		let state = LiveState { link_id: link.link_id.clone(), suspended: link.suspend };
		if let Some(dup) = index.insert(key, state) {
			plan.stale.push(dup.link_id);
		}
	}

	let mut handled: HashSet<LinkKey> = HashSet::new();
	for link in desired {
		let swapped = link.key.swapped();
		if handled.contains(&link.key) || handled.contains(&swapped) {
			continue;
		}
		handled.insert(link.key.clone());

		let found = match index.remove(&link.key) {
			Some(state) => Some(state),
			None => index.remove(&swapped),
		};
		match found {
			Some(state) => {
				if state.suspended {
					plan.resume.push(state.link_id.clone());
				}
				plan.kept.push((state.link_id, state.suspended));
			},
			None => plan.create.push(link.clone()),
		}
	}

	let remaining: HashSet<&str> = index.values().map(|s| s.link_id.as_str()).collect();
	plan.stale.extend(live.iter()
		.filter(|l| remaining.contains(l.link_id.as_str()))
		.map(|l| l.link_id.clone()));
	plan
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
	ProjectCreated { name: String, id: String },
	ProjectExists { name: String, id: String },
	ApplianceImported { name: String },
	TemplateCreated { name: String, template_type: String },
	TemplateExists { name: String },
	NodeCreated { name: String, id: String },
	NodeExists { name: String, id: String },
	StartupWritten { path: PathBuf },
	LinkExists { id: String, suspended: bool },
	LinkDeleted { id: String },
	LinkCreated { id: String, a_name: String, z_name: String },
	NodeStarted { name: String },
	LinkResumed { id: String },
}
impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Event::ProjectCreated { name, id } => write!(f, "PROJECT: {} ({}) created", name, id),
			Event::ProjectExists { name, id } => write!(f, "PROJECT: {} ({}) exists", name, id),
			Event::ApplianceImported { name } => write!(f, "APPLIANCE: {} imported", name),
			Event::TemplateCreated { name, template_type } => write!(f, "TEMPLATE: {} type {} created", name, template_type),
			Event::TemplateExists { name } => write!(f, "TEMPLATE: {} already present", name),
			Event::NodeCreated { name, id } => write!(f, "NODE: {} ({}) created", name, id),
			Event::NodeExists { name, id } => write!(f, "NODE: {} ({}) exists", name, id),
			Event::StartupWritten { path } => write!(f, "STARTUP: {}", path.display()),
			Event::LinkExists { id, suspended } => write!(f, "LINK: {} already exists, suspended: {}", id, suspended),
			Event::LinkDeleted { id } => write!(f, "LINK: {} stale, deleted", id),
			Event::LinkCreated { id, a_name, z_name } => write!(f, "LINK: {} ({}-{}) created", id, a_name, z_name),
			Event::NodeStarted { name } => write!(f, "NODE: {}: started", name),
			Event::LinkResumed { id } => write!(f, "LINK: {} resumed", id),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
	CreateNode,
	DeleteLink,
	CreateLink,
	StartNode,
}
impl fmt::Display for Step {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Step::CreateNode => "NODE: create failed",
			Step::DeleteLink => "LINK: delete failed",
			Step::CreateLink => "LINK: create failed",
			Step::StartNode => "NODE: start failed",
		})
	}
}

/// A best-effort step that failed without stopping the run.
#[derive(Debug)]
pub struct Failure {
	pub step: Step,
	/// Node name, link id or endpoint pair the step was about
	pub subject: String,
	pub error: Error,
}
impl fmt::Display for Failure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}: {}", self.step, self.subject, self.error)
	}
}

#[derive(Debug)]
pub struct LoadReport {
	pub project: rt::Project,
	pub events: Vec<Event>,
	pub failures: Vec<Failure>,
}
impl LoadReport {
	fn event(&mut self, event: Event) {
		info!("{}", event);
		self.events.push(event);
	}

	fn failure(&mut self, step: Step, subject: impl Into<String>, error: Error) {
		let failure = Failure { step, subject: subject.into(), error };
		warn!("{}", failure);
		self.failures.push(failure);
	}
}

pub struct Reconciler<'a> {
	remote: &'a dyn RemoteState,
	importer: &'a ApplianceImporter,
	settings: &'a Settings,
}
impl<'a> Reconciler<'a> {
	pub fn new(remote: &'a dyn RemoteState, importer: &'a ApplianceImporter, settings: &'a Settings) -> Reconciler<'a> {
		Reconciler { remote, importer, settings }
	}

	/// Runs the whole reconciliation. Best-effort failures end up in the report;
	/// anything else aborts the run and is returned.
	pub async fn reconcile(&self, desired: &DesiredTopology) -> Result<LoadReport> {
		desired.validate()?;
		let (project, created) = self.ensure_project(desired.project_name()).await?;
		let mut report = LoadReport { project, events: Vec::new(), failures: Vec::new() };
		let name = report.project.name.clone();
		let id = report.project.project_id.clone();
		report.event(if created { Event::ProjectCreated { name, id } } else { Event::ProjectExists { name, id } });

		for reference in &desired.spec.appliances {
			self.import_appliance(reference, &mut report).await?;
		}

		let project_id = report.project.project_id.clone();
		for node in &desired.spec.nodes {
			self.ensure_node(&project_id, node, &mut report).await?;
		}

		let node_ids: HashMap<String, String> = self.remote.nodes(&project_id).await?
			.into_iter()
			.map(|n| (n.name, n.node_id))
			.collect();
		let resolved = desired.spec.links.iter()
			.map(|link| resolve_link(&node_ids, &link.a_end, &link.z_end))
			.collect::<Result<Vec<_>>>()?;
		let live = self.remote.links(&project_id).await?;
		let mut plan = plan_links(&live, &resolved);
		for (id, suspended) in &plan.kept {
			report.event(Event::LinkExists { id: id.clone(), suspended: *suspended });
		}

		for link_id in &plan.stale {
			match self.remote.delete_link(&project_id, link_id).await {
				Ok(()) => report.event(Event::LinkDeleted { id: link_id.clone() }),
				Err(e) => report.failure(Step::DeleteLink, link_id.clone(), e),
			}
		}

		for link in &plan.create {
			let spec = rt::NewLink::suspended((&link.key.0).into(), (&link.key.1).into());
			match self.remote.create_link(&project_id, &spec).await {
				Ok(created) => {
					plan.resume.push(created.link_id.clone());
					report.event(Event::LinkCreated {
						id: created.link_id,
						a_name: link.a_name.clone(),
						z_name: link.z_name.clone(),
					});
				},
				Err(e) => report.failure(Step::CreateLink, format!("{}-{}", link.a_name, link.z_name), e),
			}
		}

		for node in &desired.spec.nodes {
			let target = node_ids.get(&node.name).map(String::as_str).unwrap_or(&node.name);
			match self.remote.start_node(&project_id, target).await {
				Ok(()) => report.event(Event::NodeStarted { name: node.name.clone() }),
				Err(e) => report.failure(Step::StartNode, node.name.clone(), e),
			}
		}

		for link_id in &plan.resume {
			self.remote.resume_link(&project_id, link_id).await?;
			report.event(Event::LinkResumed { id: link_id.clone() });
		}
		Ok(report)
	}

	async fn ensure_project(&self, name: &str) -> Result<(rt::Project, bool)> {
		match self.remote.project(name).await {
			Ok(project) => Ok((project, false)),
			Err(e) if e.is_not_found() => {
				let project = self.remote.create_project(&rt::NewProject { name: name.to_owned() }).await?;
				Ok((project, true))
			},
			Err(e) => Err(e),
		}
	}

	async fn import_appliance(&self, reference: &str, report: &mut LoadReport) -> Result<()> {
		debug!("importing appliance {:?}", reference);
		let imported = self.importer.load(reference).await?;
		report.event(Event::ApplianceImported { name: imported.appliance.name.clone() });
		match ensure_template(self.remote, &imported.template).await? {
			TemplateOutcome::Created(t) => report.event(Event::TemplateCreated { name: t.name, template_type: t.template_type }),
			TemplateOutcome::AlreadyPresent(t) => report.event(Event::TemplateExists { name: t.name }),
		}
		Ok(())
	}

	async fn ensure_node(&self, project_id: &str, node: &DesiredNode, report: &mut LoadReport) -> Result<()> {
		match self.remote.node(project_id, &node.name).await {
			Ok(existing) => {
				report.event(Event::NodeExists { name: existing.name, id: existing.node_id });
				return Ok(());
			},
			Err(e) if e.is_not_found() => (),
			Err(e) => return Err(e),
		}

		let spec = rt::NewNode {
			name: node.name.clone(),
			compute_id: node.compute_id.clone()
				.filter(|c| !c.is_empty())
				.unwrap_or_else(|| self.settings.compute.clone()),
			x: node.x,
			y: node.y,
			z: node.z,
			..Default::default()
		};
		let created = match node.creation()? {
			Creation::Template(name) => {
				let template = match self.remote.template(name).await {
					Ok(template) => template,
					Err(e) if e.is_not_found() => {
						return Err(Error::Configuration(format!("node {:?} uses unknown template {:?}", node.name, name)));
					},
					Err(e) => return Err(e),
				};
				self.remote.create_node_from_template(project_id, spec, &template).await
			},
			Creation::Type(node_type) => {
				let spec = rt::NewNode {
					node_type: node_type.to_owned(),
					symbol: Some(symbol::for_node_type(node_type)),
					..spec
				};
				self.remote.create_node(project_id, &spec).await
			},
		};
		let created = match created {
			Ok(created) => created,
			Err(e) => {
				report.failure(Step::CreateNode, node.name.clone(), e);
				return Ok(());
			},
		};

		if let (Some(node_type::VPCS), Some(config)) = (node.type_lowercase().as_deref(), &node.config) {
			let path = self.vpcs_startup_path(project_id, &created.node_id);
			if let Some(dir) = path.parent() {
				tokio::fs::create_dir_all(dir).await.map_err(Error::io(dir))?;
			}
			tokio::fs::write(&path, config.render_vpcs()).await.map_err(Error::io(&path))?;
			report.event(Event::StartupWritten { path });
		}
		report.event(Event::NodeCreated { name: created.name, id: created.node_id });
		Ok(())
	}

	fn vpcs_startup_path(&self, project_id: &str, node_id: &str) -> PathBuf {
		self.settings.base_directory
			.join("projects")
			.join(project_id)
			.join("project-files")
			.join("vpcs")
			.join(node_id)
			.join("startup.vpc")
	}
}

fn resolve_link(node_ids: &HashMap<String, String>, a_end: &Endpoint, z_end: &Endpoint) -> Result<ResolvedLink> {
	let resolve = |end: &Endpoint, side: &str| -> Result<EndpointRef> {
		let node_id = node_ids.get(&end.name).ok_or_else(|| {
			Error::Configuration(format!("unable to find {} node {:?}", side, end.name))
		})?;
		Ok(EndpointRef { node_id: node_id.clone(), adapter: end.adapter, port: end.port })
	};
	Ok(ResolvedLink {
		key: LinkKey(resolve(a_end, "a-end")?, resolve(z_end, "z-end")?),
		a_name: a_end.name.clone(),
		z_name: z_end.name.clone(),
	})
}
