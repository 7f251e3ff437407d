use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, trace};

use gns3::accessor::RemoteState;
use gns3::appliance::{ensure_template, ApplianceImporter, TemplateOutcome};
use gns3::cache::{AssetCache, HttpFetcher};
use gns3::reconcile::Reconciler;
use gns3::rest::Gns3Client;
use gns3::topology::DesiredTopology;
use gns3::Settings;

pub mod config;
pub mod output;

use config::{GlobalArgs, Resolved};
use output::{render, render_document, DocumentFormat, Listing, OutputFormat, Topology};

#[derive(Parser)]
#[command(version, about = "Controls an instance of a GNS3 server")]
pub struct Args {
	#[command(flatten)]
	pub global: GlobalArgs,

	#[command(subcommand)]
	pub rootsubcmd: SubCmdRoot,
}
impl Args {
	pub async fn handle(&self) -> Result<()> {
		let resolved = self.global.resolve()?;
		trace!("resolved configuration: {:?}", resolved.settings.address);
		let ctx = Session::new(resolved)?;
		match &self.rootsubcmd {
			SubCmdRoot::Load(load) => load.handle(&ctx).await,
			SubCmdRoot::Import(SubCmdImport::Appliances(files)) => import_appliances(&ctx, &files.files).await,
			SubCmdRoot::Get(get) => get.handle(&ctx).await,
			SubCmdRoot::Start(start) => start.handle(&ctx).await,
			SubCmdRoot::Suspend(SubCmdSuspend::Links(ids)) => suspend_links(&ctx, &ids.ids).await,
			SubCmdRoot::Delete(delete) => delete.handle(&ctx).await,
			SubCmdRoot::Open(SubCmdProjects::Projects(names)) => open_projects(&ctx, &names.names, true).await,
			SubCmdRoot::Close(SubCmdProjects::Projects(names)) => open_projects(&ctx, &names.names, false).await,
			SubCmdRoot::Version => version(&ctx).await,
		}
	}
}

/// Everything a command needs: the resolved settings and a connected client.
struct Session {
	settings: Settings,
	project: String,
	client: Gns3Client,
}
impl Session {
	fn new(resolved: Resolved) -> Result<Session> {
		let client = Gns3Client::new(&resolved.settings)?;
		Ok(Session { settings: resolved.settings, project: resolved.project, client })
	}

	fn importer(&self) -> Result<ApplianceImporter> {
		let fetcher = HttpFetcher::new(&self.settings)?;
		Ok(ApplianceImporter::new(AssetCache::new(Arc::new(fetcher), &self.settings)))
	}

	async fn project_id(&self) -> Result<String> {
		let project = self.client.project(&self.project).await
			.with_context(|| format!("project {:?}", self.project))?;
		Ok(project.project_id)
	}
}

#[derive(Subcommand)]
pub enum SubCmdRoot {
	/// Creates or updates a project from YAML network documents
	#[command(alias = "apply")]
	Load(SubCmdLoad),
	#[command(subcommand)]
	Import(SubCmdImport),
	#[command(subcommand)]
	Get(SubCmdGet),
	#[command(subcommand)]
	Start(SubCmdStart),
	#[command(subcommand)]
	Suspend(SubCmdSuspend),
	#[command(subcommand)]
	Delete(SubCmdDelete),
	#[command(subcommand)]
	Open(SubCmdProjects),
	#[command(subcommand)]
	Close(SubCmdProjects),
	/// Shows client and server versions
	Version,
}

#[derive(clap::Args)]
pub struct SubCmdLoad {
	#[arg(required = true)]
	files: Vec<PathBuf>,
}
impl SubCmdLoad {
	async fn handle(&self, ctx: &Session) -> Result<()> {
		let importer = ctx.importer()?;
		let reconciler = Reconciler::new(&ctx.client, &importer, &ctx.settings);
		let mut failed = 0;
		for file in &self.files {
			debug!("loading {}", file.display());
			let result = match DesiredTopology::load(file) {
				Ok(desired) => reconciler.reconcile(&desired).await,
				Err(e) => Err(e),
			};
			match result {
				Ok(report) => {
					for event in &report.events {
						println!("{}", event);
					}
					for failure in &report.failures {
						println!("{}", failure);
					}
					println!("{}", report.project.project_id);
				},
				Err(e) => {
					println!("ERROR: {}: {}", file.display(), e);
					failed += 1;
				},
			}
		}
		if failed > 0 {
			bail!("{} of {} documents failed to load", failed, self.files.len());
		}
		Ok(())
	}
}

#[derive(clap::Args)]
pub struct Files {
	/// Appliance documents, as paths or http(s) URLs
	#[arg(required = true)]
	files: Vec<String>,
}

#[derive(Subcommand)]
pub enum SubCmdImport {
	/// Downloads appliance images and registers their templates
	Appliances(Files),
}

async fn import_appliances(ctx: &Session, files: &[String]) -> Result<()> {
	let importer = ctx.importer()?;
	let mut failed = 0;
	for file in files {
		let imported = match importer.load(file).await {
			Ok(imported) => imported,
			Err(e) => {
				println!("ERROR: {}: {}", file, e);
				failed += 1;
				continue;
			},
		};
		println!("{}", imported.appliance.name);
		match ensure_template(&ctx.client, &imported.template).await {
			Ok(TemplateOutcome::AlreadyPresent(t)) => println!("Template {} already present", t.name),
			Ok(TemplateOutcome::Created(t)) => println!("Template {} type {} created", t.name, t.template_type),
			Err(e) => {
				println!("ERROR: creating template {:?}: {}", imported.template.name, e);
				failed += 1;
			},
		}
	}
	if failed > 0 {
		bail!("{} of {} appliances failed to import", failed, files.len());
	}
	Ok(())
}

#[derive(clap::Args)]
pub struct GetArgs {
	/// Output format
	#[arg(short, long, value_enum, default_value_t)]
	output: OutputFormat,

	/// Only show these, by name or id
	names: Vec<String>,
}
impl GetArgs {
	fn print<T: Listing>(&self, items: Vec<T>, matches: impl Fn(&T, &str) -> bool) -> Result<()> {
		let items: Vec<T> = if self.names.is_empty() {
			items
		} else {
			items.into_iter().filter(|i| self.names.iter().any(|n| matches(i, n))).collect()
		};
		print!("{}", render(&items, self.output)?);
		Ok(())
	}
}

#[derive(clap::Args)]
pub struct TopologyArgs {
	/// Output format
	#[arg(short, long, value_enum, default_value_t)]
	output: DocumentFormat,
}

fn by_name_or_id<T: Listing>(item: &T, wanted: &str) -> bool {
	item.id() == wanted || item.name() == wanted
}

#[derive(Subcommand)]
pub enum SubCmdGet {
	Projects(GetArgs),
	/// Nodes of the current project
	Nodes(GetArgs),
	/// Links of the current project
	Links(GetArgs),
	/// Nodes and links of the current project as one document
	#[command(visible_aliases = ["to", "topo"])]
	Topology(TopologyArgs),
	Templates(GetArgs),
	Computes(GetArgs),
}
impl SubCmdGet {
	async fn handle(&self, ctx: &Session) -> Result<()> {
		match self {
			SubCmdGet::Projects(args) => args.print(ctx.client.projects().await?, by_name_or_id),
			SubCmdGet::Nodes(args) => args.print(ctx.client.nodes(&ctx.project_id().await?).await?, by_name_or_id),
			SubCmdGet::Links(args) => args.print(ctx.client.links(&ctx.project_id().await?).await?, |l: &gns3::rt::Link, id| l.link_id == id),
			SubCmdGet::Topology(args) => {
				let project_id = ctx.project_id().await?;
				let topology = Topology {
					nodes: ctx.client.nodes(&project_id).await?,
					links: ctx.client.links(&project_id).await?,
				};
				print!("{}", render_document(&topology, args.output)?);
				Ok(())
			},
			SubCmdGet::Templates(args) => args.print(ctx.client.templates().await?, by_name_or_id),
			SubCmdGet::Computes(args) => args.print(ctx.client.computes().await?, by_name_or_id),
		}
	}
}

#[derive(clap::Args)]
pub struct Names {
	/// Names or ids; all of them when omitted
	names: Vec<String>,
}

#[derive(clap::Args)]
pub struct Ids {
	#[arg(required = true)]
	ids: Vec<String>,
}

#[derive(Subcommand)]
pub enum SubCmdStart {
	/// Starts nodes of the current project
	Nodes(Names),
	/// Resumes suspended links of the current project
	Links(Names),
}
impl SubCmdStart {
	async fn handle(&self, ctx: &Session) -> Result<()> {
		let project_id = ctx.project_id().await?;
		let mut failed = 0;
		match self {
			SubCmdStart::Nodes(Names { names }) => {
				let names = if names.is_empty() {
					ctx.client.nodes(&project_id).await?.into_iter().map(|n| n.name).collect()
				} else {
					names.clone()
				};
				for name in &names {
					match ctx.client.start_node(&project_id, name).await {
						Ok(()) => println!("{} started", name),
						Err(e) => {
							println!("ERROR: {}: {}", name, e);
							failed += 1;
						},
					}
				}
			},
			SubCmdStart::Links(Names { names }) => {
				let ids = if names.is_empty() {
					ctx.client.links(&project_id).await?.into_iter()
						.filter(|l| l.suspend)
						.map(|l| l.link_id)
						.collect()
				} else {
					names.clone()
				};
				for id in &ids {
					match ctx.client.resume_link(&project_id, id).await {
						Ok(()) => println!("{}", id),
						Err(e) => {
							println!("ERROR: {}: {}", id, e);
							failed += 1;
						},
					}
				}
			},
		}
		if failed > 0 {
			bail!("{} operations failed", failed);
		}
		Ok(())
	}
}

#[derive(Subcommand)]
pub enum SubCmdSuspend {
	/// Suspends links of the current project
	Links(Ids),
}

async fn suspend_links(ctx: &Session, ids: &[String]) -> Result<()> {
	let project_id = ctx.project_id().await?;
	let mut failed = 0;
	for id in ids {
		match ctx.client.suspend_link(&project_id, id).await {
			Ok(()) => println!("{} suspended", id),
			Err(e) => {
				println!("ERROR: {}: {}", id, e);
				failed += 1;
			},
		}
	}
	if failed > 0 {
		bail!("{} of {} links failed to suspend", failed, ids.len());
	}
	Ok(())
}

#[derive(clap::Args)]
pub struct DeleteArgs {
	/// Do not report objects that do not exist
	#[arg(long)]
	ignore_not_found: bool,

	#[arg(required = true)]
	names: Vec<String>,
}

#[derive(Subcommand)]
pub enum SubCmdDelete {
	Projects(DeleteArgs),
	Templates(DeleteArgs),
}
impl SubCmdDelete {
	async fn handle(&self, ctx: &Session) -> Result<()> {
		let args = match self {
			SubCmdDelete::Projects(args) | SubCmdDelete::Templates(args) => args,
		};
		let mut failed = 0;
		for name in &args.names {
			let result = match self {
				SubCmdDelete::Projects(_) => ctx.client.delete_project(name).await,
				SubCmdDelete::Templates(_) => ctx.client.delete_template(name).await,
			};
			match result {
				Ok(id) => println!("{}", id),
				Err(e) if e.is_not_found() && args.ignore_not_found => (),
				Err(e) => {
					println!("ERROR: {}: {}", name, e);
					failed += 1;
				},
			}
		}
		if failed > 0 {
			bail!("{} of {} deletions failed", failed, args.names.len());
		}
		Ok(())
	}
}

#[derive(Subcommand)]
pub enum SubCmdProjects {
	Projects(ProjectNames),
}

#[derive(clap::Args)]
pub struct ProjectNames {
	#[arg(required = true)]
	names: Vec<String>,
}

async fn open_projects(ctx: &Session, names: &[String], open: bool) -> Result<()> {
	let mut failed = 0;
	for name in names {
		let result = if open {
			ctx.client.open_project(name).await.map(|p| p.project_id)
		} else {
			ctx.client.close_project(name).await
		};
		match result {
			Ok(id) => println!("{}", id),
			Err(e) => {
				println!("ERROR: {}: {}", name, e);
				failed += 1;
			},
		}
	}
	if failed > 0 {
		bail!("{} of {} projects failed", failed, names.len());
	}
	Ok(())
}

async fn version(ctx: &Session) -> Result<()> {
	println!("Client: {}", env!("CARGO_PKG_VERSION"));
	let server = ctx.client.version().await
		.with_context(|| format!("unable to query server at {}", ctx.client.address()))?;
	let locality = if server.local { "local" } else { "not local" };
	println!("Server: {} ({})", server.version, locality);
	Ok(())
}
