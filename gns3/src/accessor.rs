use async_trait::async_trait;
use log::debug;

use crate::error::{Error, Kind, Result};
use crate::rest_types as rt;

/// Objects that can be looked up either by their identifier or by their human name.
pub trait Named {
	const KIND: Kind;
	fn id(&self) -> &str;
	fn name(&self) -> &str;

	fn matches(&self, descriptor: &str) -> bool {
		self.id() == descriptor || self.name() == descriptor
	}
}
impl Named for rt::Project {
	const KIND: Kind = Kind::Project;
	fn id(&self) -> &str { &self.project_id }
	fn name(&self) -> &str { &self.name }
}
impl Named for rt::Node {
	const KIND: Kind = Kind::Node;
	fn id(&self) -> &str { &self.node_id }
	fn name(&self) -> &str { &self.name }
}
impl Named for rt::Template {
	const KIND: Kind = Kind::Template;
	fn id(&self) -> &str { &self.template_id }
	fn name(&self) -> &str { &self.name }
}
impl Named for rt::Compute {
	const KIND: Kind = Kind::Compute;
	fn id(&self) -> &str { &self.compute_id }
	fn name(&self) -> &str { &self.name }
}

/// Finds the object matching `descriptor`, preferring an identifier match over a name match.
pub fn find_named<N: Named, I: IntoIterator<Item = N>>(items: I, descriptor: &str) -> Result<N> {
	let mut by_name = None;
	for item in items {
		if item.id() == descriptor {
			return Ok(item);
		}
		if by_name.is_none() && item.name() == descriptor {
			by_name = Some(item);
		}
	}
	match by_name {
		Some(item) => {
			debug!("resolved {} {:?} by name to {}", N::KIND, descriptor, item.id());
			Ok(item)
		},
		None => Err(Error::not_found(N::KIND, descriptor)),
	}
}

/// The operations the reconciler needs from a server.
///
/// Lookups "by name or id" have default implementations that list and scan; an
/// implementation with a cheaper direct lookup should override them, but must
/// still fall back to scanning by name and report a miss as [`Error::NotFound`].
#[async_trait]
pub trait RemoteState: Send + Sync {
	async fn projects(&self) -> Result<Vec<rt::Project>>;
	async fn project(&self, name_or_id: &str) -> Result<rt::Project> {
		find_named(self.projects().await?, name_or_id)
	}
	async fn create_project(&self, spec: &rt::NewProject) -> Result<rt::Project>;
	/// Returns the identifier of the deleted project.
	async fn delete_project(&self, name_or_id: &str) -> Result<String>;
	async fn open_project(&self, name_or_id: &str) -> Result<rt::Project>;
	/// Returns the identifier of the closed project.
	async fn close_project(&self, name_or_id: &str) -> Result<String>;

	async fn nodes(&self, project_id: &str) -> Result<Vec<rt::Node>>;
	async fn node(&self, project_id: &str, name_or_id: &str) -> Result<rt::Node> {
		find_named(self.nodes(project_id).await?, name_or_id)
	}
	async fn create_node(&self, project_id: &str, spec: &rt::NewNode) -> Result<rt::Node>;
	async fn create_node_from_template(&self, project_id: &str, spec: rt::NewNode, template: &rt::Template) -> Result<rt::Node> {
		let spec = spec.from_template(template)?;
		self.create_node(project_id, &spec).await
	}
	async fn start_node(&self, project_id: &str, name_or_id: &str) -> Result<()>;
	async fn stop_node(&self, project_id: &str, name_or_id: &str) -> Result<()>;

	async fn links(&self, project_id: &str) -> Result<Vec<rt::Link>>;
	async fn link(&self, project_id: &str, link_id: &str) -> Result<rt::Link>;
	async fn create_link(&self, project_id: &str, spec: &rt::NewLink) -> Result<rt::Link>;
	async fn delete_link(&self, project_id: &str, link_id: &str) -> Result<()>;
	async fn resume_link(&self, project_id: &str, link_id: &str) -> Result<()>;
	async fn suspend_link(&self, project_id: &str, link_id: &str) -> Result<()>;

	async fn templates(&self) -> Result<Vec<rt::Template>>;
	async fn template(&self, name_or_id: &str) -> Result<rt::Template> {
		find_named(self.templates().await?, name_or_id)
	}
	async fn create_template(&self, spec: &rt::Template) -> Result<rt::Template>;
	/// Returns the identifier of the deleted template.
	async fn delete_template(&self, name_or_id: &str) -> Result<String>;
}
