use async_trait::async_trait;
use log::{debug, trace};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::accessor::{find_named, Named, RemoteState};
use crate::error::Result;
use crate::rest_types as rt;
use crate::settings::Settings;

/// The server answered with a non-success status.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{endpoint} responded with status {status}: {message}")]
pub struct ApiError {
	pub endpoint: String,
	pub status: u16,
	pub message: String,
}
impl ApiError {
	pub(crate) fn new(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> ApiError {
		ApiError {
			endpoint: endpoint.into(),
			status,
			message: message.into(),
		}
	}
}

/// Error body sent by the server alongside 4xx/5xx statuses
#[derive(Deserialize)]
struct ServerFault {
	message: String,
}

#[derive(Debug, Clone, PartialEq)]
enum RawApiResponse {
	None,
	PlainText(String),
	Json(Value),
}
impl RawApiResponse {
	async fn extract(resp: Response) -> Result<(String, u16, RawApiResponse)> {
		let endpoint = resp.url().path().to_string();
		let status = resp.status().as_u16();
		let is_json = resp.headers().get(reqwest::header::CONTENT_TYPE)
			.and_then(|ct| ct.to_str().ok())
			.map(|ct| ct.starts_with("application/json"))
			.unwrap_or(false);

		let text = resp.text().await?;
		let raw = if text.trim().is_empty() {
			RawApiResponse::None
		} else if is_json {
			RawApiResponse::Json(serde_json::from_str(&text)?)
		} else {
			RawApiResponse::PlainText(text)
		};
		Ok((endpoint, status, raw))
	}

	/// Decodes a successful response as `T`, or turns a failed one into an [`ApiError`].
	fn decode<T: DeserializeOwned>(endpoint: String, status: u16, raw: RawApiResponse) -> Result<T> {
		match (status, raw) {
			(200..=299, RawApiResponse::Json(j)) => Ok(serde_json::from_value(j)?),
			(200..=299, RawApiResponse::None) => Ok(serde_json::from_value(Value::Null)?),
			(200..=299, RawApiResponse::PlainText(s)) => Ok(serde_json::from_value(Value::String(s))?),
			(status, RawApiResponse::Json(j)) => {
				let message = match serde_json::from_value::<ServerFault>(j.clone()) {
					Ok(fault) => fault.message,
					Err(_) => j.to_string(),
				};
				Err(ApiError::new(endpoint, status, message).into())
			},
			(status, RawApiResponse::PlainText(s)) => Err(ApiError::new(endpoint, status, s).into()),
			(status, RawApiResponse::None) => Err(ApiError::new(endpoint, status, "empty response").into()),
		}
	}
}

fn is_identifier(name_or_id: &str) -> bool {
	Uuid::parse_str(name_or_id).is_ok()
}

/// HTTP implementation of [`RemoteState`] against the server's `v2` API.
#[derive(Debug, Clone)]
pub struct Gns3Client {
	client: Client,
	address: String,
	username: String,
	password: String,
}
impl Gns3Client {
	pub fn new(settings: &Settings) -> Result<Gns3Client> {
		let client = Client::builder()
			.timeout(settings.timeout)
			.danger_accept_invalid_certs(settings.insecure_skip_verify)
			.build()?;

		Ok(Gns3Client {
			client,
			address: settings.address.clone(),
			username: settings.username.clone(),
			password: settings.password.clone(),
		})
	}

	pub fn address(&self) -> &str {
		&self.address
	}

	fn request(&self, method: reqwest::Method, endpoint: &str) -> RequestBuilder {
		let url = format!("http://{}/v2/{}", self.address, endpoint);
		trace!("{} {}", method, url);
		self.client.request(method, url)
			.basic_auth(&self.username, Some(&self.password))
	}

	async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
		let resp = req.send().await?;
		let (endpoint, status, raw) = RawApiResponse::extract(resp).await?;
		RawApiResponse::decode(endpoint, status, raw)
	}

	async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
		self.send(self.request(reqwest::Method::GET, endpoint)).await
	}

	async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, endpoint: &str, body: Option<&B>) -> Result<T> {
		let mut req = self.request(reqwest::Method::POST, endpoint);
		if let Some(body) = body {
			req = req.json(body);
		}
		self.send(req).await
	}

	async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<T> {
		self.send(self.request(reqwest::Method::PUT, endpoint).json(body)).await
	}

	async fn delete(&self, endpoint: &str) -> Result<()> {
		let _: IgnoredAny = self.send(self.request(reqwest::Method::DELETE, endpoint)).await?;
		Ok(())
	}

	/// Direct lookup for values that look like identifiers. `None` means the caller should scan by name.
	async fn direct<N: Named + DeserializeOwned>(&self, endpoint: &str, name_or_id: &str) -> Option<N> {
		if !is_identifier(name_or_id) {
			return None;
		}
		match self.get::<N>(endpoint).await {
			Ok(found) => Some(found),
			Err(e) => {
				debug!("direct lookup of {} {:?} failed, scanning by name: {}", N::KIND, name_or_id, e);
				None
			},
		}
	}

	pub async fn computes(&self) -> Result<Vec<rt::Compute>> {
		self.get("computes").await
	}

	pub async fn compute(&self, name_or_id: &str) -> Result<rt::Compute> {
		// compute ids are not uuids ("local", "vm"), so the direct path is always tried
		match self.get::<rt::Compute>(&format!("computes/{}", name_or_id)).await {
			Ok(compute) => Ok(compute),
			Err(e) => {
				debug!("direct lookup of compute {:?} failed, scanning by name: {}", name_or_id, e);
				find_named(self.computes().await?, name_or_id)
			},
		}
	}

	pub async fn version(&self) -> Result<rt::ServerVersion> {
		self.get("version").await
	}
}

#[async_trait]
impl RemoteState for Gns3Client {
	async fn projects(&self) -> Result<Vec<rt::Project>> {
		self.get("projects").await
	}

	async fn project(&self, name_or_id: &str) -> Result<rt::Project> {
		if let Some(project) = self.direct(&format!("projects/{}", name_or_id), name_or_id).await {
			return Ok(project);
		}
		find_named(self.projects().await?, name_or_id)
	}

	async fn create_project(&self, spec: &rt::NewProject) -> Result<rt::Project> {
		self.post("projects", Some(spec)).await
	}

	async fn delete_project(&self, name_or_id: &str) -> Result<String> {
		let project = self.project(name_or_id).await?;
		self.delete(&format!("projects/{}", project.project_id)).await?;
		Ok(project.project_id)
	}

	async fn open_project(&self, name_or_id: &str) -> Result<rt::Project> {
		let project = self.project(name_or_id).await?;
		self.post::<_, Value>(&format!("projects/{}/open", project.project_id), None).await
	}

	async fn close_project(&self, name_or_id: &str) -> Result<String> {
		let project = self.project(name_or_id).await?;
		let _: IgnoredAny = self.post::<_, Value>(&format!("projects/{}/close", project.project_id), None).await?;
		Ok(project.project_id)
	}

	async fn nodes(&self, project_id: &str) -> Result<Vec<rt::Node>> {
		self.get(&format!("projects/{}/nodes", project_id)).await
	}

	async fn node(&self, project_id: &str, name_or_id: &str) -> Result<rt::Node> {
		if let Some(node) = self.direct(&format!("projects/{}/nodes/{}", project_id, name_or_id), name_or_id).await {
			return Ok(node);
		}
		find_named(self.nodes(project_id).await?, name_or_id)
	}

	async fn create_node(&self, project_id: &str, spec: &rt::NewNode) -> Result<rt::Node> {
		self.post(&format!("projects/{}/nodes", project_id), Some(spec)).await
	}

	async fn start_node(&self, project_id: &str, name_or_id: &str) -> Result<()> {
		let node = self.node(project_id, name_or_id).await?;
		let _: IgnoredAny = self.post::<_, Value>(&format!("projects/{}/nodes/{}/start", project_id, node.node_id), None).await?;
		Ok(())
	}

	async fn stop_node(&self, project_id: &str, name_or_id: &str) -> Result<()> {
		let node = self.node(project_id, name_or_id).await?;
		let _: IgnoredAny = self.post::<_, Value>(&format!("projects/{}/nodes/{}/stop", project_id, node.node_id), None).await?;
		Ok(())
	}

	async fn links(&self, project_id: &str) -> Result<Vec<rt::Link>> {
		self.get(&format!("projects/{}/links", project_id)).await
	}

	async fn link(&self, project_id: &str, link_id: &str) -> Result<rt::Link> {
		self.get(&format!("projects/{}/links/{}", project_id, link_id)).await
	}

	async fn create_link(&self, project_id: &str, spec: &rt::NewLink) -> Result<rt::Link> {
		self.post(&format!("projects/{}/links", project_id), Some(spec)).await
	}

	async fn delete_link(&self, project_id: &str, link_id: &str) -> Result<()> {
		self.delete(&format!("projects/{}/links/{}", project_id, link_id)).await
	}

	async fn resume_link(&self, project_id: &str, link_id: &str) -> Result<()> {
		let _: IgnoredAny = self.put(&format!("projects/{}/links/{}", project_id, link_id), &rt::LinkPatch { suspend: false }).await?;
		Ok(())
	}

	async fn suspend_link(&self, project_id: &str, link_id: &str) -> Result<()> {
		let _: IgnoredAny = self.put(&format!("projects/{}/links/{}", project_id, link_id), &rt::LinkPatch { suspend: true }).await?;
		Ok(())
	}

	async fn templates(&self) -> Result<Vec<rt::Template>> {
		self.get("templates").await
	}

	async fn template(&self, name_or_id: &str) -> Result<rt::Template> {
		if let Some(template) = self.direct(&format!("templates/{}", name_or_id), name_or_id).await {
			return Ok(template);
		}
		find_named(self.templates().await?, name_or_id)
	}

	async fn create_template(&self, spec: &rt::Template) -> Result<rt::Template> {
		self.post("templates", Some(spec)).await
	}

	async fn delete_template(&self, name_or_id: &str) -> Result<String> {
		let template = self.template(name_or_id).await?;
		self.delete(&format!("templates/{}", template.template_id)).await?;
		Ok(template.template_id)
	}
}
