//! Importing `.gns3a` appliance documents: image acquisition and template derivation.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Serialize, Deserialize};
use serde_json::Value;
use url::Url;

use crate::accessor::RemoteState;
use crate::cache::AssetCache;
use crate::error::{Error, Result};
use crate::rest_types::{self as rt, category, symbol, template_type};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplianceImage {
	pub filename: String,
	#[serde(default)]
	pub version: String,
	#[serde(default)]
	pub md5sum: String,
	#[serde(default)]
	pub filesize: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub download_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub direct_download_url: Option<String>,
}
impl ApplianceImage {
	/// Where to fetch the image from; a direct link beats a landing page.
	pub fn source(&self) -> Option<&str> {
		self.direct_download_url.as_deref()
			.filter(|u| !u.is_empty())
			.or_else(|| self.download_url.as_deref().filter(|u| !u.is_empty()))
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplianceQemu {
	#[serde(default)]
	pub arch: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kvm: Option<String>,
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
	pub kernel_command_line: Option<String>,
	#[serde(default)]
	pub options: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ram: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplianceDocker {
	pub image: String,
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

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionImages {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bios_image: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hda_disk_image: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cdrom_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplianceVersion {
	pub name: String,
	#[serde(default)]
	pub images: VersionImages,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Appliance {
	pub name: String,
	#[serde(default)]
	pub category: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub description: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub vendor_name: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub product_name: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub status: String,
	#[serde(default)]
	pub registry_version: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub symbol: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub usage: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub first_port_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub port_name_format: Option<String>,
	#[serde(default)]
	pub images: Vec<ApplianceImage>,
	#[serde(default)]
	pub versions: Vec<ApplianceVersion>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub qemu: Option<ApplianceQemu>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iou: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dynamips: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub docker: Option<ApplianceDocker>,
}

const TCG_OPTION: &str = "-machine accel=tcg";

impl Appliance {
	/// The name the derived template is registered under.
	pub fn template_name(&self) -> String {
		match self.versions.first().filter(|v| !v.name.is_empty()) {
			Some(version) => format!("{} {}", self.name, version.name),
			None => self.name.clone(),
		}
	}

	fn default_symbol(&self) -> Option<&'static str> {
		match self.category.as_str() {
			category::GUEST if self.docker.is_some() => Some(symbol::DOCKER_GUEST),
			category::GUEST => Some(symbol::QEMU_GUEST),
			category::ROUTER => Some(symbol::ROUTER),
			category::SWITCH => Some(symbol::ETHERNET_SWITCH),
			category::MULTILAYER_SWITCH => Some(symbol::MULTILAYER_SWITCH),
			category::FIREWALL => Some(symbol::FIREWALL),
			_ => None,
		}
	}

	fn qemu_settings(&self, qemu: &ApplianceQemu) -> rt::QemuSettings {
		let mut options = qemu.options.clone();
		if qemu.kvm.as_deref() == Some("disable") && !options.contains(TCG_OPTION) {
			options.push(' ');
			options.push_str(TCG_OPTION);
		}
		let options = options.trim().to_owned();
		let images = self.versions.first().map(|v| v.images.clone()).unwrap_or_default();
		rt::QemuSettings {
			options: Some(options).filter(|o| !o.is_empty()),
			kernel_command_line: qemu.kernel_command_line.clone(),
			adapter_type: qemu.adapter_type.clone(),
			adapters: qemu.adapters,
			boot_priority: qemu.boot_priority.clone(),
			console_type: qemu.console_type.clone(),
			hda_disk_interface: qemu.hda_disk_interface.clone(),
			ram: qemu.ram,
			path: Some(format!("qemu-system-{}", qemu.arch)),
			port_name_format: self.port_name_format.clone(),
			bios_image: images.bios_image,
			hda_disk_image: images.hda_disk_image,
			cdrom_image: images.cdrom_image,
		}
	}

	/// Derives the template to register for this appliance.
	///
	/// The first emulator section present wins, in the order qemu, iou, dynamips, docker.
	pub fn derive_template(&self) -> Result<rt::Template> {
		let mut template = rt::Template {
			name: self.template_name(),
			compute_id: Some("local".to_owned()),
			usage: self.usage.clone(),
			first_port_name: self.first_port_name.clone(),
			..Default::default()
		};
		template.category = match self.category.as_str() {
			"" => None,
			category::MULTILAYER_SWITCH => Some(category::SWITCH.to_owned()),
			other => Some(other.to_owned()),
		};
		template.symbol = match &self.symbol {
			Some(s) if !s.is_empty() => Some(s.clone()),
			_ => self.default_symbol().map(str::to_owned),
		};

		if let Some(qemu) = &self.qemu {
			template.template_type = template_type::QEMU.to_owned();
			template.set_settings(&self.qemu_settings(qemu))?;
		} else if self.iou.is_some() {
			template.template_type = template_type::IOU.to_owned();
		} else if self.dynamips.is_some() {
			template.template_type = template_type::DYNAMIPS.to_owned();
		} else if let Some(docker) = &self.docker {
			template.template_type = template_type::DOCKER.to_owned();
			template.set_settings(&rt::DockerSettings {
				image: Some(docker.image.clone()),
				adapters: docker.adapters,
				start_command: docker.start_command.clone(),
				environment: docker.environment.clone(),
				console_type: docker.console_type.clone(),
				extra_volumes: docker.extra_volumes.clone(),
			})?;
		} else {
			return Err(Error::Configuration(format!("{}: no configuration found for known emulators", template.name)));
		}
		Ok(template)
	}
}

/// Where an appliance document was read from. Relative references inside it resolve against this.
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
	Directory(PathBuf),
	Url(Url),
}

/// How an appliance reference should be read: a URL with a scheme, or else a local path.
fn parse_reference(reference: &str) -> Option<Url> {
	Url::parse(reference).ok()
}

fn is_http(url: &Url) -> bool {
	matches!(url.scheme().to_ascii_lowercase().as_str(), "http" | "https")
}

#[derive(Debug, Clone)]
pub struct Imported {
	pub appliance: Appliance,
	pub template: rt::Template,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateOutcome {
	Created(rt::Template),
	/// A template with the same name already exists and was left untouched
	AlreadyPresent(rt::Template),
}
impl TemplateOutcome {
	pub fn template(&self) -> &rt::Template {
		match self {
			TemplateOutcome::Created(t) | TemplateOutcome::AlreadyPresent(t) => t,
		}
	}
}

/// Registers `template` unless a template of that name exists already.
pub async fn ensure_template(remote: &dyn RemoteState, template: &rt::Template) -> Result<TemplateOutcome> {
	match remote.template(&template.name).await {
		Ok(existing) => Ok(TemplateOutcome::AlreadyPresent(existing)),
		Err(e) if e.is_not_found() => {
			let created = remote.create_template(template).await?;
			info!("template {} ({}) created", created.name, created.template_id);
			Ok(TemplateOutcome::Created(created))
		},
		Err(e) => Err(e),
	}
}

pub struct ApplianceImporter {
	cache: AssetCache,
}
impl ApplianceImporter {
	pub fn new(cache: AssetCache) -> ApplianceImporter {
		ApplianceImporter { cache }
	}

	/// Reads and imports the appliance at `reference`, a local path or an http(s) URL.
	pub async fn load(&self, reference: &str) -> Result<Imported> {
		let (doc, origin) = match parse_reference(reference) {
			Some(url) if is_http(&url) => {
				let doc = self.cache.fetcher().fetch(url.as_str()).await?;
				(doc, Origin::Url(url))
			},
			Some(url) => {
				return Err(Error::Configuration(format!("unsupported appliance URL {:?} (scheme {})", reference, url.scheme())));
			},
			None => {
				let path = Path::new(reference);
				let doc = tokio::fs::read(path).await.map_err(Error::io(path))?;
				let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
				(doc, Origin::Directory(dir))
			},
		};
		self.import(&doc, &origin).await
	}

	/// Parses an appliance document, copies its symbol and makes sure every image is present
	/// and verified locally.
	pub async fn import(&self, doc: &[u8], origin: &Origin) -> Result<Imported> {
		let appliance: Appliance = serde_json::from_slice(doc)?;
		let template = appliance.derive_template()?;

		if let Some(symbol) = appliance.symbol.as_deref().filter(|s| !s.is_empty()) {
			self.copy_symbol(symbol, origin).await?;
		}

		if let Some(image_dir) = template_type::image_dir(&template.template_type) {
			for image in &appliance.images {
				let source = match image.source() {
					Some(source) => source,
					None => continue,
				};
				self.cache.ensure(source, image_dir, &image.filename, &image.md5sum).await?;
				info!("{:?} downloaded and verified", image.filename);
			}
		}
		Ok(Imported { appliance, template })
	}

	fn symbol_path(&self, name: &str) -> PathBuf {
		self.cache.base_directory().join("symbols").join(name)
	}

	/// Copies an appliance symbol into `<base>/symbols/`.
	///
	/// References without a scheme are relative to `origin`; schemes other than http(s) are ignored.
	async fn copy_symbol(&self, reference: &str, origin: &Origin) -> Result<()> {
		let url = match (Url::parse(reference), origin) {
			(Ok(url), _) if is_http(&url) => url,
			(Ok(url), _) => {
				warn!("unsupported scheme {:?} for symbol {:?}, ignoring", url.scheme(), reference);
				return Ok(());
			},
			(Err(_), Origin::Url(base)) => match base.join(reference) {
				Ok(url) => url,
				Err(e) => {
					warn!("unable to resolve symbol {:?} against {}: {}, ignoring", reference, base, e);
					return Ok(());
				},
			},
			(Err(_), Origin::Directory(dir)) => return self.copy_local_symbol(&dir.join(reference)).await,
		};

		let name = url.path_segments()
			.and_then(|mut segments| segments.next_back())
			.filter(|name| !name.is_empty())
			.ok_or_else(|| Error::Configuration(format!("symbol URL {} does not name a file", url)))?;
		let dest = self.symbol_path(name);
		self.cache.download_to(url.as_str(), &dest).await?;
		Ok(())
	}

	async fn copy_local_symbol(&self, src: &Path) -> Result<()> {
		let name = src.file_name()
			.ok_or_else(|| Error::Configuration(format!("symbol {} does not name a file", src.display())))?;
		let dest = self.symbol_path(&name.to_string_lossy());
		let data = tokio::fs::read(src).await.map_err(Error::io(src))?;
		let dir = self.cache.base_directory().join("symbols");
		tokio::fs::create_dir_all(&dir).await.map_err(Error::io(&dir))?;
		tokio::fs::write(&dest, data).await.map_err(Error::io(&dest))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fake::{FakeServer, MemoryFetcher};
	use crate::settings::Settings;
	use md5::{Digest, Md5};
	use serde_json::json;
	use std::sync::Arc;
	use tempfile::TempDir;

	fn frr() -> Value {
		json!({
			"name": "FRR",
			"category": "router",
			"status": "stable",
			"registry_version": 3,
			"port_name_format": "eth{0}",
			"images": [{
				"filename": "frr-8.2.2.qcow2",
				"version": "8.2.2",
				"md5sum": "placeholder",
				"filesize": 23,
				"download_url": "https://sourceforge.net/projects/gns-3/files/",
				"direct_download_url": "https://images.example.net/frr-8.2.2.qcow2"
			}],
			"versions": [{"name": "8.2.2", "images": {"hda_disk_image": "frr-8.2.2.qcow2"}}],
			"qemu": {
				"adapter_type": "virtio-net-pci",
				"adapters": 8,
				"ram": 256,
				"arch": "x86_64",
				"console_type": "telnet",
				"kvm": "disable",
				"options": "-nographic"
			}
		})
	}

	fn importer(dir: &TempDir, fetcher: MemoryFetcher) -> ApplianceImporter {
		let settings = Settings { base_directory: dir.path().to_owned(), ..Default::default() };
		ApplianceImporter::new(AssetCache::new(Arc::new(fetcher), &settings))
	}

	fn appliance(doc: Value) -> Appliance {
		serde_json::from_value(doc).unwrap()
	}

	#[test]
	fn qemu_template_derivation() {
		let template = appliance(frr()).derive_template().unwrap();
		assert_eq!(template.name, "FRR 8.2.2");
		assert_eq!(template.template_type, "qemu");
		assert_eq!(template.compute_id.as_deref(), Some("local"));
		assert_eq!(template.category.as_deref(), Some("router"));
		assert_eq!(template.symbol.as_deref(), Some(symbol::ROUTER));

		let qemu: rt::QemuSettings = serde_json::from_value(Value::Object(template.settings)).unwrap();
		assert_eq!(qemu.options.as_deref(), Some("-nographic -machine accel=tcg"));
		assert_eq!(qemu.path.as_deref(), Some("qemu-system-x86_64"));
		assert_eq!(qemu.port_name_format.as_deref(), Some("eth{0}"));
		assert_eq!(qemu.hda_disk_image.as_deref(), Some("frr-8.2.2.qcow2"));
		assert_eq!(qemu.adapters, Some(8));
	}

	#[test]
	fn tcg_option_is_added_once() {
		let mut doc = frr();
		doc["qemu"]["options"] = json!("-machine accel=tcg -nographic");
		let template = appliance(doc).derive_template().unwrap();
		assert_eq!(template.settings["options"], json!("-machine accel=tcg -nographic"));

		let mut doc = frr();
		doc["qemu"]["kvm"] = json!("require");
		let template = appliance(doc).derive_template().unwrap();
		assert_eq!(template.settings["options"], json!("-nographic"));
	}

	#[test]
	fn template_name_without_versions() {
		let mut doc = frr();
		doc["versions"] = json!([]);
		assert_eq!(appliance(doc).template_name(), "FRR");
	}

	#[test]
	fn multilayer_switch_is_registered_as_switch() {
		let doc = json!({"name": "L3", "category": "multilayer_switch", "iou": {"ethernet_adapters": 2}});
		let template = appliance(doc).derive_template().unwrap();
		assert_eq!(template.category.as_deref(), Some("switch"));
		assert_eq!(template.symbol.as_deref(), Some(symbol::MULTILAYER_SWITCH));
		assert_eq!(template.template_type, "iou");
	}

	#[test]
	fn guest_symbol_depends_on_emulator() {
		let docker = json!({"name": "alpine", "category": "guest", "docker": {"image": "alpine:latest", "adapters": 1}});
		let template = appliance(docker).derive_template().unwrap();
		assert_eq!(template.symbol.as_deref(), Some(symbol::DOCKER_GUEST));
		assert_eq!(template.template_type, "docker");
		assert_eq!(template.settings["image"], json!("alpine:latest"));

		let qemu = json!({"name": "tiny", "category": "guest", "qemu": {"arch": "i386"}});
		assert_eq!(appliance(qemu).derive_template().unwrap().symbol.as_deref(), Some(symbol::QEMU_GUEST));
	}

	#[test]
	fn explicit_symbol_is_kept() {
		let mut doc = frr();
		doc["symbol"] = json!("frr.svg");
		assert_eq!(appliance(doc).derive_template().unwrap().symbol.as_deref(), Some("frr.svg"));
	}

	#[test]
	fn qemu_wins_over_docker() {
		let mut doc = frr();
		doc["docker"] = json!({"image": "frr:latest"});
		assert_eq!(appliance(doc).derive_template().unwrap().template_type, "qemu");
	}

	#[test]
	fn appliance_without_emulator_is_rejected() {
		let err = appliance(json!({"name": "ghost", "category": "guest"})).derive_template().unwrap_err();
		assert!(matches!(err, Error::Configuration(ref m) if m.contains("ghost")), "{}", err);
	}

	#[tokio::test]
	async fn import_fetches_images_from_direct_url() {
		let dir = TempDir::new().unwrap();
		let body = b"frr disk image";
		let mut doc = frr();
		doc["images"][0]["md5sum"] = json!(hex::encode(Md5::digest(body)));
		let importer = importer(&dir, MemoryFetcher::with("https://images.example.net/frr-8.2.2.qcow2", body));

		let imported = importer.import(doc.to_string().as_bytes(), &Origin::Directory(dir.path().to_owned())).await.unwrap();

		assert_eq!(imported.template.name, "FRR 8.2.2");
		assert_eq!(std::fs::read(dir.path().join("images/QEMU/frr-8.2.2.qcow2")).unwrap(), body);
		assert!(dir.path().join("images/QEMU/frr-8.2.2.qcow2.md5sum").exists());
	}

	#[tokio::test]
	async fn iou_images_land_in_iou_directory() {
		let dir = TempDir::new().unwrap();
		let body = b"iou binary";
		let doc = json!({
			"name": "IOU L2",
			"category": "switch",
			"iou": {"nvram": 128},
			"images": [{"filename": "l2.bin", "md5sum": hex::encode(Md5::digest(body)), "download_url": "https://images.example.net/l2.bin"}]
		});
		let importer = importer(&dir, MemoryFetcher::with("https://images.example.net/l2.bin", body));

		importer.import(doc.to_string().as_bytes(), &Origin::Directory(dir.path().to_owned())).await.unwrap();
		assert!(dir.path().join("images/IOU/l2.bin").exists());
	}

	#[tokio::test]
	async fn image_file_names_cannot_leave_the_image_directory() {
		let dir = TempDir::new().unwrap();
		let base = dir.path().join("GNS3");
		let body = b"iou binary";
		let doc = json!({
			"name": "IOU L2",
			"category": "switch",
			"iou": {"nvram": 128},
			"images": [{"filename": "../../../escaped.bin", "md5sum": hex::encode(Md5::digest(body)), "download_url": "https://images.example.net/l2.bin"}]
		});
		let settings = Settings { base_directory: base.clone(), ..Default::default() };
		let fetcher = Arc::new(MemoryFetcher::with("https://images.example.net/l2.bin", body));
		let importer = ApplianceImporter::new(AssetCache::new(fetcher.clone(), &settings));

		let err = importer.import(doc.to_string().as_bytes(), &Origin::Directory(dir.path().to_owned())).await.unwrap_err();

		assert!(matches!(err, Error::Configuration(ref m) if m.contains("escaped.bin")), "{}", err);
		assert_eq!(fetcher.downloads(), 0);
		assert!(!dir.path().join("escaped.bin").exists());
	}

	#[tokio::test]
	async fn local_symbol_is_copied_relative_to_the_document() {
		let dir = TempDir::new().unwrap();
		let input = dir.path().join("appliances");
		std::fs::create_dir_all(input.join("icons")).unwrap();
		std::fs::write(input.join("icons/frr.svg"), "<svg/>").unwrap();
		let mut doc = frr();
		doc["symbol"] = json!("icons/frr.svg");
		doc["images"] = json!([]);
		let importer = importer(&dir, MemoryFetcher::default());

		importer.import(doc.to_string().as_bytes(), &Origin::Directory(input)).await.unwrap();
		assert_eq!(std::fs::read_to_string(dir.path().join("symbols/frr.svg")).unwrap(), "<svg/>");
	}

	#[tokio::test]
	async fn remote_symbol_is_downloaded() {
		let dir = TempDir::new().unwrap();
		let mut doc = frr();
		doc["symbol"] = json!("https://symbols.example.net/classic/frr.svg");
		doc["images"] = json!([]);
		let importer = importer(&dir, MemoryFetcher::with("https://symbols.example.net/classic/frr.svg", b"<svg/>"));

		importer.import(doc.to_string().as_bytes(), &Origin::Directory(dir.path().to_owned())).await.unwrap();
		assert!(dir.path().join("symbols/frr.svg").exists());
	}

	#[tokio::test]
	async fn relative_symbol_of_remote_appliance_is_fetched_next_to_it() {
		let dir = TempDir::new().unwrap();
		let mut doc = frr();
		doc["symbol"] = json!("frr.svg");
		doc["images"] = json!([]);
		let fetcher = MemoryFetcher::with("https://registry.example.net/appliances/frr.gns3a", doc.to_string().as_bytes())
			.and("https://registry.example.net/appliances/frr.svg", b"<svg/>");
		let importer = importer(&dir, fetcher);

		let imported = importer.load("https://registry.example.net/appliances/frr.gns3a").await.unwrap();
		assert_eq!(imported.appliance.name, "FRR");
		assert!(dir.path().join("symbols/frr.svg").exists());
	}

	#[tokio::test]
	async fn unsupported_symbol_scheme_is_ignored() {
		let dir = TempDir::new().unwrap();
		let mut doc = frr();
		doc["symbol"] = json!("ftp://symbols.example.net/frr.svg");
		doc["images"] = json!([]);
		let importer = importer(&dir, MemoryFetcher::default());

		let imported = importer.import(doc.to_string().as_bytes(), &Origin::Directory(dir.path().to_owned())).await.unwrap();
		assert_eq!(imported.template.symbol.as_deref(), Some("ftp://symbols.example.net/frr.svg"));
		assert!(!dir.path().join("symbols").exists());
	}

	#[tokio::test]
	async fn load_reads_local_files() {
		let dir = TempDir::new().unwrap();
		let mut doc = frr();
		doc["images"] = json!([]);
		let path = dir.path().join("frr.gns3a");
		std::fs::write(&path, doc.to_string()).unwrap();

		let imported = importer(&dir, MemoryFetcher::default()).load(path.to_str().unwrap()).await.unwrap();
		assert_eq!(imported.template.template_type, "qemu");
	}

	#[tokio::test]
	async fn load_rejects_other_schemes() {
		let dir = TempDir::new().unwrap();
		let err = importer(&dir, MemoryFetcher::default()).load("ftp://registry.example.net/frr.gns3a").await.unwrap_err();
		assert!(matches!(err, Error::Configuration(_)), "{}", err);
	}

	#[tokio::test]
	async fn first_template_writer_wins() {
		let server = FakeServer::default();
		let template = appliance(frr()).derive_template().unwrap();

		let first = ensure_template(&server, &template).await.unwrap();
		assert!(matches!(first, TemplateOutcome::Created(_)));

		let mut changed = template.clone();
		changed.usage = Some("changed".into());
		let second = ensure_template(&server, &changed).await.unwrap();
		assert!(matches!(second, TemplateOutcome::AlreadyPresent(ref t) if t.usage.is_none()));
		assert_eq!(server.calls_to("create_template").len(), 1);
		assert_eq!(second.template().template_id, first.template().template_id);
	}
}
