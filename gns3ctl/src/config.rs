//! Settings resolution: command line (and environment), then the config file, then defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bytesize::ByteSize;
use clap::Args;
use log::{debug, warn};
use serde::Deserialize;

use gns3::settings::{self, Settings};

pub const DEFAULT_PROJECT: &str = "default";
pub const CONFIG_FILE_NAME: &str = ".gns3ctl.yaml";

/// Options shared by every command. Anything left unset falls back to the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
	/// Server address, as host:port [default: localhost:3080]
	#[arg(short, long, global = true, env = gns3::ENV_GNS3_ADDRESS)]
	pub address: Option<String>,

	/// [default: admin]
	#[arg(short, long, global = true, env = gns3::ENV_GNS3_USERNAME)]
	pub username: Option<String>,

	/// [default: admin]
	#[arg(short = 'w', long, global = true, env = gns3::ENV_GNS3_PASSWORD, hide_env_values = true)]
	pub password: Option<String>,

	/// Timeout applied to every request, e.g. `20s` or `1m 30s` [default: 20s]
	#[arg(short, long, global = true, env = gns3::ENV_GNS3_TIMEOUT, value_parser = humantime::parse_duration)]
	pub timeout: Option<Duration>,

	/// The server's data directory [default: ~/GNS3]
	#[arg(short = 'd', long, global = true, env = gns3::ENV_GNS3_BASE_DIRECTORY)]
	pub base_directory: Option<PathBuf>,

	/// Compute for nodes that do not name one [default: local]
	#[arg(short, long, global = true, env = gns3::ENV_GNS3_COMPUTE)]
	pub compute: Option<String>,

	/// Project that node and link commands act on [default: default]
	#[arg(short, long, global = true, env = gns3::ENV_GNS3_PROJECT)]
	pub project: Option<String>,

	/// Accept invalid TLS certificates [default: true]
	#[arg(short = 'k', long, global = true, env = gns3::ENV_GNS3_INSECURE_SKIP_VERIFY, num_args = 0..=1, default_missing_value = "true")]
	pub insecure_skip_verify: Option<bool>,

	/// Write buffer used for image downloads, e.g. `10M` [default: 10M]
	#[arg(long, global = true, env = gns3::ENV_GNS3_DOWNLOAD_BUFFER_SIZE)]
	pub download_buffer_size: Option<String>,

	/// Config file [default: ~/.gns3ctl.yaml]
	#[arg(long, global = true, env = gns3::ENV_GNS3CTL_CONFIG)]
	pub config: Option<PathBuf>,
}

/// Keys of the YAML config file. They mirror the long option names.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
	pub address: Option<String>,
	pub username: Option<String>,
	pub password: Option<String>,
	pub timeout: Option<String>,
	pub base_directory: Option<PathBuf>,
	pub compute: Option<String>,
	pub project: Option<String>,
	pub insecure_skip_verify: Option<bool>,
	pub download_buffer_size: Option<String>,
}
impl ConfigFile {
	/// Reads the config file. A missing default file is not an error; a missing explicit one is.
	pub fn load(explicit: Option<&Path>) -> Result<ConfigFile> {
		let (path, required) = match explicit {
			Some(path) => (path.to_path_buf(), true),
			None => match dirs::home_dir() {
				Some(home) => (home.join(CONFIG_FILE_NAME), false),
				None => return Ok(ConfigFile::default()),
			},
		};
		if !required && !path.exists() {
			debug!("no config file at {}", path.display());
			return Ok(ConfigFile::default());
		}
		let doc = std::fs::read_to_string(&path)
			.with_context(|| format!("unable to read config file {}", path.display()))?;
		ConfigFile::parse(&doc).with_context(|| format!("invalid config file {}", path.display()))
	}

	pub fn parse(doc: &str) -> Result<ConfigFile> {
		if doc.trim().is_empty() {
			return Ok(ConfigFile::default());
		}
		Ok(serde_yaml::from_str(doc)?)
	}
}

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
	pub settings: Settings,
	pub project: String,
}

/// Parses a human size such as `10M` or `512KiB`. Unparsable sizes fall back to the default.
pub fn parse_buffer_size(value: &str) -> usize {
	match value.trim().parse::<ByteSize>() {
		Ok(size) if size.as_u64() > 0 => size.as_u64() as usize,
		_ => {
			warn!("unable to parse download buffer size {:?}, defaulting to 10M", value);
			settings::DEFAULT_DOWNLOAD_BUFFER_SIZE
		},
	}
}

fn default_base_directory() -> PathBuf {
	dirs::home_dir().unwrap_or_default().join("GNS3")
}

impl GlobalArgs {
	pub fn resolve(&self) -> Result<Resolved> {
		let file = ConfigFile::load(self.config.as_deref())?;
		self.merge(file)
	}

	pub fn merge(&self, file: ConfigFile) -> Result<Resolved> {
		let timeout = match (self.timeout, file.timeout) {
			(Some(timeout), _) => timeout,
			(None, Some(text)) => humantime::parse_duration(&text)
				.with_context(|| format!("invalid timeout {:?} in config file", text))?,
			(None, None) => settings::DEFAULT_TIMEOUT,
		};
		let download_buffer_size = self.download_buffer_size.clone()
			.or(file.download_buffer_size)
			.map(|size| parse_buffer_size(&size))
			.unwrap_or(settings::DEFAULT_DOWNLOAD_BUFFER_SIZE);

		let settings = Settings {
			address: self.address.clone().or(file.address).unwrap_or_else(|| settings::DEFAULT_ADDRESS.to_owned()),
			username: self.username.clone().or(file.username).unwrap_or_else(|| settings::DEFAULT_USERNAME.to_owned()),
			password: self.password.clone().or(file.password).unwrap_or_else(|| settings::DEFAULT_PASSWORD.to_owned()),
			timeout,
			insecure_skip_verify: self.insecure_skip_verify.or(file.insecure_skip_verify).unwrap_or(true),
			base_directory: self.base_directory.clone().or(file.base_directory).unwrap_or_else(default_base_directory),
			compute: self.compute.clone().or(file.compute).unwrap_or_else(|| settings::DEFAULT_COMPUTE.to_owned()),
			download_buffer_size,
		};
		let project = self.project.clone().or(file.project).unwrap_or_else(|| DEFAULT_PROJECT.to_owned());
		Ok(Resolved { settings, project })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn defaults_apply_when_nothing_is_set() {
		let resolved = GlobalArgs::default().merge(ConfigFile::default()).unwrap();
		assert_eq!(resolved.project, "default");
		assert_eq!(resolved.settings.address, "localhost:3080");
		assert_eq!(resolved.settings.username, "admin");
		assert_eq!(resolved.settings.timeout, Duration::from_secs(20));
		assert_eq!(resolved.settings.compute, "local");
		assert_eq!(resolved.settings.download_buffer_size, 10_000_000);
		assert!(resolved.settings.insecure_skip_verify);
		assert!(resolved.settings.base_directory.ends_with("GNS3"));
	}

	#[test]
	fn command_line_beats_config_file() {
		let file = ConfigFile::parse("
address: gns3.lab:3080
project: core
timeout: 1m 30s
insecure-skip-verify: false
download-buffer-size: 512KiB
").unwrap();
		let args = GlobalArgs {
			address: Some("10.1.1.1:3080".into()),
			compute: Some("vm".into()),
			..Default::default()
		};

		let resolved = args.merge(file).unwrap();

		assert_eq!(resolved.settings.address, "10.1.1.1:3080");
		assert_eq!(resolved.project, "core");
		assert_eq!(resolved.settings.compute, "vm");
		assert_eq!(resolved.settings.timeout, Duration::from_secs(90));
		assert!(!resolved.settings.insecure_skip_verify);
		assert_eq!(resolved.settings.download_buffer_size, 512 * 1024);
	}

	#[test]
	fn buffer_sizes() {
		assert_eq!(parse_buffer_size("10M"), 10_000_000);
		assert_eq!(parse_buffer_size("4 KiB"), 4096);
		assert_eq!(parse_buffer_size("lots"), settings::DEFAULT_DOWNLOAD_BUFFER_SIZE);
	}

	#[test]
	fn bad_timeout_in_file_is_an_error() {
		let file = ConfigFile { timeout: Some("soon".into()), ..Default::default() };
		assert!(GlobalArgs::default().merge(file).is_err());
	}

	#[test]
	fn unknown_config_keys_are_rejected() {
		assert!(ConfigFile::parse("adress: typo:3080\n").is_err());
	}

	#[test]
	fn explicit_config_file_must_exist() {
		let dir = TempDir::new().unwrap();
		assert!(ConfigFile::load(Some(&dir.path().join("missing.yaml"))).is_err());

		let path = dir.path().join("gns3ctl.yaml");
		std::fs::write(&path, "compute: vm\n").unwrap();
		assert_eq!(ConfigFile::load(Some(&path)).unwrap().compute.as_deref(), Some("vm"));
	}
}
