use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ADDRESS: &str = "localhost:3080";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";
pub const DEFAULT_COMPUTE: &str = "local";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_DOWNLOAD_BUFFER_SIZE: usize = 10 * 1000 * 1000;

/// Everything needed to talk to one server and its backing storage.
///
/// Built once by the command line front end and handed to the client and the
/// asset cache when they are constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
	/// `host:port` of the server
	pub address: String,
	pub username: String,
	pub password: String,
	/// Applied to every request made to the server
	pub timeout: Duration,
	pub insecure_skip_verify: bool,
	/// The server's data directory: projects, images and symbols live under it
	pub base_directory: PathBuf,
	/// Compute used for nodes that do not name one
	pub compute: String,
	pub download_buffer_size: usize,
}
impl Default for Settings {
	fn default() -> Settings {
		Settings {
			address: DEFAULT_ADDRESS.to_owned(),
			username: DEFAULT_USERNAME.to_owned(),
			password: DEFAULT_PASSWORD.to_owned(),
			timeout: DEFAULT_TIMEOUT,
			insecure_skip_verify: true,
			base_directory: PathBuf::from("GNS3"),
			compute: DEFAULT_COMPUTE.to_owned(),
			download_buffer_size: DEFAULT_DOWNLOAD_BUFFER_SIZE,
		}
	}
}
