//! Local copies of appliance disk images, verified against their published MD5 sums.
//!
//! Every image `<name>` is kept next to a `<name>.md5sum` sidecar holding the
//! digest computed from it. The sidecar is what gets compared on later runs, so
//! multi-gigabyte images are only hashed after they were (re)downloaded or when
//! the sidecar is missing.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use md5::{Digest, Md5};
use reqwest::Client;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};

use crate::error::{Error, Result};
use crate::rest::ApiError;
use crate::settings::Settings;

pub const CHECKSUM_SUFFIX: &str = "md5sum";

/// Where remote content comes from.
#[async_trait]
pub trait Fetcher: Send + Sync {
	/// Fetches a small document into memory.
	async fn fetch(&self, url: &str) -> Result<Vec<u8>>;

	/// Streams `url` into `dest`, replacing any existing file. Returns the number of bytes written.
	async fn download(&self, url: &str, dest: &Path, buffer_size: usize) -> Result<u64>;
}

/// [`Fetcher`] over plain HTTP(S), with a progress bar for downloads.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
	client: Client,
}
impl HttpFetcher {
	pub fn new(settings: &Settings) -> Result<HttpFetcher> {
		// images can take far longer than a REST call, so only connecting is bounded
		let client = Client::builder()
			.connect_timeout(settings.timeout)
			.danger_accept_invalid_certs(settings.insecure_skip_verify)
			.build()?;
		Ok(HttpFetcher { client })
	}

	async fn get(&self, url: &str) -> Result<reqwest::Response> {
		let resp = self.client.get(url).send().await?;
		let status = resp.status();
		if !status.is_success() {
			let reason = status.canonical_reason().unwrap_or("download failed");
			return Err(ApiError::new(url, status.as_u16(), reason).into());
		}
		Ok(resp)
	}
}

fn progress_bar(total: Option<u64>, name: &str) -> ProgressBar {
	let bar = match total {
		Some(total) => ProgressBar::new(total).with_style(
			ProgressStyle::with_template("{msg} [{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec})")
				.unwrap_or_else(|_| ProgressStyle::default_bar())
				.progress_chars("#>."),
		),
		None => ProgressBar::new_spinner(),
	};
	bar.set_message(name.to_owned());
	bar
}

#[async_trait]
impl Fetcher for HttpFetcher {
	async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
		Ok(self.get(url).await?.bytes().await?.to_vec())
	}

	async fn download(&self, url: &str, dest: &Path, buffer_size: usize) -> Result<u64> {
		info!("downloading {} to {}", url, dest.display());
		let resp = self.get(url).await?;
		let name = dest.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_else(|| url.to_owned());
		let bar = progress_bar(resp.content_length(), &name);

		let file = tokio::fs::File::create(dest).await.map_err(Error::io(dest))?;
		let mut writer = BufWriter::with_capacity(buffer_size, file);
		let mut written = 0u64;
		let mut body = resp.bytes_stream();
		while let Some(chunk) = body.next().await {
			let chunk = match chunk {
				Ok(chunk) => chunk,
				Err(e) => {
					bar.abandon();
					return Err(e.into());
				},
			};
			writer.write_all(&chunk).await.map_err(Error::io(dest))?;
			written += chunk.len() as u64;
			bar.inc(chunk.len() as u64);
		}
		writer.flush().await.map_err(Error::io(dest))?;
		bar.finish();
		Ok(written)
	}
}

/// Computes the lower-case hex MD5 digest of a file.
pub async fn md5_file(path: &Path) -> Result<String> {
	let mut file = tokio::fs::File::open(path).await.map_err(Error::io(path))?;
	let mut hasher = Md5::new();
	let mut buf = vec![0u8; 1 << 20];
	loop {
		let n = file.read(&mut buf).await.map_err(Error::io(path))?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}
	Ok(hex::encode(hasher.finalize()))
}

pub fn sidecar_path(path: &Path) -> PathBuf {
	let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
	name.push(".");
	name.push(CHECKSUM_SUFFIX);
	path.with_file_name(name)
}

fn partial_path(path: &Path) -> PathBuf {
	let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
	name.push(".part");
	path.with_file_name(name)
}

async fn remove_if_present(path: &Path) -> Result<()> {
	match tokio::fs::remove_file(path).await {
		Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(Error::io(path)(e)),
		_ => Ok(()),
	}
}

async fn exists(path: &Path) -> bool {
	tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn same_digest(a: &str, b: &str) -> bool {
	a.trim().eq_ignore_ascii_case(b.trim())
}

pub struct AssetCache {
	fetcher: Arc<dyn Fetcher>,
	base_directory: PathBuf,
	buffer_size: usize,
}
impl AssetCache {
	pub fn new(fetcher: Arc<dyn Fetcher>, settings: &Settings) -> AssetCache {
		AssetCache {
			fetcher,
			base_directory: settings.base_directory.clone(),
			buffer_size: settings.download_buffer_size,
		}
	}

	pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
		&self.fetcher
	}

	pub fn base_directory(&self) -> &Path {
		&self.base_directory
	}

	/// `<base>/images/<image_dir>/<name>`. `name` must be a single plain file name.
	pub fn image_path(&self, image_dir: &str, name: &str) -> Result<PathBuf> {
		let mut components = Path::new(name).components();
		match (components.next(), components.next()) {
			(Some(Component::Normal(_)), None) => Ok(self.base_directory.join("images").join(image_dir).join(name)),
			_ => Err(Error::Configuration(format!("image file name {:?} is not a plain file name", name))),
		}
	}

	/// Makes sure `<base>/images/<image_dir>/<name>` exists and its digest is `expected`,
	/// downloading it from `source` when it is missing or does not match.
	///
	/// A file that still does not match after a fresh download is a [`Error::ChecksumMismatch`].
	pub async fn ensure(&self, source: &str, image_dir: &str, name: &str, expected: &str) -> Result<PathBuf> {
		let path = self.image_path(image_dir, name)?;
		let sidecar = sidecar_path(&path);

		if !exists(&path).await {
			self.download(source, &path, &sidecar).await?;
		}
		if !exists(&sidecar).await {
			info!("generating MD5 sum for {}", path.display());
			self.write_checksum(&path, &sidecar).await?;
		}

		let recorded = self.read_checksum(&sidecar).await?;
		if !same_digest(&recorded, expected) {
			warn!("MD5 mismatch for {} (have {}, want {}), downloading again", path.display(), recorded.trim(), expected);
			self.download(source, &path, &sidecar).await?;
		}

		let found = self.read_checksum(&sidecar).await?;
		if !same_digest(&found, expected) {
			return Err(Error::ChecksumMismatch {
				path,
				expected: expected.to_owned(),
				found: found.trim().to_owned(),
			});
		}
		debug!("{} verified", path.display());
		Ok(path)
	}

	/// Copies a remote file into `dest` without any verification.
	pub async fn download_to(&self, source: &str, dest: &Path) -> Result<u64> {
		if let Some(parent) = dest.parent() {
			tokio::fs::create_dir_all(parent).await.map_err(Error::io(parent))?;
		}
		self.fetcher.download(source, dest, self.buffer_size).await
	}

	/// Downloads into `<name>.part` and only moves it into place once complete.
	/// The old sidecar is removed first so it never outlives the file it was computed from.
	async fn download(&self, source: &str, path: &Path, sidecar: &Path) -> Result<()> {
		remove_if_present(sidecar).await?;
		let partial = partial_path(path);
		if let Err(e) = self.download_to(source, &partial).await {
			if let Err(cleanup) = remove_if_present(&partial).await {
				warn!("unable to remove partial download: {}", cleanup);
			}
			return Err(e);
		}
		tokio::fs::rename(&partial, path).await.map_err(Error::io(path))?;
		self.write_checksum(path, sidecar).await
	}

	async fn write_checksum(&self, path: &Path, sidecar: &Path) -> Result<()> {
		let digest = md5_file(path).await?;
		tokio::fs::write(sidecar, digest).await.map_err(Error::io(sidecar))
	}

	async fn read_checksum(&self, sidecar: &Path) -> Result<String> {
		tokio::fs::read_to_string(sidecar).await.map_err(Error::io(sidecar))
	}
}
