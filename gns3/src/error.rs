use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::rest::ApiError;

pub type Result<T> = std::result::Result<T, Error>;

/// The kind of remote object a lookup was trying to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
	Project,
	Node,
	Link,
	Template,
	Compute,
}
impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Kind::Project => "project",
			Kind::Node => "node",
			Kind::Link => "link",
			Kind::Template => "template",
			Kind::Compute => "compute",
		})
	}
}

#[derive(Debug, Error)]
pub enum Error {
	/// A named object could not be resolved on the server. Callers usually treat this as "needs creation".
	#[error("{kind} not found: {name:?}")]
	NotFound { kind: Kind, name: String },

	#[error(transparent)]
	RemoteFault(#[from] ApiError),

	#[error("checksum mismatch for {}: expected {expected}, found {found}", path.display())]
	ChecksumMismatch {
		path: PathBuf,
		expected: String,
		found: String,
	},

	#[error("invalid configuration: {0}")]
	Configuration(String),

	#[error("{}: {source}", path.display())]
	LocalIo {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("request failed: {0}")]
	Network(#[from] reqwest::Error),

	#[error("unable to decode JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("unable to decode YAML: {0}")]
	Yaml(#[from] serde_yaml::Error),
}
impl Error {
	pub fn not_found(kind: Kind, name: impl Into<String>) -> Error {
		Error::NotFound { kind, name: name.into() }
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, Error::NotFound { .. })
	}

	/// Adapter for `map_err` that tags an I/O error with the path it happened on.
	pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Error {
		let path = path.into();
		move |source| Error::LocalIo { path, source }
	}
}
