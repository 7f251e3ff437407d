
pub mod accessor;
pub mod appliance;
pub mod cache;
pub mod error;
pub mod reconcile;
pub mod rest;
pub mod rest_types;
pub mod settings;
pub mod topology;

#[cfg(test)]
pub(crate) mod fake;

pub use rest_types as rt;
pub use error::{Error, Result};
pub use settings::Settings;

pub const ENV_GNS3_ADDRESS: &str = "GNS3_ADDRESS";
pub const ENV_GNS3_USERNAME: &str = "GNS3_USERNAME";
pub const ENV_GNS3_PASSWORD: &str = "GNS3_PASSWORD";
pub const ENV_GNS3_BASE_DIRECTORY: &str = "GNS3_BASE_DIRECTORY";
pub const ENV_GNS3_TIMEOUT: &str = "GNS3_TIMEOUT";
pub const ENV_GNS3_COMPUTE: &str = "GNS3_COMPUTE";
pub const ENV_GNS3_PROJECT: &str = "GNS3_PROJECT";
pub const ENV_GNS3_INSECURE_SKIP_VERIFY: &str = "GNS3_INSECURE_SKIP_VERIFY";
pub const ENV_GNS3_DOWNLOAD_BUFFER_SIZE: &str = "GNS3_DOWNLOAD_BUFFER_SIZE";
pub const ENV_GNS3CTL_CONFIG: &str = "GNS3CTL_CONFIG";
