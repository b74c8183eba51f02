use std::path::PathBuf;

use serde::Deserialize;

/// Which object storage backend to use.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
}

/// Settings for an S3-compatible bucket.
#[derive(Debug, Deserialize, Clone)]
pub struct S3StorageConfig {
    pub bucket: String,
    /// Region name, for example `eu-central-003`.
    pub region: String,
    /// Endpoint host, for example `s3.eu-central-003.backblazeb2.com`.
    pub endpoint: String,
    /// Falls back to `AWS_ACCESS_KEY_ID` when unset.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Falls back to `AWS_SECRET_ACCESS_KEY` when unset.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Use path-style addressing (required by MinIO). Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_path_style() -> bool {
    true
}

/// App-level object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Backend selection. Default: filesystem.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory of the filesystem backend. Default: "./data/media".
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Public URL prefix of stored objects. Default: "http://127.0.0.1:3000/media".
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Maximum object size in bytes. Default: 10 MB.
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
    /// Required when `backend = "s3"`.
    #[serde(default)]
    pub s3: Option<S3StorageConfig>,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./data/media")
}
fn default_public_base_url() -> String {
    "http://127.0.0.1:3000/media".into()
}
fn default_max_object_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_storage_root(),
            public_base_url: default_public_base_url(),
            max_object_size: default_max_object_size(),
            s3: None,
        }
    }
}
