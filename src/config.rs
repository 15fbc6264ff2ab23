use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{FilterError, FilterResult};

/// Region used when `AWS_REGION` is unset
pub const DEFAULT_REGION: &str = "us-east-1";
/// Port used when `PORT` is unset or unparsable
pub const DEFAULT_PORT: u16 = 8082;

/// AWS credentials and target bucket resolved at startup
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    /// Target bucket. Uploads fail while this is unset.
    pub bucket_name: Option<String>,
}

impl Credentials {
    /// Resolve credentials from the process environment
    pub fn from_env() -> FilterResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve credentials through `lookup`, treating empty values as absent
    pub fn from_lookup<F>(lookup: F) -> FilterResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let (access_key_id, secret_access_key) =
            match (get("AWS_ACCESS_KEY_ID"), get("AWS_SECRET_ACCESS_KEY")) {
                (Some(id), Some(secret)) => (id, secret),
                _ => {
                    return Err(FilterError::Configuration(
                        "AWS credentials are not set in the environment variables".to_string(),
                    ))
                }
            };

        Ok(Credentials {
            access_key_id,
            secret_access_key,
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            bucket_name: get("S3_BUCKET_NAME"),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("bucket_name", &self.bucket_name)
            .finish()
    }
}

/// Region and bucket only; safe to log
impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region={} bucket={}",
            self.region,
            self.bucket_name.as_deref().unwrap_or("<unset>")
        )
    }
}

/// Load variables from the env file at `path`. A missing file is not an error.
pub fn load_env_file(path: &Path) -> Result<(), dotenvy::Error> {
    match dotenvy::from_path(path) {
        Err(e) if e.not_found() => Ok(()),
        other => other,
    }
}

/// Listener and scratch-space settings; always resolvable
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Shared directory the transform step writes into
    pub tmp_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let tmp_dir = lookup("FILTER_TMP_DIR")
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        ServerConfig { port, tmp_dir }
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
