use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::checksum::CHECKSUM_CHUNK_SIZE;
use crate::chunking::UPLOAD_CHUNK_SIZE;
use crate::uploader::UploadSettings;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000/";

/// Transport timeouts (optional `[http]` section in config.toml).
/// Unset values leave libcurl's defaults in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Connect timeout in seconds.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Global configuration loaded from `~/.config/chunkup/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkupConfig {
    /// Base URL of the storage server; endpoints are resolved relative to it.
    pub server_url: String,
    /// Bytes per uploaded chunk.
    pub upload_chunk_size: u64,
    /// Bytes read per step while computing the MD5 digest.
    pub checksum_chunk_size: u64,
    /// Upper bound on chunk uploads in flight (None = all chunks at once).
    #[serde(default)]
    pub max_concurrent_uploads: Option<usize>,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for ChunkupConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            upload_chunk_size: UPLOAD_CHUNK_SIZE,
            checksum_chunk_size: CHECKSUM_CHUNK_SIZE,
            max_concurrent_uploads: None,
            http: HttpConfig::default(),
        }
    }
}

impl ChunkupConfig {
    /// Rejects values the uploader cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.upload_chunk_size == 0 {
            anyhow::bail!("upload_chunk_size must be greater than 0");
        }
        if self.checksum_chunk_size == 0 {
            anyhow::bail!("checksum_chunk_size must be greater than 0");
        }
        if self.max_concurrent_uploads == Some(0) {
            anyhow::bail!("max_concurrent_uploads must be at least 1 when set");
        }
        url::Url::parse(&self.server_url)
            .with_context(|| format!("invalid server_url {:?}", self.server_url))?;
        Ok(())
    }

    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            upload_chunk_size: self.upload_chunk_size,
            checksum_chunk_size: self.checksum_chunk_size,
            max_concurrent_uploads: self.max_concurrent_uploads,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("chunkup")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ChunkupConfig> {
    load_or_init_at(&config_path()?)
}

/// Like `load_or_init` but at an explicit path (tests, `--config`).
pub fn load_or_init_at(path: &Path) -> Result<ChunkupConfig> {
    if !path.exists() {
        let default_cfg = ChunkupConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ChunkupConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
