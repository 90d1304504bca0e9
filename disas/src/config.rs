use std::fs;
use std::path::{Path, PathBuf};

use gpudis_core::Family;
use serde::Deserialize;
use thiserror::Error;

use crate::amdgpu;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Which family, triple and processor to decode for.
///
/// ```toml
/// family = "AMDGPU"
/// triple = "amdgcn--amdhsa"
/// cpu = "gfx906"
/// skip_kernel_header = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisasConfig {
    pub family: Family,
    pub triple: String,
    pub cpu: String,
    /// Treat the first 256 bytes of `.text` as `amd_kernel_code_t`.
    pub skip_kernel_header: bool,
}

impl Default for DisasConfig {
    fn default() -> Self {
        Self {
            family: amdgpu::FAMILY,
            triple: amdgpu::DEFAULT_TRIPLE.to_string(),
            cpu: amdgpu::DEFAULT_PROCESSOR.to_string(),
            skip_kernel_header: true,
        }
    }
}

impl DisasConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<memory>"))
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
