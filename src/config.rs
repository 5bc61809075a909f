use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::error_codes::CodedError;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "gallery.yaml";
pub const SOURCE_DIR_ENV: &str = "RIVE_SOURCE_DIR";
pub const REPO_PATH_ENV: &str = "REPO_PATH";

/// Every convention the generator relies on. Loaded once and passed by
/// reference into each stage so tests can vary any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    pub table: PathBuf,
    pub head_template: PathBuf,
    pub assets_dir: String,
    pub images_dir: String,
    pub pages_dir: String,
    pub index_file: String,
    pub page_file_pattern: String,
    pub page_size: usize,
    pub thumbnail_width: u32,
    pub default_state_machine: String,
    pub default_number: String,
    pub preview_suffix: String,
    pub input_columns: usize,
    pub newest_first: bool,
    pub sync: SyncConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub source_dir: Option<PathBuf>,
    pub max_age_hours: u32,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    pub remote: String,
    pub default_message: String,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            table: PathBuf::from("videos.csv"),
            head_template: PathBuf::from("head.html"),
            assets_dir: String::from("riv"),
            images_dir: String::from("images"),
            pages_dir: String::from("pages"),
            index_file: String::from("index.html"),
            page_file_pattern: String::from("page{n}.html"),
            page_size: 12,
            thumbnail_width: 200,
            default_state_machine: String::from("State Machine 1"),
            default_number: String::from("80"),
            preview_suffix: String::from("_preview"),
            input_columns: 6,
            newest_first: true,
            sync: SyncConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            max_age_hours: 24,
            extension: String::from("riv"),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            remote: String::from("origin"),
            default_message: String::from("Updated files"),
        }
    }
}

impl GalleryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(invalid("page_size must be greater than zero"));
        }
        if self.thumbnail_width == 0 {
            return Err(invalid("thumbnail_width must be greater than zero"));
        }
        if !self.page_file_pattern.contains("{n}") {
            return Err(invalid(format!(
                "page_file_pattern '{}' must contain the {{n}} placeholder",
                self.page_file_pattern
            )));
        }
        if self.default_state_machine.trim().is_empty() {
            return Err(invalid("default_state_machine must not be empty"));
        }
        for (field, value) in [
            ("assets_dir", &self.assets_dir),
            ("images_dir", &self.images_dir),
            ("pages_dir", &self.pages_dir),
            ("index_file", &self.index_file),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn table_path(&self, root: &Path) -> PathBuf {
        root.join(&self.table)
    }

    pub fn head_template_path(&self, root: &Path) -> PathBuf {
        root.join(&self.head_template)
    }

    pub fn assets_path(&self, root: &Path) -> PathBuf {
        root.join(&self.assets_dir)
    }

    pub fn pages_path(&self, root: &Path) -> PathBuf {
        root.join(&self.pages_dir)
    }

    /// Source folder for asset sync: explicit argument, then the
    /// environment, then the config file.
    pub fn sync_source(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        env::var_os(SOURCE_DIR_ENV)
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(|| self.sync.source_dir.clone())
    }
}

/// Loads `gallery.yaml`. With no explicit path a missing file under `root`
/// means defaults; an explicitly named file must exist.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<GalleryConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow!(CodedError::input(
                    "CONFIG_NOT_FOUND",
                    format!("config file {} does not exist", path.display()),
                )));
            }
            path.to_path_buf()
        }
        None => {
            let candidate = root.join(DEFAULT_CONFIG_FILE_NAME);
            if !candidate.exists() {
                tracing::debug!(
                    "no {} under {}, using defaults",
                    DEFAULT_CONFIG_FILE_NAME,
                    root.display()
                );
                return Ok(GalleryConfig::default());
            }
            candidate
        }
    };

    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = if text.trim().is_empty() {
        GalleryConfig::default()
    } else {
        serde_yaml::from_str::<GalleryConfig>(&text).map_err(|error| {
            anyhow!(CodedError::input(
                "INVALID_CONFIG",
                format!("failed to parse config yaml in {}: {error}", path.display()),
            ))
        })?
    };
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(config)
}

fn invalid(message: impl Into<String>) -> anyhow::Error {
    anyhow!(CodedError::input("INVALID_CONFIG", message))
}
