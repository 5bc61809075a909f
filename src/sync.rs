use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub source: Option<PathBuf>,
    pub destination: PathBuf,
    pub cutoff: String,
    pub copied: Vec<String>,
    pub stale: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}

/// Copies files with `extension` modified within `max_age` of `now` from
/// `source` into `destination`. A missing source is reported, not an error.
pub fn sync_assets(
    source: Option<&Path>,
    destination: &Path,
    max_age: Duration,
    extension: &str,
    now: DateTime<Local>,
) -> Result<SyncReport> {
    let cutoff = now - max_age;
    let mut report = SyncReport {
        source: source.map(Path::to_path_buf),
        destination: destination.to_path_buf(),
        cutoff: cutoff.to_rfc3339(),
        copied: Vec::new(),
        stale: 0,
        skipped_reason: None,
    };

    let Some(source) = source else {
        tracing::warn!("no asset source configured, skipping sync");
        report.skipped_reason = Some(String::from("no source directory configured"));
        return Ok(report);
    };
    if !source.is_dir() {
        tracing::warn!("asset source {} not found, skipping sync", source.display());
        report.skipped_reason = Some(format!(
            "source directory {} not found",
            source.display()
        ));
        return Ok(report);
    }

    let mut entries = fs::read_dir(source)
        .with_context(|| format!("failed to list asset source {}", source.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to list asset source {}", source.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if !path.is_file() || !has_extension(&path, extension) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .with_context(|| format!("failed to read modification time of {}", path.display()))?;
        let modified = DateTime::<Local>::from(modified);
        if modified < cutoff {
            report.stale += 1;
            continue;
        }

        fs::create_dir_all(destination).with_context(|| {
            format!("failed to create asset directory {}", destination.display())
        })?;
        let file_name = entry.file_name();
        let target = destination.join(&file_name);
        fs::copy(&path, &target).with_context(|| {
            format!("failed to copy {} to {}", path.display(), target.display())
        })?;
        tracing::info!(
            "copied {} (modified {})",
            path.display(),
            modified.format("%Y-%m-%d %H:%M")
        );
        report.copied.push(file_name.to_string_lossy().to_string());
    }

    Ok(report)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .map(|value| value.eq_ignore_ascii_case(extension.trim_start_matches('.')))
        .unwrap_or(false)
}
