use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::config::GalleryConfig;
use crate::error_codes::CodedError;

/// One CSV record keyed by lowercased header name.
pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetDescriptor {
    pub source: String,
    pub width: String,
    pub height: String,
    pub name: String,
    pub size: String,
    pub state_machine: String,
    pub artboard: String,
    pub trigger: String,
    pub duration: String,
    pub loop_mode: String,
    pub background: String,
    pub inputs: Vec<String>,
}

impl AssetDescriptor {
    /// Source filename without its extension, used for page and preview names.
    pub fn stem(&self) -> &str {
        match self.source.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.source,
        }
    }

    fn extension(&self) -> Option<&str> {
        match self.source.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// File name of the optional preview variant, e.g. `foo_preview.riv`.
    pub fn preview_source(&self, suffix: &str) -> String {
        match self.extension() {
            Some(ext) => format!("{}{}.{}", self.stem(), suffix, ext),
            None => format!("{}{}", self.stem(), suffix),
        }
    }

    pub fn detail_page_name(&self) -> String {
        format!("{}.html", self.stem())
    }

    pub fn thumbnail_dimensions(&self, target_width: u32) -> (String, String) {
        scaled_dimensions(&self.width, &self.height, target_width)
    }
}

pub fn normalize_row(row: &RawRow, config: &GalleryConfig) -> AssetDescriptor {
    let field = |key: &str| -> String {
        row.get(key)
            .map(|value| value.trim().to_owned())
            .unwrap_or_default()
    };

    let source = field("src");
    let name = match field("name") {
        explicit if !explicit.is_empty() => explicit,
        _ => display_name_from_source(&source),
    };
    let state_machine = match field("state_machine") {
        blank if blank.is_empty() => config.default_state_machine.clone(),
        value => value,
    };
    let inputs = (1..=config.input_columns)
        .map(|column| field(&format!("input{column}")))
        .collect();

    AssetDescriptor {
        width: field("width"),
        height: field("height"),
        name,
        size: field("size"),
        state_machine,
        artboard: field("artboard"),
        trigger: field("trigger"),
        duration: field("duration"),
        loop_mode: field("loop"),
        background: field("background"),
        inputs,
        source,
    }
}

/// `sleeplake_v3.riv` becomes `sleeplake`; separators read as spaces.
pub fn display_name_from_source(source: &str) -> String {
    static VERSION_SUFFIX: OnceLock<Regex> = OnceLock::new();
    let pattern = VERSION_SUFFIX
        .get_or_init(|| Regex::new(r"(?i)[_\-. ]v\d+$").expect("version suffix regex"));

    let stem = match source.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => source,
    };
    let stripped = pattern.replace(stem, "");
    stripped
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scales a width/height pair so the width equals `target`. Widths already
/// at the target and pairs that do not parse are returned unchanged.
pub fn scaled_dimensions(width: &str, height: &str, target: u32) -> (String, String) {
    let unchanged = || (width.to_owned(), height.to_owned());
    let (Ok(w), Ok(h)) = (width.trim().parse::<u32>(), height.trim().parse::<u32>()) else {
        return unchanged();
    };
    if w == target || w == 0 {
        return unchanged();
    }
    let scaled_height = (f64::from(h) * f64::from(target) / f64::from(w)).round() as u64;
    (target.to_string(), scaled_height.to_string())
}

pub fn load_table(path: &Path, config: &GalleryConfig) -> Result<Vec<AssetDescriptor>> {
    if !path.exists() {
        return Err(anyhow!(CodedError::input(
            "TABLE_NOT_FOUND",
            format!("source table {} does not exist", path.display()),
        )));
    }
    let file =
        File::open(path).with_context(|| format!("failed to open table {}", path.display()))?;
    let rows = read_rows(file).with_context(|| format!("failed to read table {}", path.display()))?;
    Ok(normalize_rows(rows, config))
}

pub fn read_rows<R: std::io::Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = reader
        .headers()
        .context("failed to read header row")?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').to_ascii_lowercase())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("malformed record {}", index + 2))?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.to_owned()))
            .collect::<RawRow>();
        rows.push(row);
    }
    Ok(rows)
}

/// Applies row order, normalizes, and drops rows that would break the
/// one-page-per-source invariant.
pub fn normalize_rows(rows: Vec<RawRow>, config: &GalleryConfig) -> Vec<AssetDescriptor> {
    let mut ordered = rows;
    if config.newest_first {
        ordered.reverse();
    }

    let mut seen = HashSet::new();
    let mut pages = HashMap::new();
    let mut assets = Vec::with_capacity(ordered.len());
    for row in &ordered {
        let asset = normalize_row(row, config);
        if asset.source.is_empty() {
            tracing::warn!("skipping row without a source filename");
            continue;
        }
        if !seen.insert(asset.source.clone()) {
            tracing::warn!("skipping duplicate row for '{}'", asset.source);
            continue;
        }
        // Page names are compared case-insensitively so they stay distinct
        // on case-insensitive filesystems too.
        let page = asset.detail_page_name().to_lowercase();
        if let Some(owner) = pages.get(&page) {
            tracing::warn!(
                "skipping '{}': its detail page {} is already taken by '{}'",
                asset.source,
                asset.detail_page_name(),
                owner
            );
            continue;
        }
        pages.insert(page, asset.source.clone());
        assets.push(asset);
    }
    assets
}
