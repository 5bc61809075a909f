use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::GalleryConfig;
use crate::controls::{build_control_set, ControlSet};
use crate::input_spec::{parse_row_inputs, RowInput};
use crate::page::{compose_detail_page, compose_index_page, PageTemplate};
use crate::pagination::PaginationPlan;
use crate::table::{load_table, AssetDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateSummary {
    pub index_pages: Vec<PathBuf>,
    pub detail_pages: Vec<PathBuf>,
    pub previews: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub table: PathBuf,
    pub page_count: usize,
    pub assets: Vec<AssetCheck>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetCheck {
    pub page: usize,
    pub has_preview: bool,
    pub asset: AssetDescriptor,
    pub inputs: Vec<RowInput>,
    pub controls: ControlSet,
}

/// Reads the table and head template once, then writes every index page and
/// every detail page. The first write failure aborts the run.
pub fn generate_site(root: &Path, config: &GalleryConfig) -> Result<GenerateSummary> {
    let template = PageTemplate::load(&config.head_template_path(root))?;
    let assets = load_table(&config.table_path(root), config)?;
    let plan = PaginationPlan::new(assets.len(), config.page_size);
    tracing::info!(
        "generating {} asset(s) across {} page(s)",
        assets.len(),
        plan.page_count()
    );
    if assets.is_empty() {
        tracing::warn!("table {} has no usable rows", config.table.display());
    }

    let mut summary = GenerateSummary {
        index_pages: Vec::with_capacity(plan.page_count()),
        detail_pages: Vec::with_capacity(assets.len()),
        previews: 0,
    };

    for page in 0..plan.page_count() {
        let path = root.join(PaginationPlan::file_name(page, config));
        let html = compose_index_page(&plan, page, &assets, &template, config);
        write_page(&path, &html)?;
        summary.index_pages.push(path);
    }

    let pages_dir = config.pages_path(root);
    if !assets.is_empty() {
        fs::create_dir_all(&pages_dir)
            .with_context(|| format!("failed to create pages directory {}", pages_dir.display()))?;
    }
    let assets_dir = config.assets_path(root);
    for (index, asset) in assets.iter().enumerate() {
        let has_preview = preview_exists(&assets_dir, asset, config);
        if has_preview {
            summary.previews += 1;
        }
        let back_href = format!("../{}", back_page_file(&plan, index, config));
        let html = compose_detail_page(asset, has_preview, &back_href, &template, config);
        let path = pages_dir.join(asset.detail_page_name());
        write_page(&path, &html)?;
        summary.detail_pages.push(path);
    }

    Ok(summary)
}

/// Dry pass over the table: what each row parses to and where it lands.
pub fn check_site(root: &Path, config: &GalleryConfig) -> Result<CheckReport> {
    let table = config.table_path(root);
    let assets = load_table(&table, config)?;
    let plan = PaginationPlan::new(assets.len(), config.page_size);
    let assets_dir = config.assets_path(root);

    let checks = assets
        .into_iter()
        .enumerate()
        .map(|(index, asset)| {
            let inputs = parse_row_inputs(&asset);
            let controls = build_control_set(&asset, &inputs, "r0", config);
            AssetCheck {
                page: plan.page_of(index).unwrap_or(0),
                has_preview: preview_exists(&assets_dir, &asset, config),
                asset,
                inputs,
                controls,
            }
        })
        .collect();

    Ok(CheckReport {
        table,
        page_count: plan.page_count(),
        assets: checks,
    })
}

pub fn preview_exists(assets_dir: &Path, asset: &AssetDescriptor, config: &GalleryConfig) -> bool {
    assets_dir
        .join(asset.preview_source(&config.preview_suffix))
        .is_file()
}

fn back_page_file(plan: &PaginationPlan, index: usize, config: &GalleryConfig) -> String {
    PaginationPlan::file_name(plan.page_of(index).unwrap_or(0), config)
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    fs::write(path, html).with_context(|| format!("failed to write page {}", path.display()))?;
    tracing::debug!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_site(dir: &Path, rows: &str) {
        fs::write(dir.join("head.html"), "<html><head></head><body>\n").expect("head");
        fs::write(
            dir.join("videos.csv"),
            format!(
                "src,width,height,size,state_machine,artboard,trigger,duration,loop,background,input1,input2\n{rows}"
            ),
        )
        .expect("table");
    }

    #[test]
    fn writes_index_and_detail_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_site(
            dir.path(),
            "c.riv,400,100,1kb,,,Go,2,loop,dark,Speed,\n\
             b.riv,200,200,1kb,,,,2,loop,dark,,\n\
             a.riv,200,200,1kb,,,,2,loop,dark,,\n",
        );
        fs::create_dir_all(dir.path().join("riv")).expect("riv dir");
        fs::write(dir.path().join("riv/a_preview.riv"), b"riv").expect("preview");

        let config = GalleryConfig {
            page_size: 2,
            ..GalleryConfig::default()
        };
        let summary = generate_site(dir.path(), &config).expect("generate");
        assert_eq!(summary.index_pages.len(), 2);
        assert_eq!(summary.detail_pages.len(), 3);
        assert_eq!(summary.previews, 1);

        let index = fs::read_to_string(dir.path().join("index.html")).expect("index");
        let first_a = index.find("riv/a.riv").expect("a on first page");
        let first_b = index.find("riv/b.riv").expect("b on first page");
        assert!(first_a < first_b, "table order is reversed");

        let page1 = fs::read_to_string(dir.path().join("page1.html")).expect("page1");
        assert!(page1.contains("riv/c.riv"));

        let detail = fs::read_to_string(dir.path().join("pages/c.html")).expect("detail");
        assert!(detail.contains("href=\"../page1.html\""));
        let preview = fs::read_to_string(dir.path().join("pages/a.html")).expect("detail");
        assert_eq!(preview.matches("<canvas").count(), 2);
    }

    #[test]
    fn detail_pages_are_never_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_site(
            dir.path(),
            "lamp.riv,200,200,1kb,,,Old,2,loop,dark,,\n\
             lamp.RIV,200,200,1kb,,,New,2,loop,dark,,\n",
        );
        let summary = generate_site(dir.path(), &GalleryConfig::default()).expect("generate");
        assert_eq!(summary.detail_pages.len(), 1);

        let unique = summary
            .detail_pages
            .iter()
            .collect::<std::collections::HashSet<_>>();
        assert_eq!(unique.len(), summary.detail_pages.len());

        let detail = fs::read_to_string(dir.path().join("pages/lamp.html")).expect("detail");
        assert!(detail.contains("src: \"../riv/lamp.RIV\""));
        let index = fs::read_to_string(dir.path().join("index.html")).expect("index");
        assert_eq!(index.matches("href=\"pages/lamp.html\"").count(), 1);
    }

    #[test]
    fn missing_template_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("videos.csv"), "src\na.riv\n").expect("table");
        let error = generate_site(dir.path(), &GalleryConfig::default()).expect_err("no head");
        assert!(error.to_string().contains("TEMPLATE_NOT_FOUND"));
        assert!(!dir.path().join("index.html").exists());
    }

    #[test]
    fn empty_table_produces_no_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_site(dir.path(), "");
        let summary = generate_site(dir.path(), &GalleryConfig::default()).expect("generate");
        assert!(summary.index_pages.is_empty());
        assert!(summary.detail_pages.is_empty());
        assert!(!dir.path().join("index.html").exists());
    }

    #[test]
    fn check_reports_parsed_inputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_site(dir.path(), "a.riv,200,200,1kb,,,,2,loop,dark,col:Tint,list:Bars[num:Height]\n");
        let report = check_site(dir.path(), &GalleryConfig::default()).expect("check");
        assert_eq!(report.page_count, 1);
        assert_eq!(report.assets.len(), 1);
        assert_eq!(report.assets[0].inputs.len(), 2);
        assert_eq!(report.assets[0].controls.controls.len(), 1);
        assert_eq!(report.assets[0].asset.state_machine, "State Machine 1");
    }
}
