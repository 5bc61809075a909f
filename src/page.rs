//! Index and detail page composition around the shared head template.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::config::GalleryConfig;
use crate::controls::build_control_set;
use crate::error_codes::CodedError;
use crate::input_spec::{parse_row_inputs, RowInput};
use crate::markup::{
    escape_html, render_controls, render_instance_script, render_script_prelude, render_viewport,
    Instance, ScriptContext,
};
use crate::pagination::PaginationPlan;
use crate::table::AssetDescriptor;

pub const PAGE_FOOT: &str = "</body>\n</html>\n";

/// Opening and closing fragments shared by every generated page. The head is
/// read from disk once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTemplate {
    pub head: String,
    pub foot: String,
}

impl PageTemplate {
    pub fn new(head: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            foot: String::from(PAGE_FOOT),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!(CodedError::input(
                "TEMPLATE_NOT_FOUND",
                format!("head template {} does not exist", path.display()),
            )));
        }
        let head = fs::read_to_string(path)
            .with_context(|| format!("failed to read head template {}", path.display()))?;
        Ok(Self::new(head))
    }
}

/// Index page for one pagination bucket.
pub fn compose_index_page(
    plan: &PaginationPlan,
    page: usize,
    assets: &[AssetDescriptor],
    template: &PageTemplate,
    config: &GalleryConfig,
) -> String {
    let slice = plan.slice(assets, page);
    let context = ScriptContext {
        images_base: format!("{}/", config.images_dir),
    };

    let mut body = String::from("<div class=\"animation-wrapper\">\n");
    let mut script = String::new();
    for (position, asset) in slice.iter().enumerate() {
        let slot = format!("r{position}");
        let inputs = parse_row_inputs(asset);
        let set = build_control_set(asset, &inputs, &slot, config);
        let instance = Instance {
            slot,
            src: format!("{}/{}", config.assets_dir, asset.source),
            artboard: asset.artboard.clone(),
            state_machine: asset.state_machine.clone(),
        };
        let (width, height) = asset.thumbnail_dimensions(config.thumbnail_width);
        let detail_href = format!("{}/{}", config.pages_dir, asset.detail_page_name());

        body.push_str("  <div class=\"animation-container\">\n");
        body.push_str(&format!("    {}\n", render_viewport(&instance, &width, &height)));
        body.push_str("    <div class=\"description\">\n");
        body.push_str(&format!(
            "      <a href=\"{}\"><b>{}</b></a><br>\n",
            escape_html(&detail_href),
            escape_html(&asset.name)
        ));
        body.push_str(&indent(&render_controls(&set.controls), 6));
        body.push_str("    </div>\n");
        body.push_str("  </div>\n");

        script.push_str(&render_instance_script(&instance, &set, &context));
    }
    body.push_str("</div>\n");

    let mut out = String::with_capacity(template.head.len() + body.len() + script.len() + 512);
    out.push_str(&template.head);
    out.push_str(&body);
    out.push_str(&plan.render_navigation(page, config));
    push_script(&mut out, &script);
    out.push_str(&template.foot);
    out
}

/// Detail page for one asset. With a preview variant the page shows both
/// animations side by side, each with its own independent controls.
pub fn compose_detail_page(
    asset: &AssetDescriptor,
    has_preview: bool,
    back_href: &str,
    template: &PageTemplate,
    config: &GalleryConfig,
) -> String {
    let inputs = parse_row_inputs(asset);
    let context = ScriptContext {
        images_base: format!("../{}/", config.images_dir),
    };

    let mut viewports = vec![(String::from("Current"), asset.source.clone())];
    if has_preview {
        viewports.push((
            String::from("Preview"),
            asset.preview_source(&config.preview_suffix),
        ));
    }

    let mut body = String::from("<div class=\"detail\">\n");
    body.push_str(&format!(
        "  <a class=\"back\" href=\"{}\">&larr; Gallery</a>\n",
        escape_html(back_href)
    ));
    body.push_str(&format!("  <h1>{}</h1>\n", escape_html(&asset.name)));
    body.push_str("  <div class=\"viewports\">\n");

    let mut script = String::new();
    for (position, (label, source)) in viewports.iter().enumerate() {
        let slot = format!("r{position}");
        let set = build_control_set(asset, &inputs, &slot, config);
        let instance = Instance {
            slot,
            src: format!("../{}/{}", config.assets_dir, source),
            artboard: asset.artboard.clone(),
            state_machine: asset.state_machine.clone(),
        };

        body.push_str("    <div class=\"viewport\">\n");
        if has_preview {
            body.push_str(&format!(
                "      <div class=\"viewport-label\">{}</div>\n",
                escape_html(label)
            ));
        }
        body.push_str(&format!(
            "      {}\n",
            render_viewport(&instance, &asset.width, &asset.height)
        ));
        body.push_str(&indent(&render_controls(&set.controls), 6));
        body.push_str("    </div>\n");

        script.push_str(&render_instance_script(&instance, &set, &context));
    }
    body.push_str("  </div>\n");
    body.push_str("  <div class=\"description\">\n");
    body.push_str(&indent(&render_description(asset, &inputs), 4));
    body.push_str("  </div>\n");
    body.push_str("</div>\n");

    let mut out = String::with_capacity(template.head.len() + body.len() + script.len() + 512);
    out.push_str(&template.head);
    out.push_str(&body);
    push_script(&mut out, &script);
    out.push_str(&template.foot);
    out
}

/// Metadata block; absent fields are left out.
pub fn render_description(asset: &AssetDescriptor, inputs: &[RowInput]) -> String {
    let mut lines = vec![format!("<b>{}</b><br>", escape_html(&asset.name))];
    let mut field = |label: &str, value: &str, suffix: &str| {
        if !value.is_empty() {
            lines.push(format!(
                "{label}: {}{suffix}<br>",
                escape_html(value)
            ));
        }
    };
    field("File", &asset.source, "");
    field("Size", &asset.size, "");
    field("State Machine", &asset.state_machine, "");
    field("Artboard", &asset.artboard, "");
    field("Trigger", &asset.trigger, "");
    field("Duration", &asset.duration, "s");
    field("Loop", &asset.loop_mode, "");
    field("Background", &asset.background, "");

    if !inputs.is_empty() {
        lines.push(String::from("Inputs:<ul class=\"inputs\">"));
        for input in inputs {
            lines.push(format!(
                "  <li><code>{}</code></li>",
                escape_html(&input.spec.to_source())
            ));
        }
        lines.push(String::from("</ul>"));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn push_script(out: &mut String, script: &str) {
    if script.is_empty() {
        return;
    }
    out.push_str("<script>\n");
    out.push_str(&render_script_prelude());
    out.push_str(script);
    out.push_str("</script>\n");
}

fn indent(block: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    block
        .lines()
        .map(|line| format!("{pad}{line}\n"))
        .collect()
}
