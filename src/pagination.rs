//! Splits the ordered asset list into index pages and renders page navigation.

use std::ops::Range;

use serde::Serialize;

use crate::config::GalleryConfig;
use crate::markup::escape_html;

/// Contiguous fixed-size buckets over the ordered asset list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationPlan {
    pub page_size: usize,
    pub total_items: usize,
    pub ranges: Vec<Range<usize>>,
}

impl PaginationPlan {
    pub fn new(total_items: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let ranges = (0..total_items)
            .step_by(page_size)
            .map(|start| start..(start + page_size).min(total_items))
            .collect();
        Self {
            page_size,
            total_items,
            ranges,
        }
    }

    pub fn page_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn range(&self, page: usize) -> Option<Range<usize>> {
        self.ranges.get(page).cloned()
    }

    pub fn slice<'a, T>(&self, items: &'a [T], page: usize) -> &'a [T] {
        match self.range(page) {
            Some(range) if range.end <= items.len() => &items[range],
            _ => &[],
        }
    }

    pub fn page_of(&self, item_index: usize) -> Option<usize> {
        (item_index < self.total_items).then(|| item_index / self.page_size)
    }

    /// Page 0 is the index file, later pages follow the configured pattern.
    pub fn file_name(page: usize, config: &GalleryConfig) -> String {
        if page == 0 {
            config.index_file.clone()
        } else {
            config.page_file_pattern.replace("{n}", &page.to_string())
        }
    }

    /// Links every page from `current`, which is shown but not linked.
    pub fn render_navigation(&self, current: usize, config: &GalleryConfig) -> String {
        if self.page_count() <= 1 {
            return String::new();
        }
        let mut out = String::from("<nav class=\"pagination\">\n");
        for page in 0..self.page_count() {
            let label = page + 1;
            if page == current {
                out.push_str(&format!("  <span class=\"current\">{label}</span>\n"));
            } else {
                let href = Self::file_name(page, config);
                out.push_str(&format!("  <a href=\"{}\">{label}</a>\n", escape_html(&href)));
            }
        }
        out.push_str("</nav>\n");
        out
    }
}
