//! Vitrine query engine: filter state for the listing page and the pure
//! filtering/sorting pass over a catalog snapshot.
//!
//! Filtering is conjunctive across dimensions and disjunctive within one
//! (all active dimensions must pass; any selected value within a dimension
//! matches). Sorting is always a stable reorder of the surviving set.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use tracing::debug;
use url::Url;
use vitrine_core::{Catalog, Product, SortOrder};

/// Default suggestion count on the detail page.
pub const SUGGEST_LIMIT: usize = 4;

/// The user's current listing-page selections. One instance per listing
/// view; the hosting UI layer owns it and threads it through event
/// handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub category: Option<String>,
    /// Matched against product tags, not a true hierarchy.
    pub sub: Option<String>,
    pub sizes: BTreeSet<String>,
    pub colors: BTreeSet<String>,
    /// Inclusive price bounds. No `min <= max` invariant: inverted bounds
    /// are legal and simply yield an empty result.
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub sort: SortOrder,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `category` and `sub` from a page address. Absence of a
    /// parameter means unset; an empty value is treated the same way.
    /// This is the only entry point that seeds filter state from outside
    /// user interaction.
    pub fn from_page_url(page_url: &str) -> Result<Self> {
        let url = Url::parse(page_url).context("parsing page url")?;
        let mut state = Self::default();
        for (k, v) in url.query_pairs() {
            match k.as_ref() {
                "category" if !v.is_empty() => state.category = Some(v.into_owned()),
                "sub" if !v.is_empty() => state.sub = Some(v.into_owned()),
                _ => {}
            }
        }
        Ok(state)
    }

    /// Changing the category invalidates any inherited subcategory
    /// constraint, so `sub` is always cleared here.
    pub fn set_category(&mut self, category: Option<String>) {
        self.category = category.filter(|c| !c.is_empty());
        self.sub = None;
    }

    pub fn set_sub(&mut self, sub: Option<String>) {
        self.sub = sub.filter(|s| !s.is_empty());
    }

    /// Returns whether the size is selected after the toggle.
    pub fn toggle_size(&mut self, size: &str) -> bool {
        if !self.sizes.remove(size) {
            self.sizes.insert(size.to_string());
            return true;
        }
        false
    }

    /// Returns whether the color is selected after the toggle.
    pub fn toggle_color(&mut self, color: &str) -> bool {
        if !self.colors.remove(color) {
            self.colors.insert(color.to_string());
            return true;
        }
        false
    }

    pub fn set_price_bounds(&mut self, min: Option<u64>, max: Option<u64>) {
        self.min = min;
        self.max = max;
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    pub fn is_unfiltered(&self) -> bool {
        self.category.is_none()
            && self.sub.is_none()
            && self.sizes.is_empty()
            && self.colors.is_empty()
            && self.min.is_none()
            && self.max.is_none()
    }
}

/// Run the full filter+sort pass. Pure and deterministic for fixed
/// inputs; an empty catalog or zero matches is an empty result, never an
/// error.
pub fn run<'a>(catalog: &'a Catalog, filters: &FilterState) -> Vec<&'a Product> {
    let started = std::time::Instant::now();
    let total = catalog.len();
    let mut rows: Vec<&Product> = catalog.iter().collect();

    if let Some(sub) = filters.sub.as_deref() {
        rows.retain(|p| p.has_tag(sub));
    }
    // Dual match: a category filter also catches products tagged with the
    // category name.
    if let Some(cat) = filters.category.as_deref() {
        rows.retain(|p| p.category == cat || p.has_tag(cat));
    }
    if !filters.sizes.is_empty() {
        rows.retain(|p| p.sizes.iter().any(|s| filters.sizes.contains(s.as_str())));
    }
    if !filters.colors.is_empty() {
        rows.retain(|p| filters.colors.contains(p.color.as_str()));
    }
    if let Some(min) = filters.min {
        rows.retain(|p| p.price >= min);
    }
    if let Some(max) = filters.max {
        rows.retain(|p| p.price <= max);
    }

    // Vec::sort_by is stable: equal keys keep catalog order.
    match filters.sort {
        SortOrder::Popular => {}
        SortOrder::PriceAsc => rows.sort_by(|a, b| a.price.cmp(&b.price)),
        SortOrder::PriceDesc => rows.sort_by(|a, b| b.price.cmp(&a.price)),
        SortOrder::New => rows.sort_by(|a, b| b.added.cmp(&a.added)),
    }

    metrics::histogram!("query_eval_ms", started.elapsed().as_secs_f64() * 1000.0);
    debug!(total, kept = rows.len(), sort = %filters.sort, "query evaluated");
    rows
}

/// Related items for the detail page: catalog members other than the
/// viewed product matching on category or color, in catalog order, up to
/// `limit`. No randomization, no ranking.
pub fn suggest<'a>(catalog: &'a Catalog, product: &Product, limit: usize) -> Vec<&'a Product> {
    catalog
        .iter()
        .filter(|x| x.id != product.id && (x.category == product.category || x.color == product.color))
        .take(limit)
        .collect()
}
