//! Vitrine public façade.
//!
//! This crate defines the types frontends depend on: the error taxonomy
//! and the two per-view sessions (listing page, detail page). The hosting
//! UI layer owns one session per page view and threads it through event
//! handlers; there is no process-wide singleton.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use vitrine_core::{CartEntry, Catalog, Product, ProductId, SortOrder};
pub use vitrine_persist::CartStore;
pub use vitrine_query::{suggest, FilterState, SUGGEST_LIMIT};

/// User-visible errors. Catalog load failures and corrupt cart records
/// are recovered locally (degrade to empty, logged) and never reach this
/// enum; nothing here is fatal to the process.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
pub enum VitrineError {
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("load: {0}")]
    Load(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type VitrineResult<T> = Result<T, VitrineError>;

/// One listing-page view: owns the filter state and re-runs the full
/// query on every change.
#[derive(Debug, Clone, Default)]
pub struct PlpSession {
    filters: FilterState,
}

impl PlpSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bootstrap from the page address (`category` and `sub` query
    /// parameters). An unparsable address falls back to default filters;
    /// the page stays usable.
    pub fn from_page_url(page_url: &str) -> Self {
        let filters = match FilterState::from_page_url(page_url) {
            Ok(f) => f,
            Err(e) => {
                warn!(page_url, error = ?e, "bad page url; starting with default filters");
                FilterState::default()
            }
        };
        debug!(category = ?filters.category, sub = ?filters.sub, "listing session started");
        Self { filters }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.filters.set_category(category);
    }

    pub fn set_sub(&mut self, sub: Option<String>) {
        self.filters.set_sub(sub);
    }

    pub fn toggle_size(&mut self, size: &str) -> bool {
        self.filters.toggle_size(size)
    }

    pub fn toggle_color(&mut self, color: &str) -> bool {
        self.filters.toggle_color(color)
    }

    pub fn set_price_bounds(&mut self, min: Option<u64>, max: Option<u64>) {
        self.filters.set_price_bounds(min, max);
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.filters.set_sort(sort);
    }

    /// The ordered rows for the grid plus the "N items" count.
    pub fn results<'a>(&self, catalog: &'a Catalog) -> (Vec<&'a Product>, usize) {
        let rows = vitrine_query::run(catalog, &self.filters);
        let count = rows.len();
        (rows, count)
    }

    /// Page heading: the capitalized category, or "Shop" when browsing
    /// everything.
    pub fn title(&self) -> String {
        match self.filters.category.as_deref() {
            Some(c) => capitalize(c),
            None => "Shop".to_string(),
        }
    }
}

/// Size choice on a detail page. Starts unset on every product view and
/// only moves forward; the sole way back to `NoSizeSelected` is opening a
/// new session for another product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeSelection {
    #[default]
    NoSizeSelected,
    SizeSelected(String),
}

/// One detail-page view: the viewed product and its size selection.
#[derive(Debug, Clone)]
pub struct PdpSession {
    product: Product,
    selection: SizeSelection,
}

impl PdpSession {
    /// Look the product up by id. A missing id is a `NotFound` surfaced
    /// inline by the renderer; the page remains usable.
    pub fn open(catalog: &Catalog, id: &ProductId) -> VitrineResult<Self> {
        let product = catalog
            .get(id)
            .cloned()
            .ok_or_else(|| VitrineError::NotFound(format!("product {id}")))?;
        debug!(id = %product.id, "detail session started");
        Ok(Self { product, selection: SizeSelection::NoSizeSelected })
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn selection(&self) -> &SizeSelection {
        &self.selection
    }

    pub fn selected_size(&self) -> Option<&str> {
        match &self.selection {
            SizeSelection::NoSizeSelected => None,
            SizeSelection::SizeSelected(s) => Some(s),
        }
    }

    /// Pick a size. The label must be one of the viewed product's sizes.
    pub fn select_size(&mut self, size: &str) -> VitrineResult<()> {
        if !self.product.sizes.iter().any(|s| s == size) {
            return Err(VitrineError::Validation(format!(
                "size {size} not available for product {}",
                self.product.id
            )));
        }
        self.selection = SizeSelection::SizeSelected(size.to_string());
        Ok(())
    }

    /// Append one entry for the selected size and report the new cart
    /// length. With no size selected this is a `Validation` error and the
    /// cart is untouched; the user may retry after selecting a size.
    pub fn add_to_cart(&self, cart: &dyn CartStore) -> VitrineResult<usize> {
        let size = self
            .selected_size()
            .ok_or_else(|| VitrineError::Validation("please select a size".to_string()))?;
        cart.append(CartEntry::single(self.product.id.clone(), size))
            .map_err(|e| VitrineError::Internal(e.to_string()))
    }

    /// "You might also like" rows: up to four related products.
    pub fn suggestions<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Product> {
        suggest(catalog, &self.product, SUGGEST_LIMIT)
    }
}

/// Display-casing for category and color labels at the renderer boundary.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
