//! Vitrine catalog store: one-shot load of the product catalog into an
//! in-RAM snapshot readers can share cheaply.

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};
use vitrine_core::{Catalog, Product};

/// Where the catalog resource lives. Anything that is not an http(s) URL
/// is treated as a filesystem path.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    Url(String),
    Path(PathBuf),
}

impl CatalogSource {
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            CatalogSource::Url(s.to_string())
        } else {
            CatalogSource::Path(PathBuf::from(s))
        }
    }
}

impl std::fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogSource::Url(u) => f.write_str(u),
            CatalogSource::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Holds the session's catalog. Starts empty; populated at most once per
/// page load by `load`. Readers take `Arc` snapshots and never observe a
/// partially parsed catalog.
pub struct CatalogStore {
    snap: ArcSwap<Catalog>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self { snap: ArcSwap::from_pointee(Catalog::default()) }
    }

    pub fn current(&self) -> Arc<Catalog> {
        self.snap.load_full()
    }

    /// Parse a raw catalog body and swap it in whole. The store is only
    /// updated after the entire body parses; a malformed body leaves the
    /// previous (usually empty) snapshot in place.
    pub fn ingest_slice(&self, body: &[u8]) -> Result<()> {
        let items: Vec<Product> =
            serde_json::from_slice(body).context("parsing catalog resource")?;
        let count = items.len();
        self.snap.store(Arc::new(Catalog::new(items)));
        metrics::gauge!("catalog_items", count as f64);
        info!(count, "catalog loaded");
        Ok(())
    }

    /// Best-effort one-shot load. On fetch or parse failure the store ends
    /// up empty: the failure is logged and counted, no retry is attempted,
    /// and pages simply render as if zero products exist.
    pub async fn load(&self, source: &CatalogSource) {
        let started = std::time::Instant::now();
        let outcome = match fetch(source).await {
            Ok(body) => self.ingest_slice(&body),
            Err(e) => Err(e),
        };
        metrics::histogram!("catalog_load_ms", started.elapsed().as_secs_f64() * 1000.0);
        if let Err(e) = outcome {
            metrics::counter!("catalog_load_failures_total", 1u64);
            warn!(source = %source, error = ?e, "catalog load failed; continuing with empty catalog");
        }
    }
}

async fn fetch(source: &CatalogSource) -> Result<Vec<u8>> {
    match source {
        CatalogSource::Url(url) => {
            debug!(url = %url, "fetching catalog over http");
            let resp = reqwest::get(url)
                .await
                .with_context(|| format!("fetching catalog from {url}"))?
                .error_for_status()
                .context("catalog fetch returned error status")?;
            Ok(resp.bytes().await.context("reading catalog body")?.to_vec())
        }
        CatalogSource::Path(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("reading catalog file {}", path.display())),
    }
}

/// Filter option lists shown on the listing page. Derived once from the
/// full unfiltered catalog at page-init time and never recomputed as
/// filters are applied, so the lists do not shrink or grow while the user
/// filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub categories: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
}

impl Facets {
    pub fn derive(catalog: &Catalog) -> Self {
        Self {
            categories: distinct(catalog.iter().map(|p| p.category.as_str())),
            sizes: distinct(catalog.iter().flat_map(|p| p.sizes.iter().map(|s| s.as_str()))),
            colors: distinct(catalog.iter().map(|p| p.color.as_str())),
        }
    }
}

// Distinct values in first-occurrence order; empty strings skipped.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut out = Vec::new();
    for v in values {
        if !v.is_empty() && seen.insert(v) {
            out.push(v.to_string());
        }
    }
    out
}

/// Home-grid picks: the first `n` products in catalog order.
pub fn front_picks(catalog: &Catalog, n: usize) -> &[Product] {
    &catalog.items[..catalog.len().min(n)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: &str) -> Vec<u8> {
        json.as_bytes().to_vec()
    }

    const TWO_SHOES: &str = r#"[
        {"id": 1, "name": "A", "category": "shoes", "color": "red",
         "tags": ["running"], "sizes": ["M"], "price": 100,
         "images": ["a.jpg"], "added": "2024-01-01"},
        {"id": 2, "name": "B", "category": "shoes", "color": "blue",
         "sizes": ["L", "M"], "price": 50, "images": ["b.jpg"], "added": "2024-06-01"}
    ]"#;

    #[test]
    fn ingest_populates_snapshot() {
        let store = CatalogStore::new();
        assert!(store.current().is_empty());
        store.ingest_slice(&body(TWO_SHOES)).unwrap();
        let snap = store.current();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.items[0].name, "A");
    }

    #[test]
    fn malformed_body_leaves_store_empty() {
        let store = CatalogStore::new();
        assert!(store.ingest_slice(b"not json").is_err());
        assert!(store.current().is_empty(), "failed parse must not partially populate");
    }

    #[tokio::test]
    async fn load_from_missing_path_degrades_to_empty() {
        let store = CatalogStore::new();
        store.load(&CatalogSource::parse("/no/such/catalog.json")).await;
        assert!(store.current().is_empty());
    }

    #[test]
    fn source_detection() {
        assert!(matches!(CatalogSource::parse("https://x/y.json"), CatalogSource::Url(_)));
        assert!(matches!(CatalogSource::parse("data/products.json"), CatalogSource::Path(_)));
    }

    #[test]
    fn facets_first_occurrence_order_and_dedup() {
        let store = CatalogStore::new();
        store.ingest_slice(&body(TWO_SHOES)).unwrap();
        let f = Facets::derive(&store.current());
        assert_eq!(f.categories, vec!["shoes"]);
        assert_eq!(f.sizes, vec!["M", "L"]);
        assert_eq!(f.colors, vec!["red", "blue"]);
    }

    #[test]
    fn front_picks_truncates_to_catalog_len() {
        let store = CatalogStore::new();
        store.ingest_slice(&body(TWO_SHOES)).unwrap();
        let snap = store.current();
        assert_eq!(front_picks(&snap, 8).len(), 2);
        assert_eq!(front_picks(&snap, 1)[0].name, "A");
    }
}
