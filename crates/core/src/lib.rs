//! Vitrine core types: the catalog data model shared by every crate.

#![forbid(unsafe_code)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Opaque, stable product identifier, unique within a catalog (uniqueness
/// assumed, not enforced). Catalog resources in the wild carry ids as bare
/// integers or strings; both deserialize to the same normalized form so
/// cart records written against either kind re-read cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "IdRepr", into = "String")]
pub struct ProductId(String);

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Num(u64),
    Text(String),
}

impl From<IdRepr> for ProductId {
    fn from(v: IdRepr) -> Self {
        match v {
            IdRepr::Num(n) => ProductId(n.to_string()),
            IdRepr::Text(s) => ProductId(s),
        }
    }
}

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for ProductId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// One catalog record. Immutable once loaded.
///
/// Invariant: `sizes` and `images` are non-empty; the first image is the
/// default display image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub color: String,
    /// Subcategory/marketing tags; may be empty.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Available size labels, in display order.
    pub sizes: SmallVec<[String; 4]>,
    /// Minor-unit-free currency amount.
    pub price: u64,
    pub images: SmallVec<[String; 2]>,
    #[serde(default)]
    pub description: String,
    /// Used only for the recency sort.
    pub added: NaiveDate,
}

impl Product {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// The immutable product list for a session, in resource order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub items: Vec<Product>,
}

impl Catalog {
    pub fn new(items: Vec<Product>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.items.iter().find(|p| &p.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Product> {
        self.items.iter()
    }
}

/// One line of the persisted cart. Wire shape is `{"id", "size", "qty"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub size: String,
    #[serde(rename = "qty")]
    pub quantity: u32,
}

impl CartEntry {
    /// A fresh add-to-cart line. Quantity is always 1; repeated adds of the
    /// same product+size append new lines rather than merging.
    pub fn single(product_id: ProductId, size: impl Into<String>) -> Self {
        Self { product_id, size: size.into(), quantity: 1 }
    }
}

/// Listing sort order. `Popular` means catalog order, no reordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Popular,
    PriceAsc,
    PriceDesc,
    New,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Popular => "popular",
            SortOrder::PriceAsc => "price-asc",
            SortOrder::PriceDesc => "price-desc",
            SortOrder::New => "new",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown sort order: {0}")]
pub struct UnknownSortOrder(String);

impl std::str::FromStr for SortOrder {
    type Err = UnknownSortOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popular" => Ok(SortOrder::Popular),
            "price-asc" => Ok(SortOrder::PriceAsc),
            "price-desc" => Ok(SortOrder::PriceDesc),
            "new" => Ok(SortOrder::New),
            other => Err(UnknownSortOrder(other.to_string())),
        }
    }
}

pub mod prelude {
    pub use super::{CartEntry, Catalog, Product, ProductId, SortOrder};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_accepts_numbers_and_strings() {
        let a: ProductId = serde_json::from_str("7").unwrap();
        let b: ProductId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "7");
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"7\"");
    }

    #[test]
    fn product_parses_catalog_record() {
        let raw = r#"{
            "id": 1,
            "name": "Trail Runner",
            "category": "shoes",
            "color": "red",
            "tags": ["running", "new-in"],
            "sizes": ["M", "L"],
            "price": 45000,
            "images": ["img/trail-1.jpg", "img/trail-2.jpg"],
            "description": "Lightweight trail shoe.",
            "added": "2024-01-15"
        }"#;
        let p: Product = serde_json::from_str(raw).unwrap();
        assert_eq!(p.id, ProductId::from(1u64));
        assert_eq!(p.sizes.to_vec(), vec!["M".to_string(), "L".to_string()]);
        assert!(p.has_tag("running"));
        assert_eq!(p.added, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn tags_and_description_default_when_absent() {
        let raw = r#"{
            "id": "x1",
            "name": "Plain Tee",
            "category": "tops",
            "color": "white",
            "sizes": ["S"],
            "price": 900,
            "images": ["img/tee.jpg"],
            "added": "2023-11-02"
        }"#;
        let p: Product = serde_json::from_str(raw).unwrap();
        assert!(p.tags.is_empty());
        assert!(p.description.is_empty());
    }

    #[test]
    fn cart_entry_wire_shape() {
        let e = CartEntry::single(ProductId::from(2u64), "L");
        let js = serde_json::to_value(&e).unwrap();
        assert_eq!(js, serde_json::json!({"id": "2", "size": "L", "qty": 1}));
        let back: CartEntry = serde_json::from_value(js).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn sort_order_wire_names() {
        assert_eq!("price-asc".parse::<SortOrder>().unwrap(), SortOrder::PriceAsc);
        assert_eq!(serde_json::to_string(&SortOrder::New).unwrap(), "\"new\"");
        assert!("best".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::default(), SortOrder::Popular);
    }

    #[test]
    fn catalog_lookup_by_id() {
        let raw = r#"[
            {"id": 1, "name": "A", "category": "shoes", "color": "red",
             "sizes": ["M"], "price": 100, "images": ["a.jpg"], "added": "2024-01-01"},
            {"id": 2, "name": "B", "category": "shoes", "color": "blue",
             "sizes": ["L"], "price": 50, "images": ["b.jpg"], "added": "2024-06-01"}
        ]"#;
        let items: Vec<Product> = serde_json::from_str(raw).unwrap();
        let cat = Catalog::new(items);
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.get(&ProductId::from(2u64)).unwrap().name, "B");
        assert!(cat.get(&ProductId::from("9")).is_none());
    }
}
