//! Vitrine cart persistence: one durable local record holding the whole
//! cart as a JSON-encoded entry sequence, keyed by a fixed namespace
//! string. Keep code tiny and predictable.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use tracing::warn;
use vitrine_core::CartEntry;

/// Namespace key for the persisted cart record.
pub const CART_KEY: &str = "vitrine_cart";

/// Cart contract: `load` reads the persisted sequence, `append` adds one
/// entry and persists the full updated sequence, returning its new length.
///
/// Append-only by design: no merge-by-size, no quantity editing. Repeated
/// adds of the same product+size keep appending fresh `qty: 1` lines
/// (flagged for product-owner review, preserved as observed). Backends
/// follow a read-then-write-whole-record pattern, so concurrent writers
/// race last-writer-wins; accepted limitation, not fixed here.
pub trait CartStore {
    fn load(&self) -> Result<Vec<CartEntry>>;
    fn append(&self, entry: CartEntry) -> Result<usize>;
}

/// Decode a persisted record value. A missing, corrupt, or foreign value
/// is an empty cart, never an error.
pub fn decode_record(value: Option<&str>) -> Vec<CartEntry> {
    let Some(raw) = value else { return Vec::new() };
    match serde_json::from_str::<Vec<CartEntry>>(raw) {
        Ok(entries) => entries,
        Err(e) => {
            counter!("cart_corrupt_record_total", 1u64);
            warn!(error = %e, "cart record unreadable; treating cart as empty");
            Vec::new()
        }
    }
}

fn encode_record(entries: &[CartEntry]) -> Result<String> {
    serde_json::to_string(entries).context("encoding cart record")
}

/// SQLite-backed store. Simple, synchronous; the cart path is not latency
/// sensitive. The whole cart lives in a single kv row to mirror the
/// single-record shape of the page's local storage.
pub struct SqliteStore {
    db: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    pub fn open_default() -> Result<Self> {
        let path = std::env::var("VITRINE_DB_PATH").unwrap_or_else(|_| default_db_path());
        Self::open(&path)
    }

    pub fn open(path: &str) -> Result<Self> {
        let started = std::time::Instant::now();
        let db = rusqlite::Connection::open(path)
            .with_context(|| format!("opening sqlite db at {}", path))?;
        db.pragma_update(None, "journal_mode", "WAL").ok();
        db.pragma_update(None, "synchronous", "NORMAL").ok();
        db.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("creating kv table")?;
        let me = Self { db: std::sync::Mutex::new(db) };
        histogram!("persist_open_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(me)
    }

    fn read_record(db: &rusqlite::Connection) -> Result<Option<String>> {
        let mut stmt = db.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query([CART_KEY])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }
}

impl CartStore for SqliteStore {
    fn load(&self) -> Result<Vec<CartEntry>> {
        let started = std::time::Instant::now();
        let db = self.db.lock().unwrap();
        let record = Self::read_record(&db)?;
        histogram!("persist_get_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(decode_record(record.as_deref()))
    }

    fn append(&self, entry: CartEntry) -> Result<usize> {
        let started = std::time::Instant::now();
        let db = self.db.lock().unwrap();
        let mut entries = decode_record(Self::read_record(&db)?.as_deref());
        entries.push(entry);
        db.execute(
            "INSERT INTO kv(key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (CART_KEY, encode_record(&entries)?),
        )?;
        histogram!("persist_put_ms", started.elapsed().as_secs_f64() * 1000.0);
        counter!("cart_append_total", 1u64);
        Ok(entries.len())
    }
}

/// In-memory store over the same whole-string record shape. Used by tests
/// and embedders that do not want durability.
#[derive(Default)]
pub struct MemStore {
    record: std::sync::Mutex<Option<String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with a raw record value, corrupt or otherwise.
    pub fn with_record(raw: impl Into<String>) -> Self {
        Self { record: std::sync::Mutex::new(Some(raw.into())) }
    }

    pub fn raw_record(&self) -> Option<String> {
        self.record.lock().unwrap().clone()
    }
}

impl CartStore for MemStore {
    fn load(&self) -> Result<Vec<CartEntry>> {
        let record = self.record.lock().unwrap();
        Ok(decode_record(record.as_deref()))
    }

    fn append(&self, entry: CartEntry) -> Result<usize> {
        let mut record = self.record.lock().unwrap();
        let mut entries = decode_record(record.as_deref());
        entries.push(entry);
        *record = Some(encode_record(&entries)?);
        counter!("cart_append_total", 1u64);
        Ok(entries.len())
    }
}

fn default_db_path() -> String {
    if let Some(home) = std::env::var_os("HOME") {
        let mut p = std::path::PathBuf::from(home);
        p.push(".vitrine");
        let _ = std::fs::create_dir_all(&p);
        p.push("vitrine.db");
        return p.to_string_lossy().to_string();
    }
    // Fallback to current directory
    "vitrine.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::ProductId;

    fn temp_db() -> String {
        let dir = std::env::temp_dir();
        let f = format!(
            "vitrine-test-{}.db",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );
        dir.join(f).to_string_lossy().to_string()
    }

    #[test]
    fn missing_record_is_empty_cart() {
        let s = SqliteStore::open(&temp_db()).unwrap();
        assert!(s.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_record_is_empty_cart_not_an_error() {
        let s = MemStore::with_record("not json");
        assert!(s.load().unwrap().is_empty());
        let s = MemStore::with_record(r#"{"some": "foreign data"}"#);
        assert!(s.load().unwrap().is_empty());
    }

    #[test]
    fn append_from_empty_persists_single_qty_one_entry() {
        let s = MemStore::new();
        let n = s.append(CartEntry::single(ProductId::from(2u64), "L")).unwrap();
        assert_eq!(n, 1);
        let raw = s.raw_record().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!([{"id": "2", "size": "L", "qty": 1}]));
    }

    #[test]
    fn repeated_same_product_and_size_appends_not_merges() {
        let s = MemStore::new();
        s.append(CartEntry::single(ProductId::from(2u64), "L")).unwrap();
        let n = s.append(CartEntry::single(ProductId::from(2u64), "L")).unwrap();
        assert_eq!(n, 2);
        let entries = s.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], entries[1]);
        assert_eq!(entries[0].quantity, 1);
    }

    #[test]
    fn sqlite_record_survives_reopen() {
        let path = temp_db();
        {
            let s = SqliteStore::open(&path).unwrap();
            s.append(CartEntry::single(ProductId::from("a1"), "M")).unwrap();
            s.append(CartEntry::single(ProductId::from("a2"), "S")).unwrap();
        }
        let s = SqliteStore::open(&path).unwrap();
        let entries = s.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].product_id, ProductId::from("a1"));
        assert_eq!(entries[1].size, "S");
    }

    #[test]
    fn sqlite_append_recovers_corrupt_record() {
        let path = temp_db();
        let s = SqliteStore::open(&path).unwrap();
        {
            let db = s.db.lock().unwrap();
            db.execute("INSERT INTO kv(key, value) VALUES (?1, ?2)", (CART_KEY, "not json"))
                .unwrap();
        }
        // Corrupt content is treated as empty; append starts a fresh cart.
        let n = s.append(CartEntry::single(ProductId::from(5u64), "M")).unwrap();
        assert_eq!(n, 1);
        assert_eq!(s.load().unwrap().len(), 1);
    }
}
