//! Row normalisation: raw spreadsheet records → [`ProductRecord`].
//!
//! Sheets maintained by hand drift: one owner types `nombre`, the next adds a
//! `Name` column, a third leaves the category blank. Normalisation absorbs
//! all of it so the layout stage only ever sees displayable strings.
//!
//! ## Lookup rule
//!
//! Every field has one or more aliases (`nombre`/`name`, …). For each alias
//! the lowercase key is tried first, then its capitalised variant; the first
//! key that is *present* wins even when its value is blank. Blank values of
//! `name`, `price` and `stock` become [`NOT_AVAILABLE`].
//!
//! ## Category rule
//!
//! Category is resolved with a two-step chain instead: a blank lowercase
//! value falls through to the capitalised column before defaulting to
//! [`UNCATEGORIZED`]. The asymmetry with the other fields is intentional and
//! covered by tests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One input row: column name (case-sensitive) → scalar value.
pub type Record = serde_json::Map<String, Value>;

/// Sentinel for blank name, price and stock cells.
pub const NOT_AVAILABLE: &str = "N/A";

/// Sentinel category for rows without one.
pub const UNCATEGORIZED: &str = "Uncategorized";

const NAME_KEYS: &[&str] = &["nombre", "name"];
const CATEGORY_KEYS: &[&str] = &["categoria", "category"];
const PRICE_KEYS: &[&str] = &["precio", "price"];
const STOCK_KEYS: &[&str] = &["stock"];
const IMAGE_KEYS: &[&str] = &["imagen", "image"];

/// A product row with every field resolved to display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub category: String,
    /// Opaque display text; never parsed as a number.
    pub price: String,
    /// Opaque display text.
    pub stock: String,
    /// Possibly empty, a share link, a direct URL or a `data:` URI.
    pub image_ref: String,
}

/// Normalise a single record. Never fails.
pub fn normalize(record: &Record) -> ProductRecord {
    ProductRecord {
        name: or_not_available(lookup(record, NAME_KEYS)),
        category: resolve_category(record),
        price: or_not_available(lookup(record, PRICE_KEYS)),
        stock: or_not_available(lookup(record, STOCK_KEYS)),
        image_ref: lookup(record, IMAGE_KEYS),
    }
}

/// Normalise every record, preserving order.
pub fn normalize_all(records: &[Record]) -> Vec<ProductRecord> {
    records.iter().map(normalize).collect()
}

/// Single-level fallback: lowercase key, then capitalised key, per alias.
fn lookup(record: &Record, aliases: &[&str]) -> String {
    for alias in aliases {
        if let Some(v) = record.get(*alias) {
            return display(v);
        }
        if let Some(v) = record.get(&capitalize(alias)) {
            return display(v);
        }
    }
    String::new()
}

fn resolve_category(record: &Record) -> String {
    for alias in CATEGORY_KEYS {
        let upper = capitalize(alias);
        if let Some(lower_value) = record.get(*alias) {
            let value = display(lower_value);
            if !is_blank(&value) {
                return value;
            }
            let fallback = record.get(&upper).map(display).unwrap_or_default();
            return or_uncategorized(fallback);
        }
        if let Some(upper_value) = record.get(&upper) {
            return or_uncategorized(display(upper_value));
        }
    }
    UNCATEGORIZED.to_string()
}

/// Render a scalar cell as text. `null` is blank.
fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn or_not_available(s: String) -> String {
    if is_blank(&s) {
        NOT_AVAILABLE.to_string()
    } else {
        s
    }
}

fn or_uncategorized(s: String) -> String {
    if is_blank(&s) {
        UNCATEGORIZED.to_string()
    } else {
        s
    }
}
