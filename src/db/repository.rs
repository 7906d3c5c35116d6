//! Key/value repository over the opaque local blob store.
//!
//! Mirrors the original deployment's storage model: four independent keys,
//! each holding one JSON blob, read at startup and rewritten on every
//! mutation. Missing keys fall back to empty defaults.

use rusqlite::{params, Connection, OptionalExtension};

use super::StoreError;
use crate::config::PharmacyConfig;
use crate::models::{Product, RecordSet};

pub const KEY_PRODUCTS: &str = "products";
pub const KEY_RECORDS: &str = "records";
pub const KEY_SYNC_CODE: &str = "sync_code";
pub const KEY_PHARMACY_CONFIG: &str = "pharmacy_config";

fn kv_get(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
    let value = conn
        .query_row(
            "SELECT value FROM app_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

fn kv_set(conn: &Connection, key: &str, value: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO app_kv (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

// ═══════════════════════════════════════════
// Records
// ═══════════════════════════════════════════

pub fn load_records(conn: &Connection) -> Result<RecordSet, StoreError> {
    match kv_get(conn, KEY_RECORDS)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(RecordSet::new()),
    }
}

pub fn save_records(conn: &Connection, records: &RecordSet) -> Result<(), StoreError> {
    kv_set(conn, KEY_RECORDS, &serde_json::to_string(records)?)
}

// ═══════════════════════════════════════════
// Product catalog
// ═══════════════════════════════════════════

pub fn load_catalog(conn: &Connection) -> Result<Vec<Product>, StoreError> {
    match kv_get(conn, KEY_PRODUCTS)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

pub fn save_catalog(conn: &Connection, products: &[Product]) -> Result<(), StoreError> {
    kv_set(conn, KEY_PRODUCTS, &serde_json::to_string(products)?)
}

// ═══════════════════════════════════════════
// Sync code
// ═══════════════════════════════════════════

pub fn load_sync_code(conn: &Connection) -> Result<Option<String>, StoreError> {
    kv_get(conn, KEY_SYNC_CODE)
}

pub fn save_sync_code(conn: &Connection, code: &str) -> Result<(), StoreError> {
    kv_set(conn, KEY_SYNC_CODE, code)
}

// ═══════════════════════════════════════════
// Pharmacy configuration
// ═══════════════════════════════════════════

pub fn load_pharmacy_config(conn: &Connection) -> Result<Option<PharmacyConfig>, StoreError> {
    match kv_get(conn, KEY_PHARMACY_CONFIG)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub fn save_pharmacy_config(
    conn: &Connection,
    config: &PharmacyConfig,
) -> Result<(), StoreError> {
    kv_set(conn, KEY_PHARMACY_CONFIG, &serde_json::to_string(config)?)
}
