//! Shared application state — the single owner of the local store.
//!
//! `PharmacyState` holds the open database connection plus in-memory copies
//! of the record set and the product catalog. Every mutation writes through
//! to the local store immediately, matching the original deployment where
//! each key is rewritten on every change. Wrapped in `Arc` at startup so the
//! UI collaborator, the sync client and the poll scheduler share one instance.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::config::PharmacyConfig;
use crate::db::{self, repository, StoreError};
use crate::models::{ConsultationRecord, Product, RecordSet};
use crate::sync::RemotePayload;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,

    #[error("Duplicate record id: {0}")]
    DuplicateRecord(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct PharmacyState {
    conn: Mutex<Connection>,
    records: Mutex<RecordSet>,
    catalog: Mutex<Vec<Product>>,
}

impl PharmacyState {
    /// Open the local store at `path` and load all persisted keys.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        Self::from_connection(db::open_database(path)?)
    }

    /// In-memory state for tests.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        Self::from_connection(db::open_memory_database()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CoreError> {
        let records = repository::load_records(&conn)?;
        let catalog = repository::load_catalog(&conn)?;
        tracing::info!(
            records = records.len(),
            products = catalog.len(),
            "Local store loaded"
        );
        Ok(Self {
            conn: Mutex::new(conn),
            records: Mutex::new(records),
            catalog: Mutex::new(catalog),
        })
    }

    // ── Read path ───────────────────────────────────────────

    /// Snapshot of the record set, newest first.
    pub fn records(&self) -> Result<RecordSet, CoreError> {
        Ok(self.records.lock().map_err(|_| CoreError::LockPoisoned)?.clone())
    }

    /// Snapshot of the product catalog.
    pub fn catalog(&self) -> Result<Vec<Product>, CoreError> {
        Ok(self.catalog.lock().map_err(|_| CoreError::LockPoisoned)?.clone())
    }

    /// Resolve an engine-emitted product id against the catalog.
    /// A missing id is not an error — the slot simply stays unselected.
    pub fn product(&self, id: &str) -> Result<Option<Product>, CoreError> {
        let catalog = self.catalog.lock().map_err(|_| CoreError::LockPoisoned)?;
        Ok(catalog.iter().find(|p| p.id == id).cloned())
    }

    pub fn sync_code(&self) -> Result<Option<String>, CoreError> {
        let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
        Ok(repository::load_sync_code(&conn)?)
    }

    pub fn pharmacy_config(&self) -> Result<Option<PharmacyConfig>, CoreError> {
        let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
        Ok(repository::load_pharmacy_config(&conn)?)
    }

    // ── Write-through mutations ─────────────────────────────

    /// Save a finished consultation. The caller should follow up with a
    /// best-effort `SyncClient::push` of the new snapshots.
    pub fn add_record(&self, record: ConsultationRecord) -> Result<(), CoreError> {
        let mut records = self.records.lock().map_err(|_| CoreError::LockPoisoned)?;
        let id = record.id;
        if !records.insert(record) {
            return Err(CoreError::DuplicateRecord(id));
        }
        let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
        repository::save_records(&conn, &records)?;
        Ok(())
    }

    /// Replace the catalog wholesale (admin edit or inbound sync).
    pub fn replace_catalog(&self, products: Vec<Product>) -> Result<(), CoreError> {
        let mut catalog = self.catalog.lock().map_err(|_| CoreError::LockPoisoned)?;
        *catalog = products;
        let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
        repository::save_catalog(&conn, &catalog)?;
        Ok(())
    }

    pub fn set_sync_code(&self, code: &str) -> Result<(), CoreError> {
        let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
        repository::save_sync_code(&conn, code)?;
        Ok(())
    }

    pub fn set_pharmacy_config(&self, config: &PharmacyConfig) -> Result<(), CoreError> {
        let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
        repository::save_pharmacy_config(&conn, config)?;
        Ok(())
    }

    // ── Sync ingestion ──────────────────────────────────────

    /// Apply a pulled remote payload: additive record merge (prefer local),
    /// last-write-wins catalog replacement when `products` is non-empty.
    /// Persists both keys. Returns `(records_added, catalog_replaced)`.
    pub fn apply_remote(&self, payload: RemotePayload) -> Result<(usize, bool), CoreError> {
        let added = {
            let mut records = self.records.lock().map_err(|_| CoreError::LockPoisoned)?;
            let added = records.merge_remote(payload.records);
            let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
            repository::save_records(&conn, &records)?;
            added
        };

        let catalog_replaced = !payload.products.is_empty();
        if catalog_replaced {
            let mut catalog = self.catalog.lock().map_err(|_| CoreError::LockPoisoned)?;
            *catalog = payload.products;
            let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
            repository::save_catalog(&conn, &catalog)?;
        }

        Ok((added, catalog_replaced))
    }
}
