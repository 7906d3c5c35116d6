//! Consultation records and the id-keyed record set.
//!
//! Records are the legally-retained artifact of a consultation: created once at
//! save time, never mutated afterwards. Sync only ever adds records it has not
//! seen (union-by-id, local preferred), so two devices can both write without
//! either losing history.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{CounselingMethod, PurchaseStatus};
use super::product::Product;
use super::survey::SurveyData;

/// Legal retention period for consultation records. Enforcement (actual purge)
/// belongs to an external retention job; this crate only exposes the policy.
pub const RETENTION_YEARS: u32 = 3;

/// One saved consultation. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationRecord {
    pub id: Uuid,
    /// Set once at save time.
    pub date: DateTime<Utc>,
    pub survey: SurveyData,
    /// Snapshot of the engine's recommended-item descriptions.
    pub recommended_product_names: Vec<String>,
    /// Deep copies of the selected products, not catalog references.
    /// Catalog edits and deletions never retroactively alter history.
    pub selected_products: Vec<Product>,
    /// Sum of the snapshot prices at save time, in won.
    pub total_price: u32,
    pub purchase_status: PurchaseStatus,
    pub counseling_method: CounselingMethod,
    #[serde(default)]
    pub dispensing_days: Option<u32>,
}

impl ConsultationRecord {
    /// Create a record at save time: fresh id, current timestamp, and deep
    /// copies of the selected products (copy-on-save).
    pub fn new(
        survey: SurveyData,
        recommended_product_names: Vec<String>,
        selected: &[Product],
        purchase_status: PurchaseStatus,
        counseling_method: CounselingMethod,
        dispensing_days: Option<u32>,
    ) -> Self {
        let total_price = selected.iter().map(|p| p.price).sum();
        Self {
            id: Uuid::new_v4(),
            date: Utc::now(),
            survey,
            recommended_product_names,
            selected_products: selected.to_vec(),
            total_price,
            purchase_status,
            counseling_method,
            dispensing_days,
        }
    }

    /// When the retention obligation for this record ends.
    pub fn retention_expires_at(&self) -> DateTime<Utc> {
        self.date + Months::new(12 * RETENTION_YEARS)
    }
}

/// Id-keyed collection of consultation records.
///
/// Invariants: no duplicate ids; iteration order is `date` descending
/// (newest first), with the id as a deterministic tie-break.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet {
    records: Vec<ConsultationRecord>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an arbitrary list: later duplicates of an id are dropped.
    pub fn from_records(records: Vec<ConsultationRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            set.insert(record);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.records.iter().any(|r| r.id == *id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&ConsultationRecord> {
        self.records.iter().find(|r| r.id == *id)
    }

    /// Records in canonical order (date descending).
    pub fn iter(&self) -> impl Iterator<Item = &ConsultationRecord> {
        self.records.iter()
    }

    pub fn to_vec(&self) -> Vec<ConsultationRecord> {
        self.records.clone()
    }

    /// Insert a new record. Returns `false` (and leaves the set unchanged)
    /// if a record with the same id is already present.
    pub fn insert(&mut self, record: ConsultationRecord) -> bool {
        if self.contains(&record.id) {
            return false;
        }
        self.records.push(record);
        self.sort();
        true
    }

    /// Additive merge of inbound records: union-by-id, prefer-local.
    ///
    /// Records whose id is already present locally are never overwritten —
    /// local is authoritative for anything it has, which prevents a stale
    /// server snapshot from clobbering fresh local writes. Returns how many
    /// inbound records were actually added.
    pub fn merge_remote(&mut self, inbound: Vec<ConsultationRecord>) -> usize {
        let mut added = 0;
        for record in inbound {
            if !self.contains(&record.id) {
                self.records.push(record);
                added += 1;
            }
        }
        if added > 0 {
            self.sort();
        }
        added
    }

    fn sort(&mut self) {
        self.records
            .sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
    }
}
