use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::StorageRequirement;

/// One labeled ingredient of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientInfo {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

/// A catalog product. Records embed full denormalized copies of this type,
/// never references, so admin edits and deletions never alter history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Unit price in won. Non-negative by construction.
    pub price: u32,
    #[serde(default)]
    pub ingredients: Vec<IngredientInfo>,
    pub is_active: bool,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    pub storage: StorageRequirement,
    #[serde(default)]
    pub pill_type: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
}
