use serde::{Deserialize, Serialize};

use super::enums::{HbLevel, Stage, Symptom, VitaminDLevel};

/// Nutrient classes the customer already takes, as reported in the survey.
///
/// The boolean flags come from explicit survey questions; `other` carries
/// free-text supplement names produced by the intake photo recognition step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSupplements {
    pub folic_acid: bool,
    pub vitamin_d: bool,
    pub iron: bool,
    pub omega3: bool,
    pub cal_mag: bool,
    #[serde(default)]
    pub other: Vec<String>,
}

/// Customer intake survey. Immutable once submitted; the record embeds a copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyData {
    pub customer_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub stage: Stage,
    pub vitamin_d_level: VitaminDLevel,
    pub hb_level: HbLevel,
    #[serde(default)]
    pub symptoms: Vec<Symptom>,
    pub is_over_35: bool,
    #[serde(default)]
    pub current_supplements: CurrentSupplements,
}
