//! Recommendation rule engine — survey in, recommended bundle out.
//!
//! `recommend` is a pure function of the survey: no I/O, no randomness, no
//! catalog access. It emits abstract product ids that the caller resolves
//! against its live catalog; an id missing from the catalog simply yields no
//! pre-selection, never an error. Rule precedence is fixed: one stage branch,
//! then the cross-cutting symptom rules.

use serde::Serialize;

use crate::models::{Stage, SurveyData, Symptom, VitaminDLevel};

/// Abstract product ids understood by the caller's catalog.
pub mod product_ids {
    pub const FOLIC_ACID_620: &str = "folic-acid-620";
    pub const FOLIC_ACID_800: &str = "folic-acid-800";
    pub const VITAMIN_D_1000: &str = "vitamin-d-1000";
    pub const VITAMIN_D_2000: &str = "vitamin-d-2000";
    pub const COQ10: &str = "coq10";
    pub const VITAMIN_C: &str = "vitamin-c";
    /// Omega-3 1000mg — the preparation-stage (fertility) choice.
    pub const OMEGA3_1000: &str = "omega3-1000";
    /// The standard omega-3 for pregnancy and lactation stages.
    pub const OMEGA3_STANDARD: &str = "omega3-standard";
    pub const IRON: &str = "iron";
    pub const CAL_MAG: &str = "cal-mag";
    pub const FIBER: &str = "fiber";
    pub const MAGNESIUM: &str = "magnesium";
}

const ITEM_FOLIC_620: &str = "활성형 엽산 620mcg";
const ITEM_FOLIC_800: &str = "활성형 엽산 800mcg";
const ITEM_IRON: &str = "철분";
const ITEM_CAL_MAG: &str = "칼슘·마그네슘";
const ITEM_COQ10: &str = "코엔자임Q10";
const ITEM_VITAMIN_C: &str = "비타민C";
const ITEM_FIBER: &str = "식이섬유";
const ITEM_MAGNESIUM: &str = "마그네슘";

const WARNING_INOSITOL: &str =
    "35세 이상 임신 준비: 이노시톨 복용을 권장드립니다. (약국 미취급 제품, 별도 안내 필요)";
const WARNING_ANEMIA: &str =
    "다태아 임신 또는 낮은 헤모글로빈 수치입니다. 철분제는 약사 상담 후 선택해 주세요.";

/// Output of the rule engine.
///
/// `auto_omega_id` is held apart from `auto_ids` because omega-3 is a
/// single-slot choice — the UI guarantees at most one omega-3 product is
/// ever selected, while every other nutrient category may co-occur freely.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    /// Human-readable recommended-nutrient descriptions, in rule order.
    pub items: Vec<String>,
    /// Advisory messages for the pharmacist.
    pub warnings: Vec<String>,
    /// Product ids to pre-select (everything except the omega-3 slot).
    pub auto_ids: Vec<String>,
    /// The single mutually-exclusive omega-3 selection.
    pub auto_omega_id: Option<String>,
}

/// Target vitamin D dose in IU for a lab result.
///
/// Only a `normal` result earns the maintenance dose; deficient, insufficient
/// and *unknown* all escalate to 2000 IU. Treating unknown as deficient is a
/// deliberate clinical-policy choice carried over from the source workflow.
pub fn target_vitamin_d(level: VitaminDLevel) -> u32 {
    match level {
        VitaminDLevel::Normal => 1000,
        _ => 2000,
    }
}

fn vitamin_d_id(dose: u32) -> &'static str {
    if dose >= 2000 {
        product_ids::VITAMIN_D_2000
    } else {
        product_ids::VITAMIN_D_1000
    }
}

fn vitamin_d_item(dose: u32) -> String {
    format!("비타민D {dose}IU")
}

/// Compute the recommended bundle for a submitted survey.
pub fn recommend(survey: &SurveyData) -> RecommendationResult {
    let mut result = RecommendationResult::default();
    let supplements = &survey.current_supplements;
    let dose = target_vitamin_d(survey.vitamin_d_level);

    match survey.stage {
        Stage::Preparation => {
            if !supplements.folic_acid {
                result.auto_ids.push(product_ids::FOLIC_ACID_620.into());
            }
            // The item list documents the target regimen even when the
            // customer is already covered.
            result.items.push(ITEM_FOLIC_620.into());

            if !supplements.vitamin_d {
                result.auto_ids.push(vitamin_d_id(dose).into());
                result.items.push(vitamin_d_item(dose));
            }

            if survey.is_over_35 {
                result.auto_ids.push(product_ids::COQ10.into());
                result.items.push(ITEM_COQ10.into());
                result.auto_ids.push(product_ids::VITAMIN_C.into());
                result.items.push(ITEM_VITAMIN_C.into());
                result.auto_omega_id = Some(product_ids::OMEGA3_1000.into());
                result.warnings.push(WARNING_INOSITOL.into());
            }
        }

        Stage::Early => {
            if !supplements.folic_acid {
                result.auto_ids.push(product_ids::FOLIC_ACID_800.into());
                // The higher dose ships bundled with the folic selection.
                if dose >= 2000 {
                    result.auto_ids.push(product_ids::VITAMIN_D_2000.into());
                }
            } else if !supplements.vitamin_d {
                result.auto_ids.push(vitamin_d_id(dose).into());
            }
            result.items.push(ITEM_FOLIC_800.into());
            result.items.push(vitamin_d_item(dose));

            if !supplements.omega3 {
                result.auto_omega_id = Some(product_ids::OMEGA3_STANDARD.into());
            }
        }

        // Folic acid is never recommended past the early stage.
        Stage::Mid | Stage::Late | Stage::Lactation => {
            let anemia_risk =
                survey.symptoms.contains(&Symptom::Twins) || survey.hb_level.is_anemic();
            if anemia_risk {
                // Iron choice is deferred to the pharmacist.
                result.warnings.push(WARNING_ANEMIA.into());
            } else if !supplements.iron {
                result.auto_ids.push(product_ids::IRON.into());
                result.items.push(ITEM_IRON.into());
            }

            if !supplements.vitamin_d {
                result.auto_ids.push(vitamin_d_id(dose).into());
                result.items.push(vitamin_d_item(dose));
            }

            if !supplements.omega3 {
                result.auto_omega_id = Some(product_ids::OMEGA3_STANDARD.into());
            }

            if matches!(survey.stage, Stage::Late | Stage::Lactation) && !supplements.cal_mag {
                result.auto_ids.push(product_ids::CAL_MAG.into());
                result.items.push(ITEM_CAL_MAG.into());
            }
        }
    }

    // Cross-cutting symptom rules, independent of stage.
    if survey.symptoms.contains(&Symptom::Constipation) {
        result.auto_ids.push(product_ids::FIBER.into());
        result.items.push(ITEM_FIBER.into());
    }
    if survey.symptoms.contains(&Symptom::LegCramps) {
        result.auto_ids.push(product_ids::MAGNESIUM.into());
        result.items.push(ITEM_MAGNESIUM.into());
    }

    result
}
