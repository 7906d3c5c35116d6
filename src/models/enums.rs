use crate::db::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Stage {
    Preparation => "preparation",
    Early => "early",
    Mid => "mid",
    Late => "late",
    Lactation => "lactation",
});

str_enum!(VitaminDLevel {
    Deficient => "deficient",
    Insufficient => "insufficient",
    Normal => "normal",
    Unknown => "unknown",
});

str_enum!(HbLevel {
    UnderTen => "under_10",
    TenToEleven => "10_to_11",
    ElevenToTwelve => "11_to_12",
    TwelveOrMore => "12_or_more",
});

impl HbLevel {
    /// The two lowest bands gate the anemia rule (iron deferred to the pharmacist).
    pub fn is_anemic(&self) -> bool {
        matches!(self, Self::UnderTen | Self::TenToEleven)
    }
}

str_enum!(Symptom {
    Constipation => "constipation",
    LegCramps => "leg_cramps",
    Twins => "twins",
    Nausea => "nausea",
    Heartburn => "heartburn",
    Edema => "edema",
});

str_enum!(StorageRequirement {
    Ambient => "ambient",
    Refrigerated => "refrigerated",
});

str_enum!(PurchaseStatus {
    Purchased => "purchased",
    Pending => "pending",
    Declined => "declined",
});

str_enum!(CounselingMethod {
    InPerson => "in_person",
    Phone => "phone",
});
