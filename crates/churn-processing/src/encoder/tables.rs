//! The categorical code tables.
//!
//! Every path that turns a raw categorical value into a number goes
//! through the enums in this module. The discriminant of each variant
//! *is* its code, so there is exactly one place where a code is defined.

use crate::error::{ProcessingError, Result};
use crate::types::FEATURE_NAMES;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A closed enumeration with a fixed integer code per variant.
pub trait CodeTable: Copy + Sized + 'static {
    /// The categorical field this table encodes.
    const FIELD: CategoricalField;

    /// All variants in code order.
    const ALL: &'static [Self];

    /// The exact raw string for this variant (case-sensitive).
    fn as_str(self) -> &'static str;

    /// The integer code for this variant.
    fn code(self) -> u8;

    /// Parse a raw value, failing for anything outside the table.
    fn parse(raw: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|variant| variant.as_str() == raw)
            .ok_or_else(|| ProcessingError::InvalidCategory {
                field: Self::FIELD.column_name().to_string(),
                value: raw.to_string(),
            })
    }
}

/// The three categorical fields of a customer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoricalField {
    Gender,
    SubscriptionType,
    ContractLength,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 3] = [
        CategoricalField::Gender,
        CategoricalField::SubscriptionType,
        CategoricalField::ContractLength,
    ];

    /// Dataset column name for this field.
    pub fn column_name(self) -> &'static str {
        match self {
            CategoricalField::Gender => "Gender",
            CategoricalField::SubscriptionType => "Subscription Type",
            CategoricalField::ContractLength => "Contract Length",
        }
    }

    /// Accepted raw values, in code order.
    pub fn values(self) -> Vec<&'static str> {
        match self {
            CategoricalField::Gender => Gender::ALL.iter().map(|v| v.as_str()).collect(),
            CategoricalField::SubscriptionType => {
                SubscriptionType::ALL.iter().map(|v| v.as_str()).collect()
            }
            CategoricalField::ContractLength => {
                ContractLength::ALL.iter().map(|v| v.as_str()).collect()
            }
        }
    }

    /// Look up the code of a raw value in this field's table.
    pub fn code_of(self, raw: &str) -> Result<u8> {
        match self {
            CategoricalField::Gender => Gender::parse(raw).map(Gender::code),
            CategoricalField::SubscriptionType => {
                SubscriptionType::parse(raw).map(SubscriptionType::code)
            }
            CategoricalField::ContractLength => ContractLength::parse(raw).map(ContractLength::code),
        }
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for CategoricalField {
    type Err = ProcessingError;

    /// Accepts both the snake_case field name and the dataset column name.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gender" | "Gender" => Ok(CategoricalField::Gender),
            "subscription_type" | "Subscription Type" => Ok(CategoricalField::SubscriptionType),
            "contract_length" | "Contract Length" => Ok(CategoricalField::ContractLength),
            other => Err(ProcessingError::UnknownField(other.to_string())),
        }
    }
}

/// Customer gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Gender {
    Male = 0,
    Female = 1,
}

impl CodeTable for Gender {
    const FIELD: CategoricalField = CategoricalField::Gender;
    const ALL: &'static [Self] = &[Gender::Male, Gender::Female];

    fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    fn code(self) -> u8 {
        self as u8
    }
}

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SubscriptionType {
    Basic = 0,
    Standard = 1,
    Premium = 2,
}

impl CodeTable for SubscriptionType {
    const FIELD: CategoricalField = CategoricalField::SubscriptionType;
    const ALL: &'static [Self] = &[
        SubscriptionType::Basic,
        SubscriptionType::Standard,
        SubscriptionType::Premium,
    ];

    fn as_str(self) -> &'static str {
        match self {
            SubscriptionType::Basic => "Basic",
            SubscriptionType::Standard => "Standard",
            SubscriptionType::Premium => "Premium",
        }
    }

    fn code(self) -> u8 {
        self as u8
    }
}

/// Contract length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContractLength {
    Monthly = 0,
    Quarterly = 1,
    Annual = 2,
}

impl CodeTable for ContractLength {
    const FIELD: CategoricalField = CategoricalField::ContractLength;
    const ALL: &'static [Self] = &[
        ContractLength::Monthly,
        ContractLength::Quarterly,
        ContractLength::Annual,
    ];

    fn as_str(self) -> &'static str {
        match self {
            ContractLength::Monthly => "Monthly",
            ContractLength::Quarterly => "Quarterly",
            ContractLength::Annual => "Annual",
        }
    }

    fn code(self) -> u8 {
        self as u8
    }
}

macro_rules! impl_display_from_str {
    ($($ty:ty),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl FromStr for $ty {
                type Err = ProcessingError;

                fn from_str(s: &str) -> Result<Self> {
                    <$ty as CodeTable>::parse(s)
                }
            }
        )+
    };
}

impl_display_from_str!(Gender, SubscriptionType, ContractLength);

/// One `(field, value, code)` row of the flattened code tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub field: String,
    pub value: String,
    pub code: u8,
}

/// Snapshot of the feature order and every code table.
///
/// A trained model stores the schema it was fitted with; comparing it to
/// [`EncodingSchema::current()`] at load time detects any drift between
/// the training-side and serving-side encoders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingSchema {
    /// Feature names in encoded-vector order.
    pub feature_names: Vec<String>,

    /// Flattened code tables.
    pub entries: Vec<CodeEntry>,
}

impl EncodingSchema {
    /// The schema implemented by this build.
    pub fn current() -> Self {
        let mut entries = Vec::new();
        for field in CategoricalField::ALL {
            for value in field.values() {
                // Values come from the table itself, so the lookup cannot miss.
                if let Ok(code) = field.code_of(value) {
                    entries.push(CodeEntry {
                        field: field.column_name().to_string(),
                        value: value.to_string(),
                        code,
                    });
                }
            }
        }

        Self {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            entries,
        }
    }

    /// Describe every difference between `self` and `other`.
    ///
    /// Returns an empty list when the schemas agree.
    pub fn differences(&self, other: &EncodingSchema) -> Vec<String> {
        let mut diffs = Vec::new();

        if self.feature_names != other.feature_names {
            diffs.push(format!(
                "feature order {:?} != {:?}",
                self.feature_names, other.feature_names
            ));
        }

        for entry in &self.entries {
            match other
                .entries
                .iter()
                .find(|e| e.field == entry.field && e.value == entry.value)
            {
                Some(found) if found.code != entry.code => diffs.push(format!(
                    "{} '{}' encodes to {} vs {}",
                    entry.field, entry.value, entry.code, found.code
                )),
                Some(_) => {}
                None => diffs.push(format!("{} '{}' missing", entry.field, entry.value)),
            }
        }

        for entry in &other.entries {
            if !self
                .entries
                .iter()
                .any(|e| e.field == entry.field && e.value == entry.value)
            {
                diffs.push(format!("{} '{}' unexpected", entry.field, entry.value));
            }
        }

        diffs
    }
}
