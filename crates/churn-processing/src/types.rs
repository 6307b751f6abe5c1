//! Common types for the churn data contract.
//!
//! - [`CustomerRecord`]: raw input, as read from the dataset or a form
//! - [`Customer`]: a validated record with typed categorical values
//! - [`EncodedFeatureVector`]: the fixed-order numeric classifier input
//! - [`ChurnLabel`]: the binary outcome

use crate::encoder::{CodeTable, ContractLength, Gender, SubscriptionType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Number of features the classifier consumes.
pub const FEATURE_COUNT: usize = 10;

/// Feature names in encoded-vector order (dataset column names).
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Age",
    "Gender",
    "Tenure",
    "Usage Frequency",
    "Support Calls",
    "Payment Delay",
    "Subscription Type",
    "Contract Length",
    "Total Spend",
    "Last Interaction",
];

/// Identifier column, present in the dataset but never a feature.
pub const CUSTOMER_ID_COLUMN: &str = "CustomerID";

/// Label column.
pub const CHURN_COLUMN: &str = "Churn";

/// Every column of the dataset file, in file order.
pub const DATASET_COLUMNS: [&str; FEATURE_COUNT + 2] = [
    CUSTOMER_ID_COLUMN,
    "Age",
    "Gender",
    "Tenure",
    "Usage Frequency",
    "Support Calls",
    "Payment Delay",
    "Subscription Type",
    "Contract Length",
    "Total Spend",
    "Last Interaction",
    CHURN_COLUMN,
];

/// Binary churn outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChurnLabel {
    /// Label 0: the customer was retained.
    Stayed,
    /// Label 1: the customer left.
    Churned,
}

impl ChurnLabel {
    pub const ALL: [ChurnLabel; 2] = [ChurnLabel::Stayed, ChurnLabel::Churned];

    /// Numeric label as stored in the dataset.
    pub fn code(self) -> u8 {
        match self {
            ChurnLabel::Stayed => 0,
            ChurnLabel::Churned => 1,
        }
    }

    /// Parse a numeric label. Only `0` and `1` are valid.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ChurnLabel::Stayed),
            1 => Some(ChurnLabel::Churned),
            _ => None,
        }
    }

    /// Index into per-class arrays (`[stayed, churned]`).
    pub fn index(self) -> usize {
        self.code() as usize
    }

    /// Short class name used in tables.
    pub fn display_name(self) -> &'static str {
        match self {
            ChurnLabel::Stayed => "Stayed",
            ChurnLabel::Churned => "Churned",
        }
    }

    /// Human-readable restatement of a prediction.
    pub fn outcome_text(self) -> &'static str {
        match self {
            ChurnLabel::Stayed => "Customer is likely to stay.",
            ChurnLabel::Churned => "Customer is likely to churn.",
        }
    }
}

impl fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One customer in raw form.
///
/// Any field may be absent; absence is only an error once the record is
/// validated or encoded. `customer_id` and `churn` are never features.
///
/// # Example
///
/// ```
/// use churn_processing::CustomerRecord;
///
/// let record = CustomerRecord::new()
///     .age(30)
///     .gender("Male")
///     .tenure_months(12)
///     .usage_frequency(10)
///     .support_calls(2)
///     .payment_delay_days(5)
///     .subscription_type("Basic")
///     .contract_length("Monthly")
///     .total_spend(500.0)
///     .last_interaction_days(5);
/// assert_eq!(record.age, Some(30));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub tenure_months: Option<u32>,
    pub usage_frequency: Option<u32>,
    pub support_calls: Option<u32>,
    pub payment_delay_days: Option<u32>,
    pub subscription_type: Option<String>,
    pub contract_length: Option<String>,
    pub total_spend: Option<f64>,
    pub last_interaction_days: Option<u32>,
    pub churn: Option<ChurnLabel>,
}

impl CustomerRecord {
    /// An empty record; fill it with the chained setters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer_id(mut self, id: impl Into<String>) -> Self {
        self.customer_id = Some(id.into());
        self
    }

    pub fn age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn tenure_months(mut self, months: u32) -> Self {
        self.tenure_months = Some(months);
        self
    }

    pub fn usage_frequency(mut self, frequency: u32) -> Self {
        self.usage_frequency = Some(frequency);
        self
    }

    pub fn support_calls(mut self, calls: u32) -> Self {
        self.support_calls = Some(calls);
        self
    }

    pub fn payment_delay_days(mut self, days: u32) -> Self {
        self.payment_delay_days = Some(days);
        self
    }

    pub fn subscription_type(mut self, subscription: impl Into<String>) -> Self {
        self.subscription_type = Some(subscription.into());
        self
    }

    pub fn contract_length(mut self, contract: impl Into<String>) -> Self {
        self.contract_length = Some(contract.into());
        self
    }

    pub fn total_spend(mut self, spend: f64) -> Self {
        self.total_spend = Some(spend);
        self
    }

    pub fn last_interaction_days(mut self, days: u32) -> Self {
        self.last_interaction_days = Some(days);
        self
    }

    pub fn churn(mut self, label: ChurnLabel) -> Self {
        self.churn = Some(label);
        self
    }
}

/// A validated customer: every feature present, categoricals parsed.
///
/// Produced by [`validate_record`](crate::encoder::validate_record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: Option<String>,
    pub age: u32,
    pub gender: Gender,
    pub tenure_months: u32,
    pub usage_frequency: u32,
    pub support_calls: u32,
    pub payment_delay_days: u32,
    pub subscription_type: SubscriptionType,
    pub contract_length: ContractLength,
    pub total_spend: f64,
    pub last_interaction_days: u32,
}

impl Customer {
    /// Map to the fixed-order feature vector.
    pub fn encode(&self) -> EncodedFeatureVector {
        EncodedFeatureVector([
            f64::from(self.age),
            f64::from(self.gender.code()),
            f64::from(self.tenure_months),
            f64::from(self.usage_frequency),
            f64::from(self.support_calls),
            f64::from(self.payment_delay_days),
            f64::from(self.subscription_type.code()),
            f64::from(self.contract_length.code()),
            self.total_spend,
            f64::from(self.last_interaction_days),
        ])
    }
}

/// Fixed-order numeric classifier input.
///
/// Order matches [`FEATURE_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodedFeatureVector([f64; FEATURE_COUNT]);

impl EncodedFeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl From<[f64; FEATURE_COUNT]> for EncodedFeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

impl Index<usize> for EncodedFeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}
