//! Categorical encoding.
//!
//! Two entry points share the tables in [`tables`]:
//!
//! - [`encode_record`] turns one [`CustomerRecord`] into an
//!   [`EncodedFeatureVector`] (used for training, batch scoring and the
//!   single-record prediction).
//! - [`encode_frame`] rewrites the categorical columns of a whole
//!   [`DataFrame`] in place (used for dataset statistics).
//!
//! Both are pure: the same input always produces the same output.

mod tables;

pub use tables::{
    CategoricalField, CodeEntry, CodeTable, ContractLength, EncodingSchema, Gender,
    SubscriptionType,
};

use crate::error::{ProcessingError, Result, ResultExt};
use crate::types::{Customer, CustomerRecord, EncodedFeatureVector};
use polars::prelude::*;

/// Encode a single raw categorical value.
///
/// # Errors
///
/// Returns [`ProcessingError::InvalidCategory`] for a value outside the
/// field's table.
///
/// # Example
///
/// ```
/// use churn_processing::encoder::{encode_categorical, CategoricalField};
///
/// assert_eq!(encode_categorical(CategoricalField::Gender, "Female").unwrap(), 1);
/// assert!(encode_categorical(CategoricalField::SubscriptionType, "Gold").is_err());
/// ```
pub fn encode_categorical(field: CategoricalField, raw_value: &str) -> Result<u8> {
    field.code_of(raw_value)
}

/// Encode a raw value for a field given by name (`"gender"` or `"Gender"`).
pub fn encode_categorical_by_name(field_name: &str, raw_value: &str) -> Result<u8> {
    let field: CategoricalField = field_name.parse()?;
    encode_categorical(field, raw_value)
}

fn required<T: Clone>(value: &Option<T>, field: &str) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| ProcessingError::MissingField(field.to_string()))
}

fn categorical<T: CodeTable>(value: &Option<String>) -> Result<T> {
    let raw = value
        .as_deref()
        .ok_or_else(|| ProcessingError::MissingField(T::FIELD.column_name().to_string()))?;
    T::parse(raw)
}

/// Total spend must be a finite, non-negative amount.
fn spend(value: &Option<f64>) -> Result<f64> {
    let amount = required(value, "Total Spend")?;
    if !(amount.is_finite() && amount >= 0.0) {
        return Err(ProcessingError::InvalidField {
            field: "Total Spend".to_string(),
            reason: format!("expected a non-negative amount, got {}", amount),
        });
    }
    Ok(amount)
}

/// Validate a raw record.
///
/// Fields are checked in feature order and the first problem is reported.
///
/// # Errors
///
/// - [`ProcessingError::MissingField`] if a feature is absent
/// - [`ProcessingError::InvalidCategory`] if a categorical value is unknown
/// - [`ProcessingError::InvalidField`] for a negative or non-finite spend
pub fn validate_record(record: &CustomerRecord) -> Result<Customer> {
    Ok(Customer {
        customer_id: record.customer_id.clone(),
        age: required(&record.age, "Age")?,
        gender: categorical(&record.gender)?,
        tenure_months: required(&record.tenure_months, "Tenure")?,
        usage_frequency: required(&record.usage_frequency, "Usage Frequency")?,
        support_calls: required(&record.support_calls, "Support Calls")?,
        payment_delay_days: required(&record.payment_delay_days, "Payment Delay")?,
        subscription_type: categorical(&record.subscription_type)?,
        contract_length: categorical(&record.contract_length)?,
        total_spend: spend(&record.total_spend)?,
        last_interaction_days: required(&record.last_interaction_days, "Last Interaction")?,
    })
}

/// Encode a raw record into the classifier's feature vector.
///
/// # Errors
///
/// - [`ProcessingError::MissingField`] if a feature is absent
/// - [`ProcessingError::InvalidCategory`] if a categorical value is unknown
/// - [`ProcessingError::InvalidField`] for a negative or non-finite spend
pub fn encode_record(record: &CustomerRecord) -> Result<EncodedFeatureVector> {
    validate_record(record).map(|customer| customer.encode())
}

/// Replace the three categorical columns of `frame` with their codes.
///
/// All other columns are left untouched. Codes are written as `UInt32`.
///
/// # Errors
///
/// - [`ProcessingError::ColumnNotFound`] if a categorical column is absent
/// - [`ProcessingError::MissingField`] for a null cell
/// - [`ProcessingError::InvalidCategory`] for an unknown value
pub fn encode_frame(frame: &DataFrame) -> Result<DataFrame> {
    let mut encoded = frame.clone();

    for field in CategoricalField::ALL {
        let name = field.column_name();
        let column = frame
            .column(name)
            .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))?;
        let strings = column
            .as_materialized_series()
            .cast(&DataType::String)
            .context(format!("Casting column '{}' to String", name))?;

        let mut codes: Vec<u32> = Vec::with_capacity(strings.len());
        for (row, value) in strings.str()?.into_iter().enumerate() {
            let raw = value.ok_or_else(|| {
                ProcessingError::MissingField(name.to_string()).with_context(format!("Row {}", row))
            })?;
            let code = encode_categorical(field, raw).context(format!("Row {}", row))?;
            codes.push(u32::from(code));
        }

        encoded.replace(name, Series::new(name.into(), codes))?;
    }

    Ok(encoded)
}
