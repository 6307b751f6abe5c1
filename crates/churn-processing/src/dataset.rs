//! Loading and encoding of the churn dataset.
//!
//! The dataset is read with polars, checked against the expected columns
//! and turned into raw [`CustomerRecord`]s. Encoding happens separately so
//! the malformed-row policy can be applied per row.

use crate::config::{DatasetConfig, MalformedRowPolicy};
use crate::encoder::encode_record;
use crate::error::{ProcessingError, Result, ResultExt};
use crate::types::{
    CHURN_COLUMN, CUSTOMER_ID_COLUMN, ChurnLabel, CustomerRecord, DATASET_COLUMNS,
    EncodedFeatureVector,
};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// The churn dataset: the frame as loaded plus one raw record per row.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    records: Vec<CustomerRecord>,
}

/// Encoded feature matrix and label vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDataset {
    /// One vector per kept row.
    pub features: Vec<EncodedFeatureVector>,

    /// Label per kept row.
    pub labels: Vec<ChurnLabel>,

    /// Index of each kept row in the source dataset.
    pub source_rows: Vec<usize>,

    /// Rows skipped under [`MalformedRowPolicy::Drop`].
    pub dropped_rows: usize,
}

impl EncodedDataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Count of `[stayed, churned]` labels.
    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for label in &self.labels {
            counts[label.index()] += 1;
        }
        counts
    }
}

impl Dataset {
    /// Load the dataset from a CSV file.
    ///
    /// # Errors
    ///
    /// - [`ProcessingError::Io`] if the file does not exist
    /// - [`ProcessingError::ColumnNotFound`] if a required column is absent
    /// - [`ProcessingError::InvalidValue`] for negative or fractional counts
    ///   and labels other than 0/1
    pub fn load(path: impl AsRef<Path>, config: &DatasetConfig) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProcessingError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("dataset not found: {}", path.display()),
            )));
        }

        info!("Loading dataset from: {}", path.display());
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(config.infer_schema_length)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .context(format!("Opening {}", path.display()))?
            .finish()
            .context(format!("Reading {}", path.display()))?;

        let dataset = Self::from_frame(frame)?;
        info!(
            "Dataset loaded: {} rows x {} columns",
            dataset.frame.height(),
            dataset.frame.width()
        );
        Ok(dataset)
    }

    /// Build a dataset from an already loaded frame.
    pub fn from_frame(frame: DataFrame) -> Result<Self> {
        for name in DATASET_COLUMNS {
            if frame.column(name).is_err() {
                return Err(ProcessingError::ColumnNotFound(name.to_string()));
            }
        }

        for name in frame.get_column_names() {
            if !DATASET_COLUMNS.contains(&name.as_str()) {
                warn!("Ignoring unexpected column '{}'", name);
            }
        }

        let ids = string_cells(&frame, CUSTOMER_ID_COLUMN)?;
        let ages = count_cells(&frame, "Age")?;
        let genders = string_cells(&frame, "Gender")?;
        let tenures = count_cells(&frame, "Tenure")?;
        let usage = count_cells(&frame, "Usage Frequency")?;
        let support = count_cells(&frame, "Support Calls")?;
        let delays = count_cells(&frame, "Payment Delay")?;
        let subscriptions = string_cells(&frame, "Subscription Type")?;
        let contracts = string_cells(&frame, "Contract Length")?;
        let spend = spend_cells(&frame, "Total Spend")?;
        let interactions = count_cells(&frame, "Last Interaction")?;
        let labels = label_cells(&frame, CHURN_COLUMN)?;

        let records = (0..frame.height())
            .map(|row| CustomerRecord {
                customer_id: ids[row].clone(),
                age: ages[row],
                gender: genders[row].clone(),
                tenure_months: tenures[row],
                usage_frequency: usage[row],
                support_calls: support[row],
                payment_delay_days: delays[row],
                subscription_type: subscriptions[row].clone(),
                contract_length: contracts[row].clone(),
                total_spend: spend[row],
                last_interaction_days: interactions[row],
                churn: labels[row],
            })
            .collect();

        Ok(Self { frame, records })
    }

    /// Build a dataset from raw records (the frame is derived from them).
    pub fn from_records(records: Vec<CustomerRecord>) -> Result<Self> {
        let frame = records_to_frame(&records)?;
        Ok(Self { frame, records })
    }

    /// The frame as loaded, with raw categorical strings.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Encode every row into features and labels.
    ///
    /// Rows with an absent field (label included) or an unknown category
    /// are handled according to `policy`.
    ///
    /// # Errors
    ///
    /// - The first row error, with row context, under
    ///   [`MalformedRowPolicy::FailFast`]
    /// - [`ProcessingError::EmptyDataset`] if no row survives
    pub fn encode(&self, policy: MalformedRowPolicy) -> Result<EncodedDataset> {
        let mut features = Vec::with_capacity(self.records.len());
        let mut labels = Vec::with_capacity(self.records.len());
        let mut source_rows = Vec::with_capacity(self.records.len());
        let mut dropped_rows = 0;

        for (row, record) in self.records.iter().enumerate() {
            let encoded = encode_record(record).and_then(|vector| {
                record
                    .churn
                    .map(|label| (vector, label))
                    .ok_or_else(|| ProcessingError::MissingField(CHURN_COLUMN.to_string()))
            });

            match encoded {
                Ok((vector, label)) => {
                    features.push(vector);
                    labels.push(label);
                    source_rows.push(row);
                }
                Err(e) if policy == MalformedRowPolicy::Drop && e.is_input_error() => {
                    debug!("Dropping row {}: {}", row, e);
                    dropped_rows += 1;
                }
                Err(e) => return Err(e.with_context(format!("Row {}", row))),
            }
        }

        if dropped_rows > 0 {
            warn!(
                "Dropped {} of {} rows that could not be encoded",
                dropped_rows,
                self.records.len()
            );
        }

        if features.is_empty() {
            return Err(ProcessingError::EmptyDataset);
        }

        Ok(EncodedDataset {
            features,
            labels,
            source_rows,
            dropped_rows,
        })
    }
}

fn float_cells(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = frame
        .column(name)
        .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))?;
    let casted = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .context(format!("Casting column '{}' to Float64", name))?;
    let values = casted.f64()?.into_iter().collect();
    Ok(values)
}

fn string_cells(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = frame
        .column(name)
        .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))?;
    let casted = column
        .as_materialized_series()
        .cast(&DataType::String)
        .context(format!("Casting column '{}' to String", name))?;
    let values = casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Non-negative whole numbers (counts, days, years).
fn count_cells(frame: &DataFrame, name: &str) -> Result<Vec<Option<u32>>> {
    float_cells(frame, name)?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => Ok(None),
            Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) => {
                Ok(Some(v as u32))
            }
            Some(v) => Err(ProcessingError::InvalidValue {
                column: name.to_string(),
                row,
                reason: format!("expected a non-negative whole number, got {}", v),
            }),
        })
        .collect()
}

fn spend_cells(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    float_cells(frame, name)?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            Some(v) if !(v.is_finite() && v >= 0.0) => Err(ProcessingError::InvalidValue {
                column: name.to_string(),
                row,
                reason: format!("expected a non-negative amount, got {}", v),
            }),
            other => Ok(other),
        })
        .collect()
}

fn label_cells(frame: &DataFrame, name: &str) -> Result<Vec<Option<ChurnLabel>>> {
    float_cells(frame, name)?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => Ok(None),
            Some(v) if v == 0.0 => Ok(Some(ChurnLabel::Stayed)),
            Some(v) if v == 1.0 => Ok(Some(ChurnLabel::Churned)),
            Some(v) => Err(ProcessingError::InvalidValue {
                column: name.to_string(),
                row,
                reason: format!("expected 0 or 1, got {}", v),
            }),
        })
        .collect()
}

fn records_to_frame(records: &[CustomerRecord]) -> Result<DataFrame> {
    fn collect<T, F>(records: &[CustomerRecord], f: F) -> Vec<Option<T>>
    where
        F: Fn(&CustomerRecord) -> Option<T>,
    {
        records.iter().map(f).collect()
    }

    let columns: Vec<Column> = vec![
        Series::new(
            CUSTOMER_ID_COLUMN.into(),
            collect(records, |r| r.customer_id.clone()),
        )
        .into(),
        Series::new("Age".into(), collect(records, |r| r.age)).into(),
        Series::new("Gender".into(), collect(records, |r| r.gender.clone())).into(),
        Series::new("Tenure".into(), collect(records, |r| r.tenure_months)).into(),
        Series::new(
            "Usage Frequency".into(),
            collect(records, |r| r.usage_frequency),
        )
        .into(),
        Series::new("Support Calls".into(), collect(records, |r| r.support_calls)).into(),
        Series::new(
            "Payment Delay".into(),
            collect(records, |r| r.payment_delay_days),
        )
        .into(),
        Series::new(
            "Subscription Type".into(),
            collect(records, |r| r.subscription_type.clone()),
        )
        .into(),
        Series::new(
            "Contract Length".into(),
            collect(records, |r| r.contract_length.clone()),
        )
        .into(),
        Series::new("Total Spend".into(), collect(records, |r| r.total_spend)).into(),
        Series::new(
            "Last Interaction".into(),
            collect(records, |r| r.last_interaction_days),
        )
        .into(),
        Series::new(
            CHURN_COLUMN.into(),
            collect(records, |r| r.churn.map(|l| u32::from(l.code()))),
        )
        .into(),
    ];

    Ok(DataFrame::new(columns)?)
}
