//! Descriptive statistics of the churn dataset.
//!
//! These are the numbers behind the dashboard charts: the churn split,
//! churn per contract length and the correlation matrix of the encoded
//! columns.

use crate::config::MalformedRowPolicy;
use crate::dataset::Dataset;
use crate::encoder::{CodeTable, ContractLength, encode_frame, validate_record};
use crate::error::{ProcessingError, Result, ResultExt};
use crate::types::{CHURN_COLUMN, ChurnLabel, FEATURE_NAMES};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Number of customers per outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChurnDistribution {
    pub stayed: usize,
    pub churned: usize,
}

impl ChurnDistribution {
    pub fn total(&self) -> usize {
        self.stayed + self.churned
    }

    /// Share of churned customers, 0.0 for an empty distribution.
    pub fn churn_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.churned as f64 / total as f64,
        }
    }

    fn add(&mut self, label: ChurnLabel) {
        match label {
            ChurnLabel::Stayed => self.stayed += 1,
            ChurnLabel::Churned => self.churned += 1,
        }
    }
}

/// Churn counts for one contract length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractChurnRow {
    pub contract_length: String,
    pub counts: ChurnDistribution,
}

/// Symmetric Pearson correlation matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Column names, in row/column order.
    pub columns: Vec<String>,

    /// `values[i][j]` is the correlation of `columns[i]` and `columns[j]`.
    /// NaN where it is undefined (constant column or fewer than two pairs).
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Correlation between two named columns.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

impl fmt::Display for CorrelationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.columns.iter().map(|c| c.len()).max().unwrap_or(0);

        write!(f, "{:width$}", "", width = width)?;
        for (j, _) in self.columns.iter().enumerate() {
            write!(f, " {:>6}", j)?;
        }
        writeln!(f)?;

        for (name, row) in self.columns.iter().zip(&self.values) {
            write!(f, "{:width$}", name, width = width)?;
            for value in row {
                write!(f, " {:>6.2}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Everything the visualization view shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub rows: usize,
    pub churn_distribution: ChurnDistribution,
    pub contract_churn: Vec<ContractChurnRow>,
    pub correlation: CorrelationMatrix,
}

impl DatasetStatistics {
    /// Compute all statistics of `dataset`.
    ///
    /// Rows without a label are left out of the churn counts. The
    /// correlation matrix needs every categorical cell to be encodable.
    pub fn compute(dataset: &Dataset) -> Result<Self> {
        if dataset.is_empty() {
            return Err(ProcessingError::EmptyDataset);
        }
        info!("Computing statistics for {} rows", dataset.len());

        let mut churn_distribution = ChurnDistribution::default();
        let mut per_contract = vec![ChurnDistribution::default(); ContractLength::ALL.len()];

        for record in dataset.records() {
            let Some(label) = record.churn else { continue };
            churn_distribution.add(label);

            if let Some(contract) = record
                .contract_length
                .as_deref()
                .and_then(|raw| ContractLength::parse(raw).ok())
            {
                per_contract[contract.code() as usize].add(label);
            }
        }

        let contract_churn = ContractLength::ALL
            .iter()
            .zip(per_contract)
            .map(|(contract, counts)| ContractChurnRow {
                contract_length: contract.as_str().to_string(),
                counts,
            })
            .collect();

        let correlation = correlation_matrix(dataset.frame())?;
        debug!("Correlation matrix over {} columns", correlation.columns.len());

        Ok(Self {
            rows: dataset.len(),
            churn_distribution,
            contract_churn,
            correlation,
        })
    }
}

impl DatasetStatistics {
    /// [`compute`](Self::compute) after applying `policy` to rows that
    /// cannot be encoded.
    ///
    /// Under [`MalformedRowPolicy::Drop`] such rows are left out of every
    /// statistic; under `FailFast` the first one aborts.
    pub fn compute_with_policy(dataset: &Dataset, policy: MalformedRowPolicy) -> Result<Self> {
        if policy == MalformedRowPolicy::FailFast {
            return Self::compute(dataset);
        }

        let kept: Vec<_> = dataset
            .records()
            .iter()
            .filter(|record| validate_record(record).is_ok())
            .cloned()
            .collect();

        let dropped = dataset.len() - kept.len();
        if dropped == 0 {
            return Self::compute(dataset);
        }
        warn!(
            "Dropped {} of {} rows that could not be encoded",
            dropped,
            dataset.len()
        );
        Self::compute(&Dataset::from_records(kept)?)
    }
}

/// Pearson correlation of every feature column and the label, computed on
/// the encoded frame (identifier column excluded).
pub fn correlation_matrix(frame: &DataFrame) -> Result<CorrelationMatrix> {
    let encoded = encode_frame(frame)?;

    let names: Vec<&str> = FEATURE_NAMES
        .iter()
        .copied()
        .chain(std::iter::once(CHURN_COLUMN))
        .collect();

    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        let column = encoded
            .column(name)
            .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))?;
        let casted = column
            .as_materialized_series()
            .cast(&DataType::Float64)
            .context(format!("Casting column '{}' to Float64", name))?;
        let values: Vec<Option<f64>> = casted.f64()?.into_iter().collect();
        columns.push(values);
    }

    let n = columns.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&columns[i], &columns[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        columns: names.iter().map(|s| s.to_string()).collect(),
        values,
    })
}

/// Pearson correlation over the rows where both values are present.
///
/// Returns NaN when fewer than two complete pairs exist or either side
/// has zero variance.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}
