//! Customer Churn Data Contract
//!
//! The data side of the churn system, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Encoder**: the single definition of the categorical code tables and
//!   the record/DataFrame encoders that every other path goes through
//! - **Dataset**: schema-checked CSV loading and whole-dataset encoding
//! - **Statistics**: churn distribution, churn per contract length and the
//!   correlation matrix of the encoded columns
//!
//! # Quick Start
//!
//! ```rust
//! use churn_processing::{encode_record, CustomerRecord};
//!
//! let record = CustomerRecord::new()
//!     .age(30)
//!     .gender("Male")
//!     .tenure_months(12)
//!     .usage_frequency(10)
//!     .support_calls(2)
//!     .payment_delay_days(5)
//!     .subscription_type("Basic")
//!     .contract_length("Monthly")
//!     .total_spend(500.0)
//!     .last_interaction_days(5);
//!
//! let features = encode_record(&record).unwrap();
//! assert_eq!(
//!     features.values(),
//!     &[30.0, 0.0, 12.0, 10.0, 2.0, 5.0, 0.0, 0.0, 500.0, 5.0]
//! );
//! ```
//!
//! # Loading a Dataset
//!
//! ```rust,ignore
//! use churn_processing::{Dataset, DatasetConfig, MalformedRowPolicy};
//!
//! let config = DatasetConfig::builder()
//!     .malformed_rows(MalformedRowPolicy::Drop)
//!     .build()?;
//!
//! let dataset = Dataset::load("customer_churn.csv", &config)?;
//! let encoded = dataset.encode(config.malformed_rows)?;
//! println!("{} rows, {} dropped", encoded.len(), encoded.dropped_rows);
//! ```

pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod statistics;
pub mod types;

// Re-exports for convenient access
pub use config::{ConfigValidationError, DatasetConfig, DatasetConfigBuilder, MalformedRowPolicy};
pub use dataset::{Dataset, EncodedDataset};
pub use encoder::{
    CategoricalField, CodeEntry, CodeTable, ContractLength, EncodingSchema, Gender,
    SubscriptionType, encode_categorical, encode_categorical_by_name, encode_frame,
    encode_record, validate_record,
};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use statistics::{
    ChurnDistribution, ContractChurnRow, CorrelationMatrix, DatasetStatistics,
    correlation_matrix, pearson,
};
pub use types::{
    CHURN_COLUMN, CUSTOMER_ID_COLUMN, ChurnLabel, Customer, CustomerRecord, DATASET_COLUMNS,
    EncodedFeatureVector, FEATURE_COUNT, FEATURE_NAMES,
};
