//! Human-readable prediction report.

use crate::error::Result;
use chrono::NaiveDateTime;
use churn_processing::{ChurnLabel, CodeTable, Customer};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Timestamp format shown in reports.
pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The summary produced for one single-record prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub timestamp: NaiveDateTime,
    pub customer: Customer,
    pub prediction: ChurnLabel,
}

impl PredictionReport {
    pub fn new(timestamp: NaiveDateTime, customer: Customer, prediction: ChurnLabel) -> Self {
        Self {
            timestamp,
            customer,
            prediction,
        }
    }

    /// The report as plain text.
    pub fn text(&self) -> String {
        self.to_string()
    }

    /// Write the report to a text file, replacing any existing file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.text())?;
        Ok(())
    }
}

impl fmt::Display for PredictionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.customer;
        writeln!(f, "Customer Churn Prediction Report")?;
        writeln!(f)?;
        writeln!(
            f,
            "Timestamp: {}",
            self.timestamp.format(REPORT_TIMESTAMP_FORMAT)
        )?;
        writeln!(f)?;
        writeln!(f, "Age: {}", c.age)?;
        writeln!(f, "Gender: {}", c.gender.as_str())?;
        writeln!(f, "Tenure (months): {}", c.tenure_months)?;
        writeln!(f, "Usage Frequency: {}", c.usage_frequency)?;
        writeln!(f, "Support Calls: {}", c.support_calls)?;
        writeln!(f, "Payment Delay (days): {}", c.payment_delay_days)?;
        writeln!(f, "Subscription Type: {}", c.subscription_type.as_str())?;
        writeln!(f, "Contract Length: {}", c.contract_length.as_str())?;
        writeln!(f, "Total Spend: ${:.2}", c.total_spend)?;
        writeln!(f, "Last Interaction (days ago): {}", c.last_interaction_days)?;
        writeln!(f)?;
        writeln!(f, "Prediction: {}", self.prediction.outcome_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use churn_processing::{CustomerRecord, validate_record};

    fn report() -> PredictionReport {
        let customer = validate_record(
            &CustomerRecord::new()
                .age(30)
                .gender("Male")
                .tenure_months(12)
                .usage_frequency(10)
                .support_calls(2)
                .payment_delay_days(5)
                .subscription_type("Basic")
                .contract_length("Monthly")
                .total_spend(500.0)
                .last_interaction_days(5),
        )
        .unwrap();
        let timestamp = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        PredictionReport::new(timestamp, customer, ChurnLabel::Stayed)
    }

    #[test]
    fn test_report_text() {
        let text = report().text();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Customer Churn Prediction Report");
        assert_eq!(lines[2], "Timestamp: 2024-03-01 09:30:00");
        assert!(lines.contains(&"Gender: Male"));
        assert!(lines.contains(&"Contract Length: Monthly"));
        assert!(lines.contains(&"Total Spend: $500.00"));
        assert_eq!(
            lines.last().copied(),
            Some("Prediction: Customer is likely to stay.")
        );
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churn_prediction.txt");
        report().write_to(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), report().text());
    }
}
