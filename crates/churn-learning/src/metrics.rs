//! Aggregate model-quality views.
//!
//! All functions compare a sequence of true labels with a sequence of
//! predicted labels of the same length.

use crate::classifier::Classifier;
use crate::error::{LearningError, Result};
use crate::types::{FeatureImportance, Metrics};
use churn_processing::{ChurnLabel, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use std::fmt;

fn check_lengths(labels: &[ChurnLabel], predicted: &[ChurnLabel]) -> Result<()> {
    if labels.is_empty() {
        return Err(LearningError::InvalidData(
            "no labels to evaluate".to_string(),
        ));
    }
    if labels.len() != predicted.len() {
        return Err(LearningError::InvalidData(format!(
            "{} labels but {} predictions",
            labels.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Fraction of positions where the prediction equals the label.
///
/// # Errors
///
/// Returns [`LearningError::InvalidData`] for empty or unequal-length inputs.
pub fn accuracy(labels: &[ChurnLabel], predicted: &[ChurnLabel]) -> Result<f64> {
    check_lengths(labels, predicted)?;
    let correct = labels
        .iter()
        .zip(predicted)
        .filter(|(a, b)| a == b)
        .count();
    Ok(correct as f64 / labels.len() as f64)
}

/// 2x2 confusion matrix indexed `[actual][predicted]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub cells: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Count of rows with the given actual and predicted labels.
    pub fn get(&self, actual: ChurnLabel, predicted: ChurnLabel) -> usize {
        self.cells[actual.index()][predicted.index()]
    }

    pub fn true_negatives(&self) -> usize {
        self.get(ChurnLabel::Stayed, ChurnLabel::Stayed)
    }

    pub fn false_positives(&self) -> usize {
        self.get(ChurnLabel::Stayed, ChurnLabel::Churned)
    }

    pub fn false_negatives(&self) -> usize {
        self.get(ChurnLabel::Churned, ChurnLabel::Stayed)
    }

    pub fn true_positives(&self) -> usize {
        self.get(ChurnLabel::Churned, ChurnLabel::Churned)
    }

    pub fn total(&self) -> usize {
        self.cells.iter().flatten().sum()
    }

    /// `(TP + TN) / total`, 0.0 for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => (self.true_positives() + self.true_negatives()) as f64 / total as f64,
        }
    }

    /// Rows with the given actual label.
    fn support(&self, class: ChurnLabel) -> usize {
        self.cells[class.index()].iter().sum()
    }

    /// Rows predicted as the given label.
    fn predicted(&self, class: ChurnLabel) -> usize {
        self.cells.iter().map(|row| row[class.index()]).sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>16} {:>10} {:>10}", "", "Stayed", "Churned")?;
        for actual in ChurnLabel::ALL {
            writeln!(
                f,
                "{:>16} {:>10} {:>10}",
                format!("actual {}", actual),
                self.get(actual, ChurnLabel::Stayed),
                self.get(actual, ChurnLabel::Churned)
            )?;
        }
        Ok(())
    }
}

/// Build the confusion matrix of `predicted` against `labels`.
///
/// # Errors
///
/// Returns [`LearningError::InvalidData`] for empty or unequal-length inputs.
pub fn confusion_matrix(labels: &[ChurnLabel], predicted: &[ChurnLabel]) -> Result<ConfusionMatrix> {
    check_lengths(labels, predicted)?;
    let mut matrix = ConfusionMatrix::default();
    for (actual, guess) in labels.iter().zip(predicted) {
        matrix.cells[actual.index()][guess.index()] += 1;
    }
    Ok(matrix)
}

/// Precision, recall, F1 and support of one class (or an average).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ClassScores {
    fn for_class(matrix: &ConfusionMatrix, class: ChurnLabel) -> Self {
        let hits = matrix.get(class, class);
        let precision = ratio(hits, matrix.predicted(class));
        let recall = ratio(hits, matrix.support(class));
        let f1_score = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self {
            precision,
            recall,
            f1_score,
            support: matrix.support(class),
        }
    }
}

/// Per-class scores plus accuracy and averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Scores in class-index order (Stayed, Churned).
    pub classes: [ClassScores; 2],
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    pub fn class(&self, label: ChurnLabel) -> &ClassScores {
        &self.classes[label.index()]
    }

    /// Build the report from a confusion matrix.
    pub fn from_matrix(matrix: &ConfusionMatrix) -> Self {
        let classes = ChurnLabel::ALL.map(|class| ClassScores::for_class(matrix, class));
        let total = matrix.total();

        Self {
            classes,
            accuracy: matrix.accuracy(),
            macro_avg: average(&classes, [1.0, 1.0], total),
            weighted_avg: average(
                &classes,
                classes.map(|c| c.support as f64),
                total,
            ),
        }
    }
}

/// Weighted mean of per-class scores; all zeros when the weights are.
fn average(classes: &[ClassScores; 2], weights: [f64; 2], support: usize) -> ClassScores {
    let sum = weights[0] + weights[1];
    let mean = |get: fn(&ClassScores) -> f64| {
        if sum == 0.0 {
            0.0
        } else {
            (get(&classes[0]) * weights[0] + get(&classes[1]) * weights[1]) / sum
        }
    };
    ClassScores {
        precision: mean(|c| c.precision),
        recall: mean(|c| c.recall),
        f1_score: mean(|c| c.f1_score),
        support,
    }
}

const REPORT_WIDTH: usize = 12;

fn write_report_row(f: &mut fmt::Formatter<'_>, name: &str, s: &ClassScores) -> fmt::Result {
    writeln!(
        f,
        "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name,
        s.precision,
        s.recall,
        s.f1_score,
        s.support,
        width = REPORT_WIDTH
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            width = REPORT_WIDTH
        )?;
        writeln!(f)?;
        for label in ChurnLabel::ALL {
            write_report_row(f, label.display_name(), self.class(label))?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.weighted_avg.support,
            width = REPORT_WIDTH
        )?;
        write_report_row(f, "macro avg", &self.macro_avg)?;
        write_report_row(f, "weighted avg", &self.weighted_avg)
    }
}

/// Per-class precision, recall, F1 and support, with accuracy and averages.
///
/// Zero denominators yield 0.0 rather than an error.
///
/// # Errors
///
/// Returns [`LearningError::InvalidData`] for empty or unequal-length inputs.
pub fn classification_report(
    labels: &[ChurnLabel],
    predicted: &[ChurnLabel],
) -> Result<ClassificationReport> {
    let matrix = confusion_matrix(labels, predicted)?;
    Ok(ClassificationReport::from_matrix(&matrix))
}

/// Features paired with their importance, highest first.
///
/// Equal weights keep feature order.
///
/// # Errors
///
/// - [`LearningError::ImportancesUnavailable`] if the classifier has none
/// - [`LearningError::InvalidData`] if the weight count is wrong or a
///   weight is NaN or infinite
pub fn feature_importance_ranking<C: Classifier + ?Sized>(
    model: &C,
) -> Result<Vec<FeatureImportance>> {
    let weights = model
        .feature_importances()
        .ok_or(LearningError::ImportancesUnavailable)?;

    if weights.len() != FEATURE_NAMES.len() {
        return Err(LearningError::InvalidData(format!(
            "expected {} importance weights, got {}",
            FEATURE_NAMES.len(),
            weights.len()
        )));
    }

    if let Some(index) = weights.iter().position(|w| !w.is_finite()) {
        return Err(LearningError::InvalidData(format!(
            "importance of '{}' is not finite: {}",
            FEATURE_NAMES[index], weights[index]
        )));
    }

    let mut ranking: Vec<FeatureImportance> = FEATURE_NAMES
        .iter()
        .zip(weights)
        .map(|(name, weight)| FeatureImportance {
            feature: name.to_string(),
            weight,
        })
        .collect();

    // sort_by is stable
    ranking.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    Ok(ranking)
}

/// Summary metrics for storing with a model.
pub(crate) fn summarize(labels: &[ChurnLabel], predicted: &[ChurnLabel]) -> Result<Metrics> {
    let report = classification_report(labels, predicted)?;
    Ok(Metrics {
        test_score: Some(report.accuracy),
        accuracy: Some(report.accuracy),
        precision: Some(report.weighted_avg.precision),
        recall: Some(report.weighted_avg.recall),
        f1_score: Some(report.weighted_avg.f1_score),
        ..Metrics::default()
    })
}

/// The four model-quality views over one labelled dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub accuracy: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub classification_report: ClassificationReport,
    /// `None` when the classifier exposes no importances.
    pub feature_importance: Option<Vec<FeatureImportance>>,
}

impl ModelStats {
    /// Compute every view for `model` given true and predicted labels.
    pub fn compute<C: Classifier + ?Sized>(
        model: &C,
        labels: &[ChurnLabel],
        predicted: &[ChurnLabel],
    ) -> Result<Self> {
        let matrix = confusion_matrix(labels, predicted)?;
        let feature_importance = match feature_importance_ranking(model) {
            Ok(ranking) => Some(ranking),
            Err(LearningError::ImportancesUnavailable) => None,
            Err(e) => return Err(e),
        };

        Ok(Self {
            accuracy: accuracy(labels, predicted)?,
            confusion_matrix: matrix,
            classification_report: ClassificationReport::from_matrix(&matrix),
            feature_importance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use churn_processing::EncodedFeatureVector;
    use pretty_assertions::assert_eq;

    use ChurnLabel::{Churned as C, Stayed as S};

    struct Fixed(Option<Vec<f64>>);

    impl Classifier for Fixed {
        fn predict_one(&self, _: &EncodedFeatureVector) -> ChurnLabel {
            S
        }

        fn feature_importances(&self) -> Option<Vec<f64>> {
            self.0.clone()
        }
    }

    #[test]
    fn test_perfect_predictions() {
        let labels = [S, C];
        let matrix = confusion_matrix(&labels, &labels).unwrap();
        assert_eq!(matrix.cells, [[1, 0], [0, 1]]);
        assert_eq!(accuracy(&labels, &labels).unwrap(), 1.0);
        assert_eq!(matrix.accuracy(), 1.0);
    }

    #[test]
    fn test_confusion_cells() {
        let labels = [S, S, S, C, C];
        let predicted = [S, C, S, S, C];
        let matrix = confusion_matrix(&labels, &predicted).unwrap();

        assert_eq!(matrix.true_negatives(), 2);
        assert_eq!(matrix.false_positives(), 1);
        assert_eq!(matrix.false_negatives(), 1);
        assert_eq!(matrix.true_positives(), 1);
        assert_eq!(matrix.total(), labels.len());
        assert_eq!(matrix.accuracy(), accuracy(&labels, &predicted).unwrap());
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            accuracy(&[S, C], &[S]),
            Err(LearningError::InvalidData(_))
        ));
        assert!(confusion_matrix(&[], &[]).is_err());
        assert!(classification_report(&[S], &[S, S]).is_err());
    }

    #[test]
    fn test_classification_report_values() {
        let labels = [S, S, S, C, C];
        let predicted = [S, C, S, S, C];
        let report = classification_report(&labels, &predicted).unwrap();

        let stayed = report.class(S);
        assert!((stayed.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((stayed.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stayed.support, 3);

        let churned = report.class(C);
        assert!((churned.precision - 0.5).abs() < 1e-12);
        assert!((churned.recall - 0.5).abs() < 1e-12);
        assert_eq!(churned.support, 2);

        assert!((report.accuracy - 0.6).abs() < 1e-12);
        assert!((report.macro_avg.recall - (2.0 / 3.0 + 0.5) / 2.0).abs() < 1e-12);
        assert!(
            (report.weighted_avg.recall - (3.0 * 2.0 / 3.0 + 2.0 * 0.5) / 5.0).abs() < 1e-12
        );
        assert_eq!(report.weighted_avg.support, 5);
    }

    #[test]
    fn test_zero_division_is_zero() {
        // Churned is never predicted
        let report = classification_report(&[S, C], &[S, S]).unwrap();
        assert_eq!(report.class(C).precision, 0.0);
        assert_eq!(report.class(C).f1_score, 0.0);
    }

    #[test]
    fn test_report_display() {
        let report = classification_report(&[S, C], &[S, C]).unwrap();
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].contains("precision"));
        assert_eq!(lines[2], "      Stayed       1.00      1.00      1.00         1");
        assert_eq!(lines[3], "     Churned       1.00      1.00      1.00         1");
        assert!(lines[5].trim_start().starts_with("accuracy"));
        assert!(lines[7].starts_with("weighted avg"));
    }

    #[test]
    fn test_ranking_order_and_ties() {
        let mut weights = vec![0.0; 10];
        weights[0] = 0.1;
        weights[4] = 0.5;
        weights[8] = 0.2;
        weights[9] = 0.2;
        let ranking = feature_importance_ranking(&Fixed(Some(weights))).unwrap();

        let names: Vec<&str> = ranking.iter().take(4).map(|r| r.feature.as_str()).collect();
        assert_eq!(
            names,
            vec!["Support Calls", "Total Spend", "Last Interaction", "Age"]
        );
        assert!(ranking.windows(2).all(|w| w[0].weight >= w[1].weight));
        assert!((ranking.iter().map(|r| r.weight).sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ranking_unavailable() {
        assert!(matches!(
            feature_importance_ranking(&Fixed(None)),
            Err(LearningError::ImportancesUnavailable)
        ));
        assert!(matches!(
            feature_importance_ranking(&Fixed(Some(vec![1.0]))),
            Err(LearningError::InvalidData(_))
        ));
    }

    #[test]
    fn test_ranking_rejects_non_finite_weights() {
        let weights = vec![0.1, f64::NAN, 0.3, 0.05, 0.2, 0.0, 0.15, 0.1, 0.05, 0.05];
        let err = feature_importance_ranking(&Fixed(Some(weights))).unwrap_err();
        assert!(matches!(err, LearningError::InvalidData(_)));
        assert!(err.to_string().contains("Gender"));

        let mut weights = vec![0.1; 10];
        weights[3] = f64::INFINITY;
        assert!(feature_importance_ranking(&Fixed(Some(weights))).is_err());
    }

    #[test]
    fn test_model_stats() {
        let labels = [S, C, C];
        let predicted = [S, C, S];
        let stats = ModelStats::compute(&Fixed(None), &labels, &predicted).unwrap();
        assert!((stats.accuracy - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.confusion_matrix.accuracy(), stats.accuracy);
        assert!(stats.feature_importance.is_none());
    }
}
