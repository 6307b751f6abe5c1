//! The classifier capability.
//!
//! Inference code only needs something that maps an encoded feature vector
//! to a label. Anything implementing [`Classifier`] can be served; the
//! random forest in [`crate::forest`] is the implementation used here.

use churn_processing::{ChurnLabel, EncodedFeatureVector};

/// A fitted binary churn classifier.
pub trait Classifier {
    /// Predict the label of one encoded record.
    fn predict_one(&self, features: &EncodedFeatureVector) -> ChurnLabel;

    /// Predict the labels of many encoded records, in order.
    fn predict_many(&self, features: &[EncodedFeatureVector]) -> Vec<ChurnLabel> {
        features.iter().map(|f| self.predict_one(f)).collect()
    }

    /// Per-feature importance weights in feature order, if the model has them.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn predict_one(&self, features: &EncodedFeatureVector) -> ChurnLabel {
        (**self).predict_one(features)
    }

    fn predict_many(&self, features: &[EncodedFeatureVector]) -> Vec<ChurnLabel> {
        (**self).predict_many(features)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        (**self).feature_importances()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Threshold(f64);

    impl Classifier for Threshold {
        fn predict_one(&self, features: &EncodedFeatureVector) -> ChurnLabel {
            if features[4] > self.0 {
                ChurnLabel::Churned
            } else {
                ChurnLabel::Stayed
            }
        }
    }

    #[test]
    fn test_predict_many_default() {
        let mut low = [0.0; 10];
        low[4] = 1.0;
        let mut high = [0.0; 10];
        high[4] = 9.0;

        let model = Threshold(5.0);
        let labels = model.predict_many(&[low.into(), high.into(), low.into()]);
        assert_eq!(
            labels,
            vec![ChurnLabel::Stayed, ChurnLabel::Churned, ChurnLabel::Stayed]
        );
        assert_eq!(model.feature_importances(), None);
    }

    #[test]
    fn test_reference_forwards() {
        let model = Threshold(0.5);
        let by_ref: &dyn Classifier = &model;
        assert_eq!(by_ref.predict_one(&[1.0; 10].into()), ChurnLabel::Churned);
    }
}
