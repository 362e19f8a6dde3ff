use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Where one prediction lands in the confusion matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    TruePositive,
    FalsePositive,
    TrueNegative,
    FalseNegative,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Binary classification counts.
///
/// Every derived rate is 0.0 when its denominator is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn new(tp: usize, fp: usize, tn: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            false_positives: fp,
            true_negatives: tn,
            false_negatives: fn_,
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::TruePositive => self.true_positives += 1,
            Outcome::FalsePositive => self.false_positives += 1,
            Outcome::TrueNegative => self.true_negatives += 1,
            Outcome::FalseNegative => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }
}

impl Serialize for ConfusionMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ConfusionMatrix", 8)?;
        s.serialize_field("true_positives", &self.true_positives)?;
        s.serialize_field("false_positives", &self.false_positives)?;
        s.serialize_field("true_negatives", &self.true_negatives)?;
        s.serialize_field("false_negatives", &self.false_negatives)?;
        s.serialize_field("precision", &self.precision())?;
        s.serialize_field("recall", &self.recall())?;
        s.serialize_field("f1", &self.f1())?;
        s.serialize_field("accuracy", &self.accuracy())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_of_each() {
        let m = ConfusionMatrix::new(1, 1, 0, 1);
        assert!((m.precision() - 0.5).abs() < 1e-12);
        assert!((m.recall() - 0.5).abs() < 1e-12);
        assert!((m.f1() - 0.5).abs() < 1e-12);
        assert!((m.accuracy() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.total(), 3);
    }

    #[test]
    fn test_empty_matrix_is_zero() {
        let m = ConfusionMatrix::default();
        assert_eq!(m.precision(), 0.0);
        assert_eq!(m.recall(), 0.0);
        assert_eq!(m.f1(), 0.0);
        assert_eq!(m.accuracy(), 0.0);
    }

    #[test]
    fn test_record_each_outcome() {
        let mut m = ConfusionMatrix::default();
        m.record(Outcome::TruePositive);
        m.record(Outcome::FalseNegative);
        m.record(Outcome::TrueNegative);
        m.record(Outcome::FalsePositive);

        assert_eq!(m, ConfusionMatrix::new(1, 1, 1, 1));
    }

    #[test]
    fn test_serialized_with_rates() {
        let json = serde_json::to_value(ConfusionMatrix::new(3, 1, 0, 0)).unwrap();
        assert_eq!(json["true_positives"], 3);
        assert_eq!(json["precision"], 0.75);
        assert_eq!(json["recall"], 1.0);
    }
}
