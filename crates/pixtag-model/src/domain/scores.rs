use serde::{Deserialize, Serialize};

/// Raw class scores returned by the inference service, index-aligned with the label index.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreVector(pub Vec<f64>);

impl ScoreVector {
    /// Number of scores.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the vector holds no scores.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate scores in vector order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<f64>> for ScoreVector {
    fn from(v: Vec<f64>) -> Self {
        Self(v)
    }
}

/// A display label paired with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    label: String,
    score: f64,
}

impl Prediction {
    /// Create a new prediction.
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Raw score.
    pub fn score(&self) -> f64 {
        self.score
    }
}

/// Label to score mapping, one entry per score vector element.
///
/// Entries are kept in score vector order; that order is the tie-breaker the tagger relies on.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct PredictionMap(Vec<Prediction>);

impl PredictionMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an entry at the next vector position.
    pub fn push(&mut self, label: impl Into<String>, score: f64) {
        self.0.push(Prediction::new(label, score));
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Score of the first entry with the given label.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|p| p.label == label).map(|p| p.score)
    }

    /// Iterate entries in vector order.
    pub fn iter(&self) -> impl Iterator<Item = &Prediction> {
        self.0.iter()
    }
}

impl FromIterator<Prediction> for PredictionMap {
    fn from_iter<T: IntoIterator<Item = Prediction>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_vector_order() {
        let mut map = PredictionMap::new();
        map.push("tench", 0.1);
        map.push("goldfish", 0.7);

        let labels: Vec<_> = map.iter().map(Prediction::label).collect();
        assert_eq!(labels, ["tench", "goldfish"]);
        assert_eq!(map.get("goldfish"), Some(0.7));
        assert_eq!(map.get("shark"), None);
    }

    #[test]
    fn score_vector_is_a_transparent_array() {
        let v: ScoreVector = serde_json::from_str("[0.25, 0.75]").unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v.iter().sum::<f64>(), 1.0);
    }
}
