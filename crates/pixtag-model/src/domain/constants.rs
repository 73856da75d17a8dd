//! Well-known metadata keys written by the tagger.
//!
//! Keeping them here avoids scattering magic strings between the tagger, the store backends and tests.

/// Key holding the `label -> score` map of the selected top-K predictions.
pub const METADATA_PREDICTIONS: &str = "predictions";

/// Key holding the label at the given 1-based rank (`prediction1`, `prediction2`, ...).
pub fn prediction_key(rank: usize) -> String {
    format!("prediction{rank}")
}

/// Key holding the score at the given 1-based rank (`prediction1_percentage`, ...).
pub fn prediction_percentage_key(rank: usize) -> String {
    format!("prediction{rank}_percentage")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_one_based_and_stable() {
        assert_eq!(prediction_key(1), "prediction1");
        assert_eq!(prediction_percentage_key(1), "prediction1_percentage");
        assert_eq!(prediction_key(12), "prediction12");
    }
}
