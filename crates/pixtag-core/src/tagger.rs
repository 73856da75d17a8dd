//! Top-K selection and metadata persistence.
use pixtag_model::{
    JobId, METADATA_PREDICTIONS, Metadata, Prediction, PredictionMap, prediction_key,
    prediction_percentage_key,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{error::PipelineError, store::StoreHandle};

/// Writes the top-K predictions into the stored metadata record.
pub struct MetadataTagger {
    store: StoreHandle,
    top_k: usize,
}

impl MetadataTagger {
    pub fn new(store: StoreHandle, top_k: usize) -> Self {
        Self { store, top_k }
    }

    /// The `k` best predictions, highest score first.
    ///
    /// Sorting is stable, so equal scores keep score-vector order.
    pub fn top(&self, predictions: &PredictionMap) -> Vec<Prediction> {
        let mut ranked: Vec<&Prediction> = predictions.iter().collect();
        ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));
        ranked.into_iter().take(self.top_k).cloned().collect()
    }

    /// Metadata fragment for the top-K predictions.
    ///
    /// `predictions` keeps the first (higher ranked) score for a repeated label;
    /// the positional keys list every rank.
    pub fn fragment(&self, predictions: &PredictionMap) -> Metadata {
        let top = self.top(predictions);

        let mut by_label = Map::new();
        for p in &top {
            by_label
                .entry(p.label().to_string())
                .or_insert_with(|| Value::from(p.score()));
        }

        let mut fragment = Metadata::new();
        fragment.insert(METADATA_PREDICTIONS, Value::Object(by_label));
        for (rank, p) in top.iter().enumerate().map(|(i, p)| (i + 1, p)) {
            fragment
                .insert(prediction_key(rank), p.label())
                .insert(prediction_percentage_key(rank), p.score());
        }
        fragment
    }

    /// Merge the fragment into the record stored under `id`.
    ///
    /// Returns the fragment that was written.
    pub async fn tag(
        &self,
        id: &JobId,
        predictions: &PredictionMap,
    ) -> Result<Metadata, PipelineError> {
        let fragment = self.fragment(predictions);
        self.store.merge_metadata(id, &fragment).await?;

        debug!(
            job = %id,
            top = ?fragment.get(&prediction_key(1)),
            keys = fragment.len(),
            "metadata updated",
        );
        Ok(fragment)
    }
}
