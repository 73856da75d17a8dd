//! Label index loading and score-to-label mapping.
use std::{path::Path, sync::Arc};

use pixtag_model::{LabelIndex, ModelError, PredictionMap, ScoreVector};
use thiserror::Error;
use tracing::info;

use crate::error::PipelineError;

#[derive(Debug, Error)]
pub enum LabelIndexError {
    #[error("failed to read label index {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ModelError),
}

/// Read and validate the class-index JSON at `path`.
pub fn load_label_index(path: &Path) -> Result<LabelIndex, LabelIndexError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LabelIndexError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let index = LabelIndex::from_json_str(&raw)?;
    info!(path = %path.display(), classes = index.len(), "label index loaded");
    Ok(index)
}

/// Zips a score vector with the label index.
#[derive(Debug, Clone)]
pub struct LabelMapper {
    index: Arc<LabelIndex>,
}

impl LabelMapper {
    pub fn new(index: Arc<LabelIndex>) -> Self {
        Self { index }
    }

    pub fn classes(&self) -> usize {
        self.index.len()
    }

    /// One entry per score, in vector order.
    ///
    /// Fails with [`PipelineError::IndexMismatch`] when the lengths differ.
    pub fn map(&self, scores: &ScoreVector) -> Result<PredictionMap, PipelineError> {
        if scores.len() != self.index.len() {
            return Err(PipelineError::IndexMismatch {
                expected: self.index.len(),
                actual: scores.len(),
            });
        }
        let mut map = PredictionMap::new();
        for (entry, score) in self.index.iter().zip(scores.iter()) {
            map.push(entry.label(), score);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pixtag_model::LabelEntry;

    use super::*;

    fn mapper(labels: &[&str]) -> LabelMapper {
        let entries = labels
            .iter()
            .enumerate()
            .map(|(i, l)| LabelEntry::new(format!("n{i:08}"), *l))
            .collect();
        LabelMapper::new(Arc::new(LabelIndex::from_entries(entries).unwrap()))
    }

    #[test]
    fn maps_every_position_once() {
        let m = mapper(&["tench", "goldfish", "great white shark"]);
        let map = m.map(&ScoreVector::from(vec![0.1, 0.7, 0.2])).unwrap();

        assert_eq!(map.len(), 3);
        let labels: Vec<_> = map.iter().map(|p| p.label()).collect();
        assert_eq!(labels, ["tench", "goldfish", "great white shark"]);
        assert_eq!(map.get("goldfish"), Some(0.7));
    }

    #[test]
    fn length_mismatch_is_reported() {
        let m = mapper(&["tench", "goldfish"]);
        let err = m.map(&ScoreVector::from(vec![0.5; 3])).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::IndexMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn loads_index_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"0": ["n01440764", "tench"], "1": ["n01443537", "goldfish"]}}"#
        )
        .unwrap();

        let index = load_label_index(file.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(1).unwrap().label(), "goldfish");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_label_index(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, LabelIndexError::Io { .. }));
    }

    #[test]
    fn gapped_index_is_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"0": ["a", "x"], "2": ["b", "y"]}}"#).unwrap();
        assert!(matches!(
            load_label_index(file.path()),
            Err(LabelIndexError::Invalid(_))
        ));
    }
}
