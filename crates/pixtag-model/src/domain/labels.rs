use std::collections::BTreeMap;

use crate::error::{ModelError, ModelResult};

/// One row of the label index: the model's internal class id and its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    id: String,
    label: String,
}

impl LabelEntry {
    /// Create a new entry.
    pub fn new<I, L>(id: I, label: L) -> Self
    where
        I: Into<String>,
        L: Into<String>,
    {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Internal class id (e.g. a WordNet id such as `n02085620`).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human readable label (e.g. `Chihuahua`).
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Immutable ordered table mapping a score vector position to a class label.
///
/// Built once at startup; there is no way to mutate an index after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelIndex(Vec<LabelEntry>);

impl LabelIndex {
    /// Build an index from entries in vector order.
    pub fn from_entries(entries: Vec<LabelEntry>) -> ModelResult<Self> {
        if entries.is_empty() {
            return Err(ModelError::InvalidLabelIndex("index is empty".into()));
        }
        Ok(Self(entries))
    }

    /// Parse the class-index JSON format.
    ///
    /// The document is an object keyed by decimal positions with `[internal_id, label]` values:
    /// `{"0": ["n01440764", "tench"], "1": ["n01443537", "goldfish"]}`.
    /// Positions must cover `0..N` without gaps.
    ///
    /// # Examples
    /// ```
    /// use pixtag_model::LabelIndex;
    ///
    /// let index = LabelIndex::from_json_str(r#"{"1": ["b", "goldfish"], "0": ["a", "tench"]}"#).unwrap();
    /// assert_eq!(index.len(), 2);
    /// assert_eq!(index.get(0).unwrap().label(), "tench");
    /// ```
    pub fn from_json_str(s: &str) -> ModelResult<Self> {
        let raw: BTreeMap<String, (String, String)> = serde_json::from_str(s)
            .map_err(|e| ModelError::InvalidLabelIndex(format!("malformed json: {e}")))?;

        let mut positioned = raw
            .into_iter()
            .map(|(key, (id, label))| {
                key.trim()
                    .parse::<usize>()
                    .map(|pos| (pos, LabelEntry::new(id, label)))
                    .map_err(|_| ModelError::InvalidLabelIndex(format!("non-numeric key {key:?}")))
            })
            .collect::<ModelResult<Vec<_>>>()?;
        positioned.sort_by_key(|(pos, _)| *pos);

        for (expected, (pos, _)) in positioned.iter().enumerate() {
            if *pos != expected {
                return Err(ModelError::InvalidLabelIndex(format!(
                    "position {expected} is missing (found {pos})"
                )));
            }
        }
        Self::from_entries(positioned.into_iter().map(|(_, entry)| entry).collect())
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a constructed index; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entry at the given vector position.
    pub fn get(&self, position: usize) -> Option<&LabelEntry> {
        self.0.get(position)
    }

    /// Iterate entries in vector order.
    pub fn iter(&self) -> impl Iterator<Item = &LabelEntry> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_keys_in_position_order() {
        // "10" sorts before "2" as a string; positions must still come out numerically.
        let json = (0..12)
            .map(|i| format!(r#""{i}": ["n{i:08}", "class-{i}"]"#))
            .collect::<Vec<_>>()
            .join(",");
        let index = LabelIndex::from_json_str(&format!("{{{json}}}")).unwrap();

        assert_eq!(index.len(), 12);
        assert_eq!(index.get(2).unwrap().label(), "class-2");
        assert_eq!(index.get(10).unwrap().label(), "class-10");
        assert_eq!(index.get(10).unwrap().id(), "n00000010");
    }

    #[test]
    fn rejects_gaps() {
        let err = LabelIndex::from_json_str(r#"{"0": ["a", "x"], "2": ["b", "y"]}"#).unwrap_err();
        assert!(matches!(err, ModelError::InvalidLabelIndex(msg) if msg.contains("position 1")));
    }

    #[test]
    fn rejects_non_numeric_keys_and_bad_shapes() {
        let bad = [
            r#"{"zero": ["a", "x"]}"#,
            r#"{"0": "x"}"#,
            r#"{"0": ["a"]}"#,
            r#"[]"#,
            r#"{}"#,
        ];
        for input in bad {
            assert!(
                LabelIndex::from_json_str(input).is_err(),
                "expected error for {input}"
            );
        }
    }

    #[test]
    fn duplicate_labels_are_kept_positionally() {
        let index = LabelIndex::from_json_str(
            r#"{"0": ["n02012849", "crane"], "1": ["n03126707", "crane"]}"#,
        )
        .unwrap();

        let labels: Vec<_> = index.iter().map(LabelEntry::label).collect();
        assert_eq!(labels, ["crane", "crane"]);
        assert_ne!(index.get(0).unwrap().id(), index.get(1).unwrap().id());
    }
}
