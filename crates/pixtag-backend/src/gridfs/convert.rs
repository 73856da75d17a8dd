use mongodb::bson::{self, Bson, Document, oid::ObjectId};
use serde_json::Value;

use pixtag_core::store::{StoreError, StoreResult};
use pixtag_model::{JobId, Metadata};

/// Job ids are validated hex, so this only fails on a malformed id built by hand.
pub fn object_id(id: &JobId) -> Result<ObjectId, bson::oid::Error> {
    ObjectId::parse_str(id.as_str())
}

/// Serialize a metadata record into a BSON document.
pub fn metadata_to_document(metadata: &Metadata) -> StoreResult<Document> {
    bson::to_document(metadata).map_err(|e| StoreError::Backend(format!("metadata to bson: {e}")))
}

/// The raw `metadata` field of a file document; empty when absent or null.
pub fn stored_metadata(file: &Document) -> StoreResult<Document> {
    match file.get("metadata") {
        None | Some(Bson::Null) => Ok(Document::new()),
        Some(Bson::Document(doc)) => Ok(doc.clone()),
        Some(other) => Err(StoreError::Backend(format!(
            "metadata field is not a document: {other}"
        ))),
    }
}

/// Overwrite the fragment's keys in `current`. Other keys keep their BSON value as stored.
pub fn merge_into_document(mut current: Document, fragment: &Metadata) -> StoreResult<Document> {
    for (key, value) in metadata_to_document(fragment)? {
        current.insert(key, value);
    }
    Ok(current)
}

/// Read a stored `metadata` field; BSON-specific types come back as relaxed extended JSON.
pub fn bson_to_metadata(value: Bson) -> StoreResult<Metadata> {
    match value.into_relaxed_extjson() {
        Value::Object(map) => Ok(Metadata::from(map)),
        other => Err(StoreError::Backend(format!(
            "metadata field is not a document: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;
    use serde_json::json;

    use super::*;

    #[test]
    fn object_id_matches_job_id() {
        let id: JobId = "65f1c2a9e4b0a1b2c3d4e5f6".parse().unwrap();
        assert_eq!(object_id(&id).unwrap().to_hex(), id.as_str());
    }

    #[test]
    fn metadata_survives_the_bson_trip() {
        let mut md = Metadata::new();
        md.insert("owner", "alice")
            .insert("prediction1", "Chihuahua")
            .insert("prediction1_percentage", 0.92)
            .insert("predictions", json!({"Chihuahua": 0.92}));

        let document = metadata_to_document(&md).unwrap();
        assert_eq!(document.get_str("owner").unwrap(), "alice");
        assert_eq!(document.get_f64("prediction1_percentage").unwrap(), 0.92);

        let back = bson_to_metadata(Bson::Document(document)).unwrap();
        assert_eq!(back, md);
    }

    #[test]
    fn foreign_bson_types_read_as_extended_json() {
        let oid = ObjectId::parse_str("65f1c2a9e4b0a1b2c3d4e5f6").unwrap();
        let md = bson_to_metadata(Bson::Document(doc! { "source": oid, "count": 3_i32 })).unwrap();
        assert_eq!(md.get("source").unwrap()["$oid"], "65f1c2a9e4b0a1b2c3d4e5f6");
        assert_eq!(md.get("count").unwrap(), 3);
    }

    #[test]
    fn non_document_metadata_is_rejected() {
        assert!(bson_to_metadata(Bson::String("oops".into())).is_err());
        assert!(stored_metadata(&doc! { "metadata": "oops" }).is_err());
    }

    #[test]
    fn merge_keeps_foreign_bson_types() {
        let current = stored_metadata(&doc! {
            "filename": "dog.jpg",
            "metadata": { "owner": "alice", "count": 3_i32, "prediction1": "stale" },
        })
        .unwrap();
        let mut fragment = Metadata::new();
        fragment
            .insert("prediction1", "chihuahua")
            .insert("prediction1_percentage", 0.9)
            .insert("predictions", json!({"chihuahua": 0.9}));

        let merged = merge_into_document(current, &fragment).unwrap();

        assert_eq!(merged.get("count"), Some(&Bson::Int32(3)));
        assert_eq!(merged.get_str("owner").unwrap(), "alice");
        assert_eq!(merged.get_str("prediction1").unwrap(), "chihuahua");
        assert_eq!(merged.get_f64("prediction1_percentage").unwrap(), 0.9);
        assert_eq!(
            merged.get_document("predictions").unwrap(),
            &doc! { "chihuahua": 0.9 }
        );
    }

    #[test]
    fn missing_or_null_metadata_is_empty() {
        assert!(stored_metadata(&doc! { "filename": "a.png" }).unwrap().is_empty());
        assert!(stored_metadata(&doc! { "metadata": Bson::Null }).unwrap().is_empty());
    }
}
