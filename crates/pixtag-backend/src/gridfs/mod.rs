//! MongoDB GridFS content store.
//!
//! Job ids are the `ObjectId`s of GridFS files; the metadata record is the `metadata` field of
//! the file document in `{bucket}.files`.
mod convert;
pub use convert::{
    bson_to_metadata, merge_into_document, metadata_to_document, object_id, stored_metadata,
};

use std::str::FromStr;

use async_trait::async_trait;
use futures::{AsyncReadExt, AsyncWriteExt};
use mongodb::{
    Client, Collection, Database,
    bson::{Bson, Document, doc, oid::ObjectId},
    error::{Error as MongoError, ErrorKind, GridFsErrorKind},
    gridfs::GridFsBucket,
    options::{AuthMechanism, ClientOptions, Credential, GridFsBucketOptions, ServerAddress},
};
use tracing::{debug, info};

use pixtag_core::store::{ContentStore, StoreError, StoreResult, StoredFile};
use pixtag_model::{
    JobId, Metadata,
    config::{StoreConfig, StoreConnection},
};

/// GridFS-backed [`ContentStore`]. Cloning shares the driver's connection pool.
#[derive(Clone)]
pub struct GridFsStore {
    db: Database,
    bucket: GridFsBucket,
    files: Collection<Document>,
}

impl GridFsStore {
    /// Build the client and bucket handles. No I/O happens until the first call.
    pub async fn connect(cfg: &StoreConfig) -> StoreResult<Self> {
        let options = client_options(&cfg.connection).await?;
        let client = Client::with_options(options)
            .map_err(|e| StoreError::Connectivity(format!("client: {e}")))?;

        let db = client.database(&cfg.database);
        let mut bucket_options = GridFsBucketOptions::default();
        bucket_options.bucket_name = Some(cfg.bucket.clone());
        let bucket = db.gridfs_bucket(bucket_options);
        let files = db.collection::<Document>(&format!("{}.files", cfg.bucket));

        info!(database = %cfg.database, bucket = %cfg.bucket, "gridfs store configured");
        Ok(Self { db, bucket, files })
    }

    async fn file_document(&self, oid: ObjectId) -> StoreResult<Document> {
        self.files
            .find_one(doc! { "_id": oid })
            .await
            .map_err(driver_error)?
            .ok_or_else(|| StoreError::NotFound(oid.to_hex()))
    }

    async fn set_metadata(&self, oid: ObjectId, document: Document) -> StoreResult<()> {
        let result = self
            .files
            .update_one(doc! { "_id": oid }, doc! { "$set": { "metadata": document } })
            .await
            .map_err(driver_error)?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound(oid.to_hex()));
        }
        Ok(())
    }
}

/// Driver options from either a connection string or discrete settings.
pub async fn client_options(conn: &StoreConnection) -> StoreResult<ClientOptions> {
    match conn {
        StoreConnection::Uri { uri } => ClientOptions::parse(uri.as_str())
            .await
            .map_err(|e| StoreError::Connectivity(format!("connection string: {e}"))),
        StoreConnection::Discrete {
            host,
            port,
            username,
            password,
            auth_mechanism,
        } => {
            let address = ServerAddress::parse(format!("{host}:{port}"))
                .map_err(|e| StoreError::Connectivity(format!("address: {e}")))?;
            let mut options = ClientOptions::default();
            options.hosts = vec![address];
            options.app_name = Some("pixtag-worker".to_string());

            if username.is_some() || password.is_some() {
                let mut credential = Credential::default();
                credential.username = username.clone();
                credential.password = password.clone();
                credential.mechanism = auth_mechanism_from(auth_mechanism)?;
                options.credential = Some(credential);
            }
            Ok(options)
        }
    }
}

/// `DEFAULT` (any case) lets the driver negotiate.
fn auth_mechanism_from(name: &str) -> StoreResult<Option<AuthMechanism>> {
    if name.trim().eq_ignore_ascii_case("default") || name.trim().is_empty() {
        return Ok(None);
    }
    AuthMechanism::from_str(name.trim())
        .map(Some)
        .map_err(|e| StoreError::Connectivity(format!("auth mechanism {name:?}: {e}")))
}

fn driver_error(e: MongoError) -> StoreError {
    if matches!(
        *e.kind,
        ErrorKind::GridFs(GridFsErrorKind::FileNotFound { .. })
    ) {
        return StoreError::NotFound(e.to_string());
    }
    if matches!(
        *e.kind,
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. }
    ) {
        return StoreError::Connectivity(e.to_string());
    }
    StoreError::Backend(e.to_string())
}

fn oid(id: &JobId) -> StoreResult<ObjectId> {
    object_id(id).map_err(|e| StoreError::Backend(format!("{id}: {e}")))
}

#[async_trait]
impl ContentStore for GridFsStore {
    fn name(&self) -> &'static str {
        "gridfs"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Connectivity(e.to_string()))
    }

    async fn describe(&self, id: &JobId) -> StoreResult<StoredFile> {
        let file = self.file_document(oid(id)?).await?;

        let filename = file.get_str("filename").unwrap_or_default().to_string();
        let length = match file.get("length") {
            Some(Bson::Int64(n)) => u64::try_from(*n).unwrap_or_default(),
            Some(Bson::Int32(n)) => u64::try_from(*n).unwrap_or_default(),
            _ => 0,
        };
        let metadata = match file.get("metadata") {
            None | Some(Bson::Null) => None,
            Some(value) => Some(bson_to_metadata(value.clone())?),
        };
        Ok(StoredFile {
            filename,
            length,
            metadata,
        })
    }

    async fn get(&self, id: &JobId) -> StoreResult<Vec<u8>> {
        let mut stream = self
            .bucket
            .open_download_stream(Bson::ObjectId(oid(id)?))
            .await
            .map_err(driver_error)?;
        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| StoreError::Backend(format!("download {id}: {e}")))?;
        debug!(job = %id, bytes = buf.len(), "downloaded");
        Ok(buf)
    }

    async fn put(&self, id: &JobId, filename: &str, bytes: Vec<u8>) -> StoreResult<()> {
        let mut stream = self
            .bucket
            .open_upload_stream(filename)
            .id(Bson::ObjectId(oid(id)?))
            .await
            .map_err(driver_error)?;
        stream
            .write_all(&bytes)
            .await
            .map_err(|e| StoreError::Backend(format!("upload {id}: {e}")))?;
        stream
            .close()
            .await
            .map_err(|e| StoreError::Backend(format!("finish upload {id}: {e}")))
    }

    async fn delete(&self, id: &JobId) -> StoreResult<()> {
        self.bucket
            .delete(Bson::ObjectId(oid(id)?))
            .await
            .map_err(driver_error)
    }

    async fn write_metadata(&self, id: &JobId, metadata: &Metadata) -> StoreResult<()> {
        self.set_metadata(oid(id)?, metadata_to_document(metadata)?)
            .await
    }

    /// Merges on the stored BSON document, so keys outside the fragment are never converted.
    async fn merge_metadata(&self, id: &JobId, fragment: &Metadata) -> StoreResult<()> {
        let oid = oid(id)?;
        let file = self.file_document(oid).await?;
        let merged = merge_into_document(stored_metadata(&file)?, fragment)?;
        self.set_metadata(oid, merged).await
    }

    async fn replace(&self, id: &JobId, bytes: Vec<u8>) -> StoreResult<()> {
        let oid = oid(id)?;
        let file = self.file_document(oid).await?;
        let filename = file.get_str("filename").unwrap_or_default().to_string();
        let metadata = match file.get("metadata") {
            None | Some(Bson::Null) => None,
            Some(_) => Some(stored_metadata(&file)?),
        };
        self.delete(id).await?;

        let mut upload = self
            .bucket
            .open_upload_stream(&filename)
            .id(Bson::ObjectId(oid));
        if let Some(metadata) = metadata {
            upload = upload.metadata(metadata);
        }
        let mut stream = upload.await.map_err(driver_error)?;
        stream
            .write_all(&bytes)
            .await
            .map_err(|e| StoreError::Backend(format!("upload {id}: {e}")))?;
        stream
            .close()
            .await
            .map_err(|e| StoreError::Backend(format!("finish upload {id}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discrete_options_carry_credentials() {
        let conn = StoreConnection::Discrete {
            host: "mongo".into(),
            port: 27018,
            username: Some("worker".into()),
            password: Some("pw".into()),
            auth_mechanism: "SCRAM-SHA-256".into(),
        };
        let options = client_options(&conn).await.unwrap();

        assert_eq!(options.hosts, vec![ServerAddress::parse("mongo:27018").unwrap()]);
        let credential = options.credential.unwrap();
        assert_eq!(credential.username.as_deref(), Some("worker"));
        assert_eq!(credential.mechanism, Some(AuthMechanism::ScramSha256));
    }

    #[tokio::test]
    async fn anonymous_discrete_options_have_no_credential() {
        let conn = StoreConnection::Discrete {
            host: "mongo".into(),
            port: 27017,
            username: None,
            password: None,
            auth_mechanism: "DEFAULT".into(),
        };
        assert!(client_options(&conn).await.unwrap().credential.is_none());
    }

    #[test]
    fn default_mechanism_is_negotiated() {
        assert_eq!(auth_mechanism_from("DEFAULT").unwrap(), None);
        assert_eq!(auth_mechanism_from("default").unwrap(), None);
        assert!(auth_mechanism_from("NOT-A-MECHANISM").is_err());
    }

    #[tokio::test]
    async fn malformed_connection_string_is_rejected() {
        let conn = StoreConnection::Uri {
            uri: "postgres://nope".into(),
        };
        assert!(matches!(
            client_options(&conn).await,
            Err(StoreError::Connectivity(_))
        ));
    }
}
