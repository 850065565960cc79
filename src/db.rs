use std::future::Future;

use anyhow::{Context, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mongodb::bson::{doc, oid::ObjectId, to_document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database as MongoDatabase, IndexModel};

use crate::config::CONFIG;
use crate::data_models::{CacheRecord, CacheRecordUpdate};

/// Collection names as constants for consistency
pub mod collections {
    pub const RESULTS: &str = "results";
}

const DUPLICATE_KEY: i32 = 11000;

/// Main database wrapper providing connection management and collection access
#[derive(Debug, Clone)]
pub struct Database {
    client: Client,
    db: MongoDatabase,
}

impl Database {
    /// Create a new Database instance with custom URI and database name.
    /// Useful for testing with a different database.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        let client_options = ClientOptions::parse(uri)
            .await
            .context("Failed to parse MongoDB connection string")?;

        let client =
            Client::with_options(client_options).context("Failed to create MongoDB client")?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to connect to MongoDB")?;

        log::info!("Connected to MongoDB database: {}", db_name);

        let db = client.database(db_name);

        Ok(Self { client, db })
    }

    /// Create a Database instance using environment configuration
    pub async fn from_config() -> Result<Self> {
        let uri = CONFIG
            .mongo_uri
            .as_deref()
            .context("Missing required environment variable: MONGO_URI")?;
        Self::new(uri, &CONFIG.mongo_db_name).await
    }

    /// Get a typed collection by name
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.db.collection(name)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn results(&self) -> Collection<CacheRecord> {
        self.collection(collections::RESULTS)
    }
}

/// Persistence seam used by the result cache. Lookup and upsert both go
/// through the (requester_identity, normalized_query) composite key.
pub trait CacheStore: Send + Sync {
    fn find(
        &self,
        requester_identity: &str,
        normalized_query: &str,
    ) -> impl Future<Output = Result<Option<CacheRecord>>> + Send;

    /// Insert a new record. A record that already exists under the same
    /// composite key is overwritten in place instead of duplicated.
    fn insert(&self, record: &CacheRecord) -> impl Future<Output = Result<()>> + Send;

    /// Overwrite the non-key fields of record `id`. Returns whether it existed.
    fn update(
        &self,
        id: ObjectId,
        fields: &CacheRecordUpdate,
    ) -> impl Future<Output = Result<bool>> + Send;
}

pub struct MongoCacheStore {
    collection: Collection<CacheRecord>,
}

impl MongoCacheStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.results(),
        }
    }

    /// Ensure the unique composite-key index exists. Call once at startup.
    pub async fn init(db: &Database) -> Result<Self> {
        let store = Self::new(db);
        let options = IndexOptions::builder().unique(true).build();
        store
            .collection
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "requester_identity": 1, "normalized_query": 1 })
                    .options(options)
                    .build(),
            )
            .await
            .context("Failed to create composite key index")?;
        Ok(store)
    }

    async fn update_by_key(&self, record: &CacheRecord, fields: &CacheRecordUpdate) -> Result<()> {
        self.collection
            .update_one(
                doc! {
                    "requester_identity": &record.requester_identity,
                    "normalized_query": &record.normalized_query,
                },
                doc! { "$set": to_document(fields)? },
            )
            .await
            .context("Failed to update record by composite key")?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == DUPLICATE_KEY
    )
}

fn update_fields(record: &CacheRecord) -> CacheRecordUpdate {
    CacheRecordUpdate {
        total_result_count: record.total_result_count,
        links: record.links.clone(),
        top_words: record.top_words.clone(),
        result_limit: record.result_limit,
        top_words_limit: record.top_words_limit,
        last_modified_at: record.last_modified_at,
    }
}

impl CacheStore for MongoCacheStore {
    async fn find(
        &self,
        requester_identity: &str,
        normalized_query: &str,
    ) -> Result<Option<CacheRecord>> {
        self.collection
            .find_one(doc! {
                "requester_identity": requester_identity,
                "normalized_query": normalized_query,
            })
            .await
            .context("Failed to find cached result")
    }

    async fn insert(&self, record: &CacheRecord) -> Result<()> {
        match self.collection.insert_one(record).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                log::debug!(
                    "record for {:?}/{:?} inserted concurrently, updating instead",
                    record.requester_identity,
                    record.normalized_query
                );
                self.update_by_key(record, &update_fields(record)).await
            }
            Err(e) => Err(e).context("Failed to insert cached result"),
        }
    }

    async fn update(&self, id: ObjectId, fields: &CacheRecordUpdate) -> Result<bool> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": to_document(fields)? })
            .await
            .context("Failed to update cached result")?;
        Ok(result.matched_count > 0)
    }
}

/// In-process store keyed by the composite key.
#[derive(Default)]
pub struct MemoryCacheStore {
    records: DashMap<(String, String), CacheRecord>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    async fn find(
        &self,
        requester_identity: &str,
        normalized_query: &str,
    ) -> Result<Option<CacheRecord>> {
        let key = (requester_identity.to_string(), normalized_query.to_string());
        Ok(self.records.get(&key).map(|r| r.value().clone()))
    }

    async fn insert(&self, record: &CacheRecord) -> Result<()> {
        let key = (
            record.requester_identity.clone(),
            record.normalized_query.clone(),
        );
        match self.records.entry(key) {
            Entry::Occupied(mut existing) => existing.get_mut().apply(&update_fields(record)),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
            }
        }
        Ok(())
    }

    async fn update(&self, id: ObjectId, fields: &CacheRecordUpdate) -> Result<bool> {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(mut record) => {
                record.apply(fields);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// =============================================================================
// Test utilities
// =============================================================================
