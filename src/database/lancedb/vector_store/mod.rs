
use super::{IndexEntry, StoredEntry};
use crate::corpus::{EntryMetadata, parse_entry_id};
use crate::{PostsmithError, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Schema metadata key holding the fingerprint of the embedder that built the collection
pub const EMBEDDER_METADATA_KEY: &str = "postsmith.embedder";

/// How the indexer treats a collection that already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexMode {
    /// Drop any existing collection and build a fresh one
    #[default]
    Rebuild,
    /// Keep existing rows; rows with the same id are replaced
    Upsert,
}

/// Why an existing index could not be opened for reading
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("No index found at {}", .0.display())]
    Missing(PathBuf),
    #[error("Collection '{0}' does not exist")]
    CollectionMissing(String),
    #[error("Failed to open index: {0}")]
    Connect(String),
    #[error("Index schema is unusable: {0}")]
    Schema(String),
}

/// Vector database store using LanceDB for similarity search
pub struct VectorStore {
    connection: Connection,
    table: Table,
    collection: String,
    db_path: PathBuf,
    dimension: usize,
    fingerprint: Option<String>,
}

/// Search result from vector similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub entry: StoredEntry,
    /// Cosine distance to the query, lower is closer
    pub distance: f32,
    pub similarity_score: f32,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("collection", &self.collection)
            .field("db_path", &self.db_path)
            .field("dimension", &self.dimension)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Open the collection for writing, creating it as needed
    ///
    /// # Arguments
    /// * `config` - Application configuration naming the database path and collection
    /// * `dimension` - Vector length produced by the embedder
    /// * `fingerprint` - Embedder identity recorded in the collection schema
    /// * `mode` - Whether an existing collection is rebuilt or extended
    #[inline]
    pub async fn create(
        config: &Config,
        dimension: usize,
        fingerprint: &str,
        mode: IndexMode,
    ) -> Result<Self, PostsmithError> {
        if dimension == 0 {
            return Err(PostsmithError::Database(
                "Vector dimension must be greater than zero".to_string(),
            ));
        }

        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(&db_path).map_err(|e| {
            PostsmithError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let connection = Self::connect_with_recovery(&db_path).await?;
        let collection = config.index.collection.clone();

        let table_names = Self::list_tables(&connection).await?;
        let table = if table_names.contains(&collection) {
            match mode {
                IndexMode::Rebuild => {
                    info!("Rebuilding collection '{}'", collection);
                    Self::drop_table(&connection, &collection).await?;
                    Self::create_table(&connection, &collection, dimension, fingerprint).await?
                }
                IndexMode::Upsert => {
                    Self::open_for_upsert(&connection, &collection, dimension, fingerprint).await?
                }
            }
        } else {
            info!("Creating collection '{}'", collection);
            Self::create_table(&connection, &collection, dimension, fingerprint).await?
        };

        Ok(Self {
            connection,
            table,
            collection,
            db_path,
            dimension,
            fingerprint: Some(fingerprint.to_string()),
        })
    }

    /// Open an existing collection for reading.
    ///
    /// Never creates a directory, database or table.
    #[inline]
    pub async fn open_existing(config: &Config) -> Result<Self, OpenError> {
        let db_path = config.vector_database_path();
        if !db_path.is_dir() {
            return Err(OpenError::Missing(db_path));
        }

        let connection = lancedb::connect(&db_path.to_string_lossy())
            .execute()
            .await
            .map_err(|e| OpenError::Connect(e.to_string()))?;

        let collection = config.index.collection.clone();
        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| OpenError::Connect(e.to_string()))?;
        if !table_names.contains(&collection) {
            return Err(OpenError::CollectionMissing(collection));
        }

        let table = connection
            .open_table(&collection)
            .execute()
            .await
            .map_err(|e| OpenError::Connect(e.to_string()))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| OpenError::Schema(e.to_string()))?;
        let dimension = Self::vector_dimension(&schema).map_err(OpenError::Schema)?;
        let fingerprint = schema.metadata().get(EMBEDDER_METADATA_KEY).cloned();

        debug!(
            "Opened collection '{}' ({} dimensions, embedder {:?})",
            collection, dimension, fingerprint
        );

        Ok(Self {
            connection,
            table,
            collection,
            db_path,
            dimension,
            fingerprint,
        })
    }

    /// Remove the collection if it exists; returns whether anything was dropped
    #[inline]
    pub async fn drop_collection(config: &Config) -> Result<bool, PostsmithError> {
        let db_path = config.vector_database_path();
        if !db_path.is_dir() {
            return Ok(false);
        }

        let connection = Self::connect_with_recovery(&db_path).await?;
        let table_names = Self::list_tables(&connection).await?;
        if !table_names.contains(&config.index.collection) {
            return Ok(false);
        }

        Self::drop_table(&connection, &config.index.collection).await?;
        Ok(true)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Fingerprint of the embedder that built the collection, when recorded
    #[inline]
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn connect_with_recovery(db_path: &Path) -> Result<Connection, PostsmithError> {
        let uri = db_path.to_string_lossy().into_owned();

        match lancedb::connect(&uri).execute().await {
            Ok(conn) => Ok(conn),
            Err(e) => {
                error!("Failed to connect to LanceDB: {}", e);

                let error_msg = e.to_string().to_lowercase();
                if error_msg.contains("corrupt")
                    || error_msg.contains("invalid")
                    || error_msg.contains("malformed")
                {
                    warn!("Database corruption detected, attempting recovery");
                    Self::attempt_corruption_recovery(db_path)?;

                    std::fs::create_dir_all(db_path).map_err(|e| {
                        PostsmithError::Database(format!(
                            "Failed to recreate vector database directory: {}",
                            e
                        ))
                    })?;

                    lancedb::connect(&uri).execute().await.map_err(|e| {
                        PostsmithError::Database(format!(
                            "Failed to connect to LanceDB after recovery: {}",
                            e
                        ))
                    })
                } else {
                    Err(PostsmithError::Database(format!(
                        "Failed to connect to LanceDB: {}",
                        e
                    )))
                }
            }
        }
    }

    /// Move a corrupted database aside so a fresh one can be built
    fn attempt_corruption_recovery(db_path: &Path) -> Result<(), PostsmithError> {
        warn!("Attempting database corruption recovery at {:?}", db_path);

        if db_path.exists() {
            let backup_path = db_path.with_extension("corrupted_backup");
            if let Err(e) = std::fs::rename(db_path, &backup_path) {
                error!("Failed to backup corrupted database: {}", e);
            } else {
                info!("Corrupted database backed up to {:?}", backup_path);
            }
        }

        if db_path.exists() {
            std::fs::remove_dir_all(db_path).map_err(|e| {
                PostsmithError::Database(format!("Failed to remove corrupted database: {}", e))
            })?;
        }

        info!("Database corruption recovery completed");
        Ok(())
    }

    async fn list_tables(connection: &Connection) -> Result<Vec<String>, PostsmithError> {
        connection
            .table_names()
            .execute()
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to list tables: {}", e)))
    }

    async fn drop_table(connection: &Connection, name: &str) -> Result<(), PostsmithError> {
        info!("Dropping collection '{}'", name);
        connection
            .drop_table(name)
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to drop table: {}", e)))
    }

    async fn create_table(
        connection: &Connection,
        name: &str,
        dimension: usize,
        fingerprint: &str,
    ) -> Result<Table, PostsmithError> {
        let schema = Self::create_schema(dimension, fingerprint);
        let table = connection
            .create_empty_table(name, schema)
            .execute()
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to create table: {}", e)))?;

        info!(
            "Collection '{}' created with {} dimensions",
            name, dimension
        );
        Ok(table)
    }

    async fn open_for_upsert(
        connection: &Connection,
        name: &str,
        dimension: usize,
        fingerprint: &str,
    ) -> Result<Table, PostsmithError> {
        let table = connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to open table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to get table schema: {}", e)))?;

        let existing_dimension = Self::vector_dimension(&schema).map_err(PostsmithError::Database)?;
        let existing_fingerprint = schema.metadata().get(EMBEDDER_METADATA_KEY);

        let dimension_changed = existing_dimension != dimension;
        let embedder_changed = existing_fingerprint.is_some_and(|f| f != fingerprint);

        if dimension_changed || embedder_changed {
            // Vectors from two embedders are not comparable, so nothing can be kept
            warn!(
                "Collection '{}' was built by {:?} with {} dimensions; recreating for {} with {}",
                name, existing_fingerprint, existing_dimension, fingerprint, dimension
            );
            Self::drop_table(connection, name).await?;
            return Self::create_table(connection, name, dimension, fingerprint).await;
        }

        debug!("Extending existing collection '{}'", name);
        Ok(table)
    }

    /// Detect vector dimension from a table schema
    fn vector_dimension(schema: &Schema) -> Result<usize, String> {
        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return usize::try_from(*size)
                        .map_err(|_| format!("Invalid vector dimension {}", size));
                }
            }
        }

        Err("Could not find vector column or determine dimension".to_string())
    }

    /// Create schema with the specified vector dimension
    fn create_schema(vector_dim: usize, fingerprint: &str) -> SchemaRef {
        let metadata = HashMap::from([(
            EMBEDDER_METADATA_KEY.to_string(),
            fingerprint.to_string(),
        )]);

        Arc::new(Schema::new_with_metadata(
            vec![
                Field::new("id", DataType::Utf8, false),
                Field::new(
                    "vector",
                    DataType::FixedSizeList(
                        Arc::new(Field::new("item", DataType::Float32, false)),
                        vector_dim as i32,
                    ),
                    false,
                ),
                Field::new("text", DataType::Utf8, false),
                Field::new("length", DataType::UInt32, false),
                Field::new("line_count", DataType::UInt32, false),
                Field::new("indexed_at", DataType::Utf8, false),
            ],
            metadata,
        ))
    }

    /// Append entries to the collection
    #[inline]
    pub async fn add_entries(&self, entries: &[IndexEntry]) -> Result<(), PostsmithError> {
        if entries.is_empty() {
            debug!("No entries to store");
            return Ok(());
        }

        let record_batch = self.create_record_batch(entries).await?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        self.table
            .add(reader)
            .execute()
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to insert entries: {}", e)))?;

        info!("Stored {} entries in '{}'", entries.len(), self.collection);
        Ok(())
    }

    /// Insert entries, replacing rows that already have the same id
    #[inline]
    pub async fn upsert_entries(&self, entries: &[IndexEntry]) -> Result<(), PostsmithError> {
        if entries.is_empty() {
            debug!("No entries to upsert");
            return Ok(());
        }

        let record_batch = self.create_record_batch(entries).await?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        let mut merge = self.table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to upsert entries: {}", e)))?;

        info!("Upserted {} entries in '{}'", entries.len(), self.collection);
        Ok(())
    }

    /// Create a RecordBatch from index entries
    async fn create_record_batch(
        &self,
        entries: &[IndexEntry],
    ) -> Result<RecordBatch, PostsmithError> {
        let len = entries.len();
        let vector_dim = self.dimension;

        let mut seen = HashSet::with_capacity(len);
        if let Some(duplicate) = entries.iter().find(|e| !seen.insert(e.id.as_str())) {
            return Err(PostsmithError::Database(format!(
                "Duplicate entry id in batch: {}",
                duplicate.id
            )));
        }

        if let Some(bad) = entries.iter().find(|e| e.vector.len() != vector_dim) {
            return Err(PostsmithError::Database(format!(
                "Entry {} has {} dimensions, collection expects {}",
                bad.id,
                bad.vector.len(),
                vector_dim
            )));
        }

        let indexed_at = Utc::now().to_rfc3339();

        let mut ids = Vec::with_capacity(len);
        let mut texts = Vec::with_capacity(len);
        let mut lengths = Vec::with_capacity(len);
        let mut line_counts = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);

        for entry in entries {
            ids.push(entry.id.as_str());
            texts.push(entry.text.as_str());
            lengths.push(entry.metadata.length);
            line_counts.push(entry.metadata.line_count);
            flat_values.extend_from_slice(&entry.vector);
        }

        // Build against the stored schema so the batch matches it exactly
        let schema = self
            .table
            .schema()
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to get table schema: {}", e)))?;

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| {
                    PostsmithError::Database(format!("Failed to create vector array: {}", e))
                })?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
            Arc::new(UInt32Array::from(lengths)),
            Arc::new(UInt32Array::from(line_counts)),
            Arc::new(StringArray::from(vec![indexed_at.as_str(); len])),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| PostsmithError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Search for the entries closest to `query_vector`
    ///
    /// Exact cosine search; results are ordered by ascending distance and
    /// then by corpus position, so equal inputs always give equal output.
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, PostsmithError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        if query_vector.len() != self.dimension {
            return Err(PostsmithError::Database(format!(
                "Query has {} dimensions, collection expects {}",
                query_vector.len(),
                self.dimension
            )));
        }

        debug!("Searching '{}' with limit: {}", self.collection, limit);

        let results = self
            .table
            .vector_search(query_vector)
            .map_err(|e| PostsmithError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to execute search: {}", e)))?;

        let mut search_results = Self::collect_stream(results, Self::parse_search_batch).await?;
        search_results.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| compare_ids(&a.entry.id, &b.entry.id))
        });
        search_results.truncate(limit);

        debug!("Search returned {} results", search_results.len());
        Ok(search_results)
    }

    /// All stored entries ordered by corpus position
    #[inline]
    pub async fn list_entries(&self) -> Result<Vec<StoredEntry>, PostsmithError> {
        let results = self
            .table
            .query()
            .execute()
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to query entries: {}", e)))?;

        let mut entries = Self::collect_stream(results, Self::parse_entry_batch).await?;
        entries.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(entries)
    }

    /// Get the total number of entries stored
    #[inline]
    pub async fn count_entries(&self) -> Result<u64, PostsmithError> {
        let count = self
            .table
            .count_rows(None)
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Check that the collection is still listed and readable
    #[inline]
    pub async fn validate_integrity(&self) -> bool {
        match self.connection.table_names().execute().await {
            Ok(names) if names.contains(&self.collection) => {}
            Ok(_) => {
                warn!("Collection '{}' missing during integrity check", self.collection);
                return false;
            }
            Err(e) => {
                error!("Failed to list tables during integrity check: {}", e);
                return false;
            }
        }

        match self.table.count_rows(None).await {
            Ok(count) => {
                debug!("Integrity check passed, {} rows found", count);
                true
            }
            Err(e) => {
                error!("Failed to count rows during integrity check: {}", e);
                false
            }
        }
    }

    async fn collect_stream<T>(
        mut results: lancedb::arrow::SendableRecordBatchStream,
        parse: fn(&RecordBatch) -> Result<Vec<T>, PostsmithError>,
    ) -> Result<Vec<T>, PostsmithError> {
        let mut parsed = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| PostsmithError::Database(format!("Failed to read result stream: {}", e)))?
        {
            parsed.extend(parse(&batch)?);
        }

        Ok(parsed)
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, PostsmithError> {
        let entries = Self::parse_entry_batch(batch)?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(row, entry)| {
                let distance = distances
                    .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

                SearchResult {
                    entry,
                    distance,
                    similarity_score: 1.0 - distance,
                }
            })
            .collect())
    }

    fn parse_entry_batch(batch: &RecordBatch) -> Result<Vec<StoredEntry>, PostsmithError> {
        let ids = string_column(batch, "id")?;
        let texts = string_column(batch, "text")?;
        let lengths = u32_column(batch, "length")?;
        let line_counts = u32_column(batch, "line_count")?;
        let indexed_ats = string_column(batch, "indexed_at")?;

        Ok((0..batch.num_rows())
            .map(|row| StoredEntry {
                id: ids.value(row).to_string(),
                text: texts.value(row).to_string(),
                metadata: EntryMetadata {
                    length: lengths.value(row),
                    line_count: line_counts.value(row),
                },
                indexed_at: indexed_ats.value(row).to_string(),
            })
            .collect())
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, PostsmithError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PostsmithError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| PostsmithError::Database(format!("Invalid {} column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array, PostsmithError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PostsmithError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| PostsmithError::Database(format!("Invalid {} column type", name)))
}

/// Order `post_<N>` ids numerically, anything else after them by string
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (parse_entry_id(a), parse_entry_id(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
