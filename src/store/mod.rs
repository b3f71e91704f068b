
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::{Result, SeedError};

/// Schema metadata key recording the metric declared at index creation
const METRIC_METADATA_KEY: &str = "distance_metric";

/// Similarity metric, fixed when the index is created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
    Dot,
}

impl DistanceMetric {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
            Self::Dot => "dot",
        }
    }
}

impl fmt::Display for DistanceMetric {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = SeedError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(Self::Cosine),
            "l2" => Ok(Self::L2),
            "dot" => Ok(Self::Dot),
            other => Err(SeedError::Config(format!(
                "unknown distance metric: {} (expected cosine, l2, or dot)",
                other
            ))),
        }
    }
}

/// Embedding record persisted in the index.
///
/// The id is derived deterministically from page and chunk position, so
/// re-seeding the same document overwrites records instead of duplicating
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// `"{page_id}_chunk_{chunk_index}"`
    pub id: String,
    /// Dense vector matching the index's declared dimension
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// Metadata stored alongside each vector.
///
/// Deliberately carries no timestamps: identical input must produce
/// byte-identical records across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Id of the page this chunk was cut from
    pub page: String,
    /// The chunk text itself
    pub text: String,
}

/// Vector sink backed by a LanceDB table.
pub struct VectorStore {
    connection: Connection,
    index_name: String,
    metric: DistanceMetric,
    dimension: Option<usize>,
}

impl VectorStore {
    /// Connect to the store described by `config`.
    ///
    /// Local path URIs get their directory created on demand; remote
    /// `db://` URIs authenticate with the configured key and region.
    #[inline]
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        debug!("Connecting to vector store at {}", config.uri);

        if !config.is_remote() && !config.uri.contains("://") {
            std::fs::create_dir_all(&config.uri).map_err(|e| {
                SeedError::Store(format!("failed to create store directory: {}", e))
            })?;
        }

        let mut builder = lancedb::connect(&config.uri);
        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key);
        }
        if let Some(region) = &config.region {
            builder = builder.region(region);
        }

        let connection = builder
            .execute()
            .await
            .map_err(|e| SeedError::Store(format!("failed to connect to LanceDB: {}", e)))?;

        Ok(Self {
            connection,
            index_name: config.index_name.clone(),
            metric: config.metric,
            dimension: None,
        })
    }

    /// Create the index if absent, or verify its declaration if present.
    ///
    /// Idempotent: an existing index with the same dimension and metric is
    /// left untouched. An existing index with a conflicting dimension or
    /// metric fails with [`SeedError::IndexConfig`] before any write is
    /// attempted.
    #[inline]
    pub async fn ensure_index(&mut self, dimension: usize) -> Result<()> {
        if self.index_exists().await? {
            let (existing_dim, existing_metric) = self.read_index_declaration().await?;

            if existing_dim != dimension {
                return Err(SeedError::IndexConfig(format!(
                    "index '{}' was created with dimension {}, requested {}",
                    self.index_name, existing_dim, dimension
                )));
            }
            if existing_metric != self.metric {
                return Err(SeedError::IndexConfig(format!(
                    "index '{}' was created with metric {}, requested {}",
                    self.index_name, existing_metric, self.metric
                )));
            }

            debug!(
                "Index '{}' already exists (dimension {}, metric {})",
                self.index_name, existing_dim, existing_metric
            );
            self.dimension = Some(dimension);
            return Ok(());
        }

        info!(
            "Creating index '{}' (dimension {}, metric {})",
            self.index_name, dimension, self.metric
        );

        let schema = self.create_schema(dimension);
        self.connection
            .create_empty_table(&self.index_name, schema)
            .execute()
            .await
            .map_err(|e| SeedError::Store(format!("failed to create index: {}", e)))?;

        self.dimension = Some(dimension);
        Ok(())
    }

    /// Whether the target index already exists.
    #[inline]
    pub async fn index_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| SeedError::Store(format!("failed to list tables: {}", e)))?;
        Ok(table_names.contains(&self.index_name))
    }

    /// Number of records currently persisted in the index.
    #[inline]
    pub async fn count_records(&self) -> Result<u64> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| SeedError::Store(format!("failed to count records: {}", e)))?;
        Ok(count as u64)
    }

    /// Upsert all records, grouped into deterministic batches.
    ///
    /// Records whose ids already exist are overwritten, never duplicated.
    /// Batches are written in document order; a failure on batch k is
    /// surfaced as [`SeedError::IndexWrite`] naming the batch and its
    /// record-offset range, and batches written before it stay committed
    /// (no cross-batch transaction). Returns the number of batches written.
    /// An empty record slice is a no-op.
    #[inline]
    pub async fn upsert(&self, records: &[EmbeddingRecord], batch_size: usize) -> Result<usize> {
        if records.is_empty() {
            debug!("No records to upsert");
            return Ok(0);
        }
        if batch_size == 0 {
            return Err(SeedError::Config(
                "batch size must be greater than zero".to_string(),
            ));
        }

        let dimension = self.dimension.ok_or_else(|| {
            SeedError::Store("ensure_index must be called before upsert".to_string())
        })?;

        for record in records {
            if record.vector.len() != dimension {
                return Err(SeedError::IndexConfig(format!(
                    "record '{}' has dimension {}, index declared {}",
                    record.id,
                    record.vector.len(),
                    dimension
                )));
            }
        }

        let total_batches = records.len().div_ceil(batch_size);

        for (batch_no, batch) in records.chunks(batch_size).enumerate() {
            let start = batch_no * batch_size;
            let end = start + batch.len();

            info!("Upserting batch {}/{}", batch_no + 1, total_batches);

            self.write_batch(batch, dimension)
                .await
                .map_err(|e| SeedError::IndexWrite {
                    batch: batch_no + 1,
                    start,
                    end,
                    message: e.to_string(),
                })?;
        }

        info!(
            "Upserted {} records into '{}' in {} batches",
            records.len(),
            self.index_name,
            total_batches
        );

        Ok(total_batches)
    }

    /// Fetch a single record by identifier.
    ///
    /// Exists to verify upsert-by-id semantics; similarity search is out of
    /// scope for this crate.
    #[inline]
    pub async fn get_record(&self, id: &str) -> Result<Option<EmbeddingRecord>> {
        let table = self.open_table().await?;

        let mut stream = table
            .query()
            .only_if(format!("id = '{}'", id.replace('\'', "''")))
            .limit(1)
            .execute()
            .await
            .map_err(|e| SeedError::Store(format!("failed to query index: {}", e)))?;

        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| SeedError::Store(format!("failed to read query results: {}", e)))?
        {
            if batch.num_rows() > 0 {
                return Ok(Some(parse_record(&batch, 0)?));
            }
        }

        Ok(None)
    }

    /// Write one batch with insert-or-overwrite semantics keyed on id.
    async fn write_batch(&self, records: &[EmbeddingRecord], dimension: usize) -> Result<()> {
        let table = self.open_table().await?;
        let record_batch = self.create_record_batch(records, dimension)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        let mut merge = table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| SeedError::Store(format!("merge insert failed: {}", e)))?;

        Ok(())
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(&self.index_name)
            .execute()
            .await
            .map_err(|e| {
                SeedError::Store(format!(
                    "failed to open index '{}': {}",
                    self.index_name, e
                ))
            })
    }

    /// Read the dimension and metric an existing index was created with.
    async fn read_index_declaration(&self) -> Result<(usize, DistanceMetric)> {
        let table = self.open_table().await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| SeedError::Store(format!("failed to read index schema: {}", e)))?;

        let dimension = schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => Some(*size as usize),
                _ => None,
            })
            .ok_or_else(|| {
                SeedError::IndexConfig(format!(
                    "index '{}' has no fixed-size vector column",
                    self.index_name
                ))
            })?;

        let metric = schema
            .metadata()
            .get(METRIC_METADATA_KEY)
            .ok_or_else(|| {
                SeedError::IndexConfig(format!(
                    "index '{}' does not declare a distance metric",
                    self.index_name
                ))
            })?
            .parse()?;

        Ok((dimension, metric))
    }

    /// Arrow schema for the index, with the metric recorded as schema
    /// metadata so conflicting re-declarations can be detected later.
    fn create_schema(&self, dimension: usize) -> Arc<Schema> {
        let fields = vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("page", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
        ];

        let metadata = HashMap::from([(
            METRIC_METADATA_KEY.to_string(),
            self.metric.as_str().to_string(),
        )]);

        Arc::new(Schema::new_with_metadata(fields, metadata))
    }

    fn create_record_batch(
        &self,
        records: &[EmbeddingRecord],
        dimension: usize,
    ) -> Result<RecordBatch> {
        let len = records.len();
        let mut ids = Vec::with_capacity(len);
        let mut pages = Vec::with_capacity(len);
        let mut texts = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * dimension);

        for record in records {
            ids.push(record.id.as_str());
            pages.push(record.metadata.page.as_str());
            texts.push(record.metadata.text.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let item_field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(item_field, dimension as i32, Arc::new(values_array), None)
                .map_err(|e| SeedError::Store(format!("failed to build vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(pages)),
            Arc::new(StringArray::from(texts)),
        ];

        RecordBatch::try_new(self.create_schema(dimension), arrays)
            .map_err(|e| SeedError::Store(format!("failed to build record batch: {}", e)))
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| SeedError::Store(format!("missing or mistyped column: {}", name)))
}

fn parse_record(batch: &RecordBatch, row: usize) -> Result<EmbeddingRecord> {
    let ids = string_column(batch, "id")?;
    let pages = string_column(batch, "page")?;
    let texts = string_column(batch, "text")?;

    let vectors = batch
        .column_by_name("vector")
        .and_then(|col| col.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| SeedError::Store("missing or mistyped column: vector".to_string()))?;
    let values = vectors.value(row);
    let values = values
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| SeedError::Store("vector items are not float32".to_string()))?;

    Ok(EmbeddingRecord {
        id: ids.value(row).to_string(),
        vector: values.values().to_vec(),
        metadata: RecordMetadata {
            page: pages.value(row).to_string(),
            text: texts.value(row).to_string(),
        },
    })
}
