//! Collaborator traits consumed by the matching core.
//!
//! The matchers never talk to a catalog, tokenizer or model directly; they
//! receive these handles at construction. Implementations are built once at
//! service start and shared read-only between workers.

use crate::field::FieldInfo;
use crate::vector::Vector;
use crate::Result;
use ahash::AHashMap;
use tracing::warn;

/// Read access to table structure and contents.
pub trait DataSource: Send + Sync {
    /// Fields of a table in catalog order.
    fn fetch_fields(&self, table_id: &str) -> Result<Vec<FieldInfo>>;

    /// Raw values of a single field, at most `limit` of them.
    fn fetch_values(&self, table_id: &str, field_id: &str, limit: Option<usize>) -> Result<Vec<String>>;

    /// Values of every field of a table keyed by field id.
    ///
    /// A field whose values cannot be fetched gets an empty column; only a
    /// missing field list fails the table. Sources that return whole tables
    /// per request should override this.
    fn fetch_table_values(
        &self,
        table_id: &str,
        limit: Option<usize>,
    ) -> Result<AHashMap<String, Vec<String>>> {
        let mut values = AHashMap::new();
        for field in self.fetch_fields(table_id)? {
            let column = match self.fetch_values(table_id, &field.field_id, limit) {
                Ok(column) => column,
                Err(e) => {
                    warn!("No data for field {}/{}: {}", table_id, field.field_id, e);
                    Vec::new()
                }
            };
            values.insert(field.field_id, column);
        }
        Ok(values)
    }
}

/// Word segmentation.
pub trait Tokenizer: Send + Sync {
    fn segment(&self, text: &str) -> Result<Vec<String>>;
}

/// Phrase embedding model used for field names and detector labels.
pub trait SimilarityModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vector>;

    /// Similarity of two embeddings produced by [`SimilarityModel::embed`].
    fn similarity(&self, a: &Vector, b: &Vector) -> f64 {
        a.cosine_similarity(b)
    }

    fn score(&self, a: &str, b: &str) -> Result<f64> {
        Ok(self.similarity(&self.embed(a)?, &self.embed(b)?))
    }
}

/// Inverse document frequency lookup. Unknown terms weigh 0.
pub trait IdfTable: Send + Sync {
    fn idf(&self, term: &str) -> f64;
}

impl IdfTable for AHashMap<String, f64> {
    fn idf(&self, term: &str) -> f64 {
        self.get(term).copied().unwrap_or(0.0)
    }
}
