//! Request-scoped view over a [`DataSource`].
//!
//! Fields and values are fetched at most once per table and request. Any
//! catalog failure degrades to an empty collection with a warning so a
//! single missing table never fails a whole matching request.

use crate::cache::BoundedCache;
use crate::field::{FieldInfo, FieldRef};
use crate::source::DataSource;
use ahash::AHashMap;
use std::sync::Arc;
use tracing::warn;

/// Default number of tables kept per request
pub const DEFAULT_TABLE_CACHE: usize = 64;

pub struct FieldCatalog {
    source: Arc<dyn DataSource>,
    value_limit: Option<usize>,
    fields: BoundedCache<String, Arc<Vec<FieldInfo>>>,
    values: BoundedCache<String, Arc<AHashMap<String, Vec<String>>>>,
}

impl FieldCatalog {
    pub fn new(source: Arc<dyn DataSource>, value_limit: Option<usize>, cache_tables: usize) -> Self {
        Self {
            source,
            value_limit,
            fields: BoundedCache::new(cache_tables),
            values: BoundedCache::new(cache_tables),
        }
    }

    /// Fields of `table_id`, empty if the catalog cannot provide them. A
    /// failure is cached like a result, so it is fetched and logged once.
    pub fn fields(&mut self, table_id: &str) -> Arc<Vec<FieldInfo>> {
        if let Some(fields) = self.fields.get(&table_id.to_string()) {
            return fields;
        }
        let fields = match self.source.fetch_fields(table_id) {
            Ok(fields) => Arc::new(fields),
            Err(e) => {
                warn!("No field info for table {}: {}", table_id, e);
                Arc::new(Vec::new())
            }
        };
        self.fields.insert(table_id.to_string(), fields.clone());
        fields
    }

    pub fn field(&mut self, field: &FieldRef) -> Option<FieldInfo> {
        self.fields(&field.table_id)
            .iter()
            .find(|f| f.field_id == field.field_id)
            .cloned()
    }

    /// Logical name of a field, empty when unknown.
    pub fn logical_name(&mut self, field: &FieldRef) -> String {
        self.field(field).map(|f| f.logical_name).unwrap_or_default()
    }

    /// Raw values of a field, empty if the catalog cannot provide them.
    pub fn values(&mut self, field: &FieldRef) -> Vec<String> {
        let table = match self.values.get(&field.table_id) {
            Some(table) => table,
            None => {
                let table = match self.source.fetch_table_values(&field.table_id, self.value_limit) {
                    Ok(table) => Arc::new(table),
                    Err(e) => {
                        warn!("No data for table {}: {}", field.table_id, e);
                        Arc::new(AHashMap::new())
                    }
                };
                self.values.insert(field.table_id.clone(), table.clone());
                table
            }
        };
        table.get(&field.field_id).cloned().unwrap_or_else(|| {
            warn!("No data for field {}", field);
            Vec::new()
        })
    }

    /// Drop everything fetched so far.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.values.clear();
    }
}
