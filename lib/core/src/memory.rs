use crate::field::FieldInfo;
use crate::source::DataSource;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One column of an in-memory table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryField {
    #[serde(flatten)]
    pub info: FieldInfo,
    #[serde(default)]
    pub values: Vec<String>,
}

/// In-memory catalog. Backs tests, demos and offline evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySource {
    tables: HashMap<String, Vec<MemoryField>>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a table.
    pub fn insert_table(&mut self, table_id: impl Into<String>, fields: Vec<MemoryField>) {
        self.tables.insert(table_id.into(), fields);
    }

    /// Builder style helper: `(field_id, logical_name, values)`.
    #[must_use]
    pub fn with_table<S: AsRef<str>>(
        mut self,
        table_id: &str,
        fields: Vec<(&str, &str, Vec<S>)>,
    ) -> Self {
        let fields = fields
            .into_iter()
            .map(|(field_id, logical_name, values)| MemoryField {
                info: FieldInfo::new(field_id, field_id, logical_name),
                values: values.iter().map(|v| v.as_ref().to_string()).collect(),
            })
            .collect();
        self.insert_table(table_id, fields);
        self
    }

    /// Load `{ "<table_id>": [ {field_id, physical_name, logical_name, values}, ... ] }`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let tables: HashMap<String, Vec<MemoryField>> = serde_json::from_str(&data)?;
        Ok(Self { tables })
    }

    pub fn table_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tables.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn table(&self, table_id: &str) -> Result<&Vec<MemoryField>> {
        self.tables
            .get(table_id)
            .ok_or_else(|| Error::DataUnavailable(format!("table {}", table_id)))
    }
}

impl DataSource for MemorySource {
    fn fetch_fields(&self, table_id: &str) -> Result<Vec<FieldInfo>> {
        Ok(self.table(table_id)?.iter().map(|f| f.info.clone()).collect())
    }

    fn fetch_values(&self, table_id: &str, field_id: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let field = self
            .table(table_id)?
            .iter()
            .find(|f| f.info.field_id == field_id)
            .ok_or_else(|| Error::DataUnavailable(format!("field {}/{}", table_id, field_id)))?;
        let take = limit.unwrap_or(usize::MAX);
        Ok(field.values.iter().take(take).cloned().collect())
    }
}
