//! Multi-table requests built on the pairwise extractor.

use crate::extractor::{FieldMapping, MappingExtractor};
use fieldfuse_core::{Error, FieldRef, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Which table pairs a request aligns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchRequest {
    /// Every unordered pair, mapped in both directions.
    All { tables: Vec<String> },
    OneToAll { source: String, targets: Vec<String> },
    OneToOne { source: String, target: String },
    /// Every source against every target.
    SomeToAll { sources: Vec<String>, targets: Vec<String> },
}

fn check_ids(what: &str, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        return Err(Error::Parameter(format!("{} must not be empty", what)));
    }
    if ids.iter().any(|id| id.trim().is_empty()) {
        return Err(Error::Parameter(format!("{} contains an empty table id", what)));
    }
    Ok(())
}

fn check_id(what: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::Parameter(format!("{} must not be empty", what)));
    }
    Ok(())
}

impl MatchRequest {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            MatchRequest::All { .. } => "all",
            MatchRequest::OneToAll { .. } => "one2all",
            MatchRequest::OneToOne { .. } => "one2one",
            MatchRequest::SomeToAll { .. } => "some2all",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            MatchRequest::All { tables } => check_ids("tables", tables),
            MatchRequest::OneToAll { source, targets } => {
                check_id("source", source)?;
                check_ids("targets", targets)
            }
            MatchRequest::OneToOne { source, target } => {
                check_id("source", source)?;
                check_id("target", target)
            }
            MatchRequest::SomeToAll { sources, targets } => {
                check_ids("sources", sources)?;
                check_ids("targets", targets)
            }
        }
    }

    /// Ordered table pairs to align and whether reverse entries are wanted.
    #[must_use]
    pub fn pairs(&self) -> Vec<(String, String, bool)> {
        match self {
            MatchRequest::All { tables } => {
                let mut pairs = Vec::new();
                for (i, a) in tables.iter().enumerate() {
                    for b in &tables[i + 1..] {
                        pairs.push((a.clone(), b.clone(), true));
                    }
                }
                pairs
            }
            MatchRequest::OneToAll { source, targets } => targets
                .iter()
                .map(|t| (source.clone(), t.clone(), false))
                .collect(),
            MatchRequest::OneToOne { source, target } => vec![(source.clone(), target.clone(), false)],
            MatchRequest::SomeToAll { sources, targets } => sources
                .iter()
                .flat_map(|s| targets.iter().map(move |t| (s.clone(), t.clone(), false)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedField {
    pub asset_id: String,
    pub field_id: String,
}

/// A source field and every field it was aligned with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    pub asset_id: String,
    pub field_id: String,
    pub related_fields: Vec<RelatedField>,
}

/// Field to fields alignment with at most one related field per table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiMapping {
    entries: BTreeMap<FieldRef, Vec<FieldRef>>,
}

impl MultiMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `from -> to`. Returns false if `from` already relates to a field
    /// of `to`'s table.
    pub fn insert(&mut self, from: FieldRef, to: FieldRef) -> bool {
        let related = self.entries.entry(from).or_default();
        if related.iter().any(|r| r.table_id == to.table_id) {
            return false;
        }
        related.push(to);
        true
    }

    pub fn merge(&mut self, mapping: FieldMapping) {
        for (from, to) in mapping {
            if !self.insert(from.clone(), to.clone()) {
                debug!("Dropping {} -> {}: table already related", from, to);
            }
        }
    }

    #[must_use]
    pub fn get(&self, field: &FieldRef) -> Option<&[FieldRef]> {
        self.entries.get(field).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldRef, &Vec<FieldRef>)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn records(&self) -> Vec<FieldRecord> {
        self.entries
            .iter()
            .map(|(from, related)| FieldRecord {
                asset_id: from.table_id.clone(),
                field_id: from.field_id.clone(),
                related_fields: related
                    .iter()
                    .map(|r| RelatedField {
                        asset_id: r.table_id.clone(),
                        field_id: r.field_id.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Run a request to completion. Extractor caches are cleared afterwards.
pub fn execute(extractor: &mut MappingExtractor, request: &MatchRequest) -> MultiMapping {
    let mut result = MultiMapping::new();
    for (a, b, both) in request.pairs() {
        result.merge(extractor.match_tables(&a, &b, both));
    }
    extractor.clear();
    info!("{} request aligned {} fields", request.name(), result.len());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pairs() {
        let all = MatchRequest::All { tables: tables(&["a", "b", "c"]) };
        assert_eq!(
            all.pairs(),
            vec![
                ("a".to_string(), "b".to_string(), true),
                ("a".to_string(), "c".to_string(), true),
                ("b".to_string(), "c".to_string(), true),
            ]
        );

        let some = MatchRequest::SomeToAll {
            sources: tables(&["a", "b"]),
            targets: tables(&["x", "y"]),
        };
        assert_eq!(some.pairs().len(), 4);
        assert!(some.pairs().iter().all(|(_, _, both)| !both));

        let one = MatchRequest::OneToOne { source: "a".into(), target: "b".into() };
        assert_eq!(one.pairs(), vec![("a".to_string(), "b".to_string(), false)]);
    }

    #[test]
    fn test_validate() {
        assert!(MatchRequest::All { tables: vec![] }.validate().is_err());
        assert!(MatchRequest::OneToOne { source: "a".into(), target: " ".into() }
            .validate()
            .is_err());
        assert!(MatchRequest::OneToAll { source: "a".into(), targets: tables(&["b"]) }
            .validate()
            .is_ok());
    }

    #[test]
    fn test_one_related_field_per_table() {
        let mut m = MultiMapping::new();
        let from = FieldRef::new("a", "1");
        assert!(m.insert(from.clone(), FieldRef::new("b", "1")));
        assert!(!m.insert(from.clone(), FieldRef::new("b", "2")));
        assert!(m.insert(from.clone(), FieldRef::new("c", "1")));
        assert_eq!(m.get(&from).map(<[FieldRef]>::len), Some(2));
    }

    #[test]
    fn test_records_format() {
        let mut m = MultiMapping::new();
        m.insert(FieldRef::new("a", "1"), FieldRef::new("b", "7"));
        let json = serde_json::to_value(m.records()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "assetId": "a",
                "fieldId": "1",
                "relatedFields": [{"assetId": "b", "fieldId": "7"}]
            }])
        );
    }

    #[test]
    fn test_request_json() {
        let request: MatchRequest =
            serde_json::from_str(r#"{"kind": "one_to_all", "source": "a", "targets": ["b", "c"]}"#).unwrap();
        assert_eq!(request.name(), "one2all");
    }
}
