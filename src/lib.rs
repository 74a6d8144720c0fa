//! # fieldfuse
//!
//! Automatic schema matching across heterogeneous tables.
//!
//! For every pair of tables fieldfuse scores each pair of fields from three
//! angles and keeps a one-to-one alignment:
//!
//! - **Instance**: what kinds of values the fields hold (phones, dates, names, ...)
//! - **Text**: keyword overlap and length statistics of the values
//! - **Semantic**: similarity of the human readable field names
//!
//! The fused scores go through a stable matching pass, so no field is paired
//! twice and every kept pair clears the configured threshold.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! fieldfuse --config fieldfuse.toml --http-port 8000
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use fieldfuse::prelude::*;
//! use std::sync::Arc;
//!
//! let source = MemorySource::new()
//!     .with_table("crm", vec![("tel", "手机号码", vec!["13812345678", "13987654321", "15011112222"])])
//!     .with_table("erp", vec![("phone", "联系电话", vec!["18600001111", "13700002222", "13511113333"])]);
//! let resources = MatchResources {
//!     source: Arc::new(source),
//!     tokenizer: Arc::new(SimpleTokenizer),
//!     model: Arc::new(HashingModel::default()),
//!     idf: Arc::new(IdfCorpus::default()),
//!     registry: Arc::new(DetectorRegistry::builtin(Arc::new(Gazetteer::builtin())).unwrap()),
//! };
//! let mut extractor = MappingExtractor::new(&resources, MatcherConfig::default(), None, 16).unwrap();
//!
//! let request = MatchRequest::OneToOne { source: "crm".into(), target: "erp".into() };
//! let mapping = execute(&mut extractor, &request);
//! assert_eq!(mapping.get(&FieldRef::new("crm", "tel")), Some(&[FieldRef::new("erp", "phone")][..]));
//! ```
//!
//! ## Crate Structure
//!
//! - `fieldfuse-core` - field identifiers, caches, collaborator traits
//! - `fieldfuse-matcher` - the matchers, stable matching and evaluation
//! - `fieldfuse-storage` - task status store and IDF corpus
//! - `fieldfuse-api` - REST API, worker pool, catalog and callback adapters

pub mod resources;
pub mod settings;

pub use fieldfuse_core::{
    DataSource, Error, FieldInfo, FieldRef, HashingModel, IdfTable, MemorySource, Result,
    SimilarityModel, SimpleTokenizer, Tokenizer,
};

pub use fieldfuse_matcher::{
    execute, punish_sweep, stable_matching, DetectorRegistry, FieldRecord, Gazetteer, GoldStandard,
    MappingExtractor, MatchRequest, MatchResources, MatcherConfig, MultiMapping, ScoreMatrix,
};

pub use fieldfuse_storage::{IdfBuilder, IdfCorpus, TaskStatus, TaskStore};

pub use fieldfuse_api::{HttpSource, RestApi, WorkerPool};

pub use resources::build_resources;
pub use settings::Settings;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        execute, DataSource, DetectorRegistry, Error, FieldInfo, FieldRef, Gazetteer, HashingModel,
        IdfCorpus, MappingExtractor, MatchRequest, MatchResources, MatcherConfig, MemorySource,
        MultiMapping, Result, Settings, SimpleTokenizer,
    };
}
