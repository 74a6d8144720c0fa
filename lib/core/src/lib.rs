//! # fieldfuse Core
//!
//! Core library for the fieldfuse schema matcher.
//!
//! This crate provides the building blocks shared by every matcher:
//!
//! - [`FieldRef`] / [`FieldInfo`] - field identifiers and catalog metadata
//! - [`BoundedCache`] - LRU cache with a hard capacity
//! - [`Vector`] - dense vectors with epsilon-stable cosine similarity
//! - [`DataSource`], [`Tokenizer`], [`SimilarityModel`], [`IdfTable`] - collaborator traits
//! - [`FieldCatalog`] - request-scoped, failure tolerant view over a data source
//!
//! ## Example
//!
//! ```rust
//! use fieldfuse_core::{FieldCatalog, FieldRef, MemorySource};
//! use std::sync::Arc;
//!
//! let source = MemorySource::new()
//!     .with_table("t1", vec![("f1", "手机号码", vec!["13800138000"])]);
//! let mut catalog = FieldCatalog::new(Arc::new(source), None, 16);
//!
//! let values = catalog.values(&FieldRef::new("t1", "f1"));
//! assert_eq!(values, vec!["13800138000".to_string()]);
//! ```

pub mod cache;
pub mod catalog;
pub mod embed;
pub mod error;
pub mod field;
pub mod memory;
pub mod source;
pub mod tokenizer;
pub mod vector;

pub use cache::BoundedCache;
pub use catalog::FieldCatalog;
pub use embed::HashingModel;
pub use error::{Error, Result};
pub use field::{FieldInfo, FieldRef};
pub use memory::{MemoryField, MemorySource};
pub use source::{DataSource, IdfTable, SimilarityModel, Tokenizer};
pub use tokenizer::SimpleTokenizer;
pub use vector::Vector;
