//! # fieldfuse Matcher
//!
//! Field matching engine: profiles field contents, scores every field pair
//! of two tables and derives a one-to-one alignment.
//!
//! ## Overview
//!
//! Three signals are computed per field pair:
//! 1. **Instance** - value-type distribution from the [`DetectorRegistry`]
//! 2. **Text** - keyword term counts and value-shape statistics
//! 3. **Semantic** - embedding similarity of the logical field names
//!
//! They are fused into one score, and [`stable_matching`] turns the score
//! matrix into an assignment above a threshold.
//!
//! ## Example
//!
//! ```rust
//! use fieldfuse_core::{FieldRef, HashingModel, MemorySource, SimpleTokenizer};
//! use fieldfuse_matcher::{DetectorRegistry, Gazetteer, MappingExtractor, MatchResources, MatcherConfig};
//! use std::sync::Arc;
//!
//! let source = MemorySource::new()
//!     .with_table("a", vec![("a1", "手机号码", vec!["13812345678", "13987654321", "15011112222"])])
//!     .with_table("b", vec![("b1", "联系电话", vec!["18600001111", "13700002222", "13511113333"])]);
//!
//! let resources = MatchResources {
//!     source: Arc::new(source),
//!     tokenizer: Arc::new(SimpleTokenizer),
//!     model: Arc::new(HashingModel::default()),
//!     idf: Arc::new(ahash::AHashMap::<String, f64>::new()),
//!     registry: Arc::new(DetectorRegistry::builtin(Arc::new(Gazetteer::builtin())).unwrap()),
//! };
//! let mut extractor = MappingExtractor::new(&resources, MatcherConfig::default(), None, 16).unwrap();
//!
//! let mapping = extractor.match_tables("a", "b", false);
//! assert_eq!(mapping.get(&FieldRef::new("a", "a1")), Some(&FieldRef::new("b", "b1")));
//! ```

pub mod classifier;
pub mod config;
pub mod evaluate;
pub mod extractor;
pub mod feature;
pub mod gazetteer;
pub mod instance;
pub mod mapping;
pub mod semantic;
pub mod stable;
pub mod text;

pub use classifier::{FeatureClassifier, InstanceProfile, ProfileAccumulator};
pub use config::MatcherConfig;
pub use evaluate::{measure, punish_sweep, GoldStandard, Measurement, ScoredPair, SweepReport};
pub use extractor::{fuse, FieldMapping, MappingExtractor, MatchResources, ScoreComponents, TablePairScores};
pub use feature::{builtin_detectors, Detector, DetectorRegistry, Rule};
pub use gazetteer::{Gazetteer, GazetteerData};
pub use instance::InstanceMatcher;
pub use mapping::{execute, FieldRecord, MatchRequest, MultiMapping, RelatedField};
pub use semantic::SemanticMatcher;
pub use stable::{stable_matching, Assignment, ScoreMatrix};
pub use text::{kind, TextMatcher, TextRepresentation, TextStatistics};
