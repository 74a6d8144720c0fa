//! Pairwise table alignment
//!
//! [`MappingExtractor`] scores every field pair of two tables with the
//! instance, text and semantic matchers, fuses the three signals and runs
//! [`stable_matching`] over the resulting matrix.

use crate::config::MatcherConfig;
use crate::feature::DetectorRegistry;
use crate::instance::InstanceMatcher;
use crate::semantic::SemanticMatcher;
use crate::stable::{stable_matching, ScoreMatrix};
use crate::text::TextMatcher;
use fieldfuse_core::{
    DataSource, FieldCatalog, FieldRef, IdfTable, Result, SimilarityModel, Tokenizer,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared read-only collaborators. Built once per process, cloned into
/// every extractor.
#[derive(Clone)]
pub struct MatchResources {
    pub source: Arc<dyn DataSource>,
    pub tokenizer: Arc<dyn Tokenizer>,
    pub model: Arc<dyn SimilarityModel>,
    pub idf: Arc<dyn IdfTable>,
    pub registry: Arc<DetectorRegistry>,
}

/// Field to field alignment between tables.
pub type FieldMapping = BTreeMap<FieldRef, FieldRef>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreComponents {
    pub instance: f64,
    pub text: f64,
    pub semantic: f64,
    /// Instance and text blended, before the semantic penalty.
    pub combined: f64,
    pub score: f64,
}

/// `instance² + (1 - instance)·text`
#[inline]
#[must_use]
pub fn combine(instance: f64, text: f64) -> f64 {
    instance * instance + (1.0 - instance) * text
}

/// Pull `combined` down by the semantic dissimilarity, scaled by its
/// distance from `punish`.
#[inline]
#[must_use]
pub fn penalize(combined: f64, semantic: f64, punish: f64) -> f64 {
    combined - (punish - combined) * (1.0 - semantic)
}

#[must_use]
pub fn fuse(instance: f64, text: f64, semantic: f64, punish: f64) -> ScoreComponents {
    let combined = combine(instance, text);
    ScoreComponents {
        instance,
        text,
        semantic,
        combined,
        score: penalize(combined, semantic, punish),
    }
}

/// Full score grid of two tables.
#[derive(Debug, Clone)]
pub struct TablePairScores {
    pub left: Vec<FieldRef>,
    pub right: Vec<FieldRef>,
    pub combined: ScoreMatrix,
    pub semantic: ScoreMatrix,
    pub score: ScoreMatrix,
}

/// Stateful matcher for one worker. Not shared between threads; every
/// request must end with [`MappingExtractor::clear`].
pub struct MappingExtractor {
    config: MatcherConfig,
    catalog: FieldCatalog,
    text: TextMatcher,
    instance: InstanceMatcher,
    semantic: SemanticMatcher,
}

impl MappingExtractor {
    pub fn new(
        resources: &MatchResources,
        config: MatcherConfig,
        value_limit: Option<usize>,
        cache_tables: usize,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog: FieldCatalog::new(resources.source.clone(), value_limit, cache_tables),
            text: TextMatcher::new(
                resources.tokenizer.clone(),
                resources.idf.clone(),
                config.num_keywords,
                config.max_text_count,
                config.cache_text_rep_size,
                config.cache_text_statistics,
            ),
            instance: InstanceMatcher::new(
                resources.registry.clone(),
                resources.tokenizer.clone(),
                config.cache_instance_statistics,
            ),
            semantic: SemanticMatcher::new(resources.model.clone(), config.cache_embedding_size),
            config,
        })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Field identifiers of a table in catalog order.
    pub fn field_refs(&mut self, table_id: &str) -> Vec<FieldRef> {
        self.catalog
            .fields(table_id)
            .iter()
            .map(|f| f.field_ref(table_id))
            .collect()
    }

    pub fn score_components(&mut self, a: &FieldRef, b: &FieldRef) -> Result<ScoreComponents> {
        let text = self.text.score(a, b, &mut self.catalog)?;
        let instance = self.instance.score(a, b, &mut self.catalog, &mut self.semantic)?;
        let semantic = self.semantic.score(a, b, &mut self.catalog)?;
        Ok(fuse(instance, text, semantic, self.config.punish))
    }

    /// Fused score of a pair. A pair that cannot be scored gets negative
    /// infinity and is never accepted.
    pub fn score(&mut self, a: &FieldRef, b: &FieldRef) -> f64 {
        match self.score_components(a, b) {
            Ok(c) if c.score.is_nan() => {
                warn!("Score of {} / {} is not a number, excluding pair", a, b);
                f64::NEG_INFINITY
            }
            Ok(c) => c.score,
            Err(e) => {
                warn!("Cannot score {} / {}: {}", a, b, e);
                f64::NEG_INFINITY
            }
        }
    }

    pub fn score_matrix(&mut self, left: &[FieldRef], right: &[FieldRef]) -> ScoreMatrix {
        let mut matrix = ScoreMatrix::new(left.len(), right.len());
        for (i, a) in left.iter().enumerate() {
            for (j, b) in right.iter().enumerate() {
                matrix.set(i, j, self.score(a, b));
            }
        }
        matrix
    }

    /// Every component matrix of two tables. Unscorable pairs carry
    /// negative infinity in all three.
    pub fn table_pair_scores(&mut self, table_1: &str, table_2: &str) -> TablePairScores {
        let left = self.field_refs(table_1);
        let right = self.field_refs(table_2);
        let mut combined = ScoreMatrix::new(left.len(), right.len());
        let mut semantic = ScoreMatrix::new(left.len(), right.len());
        let mut score = ScoreMatrix::new(left.len(), right.len());
        for (i, a) in left.iter().enumerate() {
            for (j, b) in right.iter().enumerate() {
                let c = match self.score_components(a, b) {
                    Ok(c) => (c.combined, c.semantic, c.score),
                    Err(e) => {
                        warn!("Cannot score {} / {}: {}", a, b, e);
                        (f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY)
                    }
                };
                combined.set(i, j, c.0);
                semantic.set(i, j, c.1);
                score.set(i, j, c.2);
            }
        }
        TablePairScores {
            left,
            right,
            combined,
            semantic,
            score,
        }
    }

    /// Align the fields of two tables.
    ///
    /// A table matched against itself maps every field to itself. With
    /// `both`, reverse entries are added so the mapping can be looked up
    /// from either side.
    pub fn match_tables(&mut self, table_1: &str, table_2: &str, both: bool) -> FieldMapping {
        let left = self.field_refs(table_1);
        if table_1 == table_2 {
            return left.iter().map(|f| (f.clone(), f.clone())).collect();
        }
        let right = self.field_refs(table_2);

        let matrix = self.score_matrix(&left, &right);
        let assignments = stable_matching(&matrix, self.config.threshold);

        let mut mapping = FieldMapping::new();
        for a in &assignments {
            debug!("{} -> {} ({:.4})", left[a.row], right[a.col], a.score);
            mapping.insert(left[a.row].clone(), right[a.col].clone());
            if both {
                mapping.insert(right[a.col].clone(), left[a.row].clone());
            }
        }
        debug!(
            "Matched {} of {}x{} fields between {} and {}",
            assignments.len(),
            left.len(),
            right.len(),
            table_1,
            table_2
        );
        mapping
    }

    /// Drop every cached field, value, profile, representation and
    /// embedding.
    pub fn clear(&mut self) {
        self.catalog.clear();
        self.text.clear();
        self.instance.clear();
        self.semantic.clear();
    }
}
