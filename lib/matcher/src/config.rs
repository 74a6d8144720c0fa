use fieldfuse_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tuning knobs of the matching engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Score ceiling used to scale the semantic dissimilarity penalty.
    pub punish: f64,
    /// Minimum fused score for an accepted pair.
    pub threshold: f64,
    /// Number of keywords compared by the text matcher.
    pub num_keywords: usize,
    /// Vocabulary cap of a field's term representation.
    pub max_text_count: usize,
    pub cache_text_rep_size: usize,
    pub cache_text_statistics: usize,
    pub cache_instance_statistics: usize,
    pub cache_embedding_size: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            punish: 1.1,
            threshold: 0.5,
            num_keywords: 50,
            max_text_count: 2000,
            cache_text_rep_size: 256,
            cache_text_statistics: 256,
            cache_instance_statistics: 256,
            cache_embedding_size: 4096,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_keywords > self.max_text_count {
            return Err(Error::Configuration(format!(
                "num_keywords ({}) exceeds max_text_count ({})",
                self.num_keywords, self.max_text_count
            )));
        }
        if !self.punish.is_finite() || self.punish < 1.0 {
            return Err(Error::Configuration(format!(
                "punish must be a finite value >= 1, got {}",
                self.punish
            )));
        }
        if !self.threshold.is_finite() {
            return Err(Error::Configuration("threshold must be finite".to_string()));
        }
        Ok(())
    }
}
