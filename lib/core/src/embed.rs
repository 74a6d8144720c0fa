//! Local phrase embedding model
//!
//! Hashes padded character trigrams and whitespace separated words into a
//! fixed number of buckets. Buckets come from a SHA-256 digest, so the
//! same text embeds identically on every platform and release. This is the
//! default model when no external embedding service is configured.

use crate::source::SimilarityModel;
use crate::vector::Vector;
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Default embedding dimension
pub const DEFAULT_DIM: usize = 256;

/// Weight of a whole word relative to a single trigram
const WORD_WEIGHT: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct HashingModel {
    dim: usize,
}

impl HashingModel {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::Configuration(
                "embedding dimension must be positive".to_string(),
            ));
        }
        Ok(Self { dim })
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    fn bucket(&self, item: &str) -> usize {
        let digest = Sha256::digest(item.as_bytes());
        let hash = digest[..8].iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        (hash % self.dim as u64) as usize
    }
}

impl Default for HashingModel {
    fn default() -> Self {
        Self { dim: DEFAULT_DIM }
    }
}

impl SimilarityModel for HashingModel {
    fn embed(&self, text: &str) -> Result<Vector> {
        let normalized = text.trim().to_lowercase();
        let mut vector = Vector::zeros(self.dim);
        if normalized.is_empty() {
            return Ok(vector);
        }

        let components = vector.as_mut_slice();
        for trigram in trigrams(&normalized) {
            components[self.bucket(trigram.as_str())] += 1.0;
        }
        for word in normalized.split_whitespace() {
            components[self.bucket(word)] += WORD_WEIGHT;
        }

        vector.normalize();
        Ok(vector)
    }
}

fn trigrams(s: &str) -> Vec<String> {
    let padded = format!("  {}  ", s);
    let chars: Vec<char> = padded.chars().collect();
    let mut seen = ahash::AHashSet::new();
    chars
        .windows(3)
        .map(|w| w.iter().collect::<String>())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_scores_one() {
        let model = HashingModel::default();
        let s = model.score("手机号码", "手机号码").unwrap();
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_case_insensitive() {
        let model = HashingModel::default();
        let s = model.score("Phone Number", "phone number").unwrap();
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_shared_trigrams_score_higher() {
        let model = HashingModel::default();
        let close = model.score("customer name", "customer names").unwrap();
        let far = model.score("customer name", "zip").unwrap();
        assert!(close > 0.5);
        assert!(far < close);
    }

    #[test]
    fn test_empty_text_embeds_to_zero() {
        let model = HashingModel::new(16).unwrap();
        let v = model.embed("   ").unwrap();
        assert_eq!(v.dim(), 16);
        assert_eq!(v.norm(), 0.0);
        assert_eq!(model.score("", "abc").unwrap(), 0.0);
    }

    #[test]
    fn test_buckets_are_stable() {
        assert_eq!(HashingModel::default().bucket("手机号码"), 115);
        assert_eq!(HashingModel::default().bucket("phone"), 244);
        assert_eq!(HashingModel::new(16).unwrap().bucket("phone"), 4);

        let a = HashingModel::default().embed("联系电话").unwrap();
        let b = HashingModel::default().embed("联系电话").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(HashingModel::new(0), Err(Error::Configuration(_))));
    }
}
