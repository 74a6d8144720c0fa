//! Lexical field similarity
//!
//! Two signals are combined. The representation score is the cosine of term
//! counts over the union of both fields' keywords. The shape score compares
//! value-length and diversity statistics. Low-diversity fields are judged
//! on the representation score alone.

use ahash::{AHashMap, AHashSet};
use fieldfuse_core::vector::{cosine_similarity, EPSILON};
use fieldfuse_core::{BoundedCache, FieldCatalog, FieldRef, IdfTable, Result, Tokenizer};
use std::sync::Arc;

/// Term counts of a field and its most important terms.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRepresentation {
    counts: AHashMap<String, u64>,
    keywords: Vec<String>,
}

impl TextRepresentation {
    /// Build from lowercased terms in first-seen order.
    ///
    /// Importance is `count * idf`. The vocabulary is cut to the
    /// `max_count` most important terms when larger, and the top
    /// `num_keywords` become the keyword set. Ties keep first-seen order.
    pub fn build<I>(terms: I, idf: &dyn IdfTable, num_keywords: usize, max_count: usize) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut order: Vec<String> = Vec::new();
        let mut counts: AHashMap<String, u64> = AHashMap::new();
        for term in terms {
            let count = counts.entry(term.clone()).or_insert(0);
            if *count == 0 {
                order.push(term);
            }
            *count += 1;
        }

        let importance: Vec<f64> = order
            .iter()
            .map(|t| idf.idf(t) * counts[t] as f64)
            .collect();
        let mut ranked: Vec<usize> = (0..order.len()).collect();
        ranked.sort_by(|&a, &b| importance[b].total_cmp(&importance[a]));

        if order.len() > max_count {
            counts = ranked[..max_count]
                .iter()
                .map(|&i| (order[i].clone(), counts[&order[i]]))
                .collect();
        }
        let keywords = ranked
            .iter()
            .take(num_keywords)
            .map(|&i| order[i].clone())
            .collect();

        Self { counts, keywords }
    }

    #[must_use]
    pub fn count(&self, term: &str) -> u64 {
        self.counts.get(term).copied().unwrap_or(0)
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[must_use]
    pub fn vocabulary_len(&self) -> usize {
        self.counts.len()
    }

    /// Cosine of raw counts restricted to the union of both keyword sets.
    #[must_use]
    pub fn similarity(&self, other: &TextRepresentation) -> f64 {
        let mut union: Vec<&str> = Vec::with_capacity(self.keywords.len() + other.keywords.len());
        let mut seen = AHashSet::new();
        for term in self.keywords.iter().chain(&other.keywords) {
            if seen.insert(term.as_str()) {
                union.push(term);
            }
        }
        let a: Vec<f64> = union.iter().map(|t| self.count(t) as f64).collect();
        let b: Vec<f64> = union.iter().map(|t| other.count(t) as f64).collect();
        cosine_similarity(&a, &b)
    }
}

/// Shape of a field's values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextStatistics {
    /// Mean character length of distinct values.
    pub avg_len: f64,
    /// Variance of character length of distinct values.
    pub var_len: f64,
    /// Diversity of raw values.
    pub text_kind: f64,
    /// Diversity of terms.
    pub word_kind: f64,
}

impl TextStatistics {
    pub fn compute<S: AsRef<str>>(values: &[S], tokenizer: &dyn Tokenizer) -> Result<Self> {
        let mut texts: AHashSet<&str> = AHashSet::new();
        let mut words: AHashSet<String> = AHashSet::new();
        let mut word_count = 0usize;
        for value in values {
            let value = value.as_ref();
            texts.insert(value);
            for word in tokenizer.segment(value)? {
                words.insert(word);
                word_count += 1;
            }
        }

        let lengths: Vec<f64> = texts.iter().map(|t| t.chars().count() as f64).collect();
        let (avg_len, var_len) = if lengths.is_empty() {
            (0.0, 0.0)
        } else {
            let n = lengths.len() as f64;
            let avg = lengths.iter().sum::<f64>() / n;
            let var = lengths.iter().map(|l| (l - avg).powi(2)).sum::<f64>() / n;
            (avg, var)
        };

        Ok(Self {
            avg_len,
            var_len,
            text_kind: kind(values.len(), texts.len()),
            word_kind: kind(word_count, words.len()),
        })
    }

    #[must_use]
    pub fn as_array(&self) -> [f64; 4] {
        [self.avg_len, self.var_len, self.text_kind, self.word_kind]
    }
}

/// Diversity of `count` observations with `distinct` distinct values:
/// `log2(n·d / (n - d) + 1)`.
///
/// 0 for fewer than two observations. When every observation is distinct
/// the pair is rescaled to `(2n, 2d - 0.5)`; thresholds downstream were
/// tuned against exactly this behaviour.
#[must_use]
pub fn kind(count: usize, distinct: usize) -> f64 {
    if count <= 1 {
        return 0.0;
    }
    let mut n = count as f64;
    let mut d = distinct as f64;
    if count == distinct {
        d = d * 2.0 - 0.5;
        n *= 2.0;
    }
    (n * d / (n - d) + 1.0).log2()
}

#[inline]
fn approx_zero(x: f64) -> bool {
    x.abs() < EPSILON
}

/// Component-wise `min/max` similarity of two statistic vectors, weighted
/// by `1 / log2(sim / min_sim + 1)` so the closest components dominate.
#[must_use]
pub fn weighted_score(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let sim: Vec<f64> = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let hi = x.max(y);
            if approx_zero(hi) {
                1.0
            } else {
                x.min(y) / hi
            }
        })
        .collect();

    let min_sim = sim
        .iter()
        .copied()
        .filter(|s| !approx_zero(*s))
        .fold(f64::INFINITY, f64::min);
    if !min_sim.is_finite() {
        return 0.0;
    }

    let weights: Vec<f64> = sim
        .iter()
        .map(|&s| if approx_zero(s) { 1.0 } else { 1.0 / (s / min_sim + 1.0).log2() })
        .collect();
    let total: f64 = weights.iter().sum();
    sim.iter().zip(&weights).map(|(s, w)| s * w / total).sum()
}

/// Blend the representation score with the shape score.
#[must_use]
pub fn combine(score: f64, a: &TextStatistics, b: &TextStatistics) -> f64 {
    if a.text_kind < 1.0 || b.text_kind < 1.0 {
        return score;
    }
    let (ka, kb) = (a.text_kind, b.text_kind);
    let rep_weight = score + (1.0 - score) * (ka + kb) / (2.0 * ka * kb);
    score * rep_weight + weighted_score(&a.as_array(), &b.as_array()) * (1.0 - rep_weight)
}

pub struct TextMatcher {
    tokenizer: Arc<dyn Tokenizer>,
    idf: Arc<dyn IdfTable>,
    num_keywords: usize,
    max_count: usize,
    rep_cache_size: usize,
    stats_cache_size: usize,
    representations: BoundedCache<FieldRef, Arc<TextRepresentation>>,
    statistics: BoundedCache<FieldRef, TextStatistics>,
}

impl TextMatcher {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        idf: Arc<dyn IdfTable>,
        num_keywords: usize,
        max_count: usize,
        rep_cache_size: usize,
        stats_cache_size: usize,
    ) -> Self {
        Self {
            tokenizer,
            idf,
            num_keywords,
            max_count,
            rep_cache_size,
            stats_cache_size,
            representations: BoundedCache::new(rep_cache_size),
            statistics: BoundedCache::new(stats_cache_size),
        }
    }

    pub fn representation(&mut self, field: &FieldRef, catalog: &mut FieldCatalog) -> Result<Arc<TextRepresentation>> {
        if let Some(rep) = self.representations.get(field) {
            return Ok(rep);
        }
        let mut terms = Vec::new();
        for value in catalog.values(field) {
            terms.extend(self.tokenizer.segment(&value)?.into_iter().map(|t| t.to_lowercase()));
        }
        let rep = Arc::new(TextRepresentation::build(
            terms,
            self.idf.as_ref(),
            self.num_keywords,
            self.max_count,
        ));
        self.representations.insert(field.clone(), rep.clone());
        Ok(rep)
    }

    pub fn statistics(&mut self, field: &FieldRef, catalog: &mut FieldCatalog) -> Result<TextStatistics> {
        if let Some(stats) = self.statistics.get(field) {
            return Ok(stats);
        }
        let values = catalog.values(field);
        let stats = TextStatistics::compute(values.as_slice(), self.tokenizer.as_ref())?;
        self.statistics.insert(field.clone(), stats);
        Ok(stats)
    }

    pub fn score(&mut self, a: &FieldRef, b: &FieldRef, catalog: &mut FieldCatalog) -> Result<f64> {
        let rep_a = self.representation(a, catalog)?;
        let rep_b = self.representation(b, catalog)?;
        let stats_a = self.statistics(a, catalog)?;
        let stats_b = self.statistics(b, catalog)?;
        Ok(combine(rep_a.similarity(&rep_b), &stats_a, &stats_b))
    }

    /// Replace both caches with fresh empty ones.
    pub fn clear(&mut self) {
        self.representations = BoundedCache::new(self.rep_cache_size);
        self.statistics = BoundedCache::new(self.stats_cache_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldfuse_core::{MemorySource, SimpleTokenizer};

    fn flat_idf(terms: &[&str]) -> AHashMap<String, f64> {
        terms.iter().map(|t| (t.to_string(), 1.0)).collect()
    }

    fn terms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_kind_edge_cases() {
        assert_eq!(kind(0, 0), 0.0);
        assert_eq!(kind(1, 1), 0.0);
        // all distinct: n = 4, d = 3.5 -> log2(4 * 3.5 / 0.5 + 1) = log2(29)
        let all_distinct = kind(2, 2);
        assert!(all_distinct.is_finite());
        assert!((all_distinct - 29f64.log2()).abs() < 1e-12);
        // n = 4, d = 2 -> log2(4 * 2 / 2 + 1) = log2(5)
        assert!((kind(4, 2) - 5f64.log2()).abs() < 1e-12);
    }

    #[test]
    fn test_kind_grows_with_variety() {
        let count = 100;
        let mut previous = kind(count, 1);
        for distinct in 2..count {
            let k = kind(count, distinct);
            assert!(k > previous, "kind({}, {}) = {} <= {}", count, distinct, k, previous);
            previous = k;
        }
        assert!(kind(count, count) > previous);
    }

    #[test]
    fn test_keywords_by_importance() {
        let idf: AHashMap<String, f64> = [("rare", 5.0), ("common", 0.1)]
            .iter()
            .map(|(t, v)| (t.to_string(), *v))
            .collect();
        let rep = TextRepresentation::build(
            terms(&["common", "common", "common", "rare", "unknown"]),
            &idf,
            2,
            10,
        );
        assert_eq!(rep.keywords(), &["rare".to_string(), "common".to_string()]);
        assert_eq!(rep.count("common"), 3);
        assert_eq!(rep.vocabulary_len(), 3);
    }

    #[test]
    fn test_vocabulary_capped_by_importance() {
        let idf = flat_idf(&["a", "b", "c"]);
        let rep = TextRepresentation::build(terms(&["c", "a", "a", "b", "b", "b"]), &idf, 1, 2);
        assert_eq!(rep.vocabulary_len(), 2);
        assert_eq!(rep.count("c"), 0);
        assert_eq!(rep.count("b"), 3);
        assert_eq!(rep.keywords(), &["b".to_string()]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let idf = AHashMap::new();
        let rep = TextRepresentation::build(terms(&["x", "y", "z"]), &idf, 2, 10);
        assert_eq!(rep.keywords(), &["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_representation_similarity() {
        let idf = flat_idf(&["red", "green", "blue"]);
        let a = TextRepresentation::build(terms(&["red", "green", "red"]), &idf, 10, 10);
        let b = TextRepresentation::build(terms(&["red", "green", "red"]), &idf, 10, 10);
        let c = TextRepresentation::build(terms(&["blue"]), &idf, 10, 10);
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
        assert_eq!(a.similarity(&c), 0.0);

        let empty = TextRepresentation::build(Vec::new(), &idf, 10, 10);
        assert_eq!(empty.similarity(&empty), 0.0);
    }

    #[test]
    fn test_statistics() {
        let stats = TextStatistics::compute(&["ab", "abcd", "ab"], &SimpleTokenizer).unwrap();
        assert!((stats.avg_len - 3.0).abs() < 1e-12);
        assert!((stats.var_len - 1.0).abs() < 1e-12);
        assert!((stats.text_kind - kind(3, 2)).abs() < 1e-12);
        assert!((stats.word_kind - kind(3, 2)).abs() < 1e-12);

        let empty = TextStatistics::compute::<&str>(&[], &SimpleTokenizer).unwrap();
        assert_eq!(empty, TextStatistics::default());
    }

    #[test]
    fn test_weighted_score() {
        let a = [2.0, 1.0, 4.0, 4.0];
        assert!((weighted_score(&a, &a) - 1.0).abs() < 1e-12);

        // zero variance on both sides counts as identical
        let b = [2.0, 0.0, 4.0, 4.0];
        assert!((weighted_score(&b, &b) - 1.0).abs() < 1e-12);

        let c = [1.0, 0.0, 2.0, 2.0];
        let d = [2.0, 3.0, 4.0, 4.0];
        let s = weighted_score(&c, &d);
        assert!(s > 0.0 && s < 1.0);

        assert_eq!(weighted_score(&[1.0, 0.0, 1.0, 0.0], &[0.0, 1.0, 0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_low_diversity_returns_raw_score() {
        let low = TextStatistics { avg_len: 1.0, var_len: 0.0, text_kind: 0.5, word_kind: 0.5 };
        let high = TextStatistics { avg_len: 9.0, var_len: 4.0, text_kind: 8.0, word_kind: 8.0 };
        assert_eq!(combine(0.3, &low, &high), 0.3);
    }

    #[test]
    fn test_combine_stays_in_unit_range() {
        let a = TextStatistics { avg_len: 11.0, var_len: 0.0, text_kind: 6.0, word_kind: 6.0 };
        let b = TextStatistics { avg_len: 3.0, var_len: 1.5, text_kind: 2.0, word_kind: 3.0 };
        for score in [0.0, 0.25, 0.5, 1.0] {
            let s = combine(score, &a, &b);
            assert!((0.0..=1.0 + 1e-12).contains(&s), "combine({}) = {}", score, s);
        }
    }

    #[test]
    fn test_matcher_caches_and_clears() {
        let source = MemorySource::new()
            .with_table("a", vec![("f", "颜色", vec!["red", "green", "red", "blue"])])
            .with_table("b", vec![("g", "colour", vec!["Red", "Green", "RED", "blue"])]);
        let mut catalog = FieldCatalog::new(Arc::new(source), None, 4);
        let idf: Arc<dyn IdfTable> = Arc::new(flat_idf(&["red", "green", "blue"]));
        let mut matcher = TextMatcher::new(Arc::new(SimpleTokenizer), idf, 10, 100, 4, 4);

        let a = FieldRef::new("a", "f");
        let b = FieldRef::new("b", "g");
        let first = matcher.representation(&a, &mut catalog).unwrap();
        assert!(Arc::ptr_eq(&first, &matcher.representation(&a, &mut catalog).unwrap()));

        let s = matcher.score(&a, &b, &mut catalog).unwrap();
        assert!(s > 0.5, "score {}", s);

        matcher.clear();
        assert!(!Arc::ptr_eq(&first, &matcher.representation(&a, &mut catalog).unwrap()));
    }
}
