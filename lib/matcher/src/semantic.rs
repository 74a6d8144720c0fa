use fieldfuse_core::{BoundedCache, FieldCatalog, FieldRef, Result, SimilarityModel, Vector};
use std::sync::Arc;

/// Compares fields by their logical names through an embedding model.
///
/// Embeddings are cached per text. Empty names are embedded as-is; the
/// resulting degenerate score is left to the caller.
pub struct SemanticMatcher {
    model: Arc<dyn SimilarityModel>,
    embeddings: BoundedCache<String, Arc<Vector>>,
}

impl SemanticMatcher {
    pub fn new(model: Arc<dyn SimilarityModel>, cache_size: usize) -> Self {
        Self {
            model,
            embeddings: BoundedCache::new(cache_size),
        }
    }

    pub fn embedding(&mut self, text: &str) -> Result<Arc<Vector>> {
        let model = &self.model;
        self.embeddings
            .get_or_try_insert_with(text.to_string(), || model.embed(text).map(Arc::new))
    }

    /// Similarity of two arbitrary phrases.
    pub fn similarity(&mut self, a: &str, b: &str) -> Result<f64> {
        let ea = self.embedding(a)?;
        let eb = self.embedding(b)?;
        Ok(self.model.similarity(&ea, &eb))
    }

    /// Similarity of the logical names of two fields.
    pub fn score(&mut self, a: &FieldRef, b: &FieldRef, catalog: &mut FieldCatalog) -> Result<f64> {
        let name_a = catalog.logical_name(a);
        let name_b = catalog.logical_name(b);
        self.similarity(&name_a, &name_b)
    }

    pub fn cached(&self) -> usize {
        self.embeddings.len()
    }

    pub fn clear(&mut self) {
        self.embeddings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldfuse_core::{Error, HashingModel, MemorySource};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModel {
        inner: HashingModel,
        calls: AtomicUsize,
    }

    impl SimilarityModel for CountingModel {
        fn embed(&self, text: &str) -> Result<Vector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text)
        }
    }

    struct FailingModel;

    impl SimilarityModel for FailingModel {
        fn embed(&self, _text: &str) -> Result<Vector> {
            Err(Error::Model("service down".to_string()))
        }
    }

    #[test]
    fn test_embeddings_cached_until_clear() {
        let model = Arc::new(CountingModel {
            inner: HashingModel::default(),
            calls: AtomicUsize::new(0),
        });
        let mut matcher = SemanticMatcher::new(model.clone(), 16);

        let s = matcher.similarity("手机号码", "手机号码").unwrap();
        assert!((s - 1.0).abs() < 1e-6);
        matcher.similarity("手机号码", "联系电话").unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        assert_eq!(matcher.cached(), 2);

        matcher.clear();
        matcher.similarity("手机号码", "联系电话").unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_field_score_uses_logical_names() {
        let source = MemorySource::new()
            .with_table("t1", vec![("f1", "customer name", Vec::<&str>::new())])
            .with_table("t2", vec![("g1", "Customer Name", Vec::<&str>::new())]);
        let mut catalog = FieldCatalog::new(Arc::new(source), None, 4);
        let mut matcher = SemanticMatcher::new(Arc::new(HashingModel::default()), 16);

        let s = matcher
            .score(&FieldRef::new("t1", "f1"), &FieldRef::new("t2", "g1"), &mut catalog)
            .unwrap();
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_model_failure_propagates() {
        let mut matcher = SemanticMatcher::new(Arc::new(FailingModel), 16);
        assert!(matches!(matcher.similarity("a", "b"), Err(Error::Model(_))));
        assert_eq!(matcher.cached(), 0);
    }
}
