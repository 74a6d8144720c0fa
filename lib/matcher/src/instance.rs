use crate::classifier::{FeatureClassifier, InstanceProfile};
use crate::feature::DetectorRegistry;
use crate::semantic::SemanticMatcher;
use fieldfuse_core::vector::cosine_similarity;
use fieldfuse_core::{BoundedCache, FieldCatalog, FieldRef, Result, Tokenizer};
use std::sync::Arc;

/// Compares fields by the value-type distribution of their contents.
pub struct InstanceMatcher {
    registry: Arc<DetectorRegistry>,
    tokenizer: Arc<dyn Tokenizer>,
    profiles: BoundedCache<FieldRef, Arc<InstanceProfile>>,
}

impl InstanceMatcher {
    pub fn new(registry: Arc<DetectorRegistry>, tokenizer: Arc<dyn Tokenizer>, cache_size: usize) -> Self {
        Self {
            registry,
            tokenizer,
            profiles: BoundedCache::new(cache_size),
        }
    }

    pub fn profile(
        &mut self,
        field: &FieldRef,
        catalog: &mut FieldCatalog,
        semantic: &mut SemanticMatcher,
    ) -> Result<Arc<InstanceProfile>> {
        if let Some(profile) = self.profiles.get(field) {
            return Ok(profile);
        }
        let name = catalog.logical_name(field);
        let classifier = FeatureClassifier::new(&self.registry, &name, self.tokenizer.as_ref(), semantic)?;
        let values = catalog.values(field);
        let profile = Arc::new(classifier.profile(values.as_slice()));
        self.profiles.insert(field.clone(), profile.clone());
        Ok(profile)
    }

    /// Cosine of the two type distributions scaled by the harmonic mean of
    /// the match ratios. 0 when either field has no recognised values.
    pub fn score(
        &mut self,
        a: &FieldRef,
        b: &FieldRef,
        catalog: &mut FieldCatalog,
        semantic: &mut SemanticMatcher,
    ) -> Result<f64> {
        let pa = self.profile(a, catalog, semantic)?;
        let pb = self.profile(b, catalog, semantic)?;
        Ok(profile_similarity(&pa, &pb))
    }

    pub fn clear(&mut self) {
        self.profiles.clear();
    }
}

pub fn profile_similarity(a: &InstanceProfile, b: &InstanceProfile) -> f64 {
    let (ra, rb) = (a.ratio(), b.ratio());
    if ra == 0.0 || rb == 0.0 {
        return 0.0;
    }
    let cosine = cosine_similarity(a.as_vector().as_slice(), b.as_vector().as_slice());
    cosine * (2.0 * ra * rb / (ra + rb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::Gazetteer;
    use fieldfuse_core::{HashingModel, MemorySource, SimpleTokenizer};

    fn fixture() -> (InstanceMatcher, FieldCatalog, SemanticMatcher) {
        let source = MemorySource::new()
            .with_table("a", vec![
                ("phone", "手机号码", vec!["13812345678", "13987654321", "15011112222"]),
                ("mixed", "备注", vec!["13812345678", "hello", "world", "foo"]),
            ])
            .with_table("b", vec![
                ("tel", "联系电话", vec!["18600001111", "13700002222"]),
                ("day", "日期", vec!["2019-2-27", "2020-01-01"]),
                ("empty", "空", Vec::<&str>::new()),
            ]);
        let registry = Arc::new(DetectorRegistry::builtin(Arc::new(Gazetteer::builtin())).unwrap());
        let matcher = InstanceMatcher::new(registry, Arc::new(SimpleTokenizer), 16);
        let catalog = FieldCatalog::new(Arc::new(source), None, 8);
        let semantic = SemanticMatcher::new(Arc::new(HashingModel::default()), 64);
        (matcher, catalog, semantic)
    }

    #[test]
    fn test_same_type_scores_one() {
        let (mut m, mut catalog, mut semantic) = fixture();
        let s = m
            .score(&FieldRef::new("a", "phone"), &FieldRef::new("b", "tel"), &mut catalog, &mut semantic)
            .unwrap();
        assert!((s - 1.0).abs() < 1e-6, "score {}", s);
    }

    #[test]
    fn test_different_types_score_zero() {
        let (mut m, mut catalog, mut semantic) = fixture();
        let s = m
            .score(&FieldRef::new("a", "phone"), &FieldRef::new("b", "day"), &mut catalog, &mut semantic)
            .unwrap();
        assert!(s.abs() < 1e-9);
    }

    #[test]
    fn test_partial_match_ratio_scales_score() {
        let (mut m, mut catalog, mut semantic) = fixture();
        let s = m
            .score(&FieldRef::new("a", "mixed"), &FieldRef::new("b", "tel"), &mut catalog, &mut semantic)
            .unwrap();
        // ratios 1/4 and 1: harmonic mean 0.4
        assert!((s - 0.4).abs() < 1e-6, "score {}", s);
    }

    #[test]
    fn test_empty_field_scores_zero() {
        let (mut m, mut catalog, mut semantic) = fixture();
        let s = m
            .score(&FieldRef::new("b", "empty"), &FieldRef::new("b", "tel"), &mut catalog, &mut semantic)
            .unwrap();
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_profiles_cached_until_clear() {
        let (mut m, mut catalog, mut semantic) = fixture();
        let field = FieldRef::new("a", "phone");
        let first = m.profile(&field, &mut catalog, &mut semantic).unwrap();
        let second = m.profile(&field, &mut catalog, &mut semantic).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        m.clear();
        let third = m.profile(&field, &mut catalog, &mut semantic).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }
}
