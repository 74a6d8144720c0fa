//! Field value profiling
//!
//! A [`FeatureClassifier`] is built per field name. It ranks every detector
//! by how close the field name is to the detector's labels, then classifies
//! values one at a time into a [`ProfileAccumulator`]. [`FeatureClassifier::finalize`]
//! turns the accumulator into an [`InstanceProfile`]: type label to weight,
//! plus the share of values that any detector recognised.

use crate::feature::DetectorRegistry;
use crate::semantic::SemanticMatcher;
use fieldfuse_core::{Result, Tokenizer, Vector};
use std::sync::Arc;

/// Running counts for one field. Owned by the caller, one per field.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileAccumulator {
    weights: Vec<u64>,
    total: u64,
    matched: u64,
    defaults: u64,
}

impl ProfileAccumulator {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn matched(&self) -> u64 {
        self.matched
    }

    /// Values that were empty or whitespace only.
    #[must_use]
    pub fn defaults(&self) -> u64 {
        self.defaults
    }
}

/// Value-type distribution of a field.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceProfile {
    labels: Arc<Vec<String>>,
    weights: Vec<u64>,
    total: u64,
    matched: u64,
}

impl InstanceProfile {
    #[must_use]
    pub fn weight(&self, label: &str) -> u64 {
        self.labels
            .iter()
            .position(|l| l == label)
            .map_or(0, |i| self.weights[i])
    }

    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[u64] {
        &self.weights
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn matched(&self) -> u64 {
        self.matched
    }

    /// Matched share of all observed values, 0 with no values.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64
        }
    }

    /// The heaviest type label, if any value was recognised.
    #[must_use]
    pub fn dominant_type(&self) -> Option<&str> {
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, &w)| w > 0)
            .max_by(|(ia, wa), (ib, wb)| wa.cmp(wb).then(ib.cmp(ia)))
            .map(|(i, _)| self.labels[i].as_str())
    }

    #[must_use]
    pub fn as_vector(&self) -> Vector {
        Vector::new(self.weights.iter().map(|&w| w as f64).collect())
    }
}

pub struct FeatureClassifier<'r> {
    registry: &'r DetectorRegistry,
    order: Vec<usize>,
}

impl<'r> FeatureClassifier<'r> {
    /// Rank detectors for `field_name`.
    ///
    /// Every segment of the name is scored against every detector label;
    /// a label keeps its best score. Labels are visited best first (ties in
    /// declaration order) and each contributes its detectors once.
    pub fn new(
        registry: &'r DetectorRegistry,
        field_name: &str,
        tokenizer: &dyn Tokenizer,
        semantic: &mut SemanticMatcher,
    ) -> Result<Self> {
        let labels = registry.labels();
        let mut scores = vec![-1.0f64; labels.len()];
        for segment in tokenizer.segment(field_name)? {
            for (score, (label, _)) in scores.iter_mut().zip(labels) {
                *score = score.max(semantic.similarity(&segment, label)?);
            }
        }

        let mut ranked: Vec<usize> = (0..labels.len()).collect();
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let mut seen = vec![false; registry.len()];
        let mut order = Vec::with_capacity(registry.len());
        for label in ranked {
            for &detector in &labels[label].1 {
                if !seen[detector] {
                    seen[detector] = true;
                    order.push(detector);
                }
            }
        }

        Ok(Self { registry, order })
    }

    /// Detector indices in the order values are tested.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    #[must_use]
    pub fn accumulator(&self) -> ProfileAccumulator {
        ProfileAccumulator {
            weights: vec![0; self.registry.type_labels().len()],
            total: 0,
            matched: 0,
            defaults: 0,
        }
    }

    /// Record one value.
    ///
    /// The first matching detector in rank order scores its weight under its
    /// primary type, and so does every not yet tried detector of the same
    /// category that also matches. Blank values only count as defaults.
    pub fn classify(&self, acc: &mut ProfileAccumulator, value: &str) {
        acc.total += 1;
        if value.trim().is_empty() {
            acc.defaults += 1;
            return;
        }

        let registry = self.registry;
        let mut tried = vec![false; registry.len()];
        for &index in &self.order {
            tried[index] = true;
            if !registry.matches(index, value) {
                continue;
            }
            acc.matched += 1;
            acc.weights[registry.chain(index)[0]] += u64::from(registry.detector(index).weight);
            for &peer in registry.peers(index) {
                if !tried[peer] && registry.matches(peer, value) {
                    acc.weights[registry.chain(peer)[0]] += u64::from(registry.detector(peer).weight);
                }
            }
            break;
        }
    }

    pub fn finalize(&self, mut acc: ProfileAccumulator) -> InstanceProfile {
        let registry = self.registry;
        for index in 0..registry.len() {
            let chain = registry.chain(index);
            let target = (0..chain.len())
                .rev()
                .find(|&i| acc.weights[chain[i]] != 0)
                .unwrap_or(0);
            for &earlier in &chain[..target] {
                let moved = std::mem::take(&mut acc.weights[earlier]);
                acc.weights[chain[target]] += moved;
            }
        }

        // blanks count for every recognised type, unweighted
        if acc.weights.iter().any(|&w| w != 0) {
            for w in acc.weights.iter_mut().filter(|w| **w != 0) {
                *w += acc.defaults;
            }
            acc.matched += acc.defaults;
        }

        InstanceProfile {
            labels: registry.type_labels().clone(),
            weights: acc.weights,
            total: acc.total,
            matched: acc.matched,
        }
    }

    /// Classify all values and finalize.
    pub fn profile<S: AsRef<str>>(&self, values: &[S]) -> InstanceProfile {
        let mut acc = self.accumulator();
        for value in values {
            self.classify(&mut acc, value.as_ref());
        }
        self.finalize(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::Gazetteer;
    use fieldfuse_core::{HashingModel, SimpleTokenizer};

    fn setup() -> (DetectorRegistry, SemanticMatcher) {
        let registry = DetectorRegistry::builtin(Arc::new(Gazetteer::builtin())).unwrap();
        let semantic = SemanticMatcher::new(Arc::new(HashingModel::default()), 128);
        (registry, semantic)
    }

    #[test]
    fn test_label_ranks_detector_first() {
        let (registry, mut semantic) = setup();
        let c = FeatureClassifier::new(&registry, "手机号码", &SimpleTokenizer, &mut semantic).unwrap();
        assert_eq!(registry.detector(c.order()[0]).name, "phone_number");
        assert_eq!(c.order().len(), registry.len());
    }

    #[test]
    fn test_unrelated_name_keeps_declaration_order() {
        let (registry, mut semantic) = setup();
        let c = FeatureClassifier::new(&registry, "", &SimpleTokenizer, &mut semantic).unwrap();
        let names: Vec<&str> = c.order().iter().take(3).map(|&i| registry.detector(i).name.as_str()).collect();
        assert_eq!(names, vec!["integer", "decimal", "bool"]);
    }

    #[test]
    fn test_decimal_absorbs_integer_with_evidence() {
        let (registry, mut semantic) = setup();
        let c = FeatureClassifier::new(&registry, "房屋编号", &SimpleTokenizer, &mut semantic).unwrap();

        let profile = c.profile(&["52.9", "52", "46"]);
        assert_eq!(profile.weight("integer"), 0);
        assert_eq!(profile.weight("decimal"), 3);
        assert_eq!(profile.dominant_type(), Some("decimal"));

        let profile = c.profile(&["52", "46"]);
        assert_eq!(profile.weight("integer"), 2);
        assert_eq!(profile.weight("decimal"), 0);
    }

    #[test]
    fn test_same_category_detectors_register_together() {
        let (registry, mut semantic) = setup();
        let c = FeatureClassifier::new(&registry, "联系电话", &SimpleTokenizer, &mut semantic).unwrap();
        let profile = c.profile(&["13812345678"]);
        assert_eq!(profile.weight("integer"), 1);
        assert_eq!(profile.weight("phone_number"), 3);
        assert_eq!(profile.ratio(), 1.0);
    }

    #[test]
    fn test_blank_values_added_flat() {
        let (registry, mut semantic) = setup();
        let c = FeatureClassifier::new(&registry, "手机号码", &SimpleTokenizer, &mut semantic).unwrap();
        let profile = c.profile(&["13812345678", "  ", "hello"]);
        assert_eq!(profile.total(), 3);
        assert_eq!(profile.weight("phone_number"), 4);
        assert_eq!(profile.weight("integer"), 2);
        assert_eq!(profile.matched(), 2);
        assert!((profile.ratio() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_values_zero_profile() {
        let (registry, mut semantic) = setup();
        let c = FeatureClassifier::new(&registry, "备注", &SimpleTokenizer, &mut semantic).unwrap();
        let profile = c.profile::<&str>(&[]);
        assert!(profile.weights().iter().all(|&w| w == 0));
        assert_eq!(profile.ratio(), 0.0);
        assert_eq!(profile.dominant_type(), None);
    }

    #[test]
    fn test_only_blanks_are_unmatched() {
        let (registry, mut semantic) = setup();
        let c = FeatureClassifier::new(&registry, "备注", &SimpleTokenizer, &mut semantic).unwrap();
        let profile = c.profile(&["", " "]);
        assert_eq!(profile.matched(), 0);
        assert_eq!(profile.ratio(), 0.0);
    }

    #[test]
    fn test_accumulators_are_independent() {
        let (registry, mut semantic) = setup();
        let c = FeatureClassifier::new(&registry, "日期", &SimpleTokenizer, &mut semantic).unwrap();
        let mut a = c.accumulator();
        let mut b = c.accumulator();
        c.classify(&mut a, "2019-2-27");
        c.classify(&mut b, "男");
        assert_eq!(c.finalize(a).dominant_type(), Some("date"));
        assert_eq!(c.finalize(b).dominant_type(), Some("gender"));
    }
}
