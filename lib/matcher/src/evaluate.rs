//! Offline quality measurement against a gold alignment.
//!
//! Gold pairs are fields with the same logical name in different tables.
//! [`measure`] walks scored pairs best first and reports the cut with the
//! highest F1; [`punish_sweep`] repeats that for a range of `punish`
//! values over precomputed component matrices.

use crate::extractor::{penalize, MappingExtractor, TablePairScores};
use crate::stable::stable_matching;
use ahash::{AHashMap, AHashSet};
use fieldfuse_core::{FieldInfo, FieldRef};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPair {
    pub left: FieldRef,
    pub right: FieldRef,
    pub score: f64,
}

/// Unordered set of correct field pairs.
#[derive(Debug, Clone, Default)]
pub struct GoldStandard {
    pairs: AHashSet<(FieldRef, FieldRef)>,
}

impl GoldStandard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, a: FieldRef, b: FieldRef) {
        if !self.contains(&a, &b) {
            self.pairs.insert((a, b));
        }
    }

    #[must_use]
    pub fn contains(&self, a: &FieldRef, b: &FieldRef) -> bool {
        self.pairs.contains(&(a.clone(), b.clone())) || self.pairs.contains(&(b.clone(), a.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pair every two fields of different tables sharing a logical name.
    pub fn from_logical_names<'a, I>(tables: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [FieldInfo])>,
    {
        let mut by_name: AHashMap<&str, Vec<FieldRef>> = AHashMap::new();
        let mut names: Vec<&str> = Vec::new();
        for (table_id, fields) in tables {
            for field in fields {
                let group = by_name.entry(field.logical_name.as_str()).or_insert_with(|| {
                    names.push(field.logical_name.as_str());
                    Vec::new()
                });
                group.push(field.field_ref(table_id));
            }
        }

        let mut gold = Self::new();
        for name in names {
            let group = &by_name[name];
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    if a.table_id != b.table_id {
                        gold.insert(a.clone(), b.clone());
                    }
                }
            }
        }
        gold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Score of the last pair inside the best cut.
    pub threshold: f64,
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
}

impl Default for Measurement {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            f1: 0.0,
            precision: 0.0,
            recall: 0.0,
        }
    }
}

fn f1(hits: usize, predicted: usize, relevant: usize) -> f64 {
    let precision = hits as f64 / predicted as f64;
    let recall = hits as f64 / relevant as f64;
    if precision == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Best F1 over every prefix of `pairs` sorted by descending score.
#[must_use]
pub fn measure(pairs: &[ScoredPair], gold: &GoldStandard) -> Measurement {
    let mut best = Measurement::default();
    if gold.is_empty() {
        return best;
    }

    let mut sorted: Vec<&ScoredPair> = pairs.iter().collect();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut hits = 0;
    for (i, pair) in sorted.iter().enumerate() {
        if gold.contains(&pair.left, &pair.right) {
            hits += 1;
        }
        let score = f1(hits, i + 1, gold.len());
        if score > best.f1 {
            best = Measurement {
                threshold: pair.score,
                f1: score,
                precision: hits as f64 / (i + 1) as f64,
                recall: hits as f64 / gold.len() as f64,
            };
        }
    }
    best
}

/// Score grids of every unordered pair of `tables`.
pub fn collect_scores(extractor: &mut MappingExtractor, tables: &[String]) -> Vec<TablePairScores> {
    let mut grids = Vec::new();
    for (i, a) in tables.iter().enumerate() {
        for b in &tables[i + 1..] {
            debug!("Scoring {} against {}", a, b);
            grids.push(extractor.table_pair_scores(a, b));
        }
    }
    grids
}

/// Pairs kept by stable matching when `punish` is applied to the grids.
#[must_use]
pub fn matched_pairs(grids: &[TablePairScores], punish: f64, threshold: f64) -> Vec<ScoredPair> {
    let mut pairs = Vec::new();
    for grid in grids {
        let Some(matrix) = grid
            .combined
            .zip_map(&grid.semantic, |c, s| penalize(c, s, punish))
        else {
            continue;
        };
        for a in stable_matching(&matrix, threshold) {
            pairs.push(ScoredPair {
                left: grid.left[a.row].clone(),
                right: grid.right[a.col].clone(),
                score: a.score,
            });
        }
    }
    pairs
}

/// `1.01, 1.02, ..., 5.00`
#[must_use]
pub fn default_punish_weights() -> Vec<f64> {
    (101..=500).map(|i| f64::from(i) / 100.0).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub punish: f64,
    pub measurement: Measurement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub points: Vec<SweepPoint>,
    pub best: SweepPoint,
}

/// Measure every candidate `punish`; the first one reaching the highest F1
/// wins.
#[must_use]
pub fn punish_sweep(
    grids: &[TablePairScores],
    gold: &GoldStandard,
    weights: &[f64],
    threshold: f64,
) -> SweepReport {
    let mut points = Vec::with_capacity(weights.len());
    let mut best = SweepPoint {
        punish: 1.0,
        measurement: Measurement::default(),
    };
    for &punish in weights {
        let measurement = measure(&matched_pairs(grids, punish, threshold), gold);
        debug!(
            "punish {:.2}: threshold {:.4}, F1 {:.4}, precision {:.4}, recall {:.4}",
            punish, measurement.threshold, measurement.f1, measurement.precision, measurement.recall
        );
        let point = SweepPoint { punish, measurement };
        if measurement.f1 > best.measurement.f1 {
            best = point;
        }
        points.push(point);
    }
    info!(
        "Best punish {:.2}: threshold {:.4}, F1 {:.4}",
        best.punish, best.measurement.threshold, best.measurement.f1
    );
    SweepReport { points, best }
}
