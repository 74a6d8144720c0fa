//! Deferred-acceptance (Gale-Shapley) assignment over a dense score matrix.
//!
//! Rows propose to columns in descending score order; a column holds the
//! best proposal seen so far and releases the row it held before. The
//! smaller side always proposes, so every proposer ends up matched before
//! the threshold filter runs.

use fieldfuse_core::{Error, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Dense row-major score matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl ScoreMatrix {
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from nested rows, all of the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(Error::Parameter(format!(
                "row {} has {} columns, expected {}",
                bad,
                rows[bad].len(),
                cols
            )));
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    #[inline]
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut t = Self::new(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                t.set(c, r, self.get(r, c));
            }
        }
        t
    }

    /// Element-wise map into a new matrix of the same shape.
    #[must_use]
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    #[must_use]
    pub fn zip_map<F: Fn(f64, f64) -> f64>(&self, other: &Self, f: F) -> Option<Self> {
        if self.rows != other.rows || self.cols != other.cols {
            return None;
        }
        Some(Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect(),
        })
    }
}

/// One accepted pair: row index of the original matrix, column index, score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub row: usize,
    pub col: usize,
    pub score: f64,
}

/// Stable assignment of rows to columns, keeping pairs scoring at least
/// `threshold`. Results are sorted by row.
#[must_use]
pub fn stable_matching(matrix: &ScoreMatrix, threshold: f64) -> Vec<Assignment> {
    if matrix.rows() > matrix.cols() {
        let mut result: Vec<Assignment> = propose(&matrix.transpose(), threshold)
            .into_iter()
            .map(|a| Assignment {
                row: a.col,
                col: a.row,
                score: a.score,
            })
            .collect();
        result.sort_by_key(|a| a.row);
        result
    } else {
        propose(matrix, threshold)
    }
}

/// Proposal rounds with rows as proposers. Requires `rows <= cols`.
fn propose(matrix: &ScoreMatrix, threshold: f64) -> Vec<Assignment> {
    let (rows, cols) = (matrix.rows(), matrix.cols());

    // preference lists, ties to the lower column
    let order: Vec<Vec<usize>> = (0..rows)
        .map(|r| {
            let row = matrix.row(r);
            let mut cols: Vec<usize> = (0..cols).collect();
            cols.sort_by_key(|&c| Reverse(OrderedFloat(row[c])));
            cols
        })
        .collect();

    let mut matched: Vec<Option<usize>> = vec![None; rows];
    let mut holder: Vec<Option<usize>> = vec![None; cols];
    let mut next = vec![0usize; rows];

    loop {
        let mut proposed = false;
        for r in 0..rows {
            if matched[r].is_some() || next[r] >= cols {
                continue;
            }
            proposed = true;
            let c = order[r][next[r]];
            next[r] += 1;
            match holder[c] {
                None => {
                    holder[c] = Some(r);
                    matched[r] = Some(c);
                }
                Some(current) if matrix.get(r, c) > matrix.get(current, c) => {
                    holder[c] = Some(r);
                    matched[r] = Some(c);
                    matched[current] = None;
                }
                Some(_) => {}
            }
        }
        if !proposed {
            break;
        }
    }

    matched
        .iter()
        .enumerate()
        .filter_map(|(row, col)| {
            let col = (*col)?;
            let score = matrix.get(row, col);
            (score >= threshold).then_some(Assignment { row, col, score })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> ScoreMatrix {
        let data = (0..rows)
            .map(|_| (0..cols).map(|_| rng.random_range(-1.0..1.0)).collect())
            .collect();
        ScoreMatrix::from_rows(data).unwrap()
    }

    fn assert_injective(result: &[Assignment]) {
        let rows: HashSet<usize> = result.iter().map(|a| a.row).collect();
        let cols: HashSet<usize> = result.iter().map(|a| a.col).collect();
        assert_eq!(rows.len(), result.len());
        assert_eq!(cols.len(), result.len());
    }

    /// No row and column both strictly prefer each other over their partners.
    fn assert_stable(matrix: &ScoreMatrix, result: &[Assignment]) {
        let mut row_of_col = vec![None; matrix.cols()];
        let mut col_of_row = vec![None; matrix.rows()];
        for a in result {
            row_of_col[a.col] = Some(a.row);
            col_of_row[a.row] = Some(a.col);
        }
        for r in 0..matrix.rows() {
            for c in 0..matrix.cols() {
                let s = matrix.get(r, c);
                let row_prefers = col_of_row[r].map_or(true, |cur| s > matrix.get(r, cur));
                let col_prefers = row_of_col[c].map_or(true, |cur| s > matrix.get(cur, c));
                assert!(!(row_prefers && col_prefers), "blocking pair ({}, {})", r, c);
            }
        }
    }

    #[test]
    fn test_simple_assignment() {
        let m = ScoreMatrix::from_rows(vec![vec![0.9, 0.1], vec![0.8, 0.7]]).unwrap();
        let result = stable_matching(&m, 0.5);
        assert_eq!(result.len(), 2);
        assert_eq!((result[0].row, result[0].col), (0, 0));
        assert_eq!((result[1].row, result[1].col), (1, 1));
    }

    #[test]
    fn test_column_keeps_better_proposal() {
        // both rows want column 0; row 1 scores higher there
        let m = ScoreMatrix::from_rows(vec![vec![0.6, 0.5], vec![0.9, 0.2]]).unwrap();
        let result = stable_matching(&m, f64::NEG_INFINITY);
        assert_eq!((result[0].row, result[0].col), (0, 1));
        assert_eq!((result[1].row, result[1].col), (1, 0));
    }

    #[test]
    fn test_threshold_drops_weak_pairs() {
        let m = ScoreMatrix::from_rows(vec![vec![0.9, 0.1], vec![0.8, 0.2]]).unwrap();
        let result = stable_matching(&m, 0.5);
        assert_eq!(result.len(), 1);
        assert_eq!((result[0].row, result[0].col, result[0].score), (0, 0, 0.9));
    }

    #[test]
    fn test_more_rows_than_columns() {
        let m = ScoreMatrix::from_rows(vec![vec![0.2], vec![0.9], vec![0.5]]).unwrap();
        let result = stable_matching(&m, 0.0);
        assert_eq!(result, vec![Assignment { row: 1, col: 0, score: 0.9 }]);
    }

    #[test]
    fn test_empty_matrix() {
        assert!(stable_matching(&ScoreMatrix::new(0, 3), 0.0).is_empty());
        assert!(stable_matching(&ScoreMatrix::new(3, 0), 0.0).is_empty());
        assert!(ScoreMatrix::from_rows(Vec::new()).unwrap().rows() == 0);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(matches!(
            ScoreMatrix::from_rows(vec![vec![1.0, 2.0], vec![1.0]]),
            Err(Error::Parameter(_))
        ));
    }

    #[test]
    fn test_ties_are_deterministic() {
        let m = ScoreMatrix::from_rows(vec![vec![0.5; 3]; 3]).unwrap();
        let first = stable_matching(&m, 0.0);
        assert_eq!(first.len(), 3);
        assert_injective(&first);
        for _ in 0..5 {
            assert_eq!(stable_matching(&m, 0.0), first);
        }
    }

    #[test]
    fn test_random_matrices_are_stable_injections() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let rows = rng.random_range(1..7);
            let cols = rng.random_range(1..7);
            let m = random_matrix(&mut rng, rows, cols);

            let all = stable_matching(&m, f64::NEG_INFINITY);
            assert_eq!(all.len(), rows.min(cols));
            assert_injective(&all);
            assert_stable(&m, &all);
            assert_eq!(stable_matching(&m, f64::NEG_INFINITY), all);

            let filtered = stable_matching(&m, 0.0);
            assert!(filtered.iter().all(|a| a.score >= 0.0));
            assert!(filtered.iter().all(|a| all.contains(a)));
        }
    }

    #[test]
    fn test_transpose() {
        let m = ScoreMatrix::from_rows(vec![vec![1.0, 2.0, 3.0]]).unwrap();
        let t = m.transpose();
        assert_eq!((t.rows(), t.cols()), (3, 1));
        assert_eq!(t.get(2, 0), 3.0);
        assert_eq!(t.transpose(), m);
    }
}
