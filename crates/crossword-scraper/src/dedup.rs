//! Near-duplicate detection for puzzle grids found by several sources on one page.
//!
//! Different sources extracting the same puzzle can disagree on black squares at the
//! margins or on special characters, so this is a spot check rather than exact equality.

use crate::types::Grid;

/// Share of relevant cells that must match for two grids to be duplicates.
pub const DUPLICATE_THRESHOLD: f64 = 0.6;

/// Fraction of relevant cells on which `a` and `b` agree.
///
/// A cell is relevant when it is non-black in either grid; it agrees when it is non-black in
/// both with identical solutions. Returns `None` for differing dimensions or when no cell is
/// relevant.
pub fn match_ratio(a: &Grid, b: &Grid) -> Option<f64> {
    if !a.same_dimensions(b) {
        return None;
    }

    let mut identical = 0usize;
    let mut relevant = 0usize;
    for (row_a, row_b) in a.rows().iter().zip(b.rows()) {
        for (cell_a, cell_b) in row_a.iter().zip(row_b) {
            if cell_a.black && cell_b.black {
                continue;
            }
            relevant += 1;
            if !cell_a.black && !cell_b.black && cell_a.solution == cell_b.solution {
                identical += 1;
            }
        }
    }

    if relevant == 0 {
        return None;
    }
    Some(identical as f64 / relevant as f64)
}

/// Whether `candidate` duplicates any accepted grid at the given threshold (strict `>`).
pub fn is_duplicate_with_threshold(candidate: &Grid, accepted: &[Grid], threshold: f64) -> bool {
    accepted
        .iter()
        .any(|grid| match_ratio(candidate, grid).is_some_and(|ratio| ratio > threshold))
}

/// Whether `candidate` duplicates any accepted grid at [`DUPLICATE_THRESHOLD`].
pub fn is_duplicate(candidate: &Grid, accepted: &[Grid]) -> bool {
    is_duplicate_with_threshold(candidate, accepted, DUPLICATE_THRESHOLD)
}

/// The grids accepted so far in one run.
///
/// Checking and recording happen in one call, so two mutual duplicates can never both be
/// accepted.
#[derive(Debug, Clone)]
pub struct AcceptedGrids {
    grids: Vec<Grid>,
    threshold: f64,
}

impl AcceptedGrids {
    pub fn new(threshold: f64) -> Self {
        Self {
            grids: Vec::new(),
            threshold,
        }
    }

    /// Record `grid` unless it duplicates an accepted one. Returns whether it was accepted.
    pub fn try_accept(&mut self, grid: &Grid) -> bool {
        if is_duplicate_with_threshold(grid, &self.grids, self.threshold) {
            return false;
        }
        self.grids.push(grid.clone());
        true
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}

impl Default for AcceptedGrids {
    fn default() -> Self {
        Self::new(DUPLICATE_THRESHOLD)
    }
}
