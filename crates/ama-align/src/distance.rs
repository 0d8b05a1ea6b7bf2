//! Alignment Metric Accuracy distance against a fixed reference alignment.
//!
//! For every residue of the target, the distance counts the rows whose entry
//! in the residue's target column differs from the residue's reference
//! column (Schwartz et al., 2005). Residue-residue disagreements are thereby
//! seen from both endpoints, residue-gap disagreements from the residue only.

use ama_core::{AmaError, ErrorInfo};

use crate::alignment::{Alignment, Entry};
use crate::window::Window;

/// Read-only index from `(row, residue)` to the reference column holding that
/// residue.
#[derive(Debug, Clone)]
pub struct DistanceCache {
    names: Vec<String>,
    /// Reference column content, in reference order.
    columns: Vec<Box<[Entry]>>,
    /// `lookup[row][residue]` is an index into `columns`.
    lookup: Vec<Vec<u32>>,
    max_distance: u64,
    verify_names: bool,
}

impl DistanceCache {
    /// Indexes `reference`.
    pub fn new(reference: &Alignment) -> Self {
        let rows = reference.num_rows();
        let mut lookup: Vec<Vec<u32>> = (0..rows)
            .map(|row| vec![0; reference.residues(row).len()])
            .collect();
        let mut columns = Vec::with_capacity(reference.len());
        let mut residues = 0u64;

        for id in reference.iter() {
            let cells = reference.cells(id);
            let slot = columns.len() as u32;
            for (row, entry) in cells.iter().enumerate() {
                if let Some(residue) = entry {
                    lookup[row][*residue as usize] = slot;
                    residues += 1;
                }
            }
            columns.push(cells.into());
        }

        Self {
            names: reference.names().to_vec(),
            columns,
            lookup,
            max_distance: residues * rows.saturating_sub(1) as u64,
            verify_names: true,
        }
    }

    /// Enables or disables the row name check performed by
    /// [`DistanceCache::distance`]. Row and residue counts are
    /// checked regardless.
    pub fn set_verify_names(&mut self, verify: bool) {
        self.verify_names = verify;
    }

    /// Row names of the cached reference.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Distance at which accuracy reaches zero.
    pub fn max_distance(&self) -> u64 {
        self.max_distance
    }

    fn reference_column(&self, row: usize, residue: u32) -> &[Entry] {
        &self.columns[self.lookup[row][residue as usize] as usize]
    }

    /// Full distance from the reference to `target`.
    ///
    /// Rows must carry the reference's names in the same order (compared
    /// case-insensitively) unless name verification is off, and the same
    /// number of residues per row.
    pub fn distance(&self, target: &Alignment) -> Result<u64, AmaError> {
        self.match_shape(target)?;
        if self.verify_names {
            self.match_names(target.names())?;
        }
        Ok(target
            .iter()
            .map(|id| self.column_distance(target.cells(id)))
            .sum())
    }

    /// Summed distance of the columns in `window`.
    pub fn window_distance(&self, alignment: &Alignment, window: &Window) -> u64 {
        alignment
            .window_ids(window)
            .into_iter()
            .map(|id| self.column_distance(alignment.cells(id)))
            .sum()
    }

    /// Distance contribution of one column.
    pub fn column_distance(&self, cells: &[Entry]) -> u64 {
        let mut d = 0;
        for (row, entry) in cells.iter().enumerate() {
            if let Some(residue) = entry {
                let reference = self.reference_column(row, *residue);
                d += cells
                    .iter()
                    .zip(reference.iter())
                    .filter(|(a, b)| a != b)
                    .count() as u64;
            }
        }
        d
    }

    /// Marginal distance of placing `entry` at `pos` of `cells`, holding the
    /// other entries fixed. Runs in O(rows).
    ///
    /// Summing this over every position of a column gives twice the column's
    /// pairwise contribution: residue-residue mismatches count 2 from the
    /// residue's side, residue-gap mismatches count 1 from either side.
    pub fn single(&self, cells: &[Entry], pos: usize, entry: Entry) -> u64 {
        let mut d = 0;
        match entry {
            Some(residue) => {
                let reference = self.reference_column(pos, residue);
                for (row, (cell, expected)) in cells.iter().zip(reference.iter()).enumerate() {
                    if row != pos && cell != expected {
                        d += if cell.is_some() { 2 } else { 1 };
                    }
                }
            }
            None => {
                for (row, cell) in cells.iter().enumerate() {
                    if let (true, Some(residue)) = (row != pos, cell) {
                        if self.reference_column(row, *residue)[pos].is_some() {
                            d += 1;
                        }
                    }
                }
            }
        }
        d
    }

    /// Converts a distance into accuracy, `1 - d / max_distance`.
    ///
    /// A single-row reference has no pairs to disagree on; its accuracy is 1.
    pub fn dist_to_acc(&self, distance: u64) -> f64 {
        if self.max_distance == 0 {
            return 1.0;
        }
        1.0 - distance as f64 / self.max_distance as f64
    }

    /// Converts accuracy into the nearest distance.
    pub fn acc_to_dist(&self, accuracy: f64) -> u64 {
        (self.max_distance as f64 * (1.0 - accuracy)).round().max(0.0) as u64
    }

    fn match_shape(&self, target: &Alignment) -> Result<(), AmaError> {
        if self.lookup.len() != target.num_rows() {
            return Err(AmaError::Distance(
                ErrorInfo::new("row-count", "incompatible alignments")
                    .with_context("reference", self.lookup.len().to_string())
                    .with_context("target", target.num_rows().to_string()),
            ));
        }
        for (row, residues) in self.lookup.iter().enumerate() {
            let found = target.residues(row).len();
            if residues.len() != found {
                return Err(AmaError::Distance(
                    ErrorInfo::new("residue-count", "residue counts differ")
                        .with_context("sequence", self.names[row].clone())
                        .with_context("reference", residues.len().to_string())
                        .with_context("target", found.to_string()),
                ));
            }
        }
        Ok(())
    }

    fn match_names(&self, names: &[String]) -> Result<(), AmaError> {
        for (expected, found) in self.names.iter().zip(names) {
            if !expected.eq_ignore_ascii_case(found) {
                return Err(AmaError::Distance(
                    ErrorInfo::new("name-mismatch", "incompatible sequence names")
                        .with_context("reference", expected.clone())
                        .with_context("target", found.clone()),
                ));
            }
        }
        Ok(())
    }
}
