use std::fmt;

use ama_core::{AmaError, ErrorInfo, RngHandle};
use log::warn;
use rand::Rng;

use crate::raw::{RawSequences, GAP_CHAR};

/// Content of one alignment cell: the residue index within its (ungapped)
/// sequence, or `None` for a gap.
pub type Entry = Option<u32>;

/// Stable handle to a column stored in an [`Alignment`].
///
/// Handles stay valid until the column is removed; a removed column's slot
/// may later be reused for a newly inserted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnId(u32);

impl ColumnId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct ColumnNode {
    cells: Box<[Entry]>,
    prev: Option<ColumnId>,
    next: Option<ColumnId>,
    /// Slot in `Alignment::columns`.
    ord: usize,
    /// Slot in `Alignment::singular` when the column holds exactly one residue.
    singular_ord: Option<usize>,
    live: bool,
}

/// Column-oriented multiple alignment supporting O(1) random structural edits.
///
/// Columns live in an arena and are chained into a doubly linked list that
/// defines their left-to-right order. Two unordered handle arrays index the
/// same columns: `columns` holds every column and `singular` holds the columns
/// with a single residue. Both support uniform selection and swap-with-last
/// removal; each column caches its slot in both arrays.
///
/// Rows are sorted by name when the alignment is built and never reordered.
#[derive(Debug, Clone)]
pub struct Alignment {
    names: Vec<String>,
    residues: Vec<Vec<u8>>,
    nodes: Vec<ColumnNode>,
    vacant: Vec<ColumnId>,
    first: Option<ColumnId>,
    columns: Vec<ColumnId>,
    singular: Vec<ColumnId>,
}

impl Alignment {
    /// Builds an alignment from gapped, equal-length sequences.
    ///
    /// Rows are sorted by name. Gap-only columns are dropped with a warning,
    /// so the result may be shorter than the input.
    pub fn from_raw(raw: &RawSequences) -> Result<Self, AmaError> {
        if raw.is_empty() {
            return Err(AmaError::Input(ErrorInfo::new(
                "no-sequences",
                "alignment needs at least one sequence",
            )));
        }
        let Some(len) = raw.aligned_len() else {
            return Err(AmaError::Input(
                ErrorInfo::new("unaligned", "sequences are unaligned")
                    .with_hint("all sequences of an alignment must have the same length"),
            ));
        };

        let mut order: Vec<usize> = (0..raw.len()).collect();
        order.sort_by(|&a, &b| raw.name(a).cmp(raw.name(b)));
        let size = order.len();

        let mut cells = vec![vec![None; size]; len];
        let mut residues = Vec::with_capacity(size);
        for (row, &source) in order.iter().enumerate() {
            let mut seq = Vec::new();
            for (col, &ch) in raw.sequence(source).as_bytes().iter().enumerate() {
                if ch != GAP_CHAR {
                    cells[col][row] = Some(seq.len() as u32);
                    seq.push(ch);
                }
            }
            residues.push(seq);
        }

        let names = order.iter().map(|&idx| raw.name(idx).to_string()).collect();
        let columns = cells.into_iter().map(Vec::into_boxed_slice);
        let mut alignment = Self::from_columns(names, residues, columns);

        let mut slot = 0;
        while slot < alignment.columns.len() {
            let id = alignment.columns[slot];
            if alignment.update_singularity(id) == 0 {
                warn!("gap-only column found and removed");
                alignment.remove_column(id);
            } else {
                slot += 1;
            }
        }

        if alignment.columns.is_empty() {
            return Err(AmaError::Input(ErrorInfo::new(
                "no-residues",
                "alignment contains gap-only columns exclusively",
            )));
        }
        Ok(alignment)
    }

    /// Links `cells` in order without touching the singular array.
    fn from_columns(
        names: Vec<String>,
        residues: Vec<Vec<u8>>,
        cells: impl Iterator<Item = Box<[Entry]>>,
    ) -> Self {
        let mut nodes: Vec<ColumnNode> = Vec::new();
        for (idx, cells) in cells.enumerate() {
            let id = ColumnId(idx as u32);
            if let Some(prev) = nodes.last_mut() {
                prev.next = Some(id);
            }
            nodes.push(ColumnNode {
                cells,
                prev: idx.checked_sub(1).map(|prev| ColumnId(prev as u32)),
                next: None,
                ord: idx,
                singular_ord: None,
                live: true,
            });
        }
        let columns: Vec<ColumnId> = (0..nodes.len()).map(|idx| ColumnId(idx as u32)).collect();
        Self {
            names,
            residues,
            first: columns.first().copied(),
            nodes,
            vacant: Vec::new(),
            columns,
            singular: Vec::new(),
        }
    }

    /// Creates a compact copy holding the same rows and column content.
    ///
    /// The copy is laid out exactly as if it had been rebuilt from
    /// [`Alignment::to_raw`]: arena and column array follow linked order.
    pub fn rebuild(&self) -> Self {
        let cells: Vec<Box<[Entry]>> = self.iter().map(|id| self.cells(id).into()).collect();
        let mut copy =
            Self::from_columns(self.names.clone(), self.residues.clone(), cells.into_iter());
        for slot in 0..copy.columns.len() {
            let id = copy.columns[slot];
            copy.update_singularity(id);
        }
        copy
    }

    /// Row names in canonical (sorted) order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Ungapped residues of `row`.
    pub fn residues(&self, row: usize) -> &[u8] {
        &self.residues[row]
    }

    /// Number of rows (sequences).
    pub fn num_rows(&self) -> usize {
        self.names.len()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` when the alignment holds no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of columns holding exactly one residue.
    pub fn singular_count(&self) -> usize {
        self.singular.len()
    }

    /// Total number of residues over all rows.
    pub fn residue_count(&self) -> usize {
        self.residues.iter().map(Vec::len).sum()
    }

    /// First column in linked order.
    pub fn first(&self) -> Option<ColumnId> {
        self.first
    }

    /// Column following `id`.
    pub fn next(&self, id: ColumnId) -> Option<ColumnId> {
        self.node(id).next
    }

    /// Column preceding `id`.
    pub fn prev(&self, id: ColumnId) -> Option<ColumnId> {
        self.node(id).prev
    }

    /// Content of column `id`.
    pub fn cells(&self, id: ColumnId) -> &[Entry] {
        &self.node(id).cells
    }

    /// Number of residues in column `id`.
    pub fn non_gaps(&self, id: ColumnId) -> usize {
        count_non_gaps(self.cells(id))
    }

    /// Whether `id` currently sits in the singular array.
    pub fn is_singular(&self, id: ColumnId) -> bool {
        self.node(id).singular_ord.is_some()
    }

    /// Iterates over column handles in left-to-right order.
    pub fn iter(&self) -> Columns<'_> {
        Columns {
            alignment: self,
            cursor: self.first,
        }
    }

    fn node(&self, id: ColumnId) -> &ColumnNode {
        let node = &self.nodes[id.index()];
        debug_assert!(node.live, "stale column handle {id:?}");
        node
    }

    fn node_mut(&mut self, id: ColumnId) -> &mut ColumnNode {
        let node = &mut self.nodes[id.index()];
        debug_assert!(node.live, "stale column handle {id:?}");
        node
    }

    /// Uniformly chosen column.
    pub fn random_column(&self, rng: &mut RngHandle) -> ColumnId {
        self.columns[rng.gen_range(0..self.columns.len())]
    }

    /// Uniformly chosen singular column, if any exists.
    pub fn random_singular_column(&self, rng: &mut RngHandle) -> Option<ColumnId> {
        if self.singular.is_empty() {
            return None;
        }
        Some(self.singular[rng.gen_range(0..self.singular.len())])
    }

    /// Overwrites one cell in place.
    ///
    /// The singular array is not refreshed; call
    /// [`Alignment::update_singularity`] once the column edit is complete.
    pub fn set_entry(&mut self, id: ColumnId, row: usize, entry: Entry) {
        self.node_mut(id).cells[row] = entry;
    }

    /// Replaces the whole content of column `id` and refreshes its singularity.
    pub(crate) fn set_cells(&mut self, id: ColumnId, cells: Box<[Entry]>) -> usize {
        self.node_mut(id).cells = cells;
        self.update_singularity(id)
    }

    /// Inserts a new column after `after` (or as the new head when `None`).
    pub fn insert_column(&mut self, cells: Box<[Entry]>, after: Option<ColumnId>) -> ColumnId {
        let next = match after {
            Some(prev) => self.node(prev).next,
            None => self.first,
        };
        let node = ColumnNode {
            cells,
            prev: after,
            next,
            ord: self.columns.len(),
            singular_ord: None,
            live: true,
        };
        let id = match self.vacant.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                self.nodes.push(node);
                ColumnId((self.nodes.len() - 1) as u32)
            }
        };

        match after {
            Some(prev) => self.node_mut(prev).next = Some(id),
            None => self.first = Some(id),
        }
        if let Some(next) = next {
            self.node_mut(next).prev = Some(id);
        }

        self.columns.push(id);
        self.update_singularity(id);
        id
    }

    /// Unlinks column `id` and drops it from both unordered arrays.
    pub fn remove_column(&mut self, id: ColumnId) {
        let (prev, next) = {
            let node = self.node(id);
            (node.prev, node.next)
        };
        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.first = next,
        }
        if let Some(next) = next {
            self.node_mut(next).prev = prev;
        }

        let ord = self.node(id).ord;
        self.columns.swap_remove(ord);
        if let Some(&moved) = self.columns.get(ord) {
            self.node_mut(moved).ord = ord;
        }
        self.drop_singular(id);

        let node = self.node_mut(id);
        node.live = false;
        node.prev = None;
        node.next = None;
        self.vacant.push(id);
    }

    fn drop_singular(&mut self, id: ColumnId) {
        if let Some(ord) = self.node_mut(id).singular_ord.take() {
            self.singular.swap_remove(ord);
            if let Some(&moved) = self.singular.get(ord) {
                self.node_mut(moved).singular_ord = Some(ord);
            }
        }
    }

    /// Recomputes the residue count of `id` after an in-place edit and syncs
    /// its membership in the singular array. Returns the residue count.
    pub fn update_singularity(&mut self, id: ColumnId) -> usize {
        let non_gaps = self.non_gaps(id);
        if non_gaps == 1 {
            if self.node(id).singular_ord.is_none() {
                let ord = self.singular.len();
                self.singular.push(id);
                self.node_mut(id).singular_ord = Some(ord);
            }
        } else {
            self.drop_singular(id);
        }
        non_gaps
    }

    /// Reconstructs the gapped sequences, one row per name in sorted order.
    pub fn to_raw(&self) -> RawSequences {
        let mut raw = RawSequences::new();
        for (row, name) in self.names.iter().enumerate() {
            let text: String = self
                .iter()
                .map(|id| self.char_at(id, row) as char)
                .collect();
            // names were unique when the alignment was built
            let _ = raw.add(name.clone(), text);
        }
        raw
    }

    fn char_at(&self, id: ColumnId, row: usize) -> u8 {
        match self.nodes[id.index()].cells[row] {
            Some(residue) => self.residues[row][residue as usize],
            None => GAP_CHAR,
        }
    }

    /// Renders column `id` as one character per row.
    pub fn column_text(&self, id: ColumnId) -> String {
        (0..self.num_rows())
            .map(|row| self.char_at(id, row) as char)
            .collect()
    }

    /// Validates every structural invariant of the representation.
    ///
    /// Intended for tests and strict runs; it walks the whole alignment.
    pub fn check_consistency(&self) -> Result<(), AmaError> {
        let mut positions = vec![0u32; self.num_rows()];
        let mut count = 0usize;
        let mut singular = 0usize;
        let mut prev = None;

        for id in self.iter() {
            count += 1;
            let node = &self.nodes[id.index()];
            let fail = |code: &str, message: &str| {
                ErrorInfo::new(code, message)
                    .with_context("column", count.to_string())
                    .with_context("content", self.column_text(id))
            };
            if !node.live {
                return Err(AmaError::Alignment(fail(
                    "dead-column",
                    "linked column is marked as removed",
                )));
            }
            if node.prev != prev {
                return Err(AmaError::Alignment(fail(
                    "broken-link",
                    "backward link does not match traversal",
                )));
            }
            if node.cells.len() != self.num_rows() {
                return Err(AmaError::Alignment(fail(
                    "column-size",
                    "column size differs from row count",
                )));
            }
            for (row, entry) in node.cells.iter().enumerate() {
                if let Some(residue) = entry {
                    if *residue != positions[row] {
                        return Err(AmaError::Alignment(
                            fail("residue-order", "residue indices out of order")
                                .with_context("row", (row + 1).to_string())
                                .with_context("expected", positions[row].to_string()),
                        ));
                    }
                    positions[row] += 1;
                }
            }
            if self.columns.get(node.ord) != Some(&id) {
                return Err(AmaError::Alignment(fail(
                    "column-slot",
                    "column array slot does not point back",
                )));
            }
            let non_gaps = count_non_gaps(&node.cells);
            if non_gaps == 0 {
                return Err(AmaError::Alignment(fail("gap-only", "gap-only column")));
            }
            if (non_gaps == 1) != node.singular_ord.is_some() {
                return Err(AmaError::Alignment(fail(
                    "singular-flag",
                    "singular membership disagrees with content",
                )));
            }
            if let Some(ord) = node.singular_ord {
                if self.singular.get(ord) != Some(&id) {
                    return Err(AmaError::Alignment(fail(
                        "singular-slot",
                        "singular array slot does not point back",
                    )));
                }
                singular += 1;
            }
            prev = Some(id);
        }

        if self.columns.len() != count {
            return Err(AmaError::Alignment(
                ErrorInfo::new("length-mismatch", "column array size differs from linked length")
                    .with_context("array", self.columns.len().to_string())
                    .with_context("linked", count.to_string()),
            ));
        }
        if self.singular.len() != singular {
            return Err(AmaError::Alignment(
                ErrorInfo::new("singular-count", "singular array size differs from content")
                    .with_context("array", self.singular.len().to_string())
                    .with_context("linked", singular.to_string()),
            ));
        }
        for (row, &pos) in positions.iter().enumerate() {
            if pos as usize != self.residues[row].len() {
                return Err(AmaError::Alignment(
                    ErrorInfo::new("sequence-length", "row does not cover its sequence")
                        .with_context("sequence", self.names[row].clone())
                        .with_context("covered", pos.to_string()),
                ));
            }
        }
        Ok(())
    }
}

/// Counts the residues of a column.
pub fn count_non_gaps(cells: &[Entry]) -> usize {
    cells.iter().filter(|entry| entry.is_some()).count()
}

/// Iterator over column handles in linked order.
pub struct Columns<'a> {
    alignment: &'a Alignment,
    cursor: Option<ColumnId>,
}

impl Iterator for Columns<'_> {
    type Item = ColumnId;

    fn next(&mut self) -> Option<ColumnId> {
        let id = self.cursor?;
        self.cursor = self.alignment.next(id);
        Some(id)
    }
}

/// Renders the alignment as FASTA text; this is the canonical text form.
impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw())
    }
}
