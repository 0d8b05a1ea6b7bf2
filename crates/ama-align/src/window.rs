use ama_core::{AmaError, ErrorInfo, RngHandle};

use crate::alignment::{count_non_gaps, Alignment, ColumnId, Entry};

/// Contiguous run of linked columns, identified by its boundary columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    first: ColumnId,
    last: ColumnId,
    len: usize,
}

impl Window {
    /// Leftmost column of the window.
    pub fn first(&self) -> ColumnId {
        self.first
    }

    /// Rightmost column of the window.
    pub fn last(&self) -> ColumnId {
        self.last
    }

    /// Number of columns in the window.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Windows always span at least one column.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Alignment {
    /// Picks a uniformly random window of `len` consecutive columns.
    ///
    /// A start column is drawn uniformly and the window extended forward; if
    /// it runs past the last column the start is redrawn. Returns `None` when
    /// the alignment is shorter than `len`, where no draw could succeed.
    pub fn random_window(&self, len: usize, rng: &mut RngHandle) -> Option<Window> {
        if len == 0 || len > self.len() {
            return None;
        }
        loop {
            let first = self.random_column(rng);
            let mut last = Some(first);
            for _ in 1..len {
                last = last.and_then(|id| self.next(id));
            }
            if let Some(last) = last {
                return Some(Window { first, last, len });
            }
        }
    }

    /// Window spanning `len` columns starting at `first`, if that many exist.
    pub fn window_at(&self, first: ColumnId, len: usize) -> Option<Window> {
        if len == 0 {
            return None;
        }
        let mut last = first;
        for _ in 1..len {
            last = self.next(last)?;
        }
        Some(Window { first, last, len })
    }

    /// Column handles of `window` in order.
    pub fn window_ids(&self, window: &Window) -> Vec<ColumnId> {
        let mut ids = Vec::with_capacity(window.len);
        let mut cursor = Some(window.first);
        while let Some(id) = cursor {
            ids.push(id);
            if id == window.last {
                break;
            }
            cursor = self.next(id);
        }
        ids
    }

    /// Owned copies of the column content of `window`, for local
    /// recomputation without touching the live alignment.
    pub fn window_columns(&self, window: &Window) -> Vec<Box<[Entry]>> {
        self.window_ids(window)
            .into_iter()
            .map(|id| self.cells(id).into())
            .collect()
    }

    /// Replaces `window` by `columns`, which may differ in length.
    ///
    /// Overlapping columns are rewritten in place, surplus old columns are
    /// removed and surplus new columns are linked in after the last kept one.
    /// Every new column must have one entry per row and at least one residue.
    /// Returns the window now occupying the region, or `None` if it is empty.
    pub fn replace_window(
        &mut self,
        window: &Window,
        columns: Vec<Box<[Entry]>>,
    ) -> Result<Option<Window>, AmaError> {
        for (idx, cells) in columns.iter().enumerate() {
            if cells.len() != self.num_rows() {
                return Err(AmaError::Alignment(
                    ErrorInfo::new("column-size", "replacement column size differs from row count")
                        .with_context("column", (idx + 1).to_string()),
                ));
            }
            if count_non_gaps(cells) == 0 {
                return Err(AmaError::Alignment(
                    ErrorInfo::new("gap-only", "replacement column is gap-only")
                        .with_context("column", (idx + 1).to_string()),
                ));
            }
        }

        let old = self.window_ids(window);
        let mut anchor = self.prev(window.first);
        let mut placed = Vec::with_capacity(columns.len());
        let mut fresh = columns.into_iter();

        for &id in &old {
            match fresh.next() {
                Some(cells) => {
                    self.set_cells(id, cells);
                    anchor = Some(id);
                    placed.push(id);
                }
                None => self.remove_column(id),
            }
        }
        for cells in fresh {
            let id = self.insert_column(cells, anchor);
            anchor = Some(id);
            placed.push(id);
        }

        Ok(match (placed.first(), placed.last()) {
            (Some(&first), Some(&last)) => Some(Window {
                first,
                last,
                len: placed.len(),
            }),
            _ => None,
        })
    }

    /// Rewrites the content of `window` in place with equally many columns.
    pub fn replace_window_content(
        &mut self,
        window: &Window,
        columns: Vec<Box<[Entry]>>,
    ) -> Result<(), AmaError> {
        if columns.len() != window.len {
            return Err(AmaError::Alignment(
                ErrorInfo::new(
                    "window-length",
                    "window length does not agree with the replacement columns",
                )
                .with_context("window", window.len.to_string())
                .with_context("columns", columns.len().to_string()),
            ));
        }
        self.replace_window(window, columns).map(|_| ())
    }
}
