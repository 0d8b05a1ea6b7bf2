use std::fmt;

use ama_core::{AmaError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// Gap character used in aligned sequence text.
pub const GAP_CHAR: u8 = b'-';

/// Ordered collection of named, possibly gapped sequences.
///
/// Names are unique. Sequences of an alignment must share one length, which
/// is checked lazily by [`RawSequences::aligned_len`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSequences {
    names: Vec<String>,
    sequences: Vec<String>,
}

impl RawSequences {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named sequence, rejecting duplicate names.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        sequence: impl Into<String>,
    ) -> Result<(), AmaError> {
        let name = name.into();
        if self.names.iter().any(|existing| *existing == name) {
            return Err(AmaError::Input(
                ErrorInfo::new("duplicate-name", "name collision between sequences")
                    .with_context("name", name)
                    .with_hint("edit the input file so that every sequence name is unique"),
            ));
        }
        self.names.push(name);
        self.sequences.push(sequence.into());
        Ok(())
    }

    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` when no sequence has been added.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of the `index`th sequence.
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Text of the `index`th sequence.
    pub fn sequence(&self, index: usize) -> &str {
        &self.sequences[index]
    }

    /// Iterates over `(name, sequence)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.names
            .iter()
            .zip(self.sequences.iter())
            .map(|(name, seq)| (name.as_str(), seq.as_str()))
    }

    /// Common length of all sequences, or `None` if lengths differ.
    ///
    /// An empty collection is aligned with length zero.
    pub fn aligned_len(&self) -> Option<usize> {
        let first = self.sequences.first().map_or(0, |seq| seq.len());
        self.sequences
            .iter()
            .all(|seq| seq.len() == first)
            .then_some(first)
    }

    /// Removes every gap character from every sequence.
    pub fn remove_gaps(&mut self) {
        for seq in &mut self.sequences {
            seq.retain(|ch| ch != GAP_CHAR as char);
        }
    }
}

impl fmt::Display for RawSequences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, seq) in self.iter() {
            writeln!(f, ">{name}")?;
            writeln!(f, "{seq}")?;
        }
        Ok(())
    }
}
