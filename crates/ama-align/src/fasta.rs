//! FASTA (and MPD) reading and FASTA writing for [`RawSequences`].

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ama_core::{AmaError, ErrorInfo};
use log::debug;

use crate::raw::{RawSequences, GAP_CHAR};

/// Line that starts the trailing score block of MPD files.
const SCORES_SEPARATOR: &str = "#scores";

/// Reads sequences in FASTA format from `reader`.
///
/// Sequence names are normalised: surrounding whitespace is trimmed, runs of
/// blanks become `_`, and parentheses become braces. `.` is read as a gap.
/// Anything after an MPD `#scores` line is ignored. Any malformed line makes
/// the whole read fail with the number of problems found.
pub fn read_fasta<R: BufRead>(reader: R) -> Result<RawSequences, AmaError> {
    let mut result = RawSequences::new();
    let mut current: Option<(String, String)> = None;
    let mut problems = Problems::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|err| {
            AmaError::Io(
                ErrorInfo::new("fasta-read", err.to_string())
                    .with_context("line", line_no.to_string()),
            )
        })?;
        if line.is_empty() {
            continue;
        }
        if line.starts_with(SCORES_SEPARATOR) {
            break;
        }
        if let Some(header) = line.strip_prefix('>') {
            if let Some((name, seq)) = current.take() {
                finish_record(&mut result, name, seq, line_no, &mut problems)?;
            }
            current = Some((normalise_name(header), String::new()));
            continue;
        }
        match current.as_mut() {
            Some((_, seq)) => {
                for ch in line.chars().filter(|ch| !ch.is_whitespace()) {
                    if ch.is_ascii_alphabetic() {
                        seq.push(ch);
                    } else if ch == '-' || ch == '.' {
                        seq.push(GAP_CHAR as char);
                    } else {
                        problems.note(line_no);
                    }
                }
            }
            None => problems.note(line_no),
        }
    }
    if let Some((name, seq)) = current.take() {
        finish_record(&mut result, name, seq, 0, &mut problems)?;
    }

    if problems.count > 0 {
        let mut info = ErrorInfo::new("fasta-parse", "malformed FASTA input")
            .with_context("errors", problems.count.to_string());
        if let Some(line) = problems.first_line {
            info = info.with_context("first_line", line.to_string());
        }
        return Err(AmaError::Input(info));
    }
    debug!("read {} sequences", result.len());
    Ok(result)
}

#[derive(Default)]
struct Problems {
    count: usize,
    first_line: Option<usize>,
}

impl Problems {
    fn note(&mut self, line_no: usize) {
        self.count += 1;
        if line_no > 0 {
            self.first_line.get_or_insert(line_no);
        }
    }
}

/// Stores a completed record; `line_no` is the line that closed it (0 at EOF).
fn finish_record(
    result: &mut RawSequences,
    name: String,
    seq: String,
    line_no: usize,
    problems: &mut Problems,
) -> Result<(), AmaError> {
    if seq.is_empty() {
        problems.note(line_no);
        return Ok(());
    }
    result.add(name, seq)
}

fn normalise_name(header: &str) -> String {
    let mut name = String::with_capacity(header.len());
    let mut in_blank = false;
    for ch in header.trim().chars() {
        match ch {
            ' ' | '\t' => {
                if !in_blank {
                    name.push('_');
                }
                in_blank = true;
                continue;
            }
            '(' => name.push('{'),
            ')' => name.push('}'),
            other => name.push(other),
        }
        in_blank = false;
    }
    name
}

/// Reads a FASTA or MPD file from disk.
pub fn read_fasta_file(path: &Path) -> Result<RawSequences, AmaError> {
    debug!("parsing fasta file {path:?}");
    let file = File::open(path).map_err(|err| AmaError::io("fasta-open", err, path))?;
    read_fasta(BufReader::new(file)).map_err(|err| match err {
        AmaError::Input(info) => {
            AmaError::Input(info.with_context("path", path.display().to_string()))
        }
        other => other,
    })
}

/// Writes sequences in FASTA format, wrapping sequence lines at `wrap`
/// characters when it is non-zero.
pub fn write_fasta<W: Write>(raw: &RawSequences, writer: W, wrap: usize) -> std::io::Result<()> {
    let mut writer = BufWriter::new(writer);
    for (name, seq) in raw.iter() {
        writeln!(writer, "> {name}")?;
        if wrap == 0 {
            writeln!(writer, "{seq}")?;
        } else {
            for chunk in seq.as_bytes().chunks(wrap) {
                writer.write_all(chunk)?;
                writeln!(writer)?;
            }
        }
    }
    writer.flush()
}

/// Writes sequences to a FASTA file, creating parent directories.
pub fn write_fasta_file(raw: &RawSequences, path: &Path, wrap: usize) -> Result<(), AmaError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AmaError::io("fasta-mkdir", err, parent))?;
    }
    let file = File::create(path).map_err(|err| AmaError::io("fasta-create", err, path))?;
    write_fasta(raw, file, wrap).map_err(|err| AmaError::io("fasta-write", err, path))
}
