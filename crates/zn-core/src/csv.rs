// Minimal CSV reading and writing.
//
// Inputs are operator-maintained lists (`AssetId,ClusterId`), outputs are
// hunt exports. Quoting follows RFC 4180: fields containing a comma, quote
// or line break are wrapped in quotes with inner quotes doubled.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// A parsed CSV document: header row plus records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Index of a column, matched case-insensitively and ignoring
    /// surrounding whitespace.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
    }

    /// Cell `col` of `row`, trimmed; `None` when missing or blank.
    pub fn cell<'a>(&self, row: &'a [String], col: usize) -> Option<&'a str> {
        row.get(col).map(|c| c.trim()).filter(|c| !c.is_empty())
    }
}

/// Read a CSV file with a header row. Blank lines are skipped.
pub fn read_table(path: &Path) -> Result<CsvTable, CoreError> {
    let raw = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    parse(&raw).map_err(|message| CoreError::csv(path, message))
}

/// Non-blank values of one column, in file order.
pub fn read_column(path: &Path, column: &str) -> Result<Vec<String>, CoreError> {
    let table = read_table(path)?;
    let col = table
        .column(column)
        .ok_or_else(|| CoreError::csv(path, format!("missing '{column}' column")))?;
    Ok(table
        .rows
        .iter()
        .filter_map(|row| table.cell(row, col).map(str::to_owned))
        .collect())
}

/// Parse CSV text with a header row.
pub fn parse(raw: &str) -> Result<CsvTable, String> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut records = parse_records(raw)?.into_iter();
    let Some(headers) = records.next() else {
        return Err("file is empty".into());
    };
    Ok(CsvTable {
        headers,
        rows: records.collect(),
    })
}

fn parse_records(raw: &str) -> Result<Vec<Vec<String>>, String> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1_usize;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                line += 1;
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(format!("unterminated quoted field (line {line})"));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }
    Ok(records)
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.iter().all(|f| f.trim().is_empty());
    if !blank {
        records.push(record);
    }
}

/// Quote a field when it needs it.
pub fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

/// Render rows as CSV text with `\n` line endings.
pub fn to_string<H, R, F>(headers: &[H], rows: R) -> String
where
    H: AsRef<str>,
    R: IntoIterator<Item = Vec<F>>,
    F: AsRef<str>,
{
    let mut out = String::new();
    push_line(&mut out, headers.iter().map(AsRef::as_ref));
    for row in rows {
        push_line(&mut out, row.iter().map(AsRef::as_ref));
    }
    out
}

fn push_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let line: Vec<String> = fields.map(escape).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Write CSV to `path`, replacing any existing file.
pub fn write_table<H, R, F>(path: &Path, headers: &[H], rows: R) -> Result<(), CoreError>
where
    H: AsRef<str>,
    R: IntoIterator<Item = Vec<F>>,
    F: AsRef<str>,
{
    fs::write(path, to_string(headers, rows)).map_err(|e| CoreError::io(path, e))
}

/// `path` if free, else `stem_1.ext`, `stem_2.ext`, ... in the same directory.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    (1_u32..)
        .map(|n| parent.join(format!("{stem}_{n}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
