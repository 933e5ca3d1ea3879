//! Delimited text (CSV/TXT) parsing.

use crate::error::{LoadError, LoadResult};
use crate::models::{Cell, Document};

/// Tokens read as missing values.
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A",
    "#N/A N/A", "#NA", "<NA>", "1.#IND", "1.#QNAN", "-1.#IND", "-1.#QNAN",
];

/// Pick the field delimiter from the header line.
///
/// Comma unless `;`, tab or `|` appears strictly more often.
pub fn detect_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");

    let mut best = b',';
    let mut best_count = first_line.matches(',').count();

    for sep in [b';', b'\t', b'|'] {
        let count = first_line.matches(sep as char).count();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }

    best
}

/// Parse decoded text into a document, first row as column names.
pub fn parse_delimited(content: &str, delimiter: u8) -> LoadResult<Document> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader
        .records()
        .filter(|r| r.as_ref().map_or(true, |rec| !is_blank(rec, content)));

    let header = match records.next() {
        Some(record) => record.map_err(malformed)?,
        None => return Err(LoadError::Empty),
    };
    let headers = clean_headers(header.iter().map(str::to_string).collect());

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(malformed)?;
        if record.len() > headers.len() {
            let line = record.position().map_or(rows.len() + 2, |p| p.line() as usize);
            return Err(LoadError::Malformed {
                line,
                message: format!("expected {} fields, saw {}", headers.len(), record.len()),
            });
        }
        rows.push(record.iter().map(to_cell).collect());
    }

    Ok(Document::from_rows(headers, rows)?)
}

/// A whitespace-only line. A quoted empty field (`""`) is a real row with
/// one missing value, so the raw text at the record start is checked too.
fn is_blank(record: &csv::StringRecord, content: &str) -> bool {
    if record.len() > 1 || !record.iter().all(|f| f.trim().is_empty()) {
        return false;
    }
    let start = record.position().map_or(0, |p| p.byte() as usize);
    let raw = content
        .get(start..)
        .unwrap_or("")
        .trim_start_matches(['\r', '\n']);
    !raw.starts_with('"')
}

fn to_cell(field: &str) -> Cell {
    if MISSING_TOKENS.contains(&field) {
        Cell::Missing
    } else {
        Cell::Text(field.to_string())
    }
}

fn malformed(err: csv::Error) -> LoadError {
    let line = err.position().map_or(0, |p| p.line() as usize);
    LoadError::Malformed {
        line,
        message: err.to_string(),
    }
}

/// Name blank headers `Unnamed: <i>` and suffix repeats with `.1`, `.2`, ...
pub fn clean_headers(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for (i, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{}.{}", base, n);
            n += 1;
        }
        out.push(candidate);
    }
    out
}
