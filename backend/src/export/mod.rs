//! Document export to CSV, Excel and JSON.
//!
//! Every writer builds the whole output in memory first, so a failure never
//! leaves a partial file behind. The caller's document is only borrowed.

use rust_xlsxwriter::{Formula, Workbook};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use crate::api::logs::LogScope;
use crate::error::{ExportError, ExportResult};
use crate::models::{Cell, Document};

/// Base name of downloaded files.
pub const EXPORT_BASENAME: &str = "processed_data";

/// Last usable worksheet row (the header takes row 0).
const EXCEL_MAX_ROWS: usize = 1_048_576;
const EXCEL_MAX_COLUMNS: usize = 16_384;

/// Target encoding of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Excel,
    Json,
}

impl ExportFormat {
    pub fn tag(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
            ExportFormat::Json => "json",
        }
    }

    /// Suggested download name, `processed_data.<format>`.
    pub fn file_name(self) -> String {
        format!("{}.{}", EXPORT_BASENAME, self.tag())
    }

    /// MIME label, `application/<format>`.
    pub fn mime(self) -> String {
        format!("application/{}", self.tag())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" => Ok(ExportFormat::Excel),
            "json" => Ok(ExportFormat::Json),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// A finished export, ready to stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub data: Vec<u8>,
    pub file_name: String,
    pub mime: String,
    pub format: ExportFormat,
}

impl ExportedFile {
    /// Reader positioned at the start of the content.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.data.as_slice())
    }
}

/// Serialize `doc` to `format`.
pub fn export(doc: &Document, format: ExportFormat) -> ExportResult<ExportedFile> {
    export_scoped(doc, format, &LogScope::global())
}

/// [`export`] with the completion entry tagged for `scope`.
pub fn export_scoped(doc: &Document, format: ExportFormat, scope: &LogScope) -> ExportResult<ExportedFile> {
    let data = match format {
        ExportFormat::Csv => to_csv(doc)?,
        ExportFormat::Excel => to_excel(doc)?,
        ExportFormat::Json => to_json(doc)?,
    };
    scope.success(format!(
        "Exported {} rows as {} ({} bytes)",
        doc.row_count(),
        format,
        data.len()
    ));
    Ok(ExportedFile {
        data,
        file_name: format.file_name(),
        mime: format.mime(),
        format,
    })
}

/// Comma-delimited UTF-8 with a header row and no index column.
pub fn to_csv(doc: &Document) -> ExportResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(doc.column_names())?;
    for row in 0..doc.row_count() {
        writer.write_record(
            doc.columns()
                .iter()
                .map(|c| c.data.render(row).unwrap_or_default()),
        )?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))
}

/// Single-sheet workbook with a header row and no index column. Numbers are
/// numeric cells; everything else is written as text.
///
/// Missing cells are left blank, except that a row with no value at all gets
/// `=NA()` in its first cell. Blank rows at the end of a sheet are outside its
/// used range, and readers would drop them.
pub fn to_excel(doc: &Document) -> ExportResult<Vec<u8>> {
    if doc.row_count() >= EXCEL_MAX_ROWS {
        return Err(ExportError::TooLarge {
            format: "excel".to_string(),
            message: format!("{} rows exceed the sheet limit", doc.row_count()),
        });
    }
    if doc.column_count() > EXCEL_MAX_COLUMNS {
        return Err(ExportError::TooLarge {
            format: "excel".to_string(),
            message: format!("{} columns exceed the sheet limit", doc.column_count()),
        });
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1")?;

    for row in 0..doc.row_count() {
        if doc.columns().iter().all(|c| c.data.is_missing(row)) {
            sheet.write_formula((row + 1) as u32, 0, Formula::new("=NA()").set_result("#N/A"))?;
        }
    }

    for (col, column) in doc.columns().iter().enumerate() {
        let col = col as u16;
        sheet.write_string(0, col, &column.name)?;
        for row in 0..column.len() {
            let target = (row + 1) as u32;
            match column.data.cell(row) {
                Cell::Missing => {}
                Cell::Number(n) => {
                    sheet.write_number(target, col, n)?;
                }
                other => {
                    let text = other.render().unwrap_or_default();
                    sheet.write_string(target, col, &text)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Array of records, one object per row, not pretty-printed.
pub fn to_json(doc: &Document) -> ExportResult<Vec<u8>> {
    let records: Vec<Value> = (0..doc.row_count())
        .map(|row| {
            let record: Map<String, Value> = doc
                .columns()
                .iter()
                .map(|c| (c.name.clone(), c.data.cell(row).to_json()))
                .collect();
            Value::Object(record)
        })
        .collect();
    Ok(serde_json::to_vec(&records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, ColumnData};
    use crate::parser::load_bytes;
    use std::io::Read;

    fn sample() -> Document {
        Document::new(vec![
            Column::new("name", ColumnData::Text(vec![Some("Ana".into()), Some("Bo, Jr".into()), None])),
            Column::new("score", ColumnData::numeric(vec![Some(12.5), None, Some(3.0)])),
        ])
        .unwrap()
    }

    #[test]
    fn test_format_naming() {
        assert_eq!(ExportFormat::Csv.file_name(), "processed_data.csv");
        assert_eq!(ExportFormat::Excel.file_name(), "processed_data.excel");
        assert_eq!(ExportFormat::Json.mime(), "application/json");
        assert_eq!("Excel".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert!("parquet".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_csv_output() {
        let bytes = to_csv(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "name,score\nAna,12.5\n\"Bo, Jr\",\n,3\n");
    }

    #[test]
    fn test_json_output() {
        let bytes = to_json(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            r#"[{"name":"Ana","score":12.5},{"name":"Bo, Jr","score":null},{"name":null,"score":3}]"#
        );
    }

    #[test]
    fn test_reader_starts_at_beginning() {
        let file = export(&sample(), ExportFormat::Csv).unwrap();
        let mut out = String::new();
        file.reader().read_to_string(&mut out).unwrap();
        assert!(out.starts_with("name,score"));
        assert_eq!(file.file_name, "processed_data.csv");
        assert_eq!(file.mime, "application/csv");
    }

    #[test]
    fn test_csv_round_trip() {
        let doc = sample();
        let file = export(&doc, ExportFormat::Csv).unwrap();
        let back = load_bytes(&file.file_name, &file.data).unwrap().document;
        assert_eq!(back, doc);
    }

    #[test]
    fn test_json_round_trip() {
        let doc = sample();
        let file = export(&doc, ExportFormat::Json).unwrap();
        let back = load_bytes(&file.file_name, &file.data).unwrap().document;
        assert_eq!(back, doc);
    }

    #[test]
    fn test_single_column_csv_round_trip() {
        let doc = Document::new(vec![Column::new("x", ColumnData::numeric(vec![Some(1.0), None, Some(3.0)]))])
            .unwrap();
        let file = export(&doc, ExportFormat::Csv).unwrap();
        assert_eq!(file.data, b"x\n1\n\"\"\n3\n");

        let back = load_bytes(&file.file_name, &file.data).unwrap().document;
        assert_eq!(back.row_count(), 3);
        assert_eq!(back, doc);
    }

    #[test]
    fn test_excel_round_trip_shape() {
        let doc = sample();
        let file = export(&doc, ExportFormat::Excel).unwrap();
        let back = load_bytes("processed_data.xlsx", &file.data).unwrap().document;
        assert_eq!(back.column_names(), doc.column_names());
        assert_eq!(back.row_count(), doc.row_count());
        assert_eq!(back.column("score").unwrap().data.render(0).as_deref(), Some("12.5"));
    }

    #[test]
    fn test_excel_round_trip_keeps_all_missing_rows() {
        let doc = Document::new(vec![
            Column::new("a", ColumnData::numeric(vec![Some(1.0), None, Some(3.0), None])),
            Column::new("b", ColumnData::Text(vec![Some("x".into()), None, Some("z".into()), None])),
        ])
        .unwrap();
        let file = export(&doc, ExportFormat::Excel).unwrap();
        let back = load_bytes("processed_data.xlsx", &file.data).unwrap().document;

        assert_eq!(back.row_count(), 4);
        assert_eq!(back, doc);
    }

    #[test]
    fn test_empty_document_exports() {
        let doc = Document::default();
        assert_eq!(to_json(&doc).unwrap(), b"[]");
        assert!(to_excel(&doc).is_ok());
    }
}
