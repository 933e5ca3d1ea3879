//! Spreadsheet (xls/xlsx) parsing via calamine.

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use std::io::Cursor;

use super::delimited::{clean_headers, MISSING_TOKENS};
use crate::error::{LoadError, LoadResult};
use crate::models::{Cell, Document};

/// Parse the first sheet of a workbook, first row as column names.
pub fn parse_workbook(bytes: &[u8]) -> LoadResult<Document> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| LoadError::Spreadsheet(format!("cannot open workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Spreadsheet("workbook has no sheets".to_string()))?
        .map_err(|e| LoadError::Spreadsheet(format!("cannot read first sheet: {}", e)))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or(LoadError::Empty)?;
    let headers = clean_headers(
        header
            .iter()
            .map(|cell| match cell {
                Data::Empty => String::new(),
                other => other.to_string(),
            })
            .collect(),
    );

    // Rows inside the used range are kept even when every cell is empty.
    let body: Vec<Vec<Cell>> = rows.map(|row| row.iter().map(to_cell).collect()).collect();

    Ok(Document::from_rows(headers, body)?)
}

fn to_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) if MISSING_TOKENS.contains(&s.as_str()) => Cell::Missing,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map_or_else(|| Cell::Text(cell.to_string()), Cell::Datetime),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnKind;
    use rust_xlsxwriter::{Formula, Workbook};

    fn workbook_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "city").unwrap();
        sheet.write_string(0, 1, "population").unwrap();
        sheet.write_string(1, 0, "Lyon").unwrap();
        sheet.write_number(1, 1, 513275.0).unwrap();
        sheet.write_string(2, 0, "Nantes").unwrap();
        sheet.write_string(3, 0, "Lille").unwrap();
        sheet.write_number(3, 1, 236234.0).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_first_sheet_first_row_headers() {
        let doc = parse_workbook(&workbook_bytes()).unwrap();

        assert_eq!(doc.column_names(), vec!["city", "population"]);
        assert_eq!(doc.row_count(), 3);
        let population = &doc.column("population").unwrap().data;
        assert_eq!(population.kind(), ColumnKind::Numeric);
        assert!(population.is_missing(1));
        assert_eq!(population.render(2).as_deref(), Some("236234"));
    }

    #[test]
    fn test_interior_empty_row_kept() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "a").unwrap();
        sheet.write_number(1, 0, 1.0).unwrap();
        sheet.write_number(3, 0, 3.0).unwrap();
        let doc = parse_workbook(&workbook.save_to_buffer().unwrap()).unwrap();

        assert_eq!(doc.row_count(), 3);
        assert!(doc.column("a").unwrap().data.is_missing(1));
    }

    #[test]
    fn test_na_text_and_cached_errors_are_missing() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "v").unwrap();
        sheet.write_string(1, 0, "#N/A").unwrap();
        sheet
            .write_formula(2, 0, Formula::new("=NA()").set_result("#N/A"))
            .unwrap();
        sheet.write_number(3, 0, 7.0).unwrap();
        let doc = parse_workbook(&workbook.save_to_buffer().unwrap()).unwrap();

        let v = &doc.column("v").unwrap().data;
        assert_eq!(doc.row_count(), 3);
        assert!(v.is_missing(0));
        assert!(v.is_missing(1));
        assert_eq!(v.kind(), ColumnKind::Numeric);
    }

    #[test]
    fn test_not_a_workbook() {
        let err = parse_workbook(b"definitely,not\nexcel,data").unwrap_err();
        assert!(matches!(err, LoadError::Spreadsheet(_)));
    }
}
