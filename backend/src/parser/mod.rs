//! Dataset loading with format dispatch and encoding auto-detection.
//!
//! The file extension picks the parser:
//!
//! | Extension | Parser |
//! |-----------|--------|
//! | `csv`, `txt` | [`delimited`] after [`encoding`] detection, windows-1252 retry |
//! | `xls`, `xlsx` | [`excel`], first sheet |
//! | `json` | [`json`], records or columns |
//! | anything else | whole file as UTF-8 in a single `Raw_Content` cell |

pub mod delimited;
pub mod encoding;
pub mod excel;
pub mod json;

use serde::Serialize;
use std::io::{Read, Seek};
use std::path::Path;

use crate::api::logs::LogScope;
use crate::error::{LoadError, LoadResult};
use crate::models::{Column, ColumnData, Document};

pub use delimited::{detect_delimiter, parse_delimited};
pub use encoding::{
    decode_fallback, decode_strict, detect_encoding, detect_encoding_from_reader, DEFAULT_ENCODING,
    FALLBACK_ENCODING,
};
pub use excel::parse_workbook;
pub use json::parse_json;

/// Column name used when a file is wrapped as opaque text.
pub const RAW_CONTENT_COLUMN: &str = "Raw_Content";

/// Parser family selected from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Delimited,
    Excel,
    Json,
    Text,
}

impl SourceFormat {
    /// Map a lowercase extension to its parser family.
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "csv" | "txt" => SourceFormat::Delimited,
            "xls" | "xlsx" => SourceFormat::Excel,
            "json" => SourceFormat::Json,
            _ => SourceFormat::Text,
        }
    }
}

/// Lowercase text after the last dot. A name without a dot is its own extension.
pub fn extension_of(file_name: &str) -> String {
    file_name.rsplit('.').next().unwrap_or("").to_lowercase()
}

/// How a dataset was read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub file_name: String,
    pub extension: String,
    pub format: SourceFormat,
    /// Encoding used to decode text formats
    pub encoding: Option<String>,
    /// Field delimiter for delimited text
    pub delimiter: Option<char>,
    /// Whether the windows-1252 retry was needed
    pub used_fallback: bool,
}

/// A parsed document with its source metadata.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub document: Document,
    pub source: SourceInfo,
}

/// Load a dataset from raw bytes, dispatching on the file name's extension.
pub fn load_bytes(file_name: &str, bytes: &[u8]) -> LoadResult<LoadedDataset> {
    load_with_encoding(file_name, bytes, None, &LogScope::global())
}

/// [`load_bytes`] with progress entries tagged for `scope`.
pub fn load_bytes_scoped(file_name: &str, bytes: &[u8], scope: &LogScope) -> LoadResult<LoadedDataset> {
    load_with_encoding(file_name, bytes, None, scope)
}

/// Load from a seekable stream. Encoding detection rewinds the stream, so
/// the parse sees the same bytes.
pub fn load_reader<R: Read + Seek>(file_name: &str, reader: &mut R) -> LoadResult<LoadedDataset> {
    let detected = match SourceFormat::from_extension(&extension_of(file_name)) {
        SourceFormat::Delimited => Some(detect_encoding_from_reader(reader)),
        _ => None,
    };
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    load_with_encoding(file_name, &bytes, detected, &LogScope::global())
}

fn load_with_encoding(
    file_name: &str,
    bytes: &[u8],
    detected: Option<String>,
    scope: &LogScope,
) -> LoadResult<LoadedDataset> {
    let extension = extension_of(file_name);
    let format = SourceFormat::from_extension(&extension);
    let mut source = SourceInfo {
        file_name: file_name.to_string(),
        extension: extension.clone(),
        format,
        encoding: None,
        delimiter: None,
        used_fallback: false,
    };

    scope.info(format!("📖 Reading {} ({} bytes)...", file_name, bytes.len()));

    let document = match format {
        SourceFormat::Delimited => {
            let encoding = detected.unwrap_or_else(|| detect_encoding(bytes));
            scope.success(format!("Detected encoding: {}", encoding));
            load_delimited(bytes, encoding, &mut source, scope)?
        }
        SourceFormat::Excel => parse_workbook(bytes)?,
        SourceFormat::Json => {
            let text = decode_strict(bytes, DEFAULT_ENCODING)
                .ok_or_else(|| LoadError::Decode("JSON must be UTF-8".to_string()))?;
            source.encoding = Some(DEFAULT_ENCODING.to_string());
            parse_json(&text)?
        }
        SourceFormat::Text => {
            let text = std::str::from_utf8(bytes)
                .map_err(|_| LoadError::UnsupportedFormat { extension })?;
            source.encoding = Some(DEFAULT_ENCODING.to_string());
            raw_document(text)
        }
    };

    scope.success(format!(
        "Loaded {} rows × {} columns",
        document.row_count(),
        document.column_count()
    ));
    Ok(LoadedDataset { document, source })
}

/// Load a dataset from disk.
pub fn load_path<P: AsRef<Path>>(path: P) -> LoadResult<LoadedDataset> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    load_bytes(&file_name, &bytes)
}

/// Decode with the detected encoding and parse; on any failure retry once
/// with windows-1252, which decodes every byte sequence.
fn load_delimited(
    bytes: &[u8],
    encoding: String,
    source: &mut SourceInfo,
    scope: &LogScope,
) -> LoadResult<Document> {
    let first_attempt = decode_strict(bytes, &encoding)
        .ok_or_else(|| LoadError::Decode(format!("invalid {} content", encoding)))
        .and_then(|text| {
            let delimiter = detect_delimiter(&text);
            parse_delimited(&text, delimiter).map(|doc| (doc, delimiter))
        });

    let (document, delimiter, encoding) = match first_attempt {
        Ok((doc, delimiter)) => (doc, delimiter, encoding),
        Err(LoadError::Empty) => return Err(LoadError::Empty),
        Err(err) => {
            scope.warning(format!("Reading as {} failed: {}", encoding, err));
            scope.warning_indent(format!("Retrying with {}", FALLBACK_ENCODING), 1);
            source.used_fallback = true;
            let text = decode_fallback(bytes);
            let delimiter = detect_delimiter(&text);
            let doc = parse_delimited(&text, delimiter)?;
            (doc, delimiter, FALLBACK_ENCODING.to_string())
        }
    };

    scope.info_indent(format!("Delimiter: '{}'", format_delimiter(delimiter)), 1);
    source.encoding = Some(encoding);
    source.delimiter = Some(delimiter as char);
    Ok(document)
}

/// Wrap text as a single-row, single-column document.
fn raw_document(text: &str) -> Document {
    Document::new(vec![Column::new(
        RAW_CONTENT_COLUMN,
        ColumnData::Raw(vec![Some(text.to_string())]),
    )])
    .unwrap_or_default()
}

/// Format delimiter for display
fn format_delimiter(d: u8) -> &'static str {
    match d {
        b';' => ";",
        b',' => ",",
        b'\t' => "TAB",
        b'|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnKind;
    use std::io::{Cursor, Write};

    #[test]
    fn test_extension_dispatch() {
        assert_eq!(extension_of("Data.CSV"), "csv");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "readme");
        assert_eq!(SourceFormat::from_extension("xlsx"), SourceFormat::Excel);
        assert_eq!(SourceFormat::from_extension("txt"), SourceFormat::Delimited);
        assert_eq!(SourceFormat::from_extension("md"), SourceFormat::Text);
    }

    #[test]
    fn test_load_csv() {
        let loaded = load_bytes("people.csv", b"name,age\nAlice,30\nBob,25\n").unwrap();
        assert_eq!(loaded.document.row_count(), 2);
        assert_eq!(loaded.source.encoding.as_deref(), Some("utf-8"));
        assert_eq!(loaded.source.delimiter, Some(','));
        assert!(!loaded.source.used_fallback);
    }

    #[test]
    fn test_load_semicolon_txt() {
        let loaded = load_bytes("export.txt", b"a;b\n1;2\n").unwrap();
        assert_eq!(loaded.document.column_names(), vec!["a", "b"]);
        assert_eq!(loaded.source.delimiter, Some(';'));
    }

    // "ville\nSociété\n" in ISO-8859-1
    const LATIN1_CSV: &[u8] = &[
        b'v', b'i', b'l', b'l', b'e', b'\n', 0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9, b'\n',
    ];

    #[test]
    fn test_latin1_csv_loads() {
        let loaded = load_bytes("villes.csv", LATIN1_CSV).unwrap();
        let ville = &loaded.document.column("ville").unwrap().data;
        assert_eq!(loaded.document.row_count(), 1);
        assert!(ville.render(0).unwrap().starts_with("Soci"));
    }

    #[test]
    fn test_decode_failure_retries_with_fallback() {
        let mut source = SourceInfo {
            file_name: "villes.csv".into(),
            extension: "csv".into(),
            format: SourceFormat::Delimited,
            encoding: None,
            delimiter: None,
            used_fallback: false,
        };
        let doc = load_delimited(LATIN1_CSV, "utf-8".to_string(), &mut source, &LogScope::global()).unwrap();

        assert!(source.used_fallback);
        assert_eq!(source.encoding.as_deref(), Some(FALLBACK_ENCODING));
        assert_eq!(doc.column("ville").unwrap().data.render(0).as_deref(), Some("Société"));
    }

    #[test]
    fn test_garbled_txt_never_panics() {
        let garbage: Vec<u8> = (0u8..=255).rev().cycle().take(4096).collect();
        match load_bytes("noise.txt", &garbage) {
            Ok(loaded) => assert!(loaded.document.column_count() >= 1),
            Err(err) => assert!(!err.to_string().is_empty()),
        }
    }

    #[test]
    fn test_empty_csv() {
        assert!(matches!(load_bytes("empty.csv", b""), Err(LoadError::Empty)));
    }

    #[test]
    fn test_other_extension_wrapped_as_raw() {
        let loaded = load_bytes("notes.md", "# Title\nbody".as_bytes()).unwrap();
        let doc = loaded.document;
        assert_eq!(doc.column_names(), vec![RAW_CONTENT_COLUMN]);
        assert_eq!(doc.row_count(), 1);
        assert_eq!(doc.columns()[0].kind(), ColumnKind::Raw);
        assert_eq!(doc.columns()[0].data.render(0).as_deref(), Some("# Title\nbody"));
    }

    #[test]
    fn test_other_extension_binary_unsupported() {
        let err = load_bytes("image.png", &[0x89, 0x50, 0x4E, 0x47, 0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { ref extension } if extension == "png"));
        assert_eq!(err.to_string(), "Unsupported file format: .png");
    }

    #[test]
    fn test_load_json() {
        let loaded = load_bytes("rows.json", br#"[{"a":1,"b":"x"}]"#).unwrap();
        assert_eq!(loaded.document.column_names(), vec!["a", "b"]);
        assert_eq!(loaded.source.format, SourceFormat::Json);
    }

    #[test]
    fn test_load_reader() {
        let mut cursor = Cursor::new(b"x\n1\n2\n".to_vec());
        let loaded = load_reader("stream.csv", &mut cursor).unwrap();
        assert_eq!(loaded.document.row_count(), 2);
    }

    #[test]
    fn test_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"student,score\nana,12\nbo,\n").unwrap();

        let loaded = load_path(&path).unwrap();
        assert_eq!(loaded.source.file_name, "scores.csv");
        assert_eq!(loaded.document.missing_count(), 1);
    }

    #[test]
    fn test_scoped_load_tags_every_entry() {
        let mut rx = crate::api::logs::LOG_BROADCASTER.subscribe();
        let scope = LogScope::session("loader-scope");
        load_bytes_scoped("scoped_only_upload.csv", LATIN1_CSV, &scope).unwrap();

        let mut seen = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(entry) => seen.push(entry),
                Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        let reading: Vec<_> = seen
            .iter()
            .filter(|e| e.message.contains("scoped_only_upload.csv"))
            .collect();
        assert!(!reading.is_empty());
        assert!(reading.iter().all(|e| e.session.as_deref() == Some("loader-scope")));
        assert!(seen
            .iter()
            .filter(|e| e.message.starts_with("Retrying with"))
            .any(|e| e.session.as_deref() == Some("loader-scope")));
    }

    #[test]
    fn test_load_path_missing_file() {
        let err = load_path("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
