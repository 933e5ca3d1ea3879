//! Text encoding detection and decoding.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::io::{Read, Seek, SeekFrom};

/// Label returned when detection is inconclusive.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Single-byte encoding used as the last resort; it maps every byte.
pub const FALLBACK_ENCODING: &str = "windows-1252";

/// Guess the encoding of raw bytes using chardet.
///
/// The result is always a label `encoding_rs` understands. Unknown or empty
/// guesses fall back to [`DEFAULT_ENCODING`].
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return DEFAULT_ENCODING.to_string();
    }
    let (charset, _confidence, _language) = chardet::detect(bytes);
    normalize_label(&charset)
}

/// Detect the encoding of a seekable stream without moving its position.
///
/// Reads from the current position to the end, then seeks back to where it
/// started so the same bytes can be parsed afterwards. Read errors yield the
/// default label.
pub fn detect_encoding_from_reader<R: Read + Seek>(reader: &mut R) -> String {
    let start = match reader.stream_position() {
        Ok(pos) => pos,
        Err(_) => return DEFAULT_ENCODING.to_string(),
    };
    let mut buf = Vec::new();
    let label = match reader.read_to_end(&mut buf) {
        Ok(_) => detect_encoding(&buf),
        Err(_) => DEFAULT_ENCODING.to_string(),
    };
    // A stream that cannot seek back is left where the read stopped
    let _ = reader.seek(SeekFrom::Start(start));
    label
}

/// Map chardet charset names onto `encoding_rs` labels.
fn normalize_label(charset: &str) -> String {
    let lower = charset.trim().to_lowercase();
    match lower.as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => DEFAULT_ENCODING.to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => FALLBACK_ENCODING.to_string(),
        other if Encoding::for_label(other.as_bytes()).is_some() => other.to_string(),
        _ => DEFAULT_ENCODING.to_string(),
    }
}

/// Decode strictly with `label`. Returns `None` on malformed input.
///
/// A byte order mark overrides the label and is stripped.
pub fn decode_strict(bytes: &[u8], label: &str) -> Option<String> {
    let encoding = Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8);
    let (text, _used, had_errors) = encoding.decode(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

/// Decode with the single-byte fallback. Never fails.
pub fn decode_fallback(bytes: &[u8]) -> String {
    WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned()
}
