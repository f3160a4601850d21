//! Conversion of driver values into JSON-friendly values.

use crate::db::{format_iso_datetime, Row, Value};

/// Decodes binary values as UTF-8 text and renders timestamps as ISO-8601
/// text. Everything else is returned unchanged.
///
/// Invalid UTF-8 sequences are replaced with U+FFFD.
pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::Bytes(bytes) => Value::Text(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }),
        Value::Timestamp(ts) => Value::Text(format_iso_datetime(&ts)),
        other => other,
    }
}

/// Normalizes every field of a row, keeping column order.
pub fn normalize_row(row: Row) -> Row {
    row.into_iter()
        .map(|(column, value)| (column, normalize_value(value)))
        .collect()
}

pub fn normalize_rows(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter().map(normalize_row).collect()
}
