use crate::config::{DatasetConfig, DatasetFormat, TextEncoding};
use crate::data_point::Record;
use crate::error::ProcessingError;
use bstr::ByteSlice;
use log::{debug, error, info};
use serde_json::Value;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Load every record of a dataset into memory
///
/// Any failure here is fatal for the dataset: nothing is returned unless the
/// whole file decodes and parses.
pub fn load_dataset(config: &DatasetConfig) -> Result<Vec<Record>, ProcessingError> {
    info!("Loading dataset '{}' from {}", config.name, config.file_path.display());

    let text = read_text(&config.file_path, config.encoding).inspect_err(|e| {
        error!("Failed to read dataset '{}': {}", config.name, e);
    })?;

    let mut records = match config.format {
        DatasetFormat::Csv | DatasetFormat::Tsv => {
            let rows = parse_delimited(&text, config.effective_delimiter());
            rows_to_records(rows, config.has_header)
        }
        DatasetFormat::Json => parse_json(&text, &config.file_path).inspect_err(|e| {
            error!("Failed to parse dataset '{}': {}", config.name, e);
        })?,
    };

    if let Some(limit) = config.sample_size.filter(|&limit| records.len() > limit) {
        info!("Sampling first {} of {} records from '{}'", limit, records.len(), config.name);
        records.truncate(limit);
    }

    info!("Loaded {} records from dataset '{}'", records.len(), config.name);
    Ok(records)
}

/// Read a whole file and decode it. The file handle is closed when this returns.
pub fn read_text(path: &Path, encoding: TextEncoding) -> Result<String, ProcessingError> {
    let mut bytes = Vec::new();
    {
        let mut file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProcessingError::FileNotFound(path.to_path_buf()),
            _ => ProcessingError::Io(e),
        })?;
        file.read_to_end(&mut bytes)?;
    }
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    match encoding {
        TextEncoding::Utf8 => body
            .to_str()
            .map(str::to_string)
            .map_err(|e| ProcessingError::Encoding {
                path: path.to_path_buf(),
                encoding: encoding.as_str().to_string(),
                reason: format!("invalid byte sequence after {} valid bytes", e.valid_up_to()),
            }),
        TextEncoding::Utf8Lossy => Ok(body.to_str_lossy().into_owned()),
        TextEncoding::Latin1 => Ok(body.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Parse delimiter-separated text into rows of fields.
///
/// Quoted fields may contain the delimiter, line breaks and doubled quotes
/// (`""` -> `"`). A quote only opens a quoted field at the start of a cell;
/// anywhere else (`7" screen`) it is kept as a literal character. Blank lines
/// are skipped; CRLF and LF both end a row.
pub fn parse_delimited(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            c if c == delimiter => {
                row.push(std::mem::take(&mut field));
                at_field_start = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' | '\n' => {
                finish_row(&mut rows, &mut row, &mut field);
                at_field_start = true;
            }
            c => {
                field.push(c);
                at_field_start = false;
            }
        }
    }
    finish_row(&mut rows, &mut row, &mut field);

    rows
}

fn finish_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, field: &mut String) {
    row.push(std::mem::take(field));
    let blank = row.len() == 1 && row[0].trim().is_empty();
    if blank {
        row.clear();
    } else {
        rows.push(std::mem::take(row));
    }
}

/// Parse a single line; convenience over `parse_delimited`.
pub fn parse_delimited_line(line: &str, delimiter: char) -> Vec<String> {
    parse_delimited(line, delimiter).into_iter().next().unwrap_or_default()
}

fn column_name(index: usize) -> String {
    format!("column_{}", index + 1)
}

/// Turn parsed rows into keyed records. Without a header, or for cells past the
/// header's width, columns are named `column_1`, `column_2`, ...
fn rows_to_records(rows: Vec<Vec<String>>, has_header: bool) -> Vec<Record> {
    let mut rows = rows.into_iter();

    let headers: Vec<String> = if has_header {
        let raw = rows.next().unwrap_or_default();
        let mut headers: Vec<String> = Vec::with_capacity(raw.len());
        for (i, name) in raw.into_iter().enumerate() {
            let name = name.trim().to_string();
            if name.is_empty() || headers.contains(&name) {
                headers.push(column_name(i));
            } else {
                headers.push(name);
            }
        }
        headers
    } else {
        Vec::new()
    };

    rows.map(|row| {
        row.into_iter()
            .enumerate()
            .map(|(i, value)| {
                let key = headers.get(i).cloned().unwrap_or_else(|| column_name(i));
                (key, Value::String(value))
            })
            .collect()
    })
    .collect()
}

/// A JSON dataset is one object or an array of objects.
fn parse_json(text: &str, path: &Path) -> Result<Vec<Record>, ProcessingError> {
    let value: Value = serde_json::from_str(text).map_err(|source| ProcessingError::MalformedJson {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(ProcessingError::InvalidJsonShape {
                    path: path.to_path_buf(),
                    reason: format!("element {} is {}, expected an object", i, json_kind(&other)),
                }),
            })
            .collect(),
        other => Err(ProcessingError::InvalidJsonShape {
            path: path.to_path_buf(),
            reason: format!("top-level value is {}, expected an object or array", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_quoted_delimiter() {
        assert_eq!(parse_delimited_line(r#"a,"b,c",d"#, ','), vec!["a", "b,c", "d"]);
    }

    #[test]
    fn test_escaped_quote() {
        assert_eq!(parse_delimited_line(r#"a,"b""c",d"#, ','), vec!["a", "b\"c", "d"]);
    }

    #[test]
    fn test_empty_fields_and_crlf() {
        let rows = parse_delimited("a,,c\r\n\r\nx,y,\r\n", ',');
        assert_eq!(rows, vec![vec!["a", "", "c"], vec!["x", "y", ""]]);
    }

    #[test]
    fn test_stray_quote_is_literal() {
        let rows = parse_delimited(
            "rating\tverified_reviews\n5\tIts 7\" screen is great\n4\tLove it\n3\tOkay\n",
            '\t',
        );
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], vec!["5", "Its 7\" screen is great"]);
        assert_eq!(rows[2], vec!["4", "Love it"]);
        assert_eq!(rows[3], vec!["3", "Okay"]);
    }

    #[test]
    fn test_quote_after_text_does_not_open_field() {
        assert_eq!(parse_delimited_line(r#"a"b,"c,d""#, ','), vec!["a\"b", "c,d"]);
    }

    #[test]
    fn test_sample_size_caps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "big.csv", b"text\none\ntwo\nthree\nfour\n");
        let config = DatasetConfig::new("big", &path, DatasetFormat::Csv, "text").with_sample_size(2);

        let records = load_dataset(&config).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["text"], "two");

        let roomy = load_dataset(&config.with_sample_size(10)).unwrap();
        assert_eq!(roomy.len(), 4);
    }

    #[test]
    fn test_newline_inside_quotes() {
        let rows = parse_delimited("id,text\n1,\"line one\nline two\"\n", ',');
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "line one\nline two");
    }

    #[test]
    fn test_csv_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "reviews.csv", b"rating,text\n5,\"Great, really\"\n1,Bad\n");
        let config = DatasetConfig::new("reviews", &path, DatasetFormat::Csv, "text");

        let records = load_dataset(&config).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["text"], "Great, really");
        assert_eq!(records[1]["rating"], "1");
    }

    #[test]
    fn test_headerless_tsv_gets_synthetic_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "plain.tsv", b"1\tfirst review\n0\tsecond, with comma\n");
        let config = DatasetConfig::new("plain", &path, DatasetFormat::Tsv, "column_2").without_header();

        let records = load_dataset(&config).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["column_2"], "second, with comma");
        assert_eq!(records[0]["column_1"], "1");
    }

    #[test]
    fn test_custom_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "semi.csv", b"text;label\nhello;pos\n");
        let config = DatasetConfig::new("semi", &path, DatasetFormat::Csv, "text").with_delimiter(';');

        let records = load_dataset(&config).unwrap();
        assert_eq!(records[0]["label"], "pos");
    }

    #[test]
    fn test_json_object_and_array() {
        let dir = tempfile::tempdir().unwrap();
        let single = write_file(&dir, "one.json", br#"{"text": "solo"}"#);
        let many = write_file(&dir, "many.json", br#"[{"text": "a"}, {"text": "b", "score": 2}]"#);

        let one = load_dataset(&DatasetConfig::new("one", &single, DatasetFormat::Json, "text")).unwrap();
        assert_eq!(one.len(), 1);

        let records = load_dataset(&DatasetConfig::new("many", &many, DatasetFormat::Json, "text")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["score"], 2);
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.json", b"{not json at all");
        let err = load_dataset(&DatasetConfig::new("bad", &path, DatasetFormat::Json, "text")).unwrap_err();
        assert!(matches!(err, ProcessingError::MalformedJson { .. }));
        assert!(err.is_load_error());
    }

    #[test]
    fn test_json_array_of_scalars_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "scalars.json", b"[{\"text\": \"ok\"}, 3]");
        let err = load_dataset(&DatasetConfig::new("s", &path, DatasetFormat::Json, "text")).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidJsonShape { .. }));
    }

    #[test]
    fn test_missing_file() {
        let config = DatasetConfig::new("gone", "/definitely/not/here.csv", DatasetFormat::Csv, "text");
        assert!(matches!(load_dataset(&config), Err(ProcessingError::FileNotFound(_))));
    }

    #[test]
    fn test_encodings() {
        let dir = tempfile::tempdir().unwrap();
        let latin = write_file(&dir, "latin.csv", b"text\ncaf\xe9\n");

        let strict = DatasetConfig::new("l", &latin, DatasetFormat::Csv, "text");
        assert!(matches!(load_dataset(&strict), Err(ProcessingError::Encoding { .. })));

        let decoded = load_dataset(&strict.clone().with_encoding(TextEncoding::Latin1)).unwrap();
        assert_eq!(decoded[0]["text"], "café");

        let lossy = load_dataset(&strict.with_encoding(TextEncoding::Utf8Lossy)).unwrap();
        assert_eq!(lossy[0]["text"], "caf\u{FFFD}");
    }

    #[test]
    fn test_bom_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bom.csv", b"\xEF\xBB\xBFtext\nhi\n");
        let records = load_dataset(&DatasetConfig::new("b", &path, DatasetFormat::Csv, "text")).unwrap();
        assert_eq!(records[0]["text"], "hi");
    }
}
