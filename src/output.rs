use crate::data_point::ProcessedDataPoint;
use crate::error::ProcessingError;
use log::{debug, info};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(ProcessingError::Config(format!("unsupported output format '{}'", other))),
        }
    }
}

const CSV_HEADER: [&str; 6] = ["id", "originalText", "cleanedText", "normalizedText", "tokens", "label"];

/// Write processed records to `path`, creating parent directories as needed
///
/// JSON is a pretty-printed array. CSV quotes every field and doubles embedded
/// quotes; tokens are joined by single spaces.
pub fn save_processed_data(
    data: &[ProcessedDataPoint],
    path: &Path,
    format: OutputFormat,
) -> Result<(), ProcessingError> {
    let persist = |source: std::io::Error| ProcessingError::Persist {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persist)?;
    }

    let file = File::create(path).map_err(persist)?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, data)?;
            writer.write_all(b"\n").map_err(persist)?;
            writer.flush().map_err(persist)?;
        }
        OutputFormat::Csv => {
            let csv_error = |source: csv::Error| ProcessingError::Csv {
                path: path.to_path_buf(),
                source,
            };
            let mut csv_writer = csv::WriterBuilder::new()
                .quote_style(csv::QuoteStyle::Always)
                .from_writer(writer);
            csv_writer.write_record(CSV_HEADER).map_err(csv_error)?;
            for point in data {
                csv_writer.write_record(csv_row(point)).map_err(csv_error)?;
            }
            // flushes the BufWriter underneath as well
            csv_writer.flush().map_err(persist)?;
        }
    }

    info!("Saved {} records to {} ({})", data.len(), path.display(), format.extension());
    Ok(())
}

/// Persist one batch of an in-progress run as JSON
pub fn save_batch(
    data: &[ProcessedDataPoint],
    output_dir: &Path,
    dataset: &str,
    batch_index: usize,
) -> Result<(), ProcessingError> {
    let path = output_dir
        .join("intermediate")
        .join(format!("{}_batch_{}.json", dataset, batch_index));
    debug!("Persisting batch {} of '{}' to {}", batch_index, dataset, path.display());
    save_processed_data(data, &path, OutputFormat::Json)
}

fn csv_row(point: &ProcessedDataPoint) -> [String; 6] {
    [
        point.id.clone(),
        point.original_text.clone(),
        point.cleaned_text.clone(),
        point.normalized_text.clone(),
        point.tokens.join(" "),
        point.label.clone().unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset_loader::parse_delimited;
    use serde_json::Map;

    fn sample() -> Vec<ProcessedDataPoint> {
        vec![ProcessedDataPoint {
            id: "demo_0".to_string(),
            original_text: "She said \"wow\", twice".to_string(),
            cleaned_text: "she said wow twice".to_string(),
            normalized_text: "she said wow twice".to_string(),
            tokens: vec!["she".into(), "said".into(), "wow".into(), "twice".into()],
            label: Some("positive".to_string()),
            metadata: Map::new(),
        }]
    }

    #[test]
    fn test_csv_output_round_trips_through_loader_parser() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        save_processed_data(&sample(), &path, OutputFormat::Csv).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let rows = parse_delimited(&text, ',');
        assert_eq!(rows[0][1], "originalText");
        assert_eq!(rows[1][1], "She said \"wow\", twice");
        assert_eq!(rows[1][4], "she said wow twice");
        assert_eq!(rows[1][5], "positive");
        assert!(text.starts_with("\"id\",\"originalText\""));
        assert!(text.lines().nth(1).unwrap().starts_with("\"demo_0\""));
        assert!(text.contains("\"She said \"\"wow\"\", twice\""));
    }

    #[test]
    fn test_csv_output_with_line_breaks_and_no_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut data = sample();
        data[0].original_text = "first line\nsecond line".to_string();
        data[0].label = None;
        save_processed_data(&data, &path, OutputFormat::Csv).unwrap();

        let rows = parse_delimited(&fs::read_to_string(&path).unwrap(), ',');
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "first line\nsecond line");
        assert_eq!(rows[1][5], "");
    }

    #[test]
    fn test_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        save_processed_data(&sample(), &path, OutputFormat::Json).unwrap();

        let loaded: Vec<ProcessedDataPoint> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_batch_path() {
        let dir = tempfile::tempdir().unwrap();
        save_batch(&sample(), dir.path(), "demo", 2).unwrap();
        assert!(dir.path().join("intermediate").join("demo_batch_2.json").exists());
    }

    #[test]
    fn test_unwritable_path_is_persist_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let err = save_processed_data(&sample(), &blocker.join("out.json"), OutputFormat::Json).unwrap_err();
        assert!(err.is_persist_error());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
