use crate::config::{DatasetConfig, PreprocessingConfig};
use crate::data_point::{ProcessedDataPoint, Record, value_as_label};
use crate::dataset_loader;
use crate::error::ProcessingError;
use crate::output::{self, OutputFormat};
use crate::pipeline::{DatasetRun, MultiDatasetRun};
use crate::progress::CancellationToken;
use crate::report;
use crate::stats::{self, ProcessingStats};
use crate::text_cleaner::{CleaningReport, TextCleaner};
use crate::text_normalizer::{NormalizationReport, TextNormalizer};
use crate::tokenizer::{TokenizationReport, Tokenizer};
use log::{debug, info, warn};
use rustc_hash::FxHashSet as HashSet;
use serde_json::{Map, Value, json};
use std::path::Path;
use std::time::Duration;

/// Result of running one text through Clean -> Normalize -> Tokenize
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedText {
    pub cleaned: String,
    pub normalized: String,
    pub tokens: Vec<String>,
    pub cleaning_report: CleaningReport,
    pub normalization_report: NormalizationReport,
    pub tokenization_report: TokenizationReport,
}

/// Orchestrates dataset loading, per-record transformation, statistics,
/// persistence and reporting
///
/// Architecture:
/// - Each stage is built once from the run's `PreprocessingConfig`
/// - Records are processed in batches; each batch yields a progress event
/// - A failing record is counted and skipped, a failing dataset load aborts
/// - Statistics are always derived from the full processed set
pub struct DataPreprocessor {
    config: PreprocessingConfig,
    cleaner: TextCleaner,
    normalizer: TextNormalizer,
    tokenizer: Tokenizer,
}

impl DataPreprocessor {
    pub fn new(config: PreprocessingConfig) -> Result<Self, ProcessingError> {
        config.validate()?;
        info!(
            "Initializing preprocessor: batch_size={}, mode={}, save_intermediate={}",
            config.batch_size,
            config.normalization.mode.as_str(),
            config.save_intermediate
        );

        Ok(Self {
            cleaner: TextCleaner::new(config.cleaning.clone()),
            normalizer: TextNormalizer::new(config.normalization.clone()),
            tokenizer: Tokenizer::new(config.tokenization.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn cleaner(&self) -> &TextCleaner {
        &self.cleaner
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn load_dataset(&self, dataset: &DatasetConfig) -> Result<Vec<Record>, ProcessingError> {
        dataset_loader::load_dataset(dataset)
    }

    pub fn preprocess_text(&self, text: &str) -> Result<PreprocessedText, ProcessingError> {
        let (cleaned, cleaning_report) = self.cleaner.clean_with_report(text);
        let (normalized, normalization_report) = self.normalizer.normalize_with_report(&cleaned)?;
        let (tokens, tokenization_report) = self.tokenizer.tokenize_with_report(&normalized);
        Ok(PreprocessedText {
            cleaned,
            normalized,
            tokens,
            cleaning_report,
            normalization_report,
            tokenization_report,
        })
    }

    /// Transform one record
    ///
    /// Returns `Ok(None)` when the text column is missing, not a string, or
    /// blank; such records are skipped rather than counted as errors.
    pub fn process_record(
        &self,
        dataset: &DatasetConfig,
        row_index: usize,
        record: &Record,
    ) -> Result<Option<ProcessedDataPoint>, ProcessingError> {
        let original_text = match record.get(&dataset.text_column) {
            Some(Value::String(text)) if !text.trim().is_empty() => text,
            _ => {
                debug!("Skipping record {} of '{}': no usable text", row_index, dataset.name);
                return Ok(None);
            }
        };

        let processed = self
            .preprocess_text(original_text)
            .map_err(|e| ProcessingError::Record {
                index: row_index,
                reason: e.to_string(),
            })?;

        let label = dataset
            .label_column
            .as_ref()
            .and_then(|column| record.get(column))
            .and_then(value_as_label);

        let mut metadata: Map<String, Value> = record
            .iter()
            .filter(|(key, _)| {
                **key != dataset.text_column && Some(*key) != dataset.label_column.as_ref()
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let original_length = original_text.chars().count();
        let processed_length = processed.tokens.join(" ").chars().count();
        let vocabulary_size = processed.tokens.iter().collect::<HashSet<_>>().len();
        let cleaning = &processed.cleaning_report;
        let normalization = &processed.normalization_report;
        let tokenization = &processed.tokenization_report;

        let derived = [
            ("dataset", json!(dataset.name)),
            ("rowIndex", json!(row_index)),
            ("originalLength", json!(original_length)),
            ("cleanedLength", json!(processed.cleaned.chars().count())),
            ("normalizedLength", json!(processed.normalized.chars().count())),
            ("processedLength", json!(processed_length)),
            ("tokenCount", json!(processed.tokens.len())),
            ("vocabularySize", json!(vocabulary_size)),
            ("compressionRatio", json!(processed_length as f64 / original_length as f64)),
            ("removedUrls", json!(cleaning.urls)),
            ("removedEmails", json!(cleaning.emails)),
            ("removedMentions", json!(cleaning.mentions)),
            ("removedHashtags", json!(cleaning.hashtags)),
            ("removedNumbers", json!(cleaning.numbers)),
            ("removedHtml", json!(cleaning.html_tags)),
            ("removedPunctuation", json!(cleaning.punctuation)),
            ("contractionsExpanded", json!(normalization.contractions_expanded)),
            ("morphologyTransformations", json!(normalization.morphology_transformations)),
            ("morphologyType", json!(self.normalizer.mode().as_str())),
            ("removedStopwords", json!(tokenization.removed_stopwords)),
            ("removedDuplicates", json!(tokenization.removed_duplicates)),
        ];
        for (key, value) in derived {
            // derived values win; the input column is reported, not silently lost
            if let Some(shadowed) = metadata.insert(key.to_string(), value) {
                warn!(
                    "Record {} of '{}': column '{}' ({}) replaced by derived metadata",
                    row_index, dataset.name, key, shadowed
                );
            }
        }

        Ok(Some(ProcessedDataPoint {
            id: ProcessedDataPoint::make_id(&dataset.name, row_index),
            original_text: original_text.clone(),
            cleaned_text: processed.cleaned,
            normalized_text: processed.normalized,
            tokens: processed.tokens,
            label,
            metadata,
        }))
    }

    /// Load a dataset and return a lazy run over its batches
    ///
    /// Load failures are returned here, before any progress event.
    pub fn process_dataset(
        &self,
        dataset: &DatasetConfig,
        cancel: CancellationToken,
    ) -> Result<DatasetRun<'_>, ProcessingError> {
        DatasetRun::start(self, dataset.clone(), cancel)
    }

    /// Process datasets one after another and merge their results
    pub fn process_multiple_datasets(
        &self,
        datasets: &[DatasetConfig],
        cancel: CancellationToken,
    ) -> MultiDatasetRun<'_> {
        MultiDatasetRun::new(self, datasets.to_vec(), cancel)
    }

    pub fn calculate_stats(
        &self,
        data: &[ProcessedDataPoint],
        total_records: usize,
        error_records: usize,
        elapsed: Duration,
    ) -> ProcessingStats {
        stats::calculate_stats(data, total_records, error_records, elapsed)
    }

    pub fn save_processed_data(
        &self,
        data: &[ProcessedDataPoint],
        path: &Path,
        format: OutputFormat,
    ) -> Result<(), ProcessingError> {
        output::save_processed_data(data, path, format)
    }

    pub fn generate_report(&self, stats: &ProcessingStats, path: Option<&Path>) -> Result<String, ProcessingError> {
        report::generate_report(stats, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatasetFormat, NormalizationMode, TokenizationOptions};

    fn preprocessor() -> DataPreprocessor {
        DataPreprocessor::new(PreprocessingConfig::default()).unwrap()
    }

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn dataset() -> DatasetConfig {
        DatasetConfig::new("demo", "demo.csv", DatasetFormat::Csv, "text").with_label_column("label")
    }

    #[test]
    fn test_full_record() {
        let p = preprocessor();
        let rec = record(&[
            ("rating", json!("5")),
            ("text", json!("Don't miss https://shop.example #deal!!")),
            ("label", json!("1")),
        ]);

        let point = p.process_record(&dataset(), 4, &rec).unwrap().unwrap();
        assert_eq!(point.id, "demo_4");
        assert_eq!(point.cleaned_text, "don't miss deal");
        assert_eq!(point.normalized_text, "do not miss deal");
        assert_eq!(point.tokens, vec!["do", "not", "miss", "deal"]);
        assert_eq!(point.label.as_deref(), Some("1"));
        assert_eq!(point.metadata["rating"], "5");
        assert_eq!(point.metadata["tokenCount"], 4);
        assert_eq!(point.metadata["removedUrls"], 1);
        assert!(!point.metadata.contains_key("text"));
        assert!(!point.metadata.contains_key("label"));
    }

    #[test]
    fn test_morphology_and_stopword_metadata() {
        let mut config = PreprocessingConfig::default();
        config.normalization.mode = NormalizationMode::Lemmatize;
        config.tokenization.remove_stopwords = true;
        let p = DataPreprocessor::new(config).unwrap();
        let rec = record(&[("text", json!("The children went home"))]);

        let point = p.process_record(&dataset(), 0, &rec).unwrap().unwrap();
        assert_eq!(point.tokens, vec!["child", "go", "home"]);
        assert_eq!(point.metadata["removedStopwords"], 1);
        assert_eq!(point.metadata["morphologyTransformations"], 2);
        assert_eq!(point.metadata["morphologyType"], "lemmatization");
        assert_eq!(point.metadata["processedLength"], 13);
        assert_eq!(point.metadata["vocabularySize"], 3);
        let ratio = point.metadata["compressionRatio"].as_f64().unwrap();
        assert!((ratio - 13.0 / 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_derived_keys_replace_colliding_columns() {
        let p = preprocessor();
        let rec = record(&[("text", json!("hello there")), ("tokenCount", json!("999"))]);
        let point = p.process_record(&dataset(), 0, &rec).unwrap().unwrap();
        assert_eq!(point.metadata["tokenCount"], 2);
    }

    #[test]
    fn test_transform_failure_is_a_record_error() {
        let mut config = PreprocessingConfig::default();
        config.normalization.backtrack_limit = 1_000;
        let p = DataPreprocessor::new(config).unwrap();
        let rec = record(&[("text", json!("word ".repeat(5_000)))]);

        let err = p.process_record(&dataset(), 7, &rec).unwrap_err();
        assert!(matches!(err, ProcessingError::Record { index: 7, .. }));
        assert!(err.is_record_error());
    }

    #[test]
    fn test_unusable_text_is_skipped() {
        let p = preprocessor();
        for value in [json!(""), json!("   "), json!(42), json!(null)] {
            let rec = record(&[("text", value)]);
            assert!(p.process_record(&dataset(), 0, &rec).unwrap().is_none());
        }
        let missing = record(&[("other", json!("hello"))]);
        assert!(p.process_record(&dataset(), 0, &missing).unwrap().is_none());
    }

    #[test]
    fn test_tokens_follow_normalized_text() {
        let config = PreprocessingConfig {
            tokenization: TokenizationOptions {
                min_token_length: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let p = DataPreprocessor::new(config).unwrap();
        let result = p.preprocess_text("A big cat").unwrap();
        assert_eq!(result.tokens, p.tokenizer().tokenize(&result.normalized));
        assert_eq!(result.tokens, vec!["big", "cat"]);
    }

    #[test]
    fn test_lemmatize_mode_in_pipeline() {
        let mut config = PreprocessingConfig::default();
        config.normalization.mode = NormalizationMode::Lemmatize;
        let p = DataPreprocessor::new(config).unwrap();
        let result = p.preprocess_text("The geese flew south").unwrap();
        assert_eq!(result.tokens, vec!["the", "goose", "fly", "south"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PreprocessingConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(DataPreprocessor::new(config).is_err());
    }
}
