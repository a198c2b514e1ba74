use crate::error::ProcessingError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Options for the cleaning stage. Every step can be toggled on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleaningOptions {
    pub lowercase: bool,
    pub remove_urls: bool,
    pub remove_emails: bool,
    pub remove_mentions: bool,
    pub remove_hashtags: bool,
    pub remove_numbers: bool,
    pub remove_html: bool,
    pub remove_punctuation: bool,
    pub normalize_whitespace: bool,
    /// Keep apostrophes that sit between two word characters (`won't`, `it's`)
    pub keep_contractions: bool,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            lowercase: true,
            remove_urls: true,
            remove_emails: true,
            remove_mentions: true,
            remove_hashtags: true,
            remove_numbers: true,
            remove_html: true,
            remove_punctuation: true,
            normalize_whitespace: true,
            keep_contractions: true,
        }
    }
}

/// Word-level morphology applied at the end of normalization.
///
/// Stemming and lemmatization are mutually exclusive, so they share one enum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    #[default]
    None,
    Stem,
    Lemmatize,
}

impl NormalizationMode {
    /// Resolve a legacy pair of booleans. Lemmatization wins when both are set.
    pub fn from_flags(use_stemming: bool, use_lemmatization: bool) -> Self {
        match (use_stemming, use_lemmatization) {
            (_, true) => NormalizationMode::Lemmatize,
            (true, false) => NormalizationMode::Stem,
            (false, false) => NormalizationMode::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationMode::None => "none",
            NormalizationMode::Stem => "stemming",
            NormalizationMode::Lemmatize => "lemmatization",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NormalizationOptions {
    pub lowercase: bool,
    pub strip_accents: bool,
    pub expand_contractions: bool,
    pub normalize_numbers: bool,
    pub number_placeholder: String,
    pub normalize_whitespace: bool,
    pub mode: NormalizationMode,
    /// Backtracking budget per contraction search; exceeding it fails the record
    pub backtrack_limit: usize,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_accents: true,
            expand_contractions: true,
            normalize_numbers: false,
            number_placeholder: "num".to_string(),
            normalize_whitespace: true,
            mode: NormalizationMode::None,
            backtrack_limit: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TokenizationOptions {
    pub split_on_whitespace: bool,
    pub split_on_punctuation: bool,
    pub preserve_punctuation: bool,
    pub min_token_length: usize,
    pub max_token_length: usize,
    pub preserve_numbers: bool,
    pub split_on_numbers: bool,
    pub remove_stopwords: bool,
    pub remove_duplicates: bool,
}

impl Default for TokenizationOptions {
    fn default() -> Self {
        Self {
            split_on_whitespace: true,
            split_on_punctuation: true,
            preserve_punctuation: false,
            min_token_length: 1,
            max_token_length: 50,
            preserve_numbers: true,
            split_on_numbers: false,
            remove_stopwords: false,
            remove_duplicates: false,
        }
    }
}

/// Configuration for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub cleaning: CleaningOptions,
    pub normalization: NormalizationOptions,
    pub tokenization: TokenizationOptions,
    pub output_path: PathBuf,
    pub batch_size: usize,
    pub save_intermediate: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            cleaning: CleaningOptions::default(),
            normalization: NormalizationOptions::default(),
            tokenization: TokenizationOptions::default(),
            output_path: PathBuf::from("processed"),
            batch_size: 1000,
            save_intermediate: false,
        }
    }
}

impl PreprocessingConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ProcessingError> {
        debug!("Reading preprocessing config from {}", path.display());
        let raw = fs::read_to_string(path)?;
        let config: PreprocessingConfig = serde_json::from_str(&raw)
            .map_err(|e| ProcessingError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProcessingError> {
        if self.batch_size == 0 {
            return Err(ProcessingError::Config("batch_size must be greater than 0".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    Csv,
    Tsv,
    Json,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "utf-8-lossy")]
    Utf8Lossy,
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Lossy => "utf-8-lossy",
            TextEncoding::Latin1 => "latin-1",
        }
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_has_header() -> bool {
    true
}

/// Identifies one input source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetConfig {
    #[serde(default)]
    pub name: String,
    pub file_path: PathBuf,
    pub format: DatasetFormat,
    pub text_column: String,
    #[serde(default)]
    pub label_column: Option<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    #[serde(default)]
    pub encoding: TextEncoding,
    /// Keep only the first `n` records
    #[serde(default)]
    pub sample_size: Option<usize>,
}

impl DatasetConfig {
    pub fn new(
        name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        format: DatasetFormat,
        text_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            format,
            text_column: text_column.into(),
            label_column: None,
            delimiter: default_delimiter(),
            has_header: default_has_header(),
            encoding: TextEncoding::default(),
            sample_size: None,
        }
    }

    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = Some(column.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn without_header(mut self) -> Self {
        self.has_header = false;
        self
    }

    pub fn with_sample_size(mut self, limit: usize) -> Self {
        self.sample_size = Some(limit);
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Delimiter actually used for parsing; TSV always splits on tabs.
    pub fn effective_delimiter(&self) -> char {
        match self.format {
            DatasetFormat::Tsv => '\t',
            _ => self.delimiter,
        }
    }
}

/// Named dataset presets loaded from a JSON file (`{"name": DatasetConfig, ...}`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetPresets {
    presets: BTreeMap<String, DatasetConfig>,
}

impl DatasetPresets {
    pub fn from_json_file(path: &Path) -> Result<Self, ProcessingError> {
        let raw = fs::read_to_string(path)?;
        let mut presets: DatasetPresets = serde_json::from_str(&raw)
            .map_err(|e| ProcessingError::Config(format!("{}: {}", path.display(), e)))?;

        // Relative dataset paths are resolved against the presets file
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        for (key, config) in presets.presets.iter_mut() {
            if config.name.is_empty() {
                config.name = key.clone();
            }
            if config.file_path.is_relative() {
                config.file_path = base.join(&config.file_path);
            }
        }

        info!("Loaded {} dataset presets from {}", presets.presets.len(), path.display());
        Ok(presets)
    }

    pub fn get(&self, name: &str) -> Option<&DatasetConfig> {
        self.presets.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(NormalizationMode::from_flags(true, true), NormalizationMode::Lemmatize);
        assert_eq!(NormalizationMode::from_flags(true, false), NormalizationMode::Stem);
        assert_eq!(NormalizationMode::from_flags(false, false), NormalizationMode::None);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PreprocessingConfig = serde_json::from_str(
            r#"{"batch_size": 2, "normalization": {"mode": "stem"}}"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.normalization.mode, NormalizationMode::Stem);
        assert!(config.cleaning.remove_urls);
        assert_eq!(config.tokenization.max_token_length, 50);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = PreprocessingConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_tsv_forces_tab() {
        let config = DatasetConfig::new("reviews", "r.tsv", DatasetFormat::Tsv, "text")
            .with_delimiter(';');
        assert_eq!(config.effective_delimiter(), '\t');
    }

    #[test]
    fn test_presets_fill_names_and_resolve_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"alexa": {{"file_path": "alexa.tsv", "format": "tsv", "text_column": "verified_reviews", "label_column": "feedback", "encoding": "latin1"}}}}"#
        )
        .unwrap();

        let presets = DatasetPresets::from_json_file(&path).unwrap();
        let alexa = presets.get("alexa").unwrap();
        assert_eq!(alexa.name, "alexa");
        assert_eq!(alexa.file_path, dir.path().join("alexa.tsv"));
        assert_eq!(alexa.encoding, TextEncoding::Latin1);
        assert!(alexa.has_header);
        assert_eq!(alexa.sample_size, None);
        assert_eq!(presets.names().collect::<Vec<_>>(), vec!["alexa"]);
    }

    #[test]
    fn test_sample_size_from_json() {
        let config: DatasetConfig = serde_json::from_str(
            r#"{"file_path": "tweets.csv", "format": "csv", "text_column": "text", "sample_size": 10000}"#,
        )
        .unwrap();
        assert_eq!(config.sample_size, Some(10000));
        assert_eq!(config.delimiter, ',');
    }
}
