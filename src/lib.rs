//! Dataset-to-tokens preprocessing
//!
//! Loads CSV/TSV/JSON datasets, runs every record through
//! Clean -> Normalize -> Tokenize, and derives corpus statistics and a
//! Markdown report from the processed records.
//!
//! Architecture:
//! 1. `dataset_loader` turns a file into uniform keyed records
//! 2. `text_cleaner`, `text_normalizer` and `tokenizer` are the per-record stages
//! 3. `preprocessor` and `pipeline` batch records, isolate failures and report progress
//! 4. `stats`, `output` and `report` summarize and persist the result

pub mod config;
pub mod data_point;
pub mod dataset_loader;
pub mod error;
pub mod lexicon;
pub mod output;
pub mod pipeline;
pub mod preprocessor;
pub mod progress;
pub mod report;
pub mod stats;
pub mod text_cleaner;
pub mod text_normalizer;
pub mod tokenizer;

pub use config::{
    CleaningOptions, DatasetConfig, DatasetFormat, DatasetPresets, NormalizationMode,
    NormalizationOptions, PreprocessingConfig, TextEncoding, TokenizationOptions,
};
pub use data_point::{ProcessedDataPoint, Record};
pub use error::ProcessingError;
pub use output::OutputFormat;
pub use pipeline::{DatasetOutput, DatasetRun, MergedOutput, MultiDatasetRun};
pub use preprocessor::{DataPreprocessor, PreprocessedText};
pub use progress::{CancellationToken, ProgressEvent, ProgressStage};
pub use stats::{ProcessingStats, TokenMetrics};
pub use text_cleaner::{CleaningReport, TextCleaner};
pub use text_normalizer::TextNormalizer;
pub use tokenizer::Tokenizer;
