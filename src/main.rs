//! corpus-prep command line
//!
//! `process` runs one or more datasets through the pipeline and writes the
//! processed records plus a Markdown report. `inspect` shows what each stage
//! does to a single piece of text.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use corpusprep::{
    CancellationToken, DataPreprocessor, DatasetConfig, DatasetFormat, DatasetPresets,
    NormalizationMode, OutputFormat, PreprocessingConfig, ProgressStage, TextEncoding,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "corpus-prep")]
#[command(about = "Clean, normalize and tokenize text datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process datasets and write records, stats and a report
    Process(ProcessArgs),

    /// Show each preprocessing stage for a single text
    Inspect(InspectArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Tsv,
    Json,
}

impl From<FormatArg> for DatasetFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => DatasetFormat::Csv,
            FormatArg::Tsv => DatasetFormat::Tsv,
            FormatArg::Json => DatasetFormat::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    Utf8,
    Utf8Lossy,
    Latin1,
}

impl From<EncodingArg> for TextEncoding {
    fn from(encoding: EncodingArg) -> Self {
        match encoding {
            EncodingArg::Utf8 => TextEncoding::Utf8,
            EncodingArg::Utf8Lossy => TextEncoding::Utf8Lossy,
            EncodingArg::Latin1 => TextEncoding::Latin1,
        }
    }
}

#[derive(Args)]
struct PipelineArgs {
    /// Preprocessing config (JSON); flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reduce words to stems
    #[arg(long, conflicts_with = "lemmatize")]
    stem: bool,

    /// Map irregular forms to dictionary lemmas
    #[arg(long)]
    lemmatize: bool,

    /// Drop English stop words from token lists
    #[arg(long)]
    remove_stopwords: bool,
}

impl PipelineArgs {
    fn load(&self) -> Result<PreprocessingConfig> {
        let mut config = match &self.config {
            Some(path) => PreprocessingConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PreprocessingConfig::default(),
        };
        if self.stem || self.lemmatize {
            config.normalization.mode = NormalizationMode::from_flags(self.stem, self.lemmatize);
        }
        if self.remove_stopwords {
            config.tokenization.remove_stopwords = true;
        }
        Ok(config)
    }
}

#[derive(Args)]
struct ProcessArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Dataset presets file (JSON map of name -> dataset config)
    #[arg(long)]
    presets: Option<PathBuf>,

    /// Preset names to process, in order
    #[arg(short = 'd', long = "dataset", requires = "presets")]
    datasets: Vec<String>,

    /// Process a single file instead of presets
    #[arg(short, long, conflicts_with = "presets")]
    input: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "csv")]
    format: FormatArg,

    #[arg(long, default_value = "text")]
    text_column: String,

    #[arg(long)]
    label_column: Option<String>,

    /// Field delimiter for CSV input (TSV always splits on tabs)
    #[arg(long, default_value = ",")]
    delimiter: char,

    #[arg(long, value_enum, default_value = "utf8")]
    encoding: EncodingArg,

    /// Process only the first N records of each dataset
    #[arg(long)]
    sample_size: Option<usize>,

    /// The input file has no header row
    #[arg(long)]
    no_header: bool,

    /// Directory for results and intermediate batches
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for processed records (json or csv)
    #[arg(long, default_value = "json")]
    output_format: String,

    #[arg(long)]
    batch_size: Option<usize>,

    /// Persist every batch under <output-dir>/intermediate
    #[arg(long)]
    save_intermediate: bool,
}

#[derive(Args)]
struct InspectArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Text to run through the pipeline
    #[arg(short, long)]
    text: String,

    /// Largest n-gram size to show
    #[arg(long, default_value = "2")]
    ngrams: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Process(args) => run_process(args),
        Commands::Inspect(args) => run_inspect(args),
    }
}

fn resolve_datasets(args: &ProcessArgs) -> Result<Vec<DatasetConfig>> {
    let mut datasets = select_datasets(args)?;
    if let Some(limit) = args.sample_size {
        for dataset in &mut datasets {
            dataset.sample_size = Some(limit);
        }
    }
    Ok(datasets)
}

fn select_datasets(args: &ProcessArgs) -> Result<Vec<DatasetConfig>> {
    if let Some(presets_path) = &args.presets {
        let presets = DatasetPresets::from_json_file(presets_path)
            .with_context(|| format!("loading presets {}", presets_path.display()))?;

        if args.datasets.is_empty() {
            return Ok(presets.names().filter_map(|n| presets.get(n)).cloned().collect());
        }
        return args
            .datasets
            .iter()
            .map(|name| {
                presets.get(name).cloned().with_context(|| {
                    let known: Vec<&str> = presets.names().collect();
                    format!("unknown dataset '{}' (known: {})", name, known.join(", "))
                })
            })
            .collect();
    }

    let Some(input) = &args.input else {
        bail!("either --input or --presets is required");
    };
    let name = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());

    let mut dataset = DatasetConfig::new(name, input, args.format.into(), &args.text_column)
        .with_delimiter(args.delimiter)
        .with_encoding(args.encoding.into());
    if let Some(label) = &args.label_column {
        dataset = dataset.with_label_column(label);
    }
    if args.no_header {
        dataset = dataset.without_header();
    }
    Ok(vec![dataset])
}

fn run_process(args: ProcessArgs) -> Result<()> {
    let mut config = args.pipeline.load()?;
    if let Some(dir) = &args.output_dir {
        config.output_path = dir.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    config.save_intermediate |= args.save_intermediate;

    let output_format: OutputFormat = args.output_format.parse()?;
    let datasets = resolve_datasets(&args)?;
    let preprocessor = DataPreprocessor::new(config).context("building preprocessor")?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")?
            .progress_chars("#>-"),
    );

    let merged = preprocessor
        .process_multiple_datasets(&datasets, CancellationToken::new())
        .run_with(|event| {
            pb.set_position(event.percent.round() as u64);
            if event.stage != ProgressStage::Finished {
                pb.set_message(event.message.clone());
            }
        })
        .context("processing datasets")?;
    pb.finish_with_message("done");

    let output_dir = preprocessor.config().output_path.clone();
    let data_path = output_dir.join(format!("processed_data.{}", output_format.extension()));
    preprocessor
        .save_processed_data(&merged.data, &data_path, output_format)
        .with_context(|| format!("saving {}", data_path.display()))?;

    let stats_path = output_dir.join("stats.json");
    write_json(&stats_path, &merged.stats)?;

    for summary in &merged.datasets {
        info!(
            "{}: {}/{} records processed ({:.2}%)",
            summary.dataset,
            summary.stats.processed_records,
            summary.stats.total_records,
            summary.stats.success_rate()
        );
    }

    let report_path = output_dir.join("report.md");
    preprocessor
        .generate_report(&merged.stats, Some(&report_path))
        .context("writing report")?;

    println!(
        "Processed {} of {} records into {}",
        merged.stats.processed_records,
        merged.stats.total_records,
        output_dir.display()
    );
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let preprocessor = DataPreprocessor::new(args.pipeline.load()?)?;
    let tokenizer = preprocessor.tokenizer();
    let result = preprocessor.preprocess_text(&args.text)?;

    println!("original:   {}", args.text);
    println!("cleaned:    {}", result.cleaned);
    println!("normalized: {}", result.normalized);
    println!("tokens:     {:?}", result.tokens);
    println!("removed:    {:?}", result.cleaning_report);

    for (n, grams) in tokenizer.generate_all_ngrams(&result.normalized, args.ngrams) {
        println!("{}-grams:    {:?}", n, grams);
    }

    let sentences = tokenizer.tokenize_sentences(&args.text);
    println!("sentences:  {}", sentences.len());

    let keywords = tokenizer.extract_keywords(&result.normalized, 1, 3);
    if !keywords.is_empty() {
        let top: Vec<String> = keywords.iter().take(10).map(|(w, c)| format!("{} ({})", w, c)).collect();
        println!("keywords:   {}", top.join(", "));
    }

    let metrics = tokenizer.token_metrics(&result.tokens);
    println!(
        "metrics:    {} tokens, {} unique, diversity {:.3}",
        metrics.total_tokens, metrics.unique_tokens, metrics.vocabulary_diversity
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_args(argv: &[&str]) -> ProcessArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Process(args) => args,
            Commands::Inspect(_) => panic!("expected the process subcommand"),
        }
    }

    #[test]
    fn test_delimiter_and_sample_size_flags() {
        let args = process_args(&[
            "corpus-prep", "process", "-i", "reviews.csv", "--delimiter", ";", "--sample-size", "50",
        ]);
        let datasets = resolve_datasets(&args).unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].name, "reviews");
        assert_eq!(datasets[0].delimiter, ';');
        assert_eq!(datasets[0].sample_size, Some(50));
    }

    #[test]
    fn test_default_delimiter_is_comma() {
        let args = process_args(&["corpus-prep", "process", "-i", "reviews.csv"]);
        let datasets = resolve_datasets(&args).unwrap();
        assert_eq!(datasets[0].delimiter, ',');
        assert_eq!(datasets[0].sample_size, None);
    }

    #[test]
    fn test_sample_size_applies_to_presets() {
        let dir = tempfile::tempdir().unwrap();
        let presets = dir.path().join("presets.json");
        std::fs::write(
            &presets,
            r#"{"alexa": {"file_path": "alexa.tsv", "format": "tsv", "text_column": "verified_reviews"}}"#,
        )
        .unwrap();
        let presets_arg = presets.to_string_lossy().into_owned();
        let args = process_args(&["corpus-prep", "process", "--presets", &presets_arg, "--sample-size", "10"]);
        let datasets = resolve_datasets(&args).unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].sample_size, Some(10));
    }
}
