use crate::config::DatasetConfig;
use crate::data_point::{ProcessedDataPoint, Record};
use crate::error::ProcessingError;
use crate::output;
use crate::preprocessor::DataPreprocessor;
use crate::progress::{
    COMPLETE_PERCENT, CancellationToken, LOADED_PERCENT, ProgressEvent, ProgressStage, batch_percent,
};
use crate::stats::{ProcessingStats, calculate_stats};
use log::{info, warn};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Loaded,
    Processing,
    Done,
    Failed,
}

/// Everything a completed dataset run produced
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetOutput {
    pub dataset: String,
    pub data: Vec<ProcessedDataPoint>,
    pub stats: ProcessingStats,
}

/// Per-dataset totals kept by a multi-dataset run
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub dataset: String,
    pub stats: ProcessingStats,
}

/// Result of a multi-dataset run: concatenated records, corpus-wide stats
#[derive(Debug, Clone, PartialEq)]
pub struct MergedOutput {
    pub data: Vec<ProcessedDataPoint>,
    pub stats: ProcessingStats,
    pub datasets: Vec<DatasetSummary>,
}

/// Lazy, batch-at-a-time processing of one loaded dataset
///
/// Every call to `next` does at most one batch of work and yields the
/// matching progress event:
/// 1. `Loaded` at 10%
/// 2. One `BatchCompleted` per batch, percentages non-decreasing
/// 3. `Finished` at exactly 100% once statistics are computed
///
/// An error (cancellation or a failed intermediate save) ends the run.
/// Records processed before that stay available through `processed()`.
pub struct DatasetRun<'a> {
    preprocessor: &'a DataPreprocessor,
    dataset: DatasetConfig,
    records: Vec<Record>,
    cursor: usize,
    batch_index: usize,
    processed: Vec<ProcessedDataPoint>,
    error_records: usize,
    started: Instant,
    cancel: CancellationToken,
    state: RunState,
    stats: Option<ProcessingStats>,
}

impl<'a> DatasetRun<'a> {
    pub(crate) fn start(
        preprocessor: &'a DataPreprocessor,
        dataset: DatasetConfig,
        cancel: CancellationToken,
    ) -> Result<Self, ProcessingError> {
        let started = Instant::now();
        let records = preprocessor.load_dataset(&dataset)?;

        Ok(Self {
            preprocessor,
            dataset,
            records,
            cursor: 0,
            batch_index: 0,
            processed: Vec::new(),
            error_records: 0,
            started,
            cancel,
            state: RunState::Loaded,
            stats: None,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn dataset(&self) -> &DatasetConfig {
        &self.dataset
    }

    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    pub fn error_records(&self) -> usize {
        self.error_records
    }

    /// Records successfully processed so far
    pub fn processed(&self) -> &[ProcessedDataPoint] {
        &self.processed
    }

    /// Drain the run, handing every event to `on_progress`
    pub fn run_with<F>(mut self, mut on_progress: F) -> Result<DatasetOutput, ProcessingError>
    where
        F: FnMut(&ProgressEvent),
    {
        for event in self.by_ref() {
            on_progress(&event?);
        }
        self.into_output().ok_or(ProcessingError::IncompleteRun)
    }

    pub fn finish(self) -> Result<DatasetOutput, ProcessingError> {
        self.run_with(|_| {})
    }

    /// The final output, available only once the run reached `Done`
    pub fn into_output(self) -> Option<DatasetOutput> {
        match (self.state, self.stats) {
            (RunState::Done, Some(stats)) => Some(DatasetOutput {
                dataset: self.dataset.name,
                data: self.processed,
                stats,
            }),
            _ => None,
        }
    }

    fn event(&self, stage: ProgressStage, percent: f64, message: String) -> ProgressEvent {
        ProgressEvent {
            stage,
            dataset: self.dataset.name.clone(),
            percent,
            message,
            batch_index: match stage {
                ProgressStage::BatchCompleted => Some(self.batch_index),
                _ => None,
            },
            records_consumed: self.cursor,
            total_records: self.records.len(),
        }
    }

    fn batch_count(&self) -> usize {
        self.records.len().div_ceil(self.preprocessor.config().batch_size)
    }

    fn run_batch(&mut self) -> Result<ProgressEvent, ProcessingError> {
        let total = self.records.len();
        if self.cancel.is_cancelled() {
            info!("Cancelled '{}' after {} of {} records", self.dataset.name, self.cursor, total);
            return Err(ProcessingError::Cancelled {
                consumed: self.cursor,
                total,
            });
        }

        let config = self.preprocessor.config();
        let end = (self.cursor + config.batch_size).min(total);
        let batch_start = self.processed.len();

        for row_index in self.cursor..end {
            match self
                .preprocessor
                .process_record(&self.dataset, row_index, &self.records[row_index])
            {
                Ok(Some(point)) => self.processed.push(point),
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping record {} of '{}': {}", row_index, self.dataset.name, e);
                    self.error_records += 1;
                }
            }
        }
        self.cursor = end;

        if config.save_intermediate {
            output::save_batch(
                &self.processed[batch_start..],
                &config.output_path,
                &self.dataset.name,
                self.batch_index,
            )?;
        }

        let message = format!(
            "Processed batch {}/{} ({} of {} records)",
            self.batch_index + 1,
            self.batch_count(),
            end,
            total
        );
        info!("[{}] {}", self.dataset.name, message);
        let event = self.event(ProgressStage::BatchCompleted, batch_percent(end, total), message);
        self.batch_index += 1;
        Ok(event)
    }

    fn complete(&mut self) -> ProgressEvent {
        let stats = calculate_stats(
            &self.processed,
            self.records.len(),
            self.error_records,
            self.started.elapsed(),
        );
        let message = format!(
            "Finished '{}': {} processed, {} skipped, {} errors",
            self.dataset.name, stats.processed_records, stats.skipped_records, stats.error_records
        );
        info!("{}", message);
        self.stats = Some(stats);
        self.event(ProgressStage::Finished, COMPLETE_PERCENT, message)
    }
}

impl Iterator for DatasetRun<'_> {
    type Item = Result<ProgressEvent, ProcessingError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            RunState::Loaded => {
                self.state = RunState::Processing;
                let message = format!("Loaded {} records from '{}'", self.records.len(), self.dataset.name);
                Some(Ok(self.event(ProgressStage::Loaded, LOADED_PERCENT, message)))
            }
            RunState::Processing if self.cursor < self.records.len() => match self.run_batch() {
                Ok(event) => Some(Ok(event)),
                Err(e) => {
                    self.state = RunState::Failed;
                    Some(Err(e))
                }
            },
            RunState::Processing => {
                let event = self.complete();
                self.state = RunState::Done;
                Some(Ok(event))
            }
            RunState::Done | RunState::Failed => None,
        }
    }
}

/// Sequential run over several datasets
///
/// Each dataset is loaded only when the previous one has finished. Its events
/// are rescaled into its share of the overall range, its terminal event is
/// reported as `DatasetCompleted`, and a single `Finished` event closes the
/// run with statistics recomputed over all records.
pub struct MultiDatasetRun<'a> {
    preprocessor: &'a DataPreprocessor,
    datasets: Vec<DatasetConfig>,
    next_dataset: usize,
    current: Option<DatasetRun<'a>>,
    cancel: CancellationToken,
    data: Vec<ProcessedDataPoint>,
    summaries: Vec<DatasetSummary>,
    total_records: usize,
    error_records: usize,
    started: Instant,
    state: RunState,
    stats: Option<ProcessingStats>,
}

impl<'a> MultiDatasetRun<'a> {
    pub(crate) fn new(
        preprocessor: &'a DataPreprocessor,
        datasets: Vec<DatasetConfig>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            preprocessor,
            datasets,
            next_dataset: 0,
            current: None,
            cancel,
            data: Vec::new(),
            summaries: Vec::new(),
            total_records: 0,
            error_records: 0,
            started: Instant::now(),
            state: RunState::Loaded,
            stats: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Records from datasets that already completed
    pub fn processed(&self) -> &[ProcessedDataPoint] {
        &self.data
    }

    pub fn run_with<F>(mut self, mut on_progress: F) -> Result<MergedOutput, ProcessingError>
    where
        F: FnMut(&ProgressEvent),
    {
        for event in self.by_ref() {
            on_progress(&event?);
        }
        self.into_output().ok_or(ProcessingError::IncompleteRun)
    }

    pub fn finish(self) -> Result<MergedOutput, ProcessingError> {
        self.run_with(|_| {})
    }

    pub fn into_output(self) -> Option<MergedOutput> {
        match (self.state, self.stats) {
            (RunState::Done, Some(stats)) => Some(MergedOutput {
                data: self.data,
                stats,
                datasets: self.summaries,
            }),
            _ => None,
        }
    }

    /// Map a percentage within dataset `position` onto the whole run
    fn overall_percent(&self, position: usize, percent: f64) -> f64 {
        (position as f64 * COMPLETE_PERCENT + percent) / self.datasets.len() as f64
    }

    fn fail(&mut self, error: ProcessingError) -> Option<Result<ProgressEvent, ProcessingError>> {
        self.current = None;
        self.state = RunState::Failed;
        Some(Err(error))
    }

    fn absorb(&mut self, position: usize, run: DatasetRun<'a>, finished: ProgressEvent) -> ProgressEvent {
        let percent = self.overall_percent(position, finished.percent);
        let message = format!(
            "Dataset {}/{} done: {}",
            position + 1,
            self.datasets.len(),
            finished.message
        );

        if let Some(output) = run.into_output() {
            self.total_records += output.stats.total_records;
            self.error_records += output.stats.error_records;
            self.data.extend(output.data);
            self.summaries.push(DatasetSummary {
                dataset: output.dataset,
                stats: output.stats,
            });
        }

        ProgressEvent {
            stage: ProgressStage::DatasetCompleted,
            percent,
            message,
            ..finished
        }
    }

    fn complete(&mut self) -> ProgressEvent {
        let stats = calculate_stats(
            &self.data,
            self.total_records,
            self.error_records,
            self.started.elapsed(),
        );
        let message = format!(
            "Finished {} datasets: {} of {} records processed",
            self.datasets.len(),
            stats.processed_records,
            stats.total_records
        );
        info!("{}", message);

        let event = ProgressEvent {
            stage: ProgressStage::Finished,
            dataset: String::new(),
            percent: COMPLETE_PERCENT,
            message,
            batch_index: None,
            records_consumed: stats.total_records,
            total_records: stats.total_records,
        };
        self.stats = Some(stats);
        event
    }
}

impl Iterator for MultiDatasetRun<'_> {
    type Item = Result<ProgressEvent, ProcessingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if matches!(self.state, RunState::Done | RunState::Failed) {
                return None;
            }
            self.state = RunState::Processing;

            if let Some(run) = self.current.as_mut() {
                let position = self.next_dataset - 1;
                match run.next() {
                    Some(Ok(event)) if event.is_terminal() => {
                        if let Some(run) = self.current.take() {
                            return Some(Ok(self.absorb(position, run, event)));
                        }
                    }
                    Some(Ok(event)) => {
                        let percent = self.overall_percent(position, event.percent);
                        return Some(Ok(ProgressEvent { percent, ..event }));
                    }
                    Some(Err(e)) => return self.fail(e),
                    None => self.current = None,
                }
                continue;
            }

            if self.next_dataset < self.datasets.len() {
                if self.cancel.is_cancelled() {
                    let consumed = self.total_records;
                    return self.fail(ProcessingError::Cancelled {
                        consumed,
                        total: consumed,
                    });
                }
                let dataset = self.datasets[self.next_dataset].clone();
                self.next_dataset += 1;
                match DatasetRun::start(self.preprocessor, dataset, self.cancel.clone()) {
                    Ok(run) => self.current = Some(run),
                    Err(e) => return self.fail(e),
                }
                continue;
            }

            let event = self.complete();
            self.state = RunState::Done;
            return Some(Ok(event));
        }
    }
}
