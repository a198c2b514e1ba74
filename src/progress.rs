use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Progress reported once the dataset is in memory
pub const LOADED_PERCENT: f64 = 10.0;
/// Share of the bar covered by batch processing (10% -> 90%)
pub const BATCH_SPAN_PERCENT: f64 = 80.0;
pub const COMPLETE_PERCENT: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Loaded,
    BatchCompleted,
    /// one dataset of a multi-dataset run is done
    DatasetCompleted,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub dataset: String,
    pub percent: f64,
    pub message: String,
    pub batch_index: Option<usize>,
    pub records_consumed: usize,
    pub total_records: usize,
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        self.stage == ProgressStage::Finished
    }
}

/// Shared flag checked at every batch boundary
///
/// Clones observe the same flag, so a token handed to a run can be cancelled
/// from another thread or from the progress consumer itself.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Percentage after `consumed` of `total` records, within the batch span
pub fn batch_percent(consumed: usize, total: usize) -> f64 {
    if total == 0 {
        return LOADED_PERCENT + BATCH_SPAN_PERCENT;
    }
    LOADED_PERCENT + BATCH_SPAN_PERCENT * consumed as f64 / total as f64
}
