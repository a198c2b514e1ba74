use crate::data_point::ProcessedDataPoint;
use log::debug;
use rustc_hash::FxHashSet as HashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Corpus-level token statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetrics {
    pub total_tokens: usize,
    pub unique_tokens: usize,
    pub average_token_length: f64,
    /// token length in characters -> number of tokens with that length
    pub token_length_distribution: BTreeMap<usize, usize>,
    pub longest_token: String,
    pub shortest_token: String,
    /// unique / total, 0 for an empty corpus
    pub vocabulary_diversity: f64,
}

impl TokenMetrics {
    /// Derive metrics from a token stream. Ties for longest/shortest keep the
    /// first token encountered.
    pub fn from_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut total_tokens = 0usize;
        let mut total_length = 0usize;
        let mut unique: HashSet<&'a str> = HashSet::default();
        let mut distribution = BTreeMap::new();
        let mut longest: Option<(&'a str, usize)> = None;
        let mut shortest: Option<(&'a str, usize)> = None;

        for token in tokens {
            let len = token.chars().count();
            total_tokens += 1;
            total_length += len;
            unique.insert(token);
            *distribution.entry(len).or_insert(0) += 1;

            if longest.is_none_or(|(_, best)| len > best) {
                longest = Some((token, len));
            }
            if shortest.is_none_or(|(_, best)| len < best) {
                shortest = Some((token, len));
            }
        }

        let (average_token_length, vocabulary_diversity) = if total_tokens == 0 {
            (0.0, 0.0)
        } else {
            (
                total_length as f64 / total_tokens as f64,
                unique.len() as f64 / total_tokens as f64,
            )
        };

        TokenMetrics {
            total_tokens,
            unique_tokens: unique.len(),
            average_token_length,
            token_length_distribution: distribution,
            longest_token: longest.map(|(t, _)| t.to_string()).unwrap_or_default(),
            shortest_token: shortest.map(|(t, _)| t.to_string()).unwrap_or_default(),
            vocabulary_diversity,
        }
    }
}

/// Aggregate statistics for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    pub total_records: usize,
    pub processed_records: usize,
    pub error_records: usize,
    pub skipped_records: usize,
    /// mean length of the original text, in characters
    pub average_text_length: f64,
    pub average_tokens_per_record: f64,
    pub token_metrics: TokenMetrics,
    pub processing_time_ms: u128,
    /// estimated bytes retained by the processed records
    pub memory_delta_bytes: u64,
}

impl ProcessingStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            self.processed_records as f64 * 100.0 / self.total_records as f64
        }
    }
}

/// Derive statistics from the complete processed set.
///
/// Nothing is carried over from earlier calls: merging runs means calling this
/// again on the concatenated data, so token metrics describe the whole corpus.
pub fn calculate_stats(
    data: &[ProcessedDataPoint],
    total_records: usize,
    error_records: usize,
    elapsed: Duration,
) -> ProcessingStats {
    let processed_records = data.len();
    let skipped_records = total_records.saturating_sub(processed_records + error_records);

    let token_metrics = TokenMetrics::from_tokens(
        data.iter().flat_map(|point| point.tokens.iter().map(String::as_str)),
    );

    let (average_text_length, average_tokens_per_record) = if processed_records == 0 {
        (0.0, 0.0)
    } else {
        let text_chars: usize = data.iter().map(|p| p.original_text.chars().count()).sum();
        (
            text_chars as f64 / processed_records as f64,
            token_metrics.total_tokens as f64 / processed_records as f64,
        )
    };

    let memory_delta_bytes = data.iter().map(ProcessedDataPoint::estimated_size).sum::<usize>() as u64;

    debug!(
        "Stats: {} processed, {} errors, {} skipped, {} tokens",
        processed_records, error_records, skipped_records, token_metrics.total_tokens
    );

    ProcessingStats {
        total_records,
        processed_records,
        error_records,
        skipped_records,
        average_text_length,
        average_tokens_per_record,
        token_metrics,
        processing_time_ms: elapsed.as_millis(),
        memory_delta_bytes,
    }
}
