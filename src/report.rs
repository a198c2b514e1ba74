use crate::error::ProcessingError;
use crate::stats::ProcessingStats;
use log::info;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const HISTOGRAM_WIDTH: usize = 40;

/// Render the Markdown processing report and optionally write it to `path`
pub fn generate_report(stats: &ProcessingStats, path: Option<&Path>) -> Result<String, ProcessingError> {
    let report = render(stats);

    if let Some(path) = path {
        let persist = |source: std::io::Error| ProcessingError::Persist {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persist)?;
        }
        let mut writer = BufWriter::new(File::create(path).map_err(persist)?);
        writer.write_all(report.as_bytes()).map_err(persist)?;
        writer.flush().map_err(persist)?;
        info!("Report written to {}", path.display());
    }

    Ok(report)
}

fn render(stats: &ProcessingStats) -> String {
    let metrics = &stats.token_metrics;
    let mut lines = vec![
        "# Data Preprocessing Report".to_string(),
        String::new(),
        "## Overview".to_string(),
        String::new(),
        format!("- **Total records:** {}", stats.total_records),
        format!("- **Processed records:** {}", stats.processed_records),
        format!("- **Skipped records:** {}", stats.skipped_records),
        format!("- **Error records:** {}", stats.error_records),
        format!("- **Success rate:** {:.2}%", stats.success_rate()),
        String::new(),
        "## Text Analysis".to_string(),
        String::new(),
        format!("- **Average text length:** {:.2} characters", stats.average_text_length),
        format!("- **Average tokens per record:** {:.2}", stats.average_tokens_per_record),
        String::new(),
        "## Token Metrics".to_string(),
        String::new(),
        format!("- **Total tokens:** {}", metrics.total_tokens),
        format!("- **Unique tokens:** {}", metrics.unique_tokens),
        format!("- **Vocabulary diversity:** {:.4}", metrics.vocabulary_diversity),
        format!("- **Average token length:** {:.2}", metrics.average_token_length),
        format!("- **Longest token:** `{}`", metrics.longest_token),
        format!("- **Shortest token:** `{}`", metrics.shortest_token),
        String::new(),
        "## Performance".to_string(),
        String::new(),
        format!("- **Processing time:** {} ms", stats.processing_time_ms),
        format!("- **Memory delta:** {:.2} KB", stats.memory_delta_bytes as f64 / 1024.0),
        String::new(),
        "## Token Length Distribution".to_string(),
        String::new(),
    ];
    lines.extend(histogram(&metrics.token_length_distribution));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// One table row per token length, bars scaled to the most frequent length
fn histogram(distribution: &BTreeMap<usize, usize>) -> Vec<String> {
    if distribution.is_empty() {
        return vec!["_No tokens produced._".to_string()];
    }

    let max = distribution.values().copied().max().unwrap_or(1).max(1);
    let mut rows = vec![
        "| Length | Count | Histogram |".to_string(),
        "|-------:|------:|:----------|".to_string(),
    ];
    rows.extend(distribution.iter().map(|(length, count)| {
        let bar = (count * HISTOGRAM_WIDTH / max).max(1);
        format!("| {} | {} | {} |", length, count, "█".repeat(bar))
    }));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::TokenMetrics;

    fn stats() -> ProcessingStats {
        ProcessingStats {
            total_records: 4,
            processed_records: 3,
            skipped_records: 1,
            token_metrics: TokenMetrics::from_tokens(["good", "bad", "good", "excellent"]),
            processing_time_ms: 7,
            ..Default::default()
        }
    }

    #[test]
    fn test_sections_present() {
        let report = generate_report(&stats(), None).unwrap();
        for heading in [
            "## Overview",
            "## Text Analysis",
            "## Token Metrics",
            "## Performance",
            "## Token Length Distribution",
        ] {
            assert!(report.contains(heading), "missing {}", heading);
        }
        assert!(report.contains("**Success rate:** 75.00%"));
        assert!(report.contains("`excellent`"));
        assert!(report.contains("| 4 | 2 |"));
        assert!(report.starts_with("# Data Preprocessing Report\n\n## Overview\n\n"));
        assert!(report.ends_with(" |\n"));
    }

    #[test]
    fn test_histogram_scales_to_widest_bucket() {
        let rows = histogram(&BTreeMap::from([(3, 1), (4, 2)]));
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2], format!("| 3 | 1 | {} |", "█".repeat(HISTOGRAM_WIDTH / 2)));
        assert_eq!(rows[3], format!("| 4 | 2 | {} |", "█".repeat(HISTOGRAM_WIDTH)));
    }

    #[test]
    fn test_empty_distribution() {
        let report = generate_report(&ProcessingStats::default(), None).unwrap();
        assert!(report.contains("_No tokens produced._"));
        assert!(report.contains("**Success rate:** 0.00%"));
    }

    #[test]
    fn test_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.md");
        let report = generate_report(&stats(), Some(&path)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), report);
    }
}
