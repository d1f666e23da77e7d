//! Terminal rendering for analysis results.

use crate::models::{BatchSummary, IntentLabel, IntentResult};
use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

/// Output format for the `analyze` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (default).
    #[default]
    Text,
    /// One JSON document.
    Json,
}

impl FromStr for OutputFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        })
    }
}

const BAR_WIDTH: usize = 30;

fn bar(score: f64) -> String {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let filled = ((score / 100.0) * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64) as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// Writes one result as a text block.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_result<W: Write>(writer: &mut W, result: &IntentResult, verbose: bool) -> io::Result<()> {
    writeln!(writer, "Query:      {}", result.query())?;
    writeln!(
        writer,
        "Primary:    {} ({:.1}%)",
        result.primary(),
        result.confidence()
    )?;
    writeln!(writer, "Secondary:  {}", result.secondary())?;
    writeln!(writer, "Clarity:    {}", result.clarity())?;
    writeln!(writer, "Path:       {}", result.path())?;
    writeln!(writer)?;
    for label in result.scores().ranked() {
        let score = result.scores().get(label);
        writeln!(writer, "  {:<26}{:>6.1}  {}", label.as_str(), score, bar(score))?;
    }

    if let Some(explanation) = result.explanation() {
        writeln!(writer)?;
        writeln!(writer, "Why: {explanation}")?;
    }

    if verbose && let Some(breakdown) = result.breakdown() {
        writeln!(writer)?;
        writeln!(writer, "{:<14}{:>8}  TOP INTENT", "SOURCE", "WEIGHT")?;
        for (source, weight) in breakdown.weights.iter() {
            let top = breakdown
                .sources
                .get(&source)
                .map_or_else(|| "-".to_string(), |v| v.argmax().to_string());
            writeln!(writer, "{:<14}{:>8.2}  {top}", source.as_str(), weight)?;
        }
        for source in &breakdown.absent {
            writeln!(writer, "{:<14}{:>8}  absent", source.as_str(), "-")?;
        }
    }
    Ok(())
}

/// Writes a result as JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).map_err(io::Error::other)?;
    writeln!(writer)
}

/// Writes the per-intent summary table of a batch.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_summary<W: Write>(writer: &mut W, summary: &BatchSummary) -> io::Result<()> {
    writeln!(
        writer,
        "Analyzed {} of {} queries ({} failed)",
        summary.analyzed, summary.total, summary.failed
    )?;
    if summary.by_intent.is_empty() {
        return Ok(());
    }
    writeln!(writer)?;
    writeln!(
        writer,
        "{:<26}{:>7}{:>9}{:>9}{:>9}",
        "INTENT", "COUNT", "AVG", "MIN", "MAX"
    )?;
    for label in IntentLabel::PRIORITY {
        if let Some(stats) = summary.by_intent.get(&label) {
            writeln!(
                writer,
                "{:<26}{:>7}{:>9.1}{:>9.1}{:>9.1}",
                label.as_str(),
                stats.count,
                stats.mean_confidence,
                stats.min_confidence,
                stats.max_confidence
            )?;
        }
    }
    if !summary.failures_by_kind.is_empty() {
        writeln!(writer)?;
        for (kind, count) in &summary.failures_by_kind {
            writeln!(writer, "  {kind}: {count}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisPath, BatchItem, BatchResult, Query, ScoreVector};

    fn result() -> IntentResult {
        let raw = ScoreVector::from_pairs([
            (IntentLabel::Transactional, 75.0),
            (IntentLabel::CommercialInvestigation, 25.0),
        ]);
        IntentResult::from_scores(
            Query::parse("buy iphone").unwrap(),
            &raw,
            AnalysisPath::Model,
            Some("Purchase verb.".to_string()),
        )
    }

    #[test]
    fn test_write_result_text() {
        let mut out = Vec::new();
        write_result(&mut out, &result(), false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Primary:    Transactional (75.0%)"));
        assert!(text.contains("Why: Purchase verb."));
        assert!(text.lines().any(|l| l.trim_start().starts_with("Navigational")));
    }

    #[test]
    fn test_bar_bounds() {
        assert_eq!(bar(0.0), ".".repeat(BAR_WIDTH));
        assert_eq!(bar(100.0), "#".repeat(BAR_WIDTH));
        assert_eq!(bar(250.0).len(), BAR_WIDTH);
    }

    #[test]
    fn test_write_summary_table() {
        let batch = BatchResult::new(
            vec![BatchItem::from_result("buy iphone", Ok(result()))],
            false,
        );
        let mut out = Vec::new();
        write_summary(&mut out, &batch.summary()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Analyzed 1 of 1 queries (0 failed)"));
        assert!(text.contains("Transactional"));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
    }
}
