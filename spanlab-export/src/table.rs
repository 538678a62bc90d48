//! CSV rendering of a trial log.
//!
//! Output is UTF-8, comma-delimited, `\n`-terminated, with RFC-4180 quoting
//! for any field holding a comma, a double quote, or a line break.

use chrono::SecondsFormat;
use spanlab_core::{ComparisonMode, TrialRecord};
use spanlab_experiment::SessionSummary;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    TrialIndex,
    Level,
    Attempt,
    PresentedSequence,
    ExpectedResponse,
    SubmittedResponse,
    Correct,
    ScoreDelta,
    TimestampUtc,
}

impl Column {
    /// Every field of a [`TrialRecord`], in export order.
    pub const ALL: [Column; 9] = [
        Column::TrialIndex,
        Column::Level,
        Column::Attempt,
        Column::PresentedSequence,
        Column::ExpectedResponse,
        Column::SubmittedResponse,
        Column::Correct,
        Column::ScoreDelta,
        Column::TimestampUtc,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Column::TrialIndex => "trial_index",
            Column::Level => "level",
            Column::Attempt => "attempt",
            Column::PresentedSequence => "presented_sequence",
            Column::ExpectedResponse => "expected_response",
            Column::SubmittedResponse => "submitted_response",
            Column::Correct => "correct",
            Column::ScoreDelta => "score_delta",
            Column::TimestampUtc => "timestamp_utc",
        }
    }

    fn value(&self, record: &TrialRecord) -> String {
        match self {
            Column::TrialIndex => record.trial_index.to_string(),
            Column::Level => record.level.to_string(),
            Column::Attempt => record.attempt.to_string(),
            Column::PresentedSequence => record.presented_sequence.clone(),
            Column::ExpectedResponse => record.expected_response.clone(),
            Column::SubmittedResponse => record.submitted_response.clone(),
            Column::Correct => record.correct.to_string(),
            Column::ScoreDelta => record.score_delta.to_string(),
            Column::TimestampUtc => record
                .timestamp_utc
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Where the session summary goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryPlacement {
    /// Repeated as extra columns on every row.
    PerRow,
    /// `key,value` lines after a blank line.
    Trailer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLayout {
    pub columns: Vec<Column>,
    pub summary: SummaryPlacement,
}

const PER_ROW_SUMMARY: [&str; 3] = ["accuracy", "max_level_reached", "termination"];

impl CsvLayout {
    /// Default layout for a task family. Every layout carries each record
    /// field; change detection puts the summary in a trailer.
    pub fn for_mode(mode: ComparisonMode) -> Self {
        let summary = match mode {
            ComparisonMode::ChangeDetection => SummaryPlacement::Trailer,
            _ => SummaryPlacement::PerRow,
        };
        Self {
            columns: Column::ALL.to_vec(),
            summary,
        }
    }

    pub fn header(&self) -> Vec<&'static str> {
        let mut header: Vec<&'static str> = self.columns.iter().map(Column::header).collect();
        if self.summary == SummaryPlacement::PerRow {
            header.extend(PER_ROW_SUMMARY);
        }
        header
    }
}

/// Renders `records` in insertion order under `layout`.
pub fn to_csv(layout: &CsvLayout, records: &[TrialRecord], summary: &SessionSummary) -> String {
    let mut out = String::new();
    write_row(&mut out, layout.header());

    let accuracy = format!("{:.4}", summary.accuracy);
    let max_level = summary.max_level_reached.to_string();
    let termination = summary.termination.map(|t| t.as_str()).unwrap_or("");

    for record in records {
        let mut row: Vec<String> = layout.columns.iter().map(|c| c.value(record)).collect();
        if layout.summary == SummaryPlacement::PerRow {
            row.extend([accuracy.clone(), max_level.clone(), termination.to_string()]);
        }
        write_row(&mut out, row);
    }

    if layout.summary == SummaryPlacement::Trailer {
        out.push('\n');
        let mut trailer = vec![
            ("trials", summary.trials.to_string()),
            ("correct_trials", summary.correct_trials.to_string()),
            ("accuracy", accuracy),
            ("max_level_reached", max_level),
            ("total_score", summary.total_score.to_string()),
        ];
        if let Some(reason) = summary.termination {
            trailer.push(("termination", reason.as_str().to_string()));
        }
        for (key, value) in trailer {
            write_row(&mut out, [key.to_string(), value]);
        }
    }
    out
}

fn write_row<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field.as_ref()));
    }
    out.push('\n');
}

/// Quotes a field when it needs it, doubling embedded quotes.
pub fn escape_field(field: &str) -> String {
    if !field.contains([',', '"', '\r', '\n']) {
        return field.to_string();
    }
    let mut quoted = String::with_capacity(field.len() + 2);
    quoted.push('"');
    for c in field.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// One-line description of a summary, for logs and terminal output.
pub fn summary_line(summary: &SessionSummary) -> String {
    let mut line = String::new();
    let _ = write!(
        line,
        "{} trials, {} correct ({:.1}%), max level {}, score {}",
        summary.trials,
        summary.correct_trials,
        summary.accuracy * 100.0,
        summary.max_level_reached,
        summary.total_score
    );
    if let Some(reason) = summary.termination {
        let _ = write!(line, ", ended: {}", reason.as_str());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use spanlab_core::TerminationReason;

    fn record(index: usize, submitted: &str, correct: bool) -> TrialRecord {
        TrialRecord {
            trial_index: index,
            level: 3,
            attempt: 1,
            presented_sequence: "3 8 5".into(),
            expected_response: "3 8 5".into(),
            submitted_response: submitted.into(),
            correct,
            score_delta: i32::from(correct),
            timestamp_utc: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        }
    }

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape_field("3 8 5"), "3 8 5");
        assert_eq!(escape_field("3,8"), "\"3,8\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("a\nb"), "\"a\nb\"");
    }

    #[test]
    fn per_row_layout() {
        let records = vec![record(0, "3 8 5", true), record(1, "3,8,5", true)];
        let summary = SessionSummary::from_records(&records)
            .with_termination(Some(TerminationReason::CeilingReached));
        let csv = to_csv(
            &CsvLayout::for_mode(ComparisonMode::Forward),
            &records,
            &summary,
        );
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "trial_index,level,attempt,presented_sequence,expected_response,submitted_response,correct,score_delta,timestamp_utc,accuracy,max_level_reached,termination"
        );
        assert_eq!(
            lines[1],
            "0,3,1,3 8 5,3 8 5,3 8 5,true,1,2026-03-14T09:26:53.000Z,1.0000,3,ceiling_reached"
        );
        assert!(lines[2].contains(",\"3,8,5\","));
        assert_eq!(lines.len(), 3);
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn trailer_layout() {
        let records = vec![record(0, "1 2", false), record(1, "1", true)];
        let summary = SessionSummary::from_records(&records);
        let csv = to_csv(
            &CsvLayout::for_mode(ComparisonMode::ChangeDetection),
            &records,
            &summary,
        );
        let (table, trailer) = csv.split_once("\n\n").unwrap();
        assert!(table.lines().next().unwrap().contains("score_delta"));
        assert_eq!(table.lines().count(), 3);
        assert_eq!(
            trailer,
            "trials,2\ncorrect_trials,1\naccuracy,0.5000\nmax_level_reached,3\ntotal_score,1\n"
        );
    }

    #[test]
    fn empty_log_is_header_only() {
        let summary = SessionSummary::from_records(&[]);
        let csv = to_csv(&CsvLayout::for_mode(ComparisonMode::Count), &[], &summary);
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn summary_line_mentions_termination() {
        let summary = SessionSummary::from_records(&[record(0, "3 8 5", true)])
            .with_termination(Some(TerminationReason::ConsecutiveFailures));
        assert_eq!(
            summary_line(&summary),
            "1 trials, 1 correct (100.0%), max level 3, score 1, ended: consecutive_failures"
        );
    }
}
