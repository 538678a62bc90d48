//! Exports read back through an independent RFC-4180 parser.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use spanlab_core::{ComparisonMode, TrialRecord};
use spanlab_experiment::SessionSummary;
use spanlab_export::{CsvLayout, SummaryPlacement, to_csv};

fn parse(text: &str) -> Vec<csv::StringRecord> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
        .records()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn record_from_row(header: &csv::StringRecord, row: &csv::StringRecord) -> TrialRecord {
    let field = |name: &str| {
        let i = header
            .iter()
            .position(|h| h == name)
            .unwrap_or_else(|| panic!("{name} column missing"));
        row[i].to_string()
    };
    TrialRecord {
        trial_index: field("trial_index").parse().unwrap(),
        level: field("level").parse().unwrap(),
        attempt: field("attempt").parse().unwrap(),
        presented_sequence: field("presented_sequence"),
        expected_response: field("expected_response"),
        submitted_response: field("submitted_response"),
        correct: field("correct").parse().unwrap(),
        score_delta: field("score_delta").parse().unwrap(),
        timestamp_utc: DateTime::parse_from_rfc3339(&field("timestamp_utc"))
            .unwrap()
            .with_timezone(&Utc),
    }
}

const MODES: [ComparisonMode; 5] = [
    ComparisonMode::Forward,
    ComparisonMode::Backward,
    ComparisonMode::Count,
    ComparisonMode::ChangeDetection,
    ComparisonMode::CardSelection,
];

fn awkward_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just(",".to_string()),
            Just("\"".to_string()),
            Just("\n".to_string()),
            Just(" ".to_string()),
            "[a-z0-9]{1,4}",
        ],
        0..8,
    )
    .prop_map(|parts| parts.concat())
}

fn record_strategy() -> impl Strategy<Value = TrialRecord> {
    (
        1..10u32,
        1..=2u8,
        awkward_text(),
        awkward_text(),
        any::<bool>(),
        -5..6i32,
        0..10_000_000i64,
    )
        .prop_map(|(level, attempt, expected, submitted, correct, score_delta, ms)| {
            TrialRecord {
                trial_index: 0,
                level,
                attempt,
                presented_sequence: expected.clone(),
                expected_response: expected,
                submitted_response: submitted,
                correct,
                score_delta,
                timestamp_utc: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                    + chrono::TimeDelta::milliseconds(ms),
            }
        })
}

#[test]
fn quoted_fields_survive() {
    let records = vec![TrialRecord {
        trial_index: 0,
        level: 3,
        attempt: 1,
        presented_sequence: "3 8 5".into(),
        expected_response: "3 8 5".into(),
        submitted_response: "3,8,\"5\"".into(),
        correct: false,
        score_delta: 0,
        timestamp_utc: Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap(),
    }];
    let summary = SessionSummary::from_records(&records);
    let text = to_csv(
        &CsvLayout::for_mode(ComparisonMode::ChangeDetection),
        &records,
        &summary,
    );
    let rows = parse(&text);
    assert_eq!(&rows[1][5], "3,8,\"5\"");
    assert_eq!(record_from_row(&rows[0], &rows[1]), records[0]);
}

proptest! {
    #[test]
    fn every_layout_round_trips(
        mut records in prop::collection::vec(record_strategy(), 0..12),
        mode in prop::sample::select(MODES.to_vec()),
    ) {
        for (i, r) in records.iter_mut().enumerate() {
            r.trial_index = i;
        }
        let summary = SessionSummary::from_records(&records);
        let layout = CsvLayout::for_mode(mode);
        let text = to_csv(&layout, &records, &summary);

        let rows = parse(&text);
        prop_assert_eq!(rows[0].iter().collect::<Vec<_>>(), layout.header());
        let parsed: Vec<TrialRecord> = rows[1..=records.len()]
            .iter()
            .map(|row| record_from_row(&rows[0], row))
            .collect();
        prop_assert_eq!(parsed, records.clone());

        match layout.summary {
            SummaryPlacement::Trailer => {
                // trailer rows follow the blank separator line
                let trailer = &rows[records.len() + 1..];
                prop_assert_eq!(&trailer[0][0], "trials");
                prop_assert_eq!(trailer[0][1].parse::<usize>().unwrap(), records.len());
            }
            SummaryPlacement::PerRow => {
                prop_assert_eq!(rows.len(), records.len() + 1);
                let accuracy = format!("{:.4}", summary.accuracy);
                for row in &rows[1..] {
                    prop_assert_eq!(&row[layout.columns.len()], accuracy.as_str());
                }
            }
        }
    }
}
