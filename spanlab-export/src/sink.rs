//! File-writing record sinks.
//!
//! Output directory, participant id and the timestamp that goes into the
//! filename are all handed in at construction.

use chrono::{DateTime, Utc};
use spanlab_core::{TerminationReason, TrialRecord};
use spanlab_experiment::{RecordSink, SessionSummary};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::document::{ExportDocument, to_json};
use crate::error::ExportError;
use crate::table::{CsvLayout, to_csv};

/// Keeps `[A-Za-z0-9_-]`, replaces anything else with `_`.
pub fn sanitize_id(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Where and under which name exports are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub dir: PathBuf,
    pub participant_id: String,
    pub stamped_at: DateTime<Utc>,
}

impl OutputTarget {
    pub fn new(
        dir: impl Into<PathBuf>,
        participant_id: &str,
        stamped_at: DateTime<Utc>,
    ) -> Result<Self, ExportError> {
        let sanitized = sanitize_id(participant_id);
        if sanitized.is_empty() {
            return Err(ExportError::EmptyParticipantId(participant_id.to_string()));
        }
        Ok(Self {
            dir: dir.into(),
            participant_id: sanitized,
            stamped_at,
        })
    }

    /// `{participant}_{task}_{YYYYMMDDTHHMMSSZ}.{extension}`
    pub fn file_name(&self, task_id: &str, extension: &str) -> String {
        format!(
            "{}_{}_{}.{extension}",
            self.participant_id,
            sanitize_id(task_id),
            self.stamped_at.format("%Y%m%dT%H%M%SZ")
        )
    }

    pub fn path_for(&self, task_id: &str, extension: &str) -> PathBuf {
        self.dir.join(self.file_name(task_id, extension))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), ExportError> {
        let io_err = |source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        fs::write(path, contents).map_err(io_err)?;
        info!(path = %path.display(), bytes = contents.len(), "export written");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CsvFileSink {
    target: OutputTarget,
    layout: CsvLayout,
    termination: Option<TerminationReason>,
    written: Vec<PathBuf>,
}

impl CsvFileSink {
    pub fn new(target: OutputTarget, layout: CsvLayout) -> Self {
        Self {
            target,
            layout,
            termination: None,
            written: Vec::new(),
        }
    }

    pub fn with_termination(mut self, termination: Option<TerminationReason>) -> Self {
        self.termination = termination;
        self
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl RecordSink for CsvFileSink {
    type Error = ExportError;

    fn persist(&mut self, task_id: &str, records: &[TrialRecord]) -> Result<(), ExportError> {
        let summary = SessionSummary::from_records(records).with_termination(self.termination);
        let body = to_csv(&self.layout, records, &summary);
        let path = self.target.path_for(task_id, "csv");
        self.target.write(&path, &body)?;
        self.written.push(path);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileSink {
    target: OutputTarget,
    termination: Option<TerminationReason>,
    written: Vec<PathBuf>,
}

impl JsonFileSink {
    pub fn new(target: OutputTarget) -> Self {
        Self {
            target,
            termination: None,
            written: Vec::new(),
        }
    }

    pub fn with_termination(mut self, termination: Option<TerminationReason>) -> Self {
        self.termination = termination;
        self
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl RecordSink for JsonFileSink {
    type Error = ExportError;

    fn persist(&mut self, task_id: &str, records: &[TrialRecord]) -> Result<(), ExportError> {
        let document = ExportDocument::new(
            task_id,
            Some(self.target.participant_id.clone()),
            records,
            self.termination,
        );
        let body = to_json(&document)?;
        let path = self.target.path_for(task_id, "json");
        self.target.write(&path, &body)?;
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 5, 9).unwrap()
    }

    #[test]
    fn sanitizes_participant_ids() {
        assert_eq!(sanitize_id("P 01/../x"), "P_01____x");
        assert_eq!(sanitize_id("  ab-C_9 "), "ab-C_9");
    }

    #[test]
    fn filename_pattern() {
        let target = OutputTarget::new("/tmp/out", "Jane Doe", stamp()).unwrap();
        assert_eq!(
            target.file_name("digit-span-forward", "csv"),
            "Jane_Doe_digit-span-forward_20261016T080509Z.csv"
        );
    }

    #[test]
    fn rejects_blank_participant() {
        assert!(matches!(
            OutputTarget::new("/tmp/out", "   ", stamp()),
            Err(ExportError::EmptyParticipantId(_))
        ));
    }
}
