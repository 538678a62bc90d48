use serde::{Deserialize, Serialize};
use spanlab_core::{TerminationReason, TrialRecord};
use spanlab_experiment::SessionSummary;

use crate::error::ExportError;

/// Everything a JSON export contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<String>,
    pub summary: SessionSummary,
    pub records: Vec<TrialRecord>,
}

impl ExportDocument {
    pub fn new(
        task_id: impl Into<String>,
        participant_id: Option<String>,
        records: &[TrialRecord],
        termination: Option<TerminationReason>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            participant_id,
            summary: SessionSummary::from_records(records).with_termination(termination),
            records: records.to_vec(),
        }
    }
}

pub fn to_json(document: &ExportDocument) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(document)?)
}

pub fn from_json(text: &str) -> Result<ExportDocument, ExportError> {
    Ok(serde_json::from_str(text)?)
}
