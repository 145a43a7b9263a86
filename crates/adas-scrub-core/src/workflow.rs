//! Report workflow states and the submission gate.
//!
//! A report moves `draft → in_review → ready_to_submit → submitted`.
//! Entering `ready_to_submit` is gated on the completeness assessment:
//! [`guard_transition`] must be called by whatever layer changes the
//! status, and it refuses the move unless the report is ready.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::completeness::CompletenessAssessment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    InReview,
    ReadyToSubmit,
    Submitted,
}

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 4] = [
        WorkflowStatus::Draft,
        WorkflowStatus::InReview,
        WorkflowStatus::ReadyToSubmit,
        WorkflowStatus::Submitted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::InReview => "in_review",
            WorkflowStatus::ReadyToSubmit => "ready_to_submit",
            WorkflowStatus::Submitted => "submitted",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        WorkflowStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| TransitionError::UnknownStatus(s.to_string()))
    }
}

/// Why a status change was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("unknown workflow status '{0}'")]
    UnknownStatus(String),

    #[error("report is not ready to submit (score {score}, missing: {})", .missing.join(", "))]
    NotReady { score: u32, missing: Vec<String> },
}

/// Refuse a move to `ReadyToSubmit` unless `assessment` is ready.
///
/// Every other target is allowed; the gate only protects submission.
pub fn guard_transition(
    target: WorkflowStatus,
    assessment: &CompletenessAssessment,
) -> Result<(), TransitionError> {
    if target == WorkflowStatus::ReadyToSubmit && !assessment.ready_for_submission {
        return Err(TransitionError::NotReady {
            score: assessment.score,
            missing: assessment.missing.clone(),
        });
    }
    Ok(())
}
