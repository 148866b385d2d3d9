use serde::Serialize;

use crate::config::OutputMode;
use crate::error::AlignError;
use crate::types::{AlignmentJob, JobOutput};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Outcome of one batch invocation, created fresh per run and immutable
/// once the run completes. Serializes to the JSON run report.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub meta: RunMeta,
    pub jobs: Vec<JobRecord>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    /// RFC 3339 timestamp, stamped by the caller via `with_generated_at`.
    pub generated_at: String,
    pub mode: String,
    pub job_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failed,
}

/// One job's outcome. Success records carry the output block, failure
/// records the error block; both always name the job and its inputs.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub name: String,
    pub audio: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extrapolated_events: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_extrapolated_run: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn success(job: &AlignmentJob, output: &JobOutput) -> Self {
        Self {
            outputs: Some(
                output
                    .outputs
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect(),
            ),
            events: Some(output.events),
            extrapolated_events: Some(output.extrapolated_events),
            longest_extrapolated_run: Some(output.longest_extrapolated_run),
            error_kind: None,
            error: None,
            status: JobStatus::Success,
            ..Self::bare(job)
        }
    }

    pub fn failure(job: &AlignmentJob, error: &AlignError) -> Self {
        Self {
            error_kind: Some(error.kind().to_string()),
            error: Some(error.to_string()),
            status: JobStatus::Failed,
            ..Self::bare(job)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    fn bare(job: &AlignmentJob) -> Self {
        Self {
            name: job.display_name(),
            audio: job.audio.display().to_string(),
            notes: job.notes.display().to_string(),
            labels: job.labels.as_ref().map(|path| path.display().to_string()),
            status: JobStatus::Failed,
            outputs: None,
            events: None,
            extrapolated_events: None,
            longest_extrapolated_run: None,
            error_kind: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub fn summarize(jobs: &[JobRecord]) -> RunSummary {
    let succeeded = jobs.iter().filter(|record| record.is_success()).count();
    RunSummary {
        total: jobs.len(),
        succeeded,
        failed: jobs.len() - succeeded,
    }
}

impl RunReport {
    pub fn new(mode: OutputMode, jobs: Vec<JobRecord>) -> Self {
        let summary = summarize(&jobs);
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            meta: RunMeta {
                generated_at: String::new(),
                mode: mode.as_str().to_string(),
                job_count: jobs.len(),
            },
            jobs,
            summary,
        }
    }

    pub fn with_generated_at(mut self, generated_at: impl Into<String>) -> Self {
        self.meta.generated_at = generated_at.into();
        self
    }
}
