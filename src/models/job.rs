//! 任务模型
//!
//! `Job` 只由编排层的 worker 修改；对外只暴露 `JobSnapshot`（加锁时整体克隆出来的只读副本）。

use crate::models::score::ScoreMap;
use crate::models::submission::{JobKind, Submission};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use uuid::Uuid;

/// 任务标识（不透明字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// 生成新的任务标识，形如 `crab_comment_<uuid>`
    pub fn generate(kind: JobKind) -> Self {
        Self(format!("crab_{}_{}", kind.as_str(), Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 任务生命周期状态（不带数据，用于快照和日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Complete,
    Failed,
}

impl JobStatus {
    /// 是否已经结束（Complete / Failed）
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

/// 任务状态及其只在该状态下有意义的数据
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Queued,
    Processing {
        progress_percent: u8,
    },
    Complete {
        results: Arc<ScoreMap>,
        skipped: usize,
    },
    Failed {
        reason: String,
    },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Queued => JobStatus::Queued,
            JobState::Processing { .. } => JobStatus::Processing,
            JobState::Complete { .. } => JobStatus::Complete,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }
}

/// 一次提交及其评测状态
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub submission: Arc<Submission>,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(kind: JobKind, submission: Submission) -> Self {
        Self {
            id: JobId::generate(kind),
            kind,
            submission: Arc::new(submission),
            state: JobState::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// 生成快照；排队位置由调用方根据实时队列计算后传入
    pub fn snapshot(&self, queue_position: Option<usize>) -> JobSnapshot {
        let (progress_percent, results, skipped, error_reason) = match &self.state {
            JobState::Queued => (None, None, None, None),
            JobState::Processing { progress_percent } => (Some(*progress_percent), None, None, None),
            JobState::Complete { results, skipped } => {
                (None, Some(Arc::clone(results)), Some(*skipped), None)
            }
            JobState::Failed { reason } => (None, None, None, Some(reason.clone())),
        };

        JobSnapshot {
            job_id: self.id.clone(),
            kind: self.kind,
            state: self.state.status(),
            queue_position: match self.state {
                JobState::Queued => queue_position,
                _ => None,
            },
            progress_percent,
            results,
            skipped,
            error_reason,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// 任务的只读快照，拉取查询与推送都基于它
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub state: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Arc<ScoreMap>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_prefix() {
        let id = JobId::generate(JobKind::RefinementScoring);
        assert!(id.as_str().starts_with("crab_refinement_"));
        assert_ne!(id, JobId::generate(JobKind::RefinementScoring));
    }

    #[test]
    fn test_snapshot_hides_fields_outside_their_state() {
        let mut job = Job::new(
            JobKind::CommentScoring,
            Submission::from_iter([("a", "text")]),
        );

        let queued = job.snapshot(Some(2));
        assert_eq!(queued.state, JobStatus::Queued);
        assert_eq!(queued.queue_position, Some(2));
        assert_eq!(queued.progress_percent, None);

        job.state = JobState::Processing {
            progress_percent: 40,
        };
        let processing = job.snapshot(Some(2));
        assert_eq!(processing.queue_position, None);
        assert_eq!(processing.progress_percent, Some(40));

        job.state = JobState::Failed {
            reason: "boom".to_string(),
        };
        let failed = job.snapshot(None);
        assert_eq!(failed.error_reason.as_deref(), Some("boom"));
        assert!(failed.results.is_none());

        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["type"], "comment");
        assert!(json.get("queue_position").is_none());
    }

    #[test]
    fn test_terminal_status() {
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Complete.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
