//! 任务队列 - 编排层
//!
//! ## 职责
//!
//! 把评测引擎包装成单 worker 的严格 FIFO 队列。
//!
//! ## 核心功能
//!
//! 1. **接收提交**：`submit` 只在队列锁内追加任务，立即返回任务 ID，不等待评测
//! 2. **顺序处理**：唯一的 worker 任务每次取队首，同一时刻最多一个任务处于 Processing
//! 3. **进度汇报**：评测在阻塞线程上运行，进度回调同步更新任务并推送事件
//! 4. **故障隔离**：评测器返回错误或 panic 只会让当前任务 Failed，worker 继续处理后续任务
//! 5. **状态查询**：`get_status` / `queue_position` 读取实时状态的原子快照
//! 6. **过期清理**：结束的任务在保留期之后被清理
//!
//! ## 锁顺序
//!
//! 队列锁 → 通知器注册表锁，所有推送都在队列锁内、状态修改之后发出。

use crate::error::{AppError, AppResult, EvaluationError, StatusError, SubmitError};
use crate::models::{
    EvaluationOutcome, Job, JobId, JobKind, JobSnapshot, JobState, JobStatus, Submission,
};
use crate::orchestrator::notifier::{ConnectionToken, JobEvent, Notifier};
use crate::services::Evaluator;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// 排队位置查询的应答
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionReply {
    pub state: JobStatus,
    /// 前面还有几个任务（仅排队中有值）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// 客户端是否需要继续轮询；离开排队状态后为 false
    pub keep_polling: bool,
}

#[derive(Default)]
struct QueueState {
    jobs: HashMap<JobId, Job>,
    waiting: VecDeque<JobId>,
    processing: Option<JobId>,
}

impl QueueState {
    /// 排在该任务前面、尚未结束的任务数（包括正在处理的那个）
    fn position(&self, job_id: &JobId) -> Option<usize> {
        self.waiting
            .iter()
            .position(|id| id == job_id)
            .map(|index| index + usize::from(self.processing.is_some()))
    }

    fn snapshot(&self, job_id: &JobId) -> Option<JobSnapshot> {
        self.jobs
            .get(job_id)
            .map(|job| job.snapshot(self.position(job_id)))
    }
}

/// worker 取出的一项工作
struct WorkItem {
    job_id: JobId,
    submission: Arc<Submission>,
    evaluator: Arc<dyn Evaluator>,
}

struct Shared {
    state: Mutex<QueueState>,
    notifier: Arc<Notifier>,
    evaluators: HashMap<JobKind, Arc<dyn Evaluator>>,
    wakeup: Notify,
    worker_started: AtomicBool,
    result_ttl: Duration,
}

/// 单 worker 评测队列
#[derive(Clone)]
pub struct JobOrchestrator {
    shared: Arc<Shared>,
}

impl JobOrchestrator {
    /// 创建队列；需要调用 [`JobOrchestrator::start`] 才会开始处理
    pub fn new(
        evaluators: HashMap<JobKind, Arc<dyn Evaluator>>,
        notifier: Arc<Notifier>,
        result_ttl: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                notifier,
                evaluators,
                wakeup: Notify::new(),
                worker_started: AtomicBool::new(false),
                result_ttl,
            }),
        }
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.shared.notifier
    }

    /// 启动唯一的 worker；重复调用返回 None
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.shared.worker_started.swap(true, Ordering::SeqCst) {
            warn!("⚠️ worker 已经在运行，忽略重复启动");
            return None;
        }
        let shared = Arc::clone(&self.shared);
        Some(tokio::spawn(async move { shared.worker_loop().await }))
    }

    /// 启动过期任务清理
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = orchestrator.evict_expired(Utc::now());
                if evicted > 0 {
                    info!("🧹 清理了 {} 个过期任务", evicted);
                }
            }
        })
    }

    /// 提交一批待评测文本，立即返回任务 ID
    pub fn submit(&self, kind: JobKind, submission: Submission) -> Result<JobId, SubmitError> {
        if submission.is_empty() {
            return Err(SubmitError::InvalidSubmission(
                "提交内容为空，至少需要一个 id".to_string(),
            ));
        }

        let job = Job::new(kind, submission);
        let job_id = job.id.clone();
        let size = job.submission.len();

        let position = {
            let mut state = self.shared.state.lock();
            state.jobs.insert(job_id.clone(), job);
            state.waiting.push_back(job_id.clone());
            state.position(&job_id).unwrap_or(0)
        };
        self.shared.wakeup.notify_one();

        info!(
            "[任务 {}] 📥 已接收 {} 提交, {} 个 id, 排队位置 {}",
            job_id, kind, size, position
        );
        Ok(job_id)
    }

    /// 查询任务当前状态（只读快照）
    pub fn get_status(&self, job_id: &JobId) -> Result<JobSnapshot, StatusError> {
        self.shared
            .state
            .lock()
            .snapshot(job_id)
            .ok_or_else(|| StatusError::NotFound {
                job_id: job_id.to_string(),
            })
    }

    /// 查询排队位置，总是由实时状态计算
    pub fn queue_position(&self, job_id: &JobId) -> Result<PositionReply, StatusError> {
        let snapshot = self.get_status(job_id)?;
        Ok(PositionReply {
            state: snapshot.state,
            position: snapshot.queue_position,
            keep_polling: snapshot.state == JobStatus::Queued,
        })
    }

    /// 让在线连接订阅任务，并立即补发当前状态
    pub fn subscribe(&self, token: &ConnectionToken, job_id: &JobId) -> AppResult<()> {
        let state = self.shared.state.lock();
        let snapshot = state
            .snapshot(job_id)
            .ok_or_else(|| AppError::job_not_found(job_id.as_str()))?;
        self.shared
            .notifier
            .attach(token, job_id, JobEvent::from_snapshot(&snapshot))?;
        debug!("[任务 {}] 连接 {} 已订阅", job_id, token);
        Ok(())
    }

    /// 连接断开时调用
    pub fn unsubscribe(&self, token: &ConnectionToken) {
        self.shared.notifier.disconnect(token);
    }

    /// 导出已完成任务的结果：`{"type": ..., "results": {...}}`；未完成时为 None
    pub fn export_results(&self, job_id: &JobId) -> Result<Option<JsonValue>, StatusError> {
        let snapshot = self.get_status(job_id)?;
        Ok(snapshot
            .results
            .map(|results| json!({ "type": snapshot.kind, "results": results })))
    }

    /// 清理保留期已过的终态任务，返回清理数量
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.shared.result_ttl;
        let mut state = self.shared.state.lock();

        let expired: Vec<JobId> = state
            .jobs
            .values()
            .filter(|job| {
                job.state.status().is_terminal()
                    && job
                        .finished_at
                        .and_then(|finished| (now - finished).to_std().ok())
                        .is_some_and(|age| age >= ttl)
            })
            .map(|job| job.id.clone())
            .collect();

        for job_id in &expired {
            state.jobs.remove(job_id);
            self.shared.notifier.forget_job(job_id);
            debug!("[任务 {}] 已过期清理", job_id);
        }
        expired.len()
    }
}

impl Shared {
    async fn worker_loop(self: Arc<Self>) {
        info!("⚙️ 评测 worker 已启动");
        loop {
            match self.take_next() {
                Some(item) => self.process(item).await,
                // notify_one 在没有等待者时会保留一个许可，不会丢失唤醒
                None => self.wakeup.notified().await,
            }
        }
    }

    /// 取出队首任务并切换到 Processing；没有对应评测器的任务直接 Failed
    fn take_next(&self) -> Option<WorkItem> {
        let mut state = self.state.lock();
        while let Some(job_id) = state.waiting.pop_front() {
            let Some(job) = state.jobs.get_mut(&job_id) else {
                continue;
            };

            let Some(evaluator) = self.evaluators.get(&job.kind).cloned() else {
                let reason = EvaluationError::NoEvaluator {
                    kind: job.kind.to_string(),
                }
                .to_string();
                error!("[任务 {}] ❌ {}", job_id, reason);
                job.state = JobState::Failed {
                    reason: reason.clone(),
                };
                job.finished_at = Some(Utc::now());
                self.notifier.publish(&job_id, JobEvent::Failed { reason });
                self.publish_positions(&state);
                continue;
            };

            job.state = JobState::Processing {
                progress_percent: 0,
            };
            job.started_at = Some(Utc::now());
            let submission = Arc::clone(&job.submission);
            state.processing = Some(job_id.clone());

            self.notifier.publish(&job_id, JobEvent::StartedProcessing);
            self.notifier
                .publish(&job_id, JobEvent::Progress { percent: 0 });
            info!("[任务 {}] 🚀 开始评测 {} 个 id", job_id, submission.len());

            return Some(WorkItem {
                job_id,
                submission,
                evaluator,
            });
        }
        None
    }

    async fn process(self: &Arc<Self>, item: WorkItem) {
        let WorkItem {
            job_id,
            submission,
            evaluator,
        } = item;

        let shared = Arc::clone(self);
        let progress_id = job_id.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let mut on_progress = |percent: u8| shared.record_progress(&progress_id, percent);
            evaluator.evaluate(&submission, &mut on_progress)
        })
        .await;

        let outcome = match joined {
            Ok(result) => result,
            Err(join_error) => Err(EvaluationError::Panicked(panic_message(join_error))),
        };
        self.finish(&job_id, outcome);
    }

    /// 进度回调：只接受不减小的进度
    fn record_progress(&self, job_id: &JobId, percent: u8) {
        let percent = percent.min(100);
        let mut state = self.state.lock();
        let Some(job) = state.jobs.get_mut(job_id) else {
            return;
        };
        if let JobState::Processing { progress_percent } = &mut job.state {
            if percent < *progress_percent {
                return;
            }
            *progress_percent = percent;
            self.notifier.publish(job_id, JobEvent::Progress { percent });
        }
    }

    /// 写入终态（结果只在这里一次性写入），并刷新后续任务的排队位置
    fn finish(&self, job_id: &JobId, outcome: Result<EvaluationOutcome, EvaluationError>) {
        let mut state = self.state.lock();
        state.processing = None;

        if let Some(job) = state.jobs.get_mut(job_id) {
            job.finished_at = Some(Utc::now());
            match outcome {
                Ok(EvaluationOutcome { results, skipped }) => {
                    info!(
                        "[任务 {}] ✓ 评测完成: {} 个结果, 跳过 {} 个 id",
                        job_id,
                        results.len(),
                        skipped
                    );
                    let results = Arc::new(results);
                    job.state = JobState::Complete {
                        results: Arc::clone(&results),
                        skipped,
                    };
                    self.notifier.publish(
                        job_id,
                        JobEvent::Complete {
                            kind: job.kind,
                            results,
                        },
                    );
                }
                Err(e) => {
                    error!("[任务 {}] ❌ 评测失败: {}", job_id, e);
                    let reason = e.to_string();
                    job.state = JobState::Failed {
                        reason: reason.clone(),
                    };
                    self.notifier.publish(job_id, JobEvent::Failed { reason });
                }
            }
        }

        self.publish_positions(&state);
    }

    /// 向仍在排队的任务推送最新位置
    fn publish_positions(&self, state: &QueueState) {
        let offset = usize::from(state.processing.is_some());
        for (index, job_id) in state.waiting.iter().enumerate() {
            self.notifier.publish(
                job_id,
                JobEvent::Queued {
                    position: index + offset,
                },
            );
        }
    }
}

fn panic_message(join_error: JoinError) -> String {
    if join_error.is_cancelled() {
        return "评测线程被取消".to_string();
    }
    let payload = join_error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知 panic".to_string()
    }
}
