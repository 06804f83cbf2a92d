//! 批量提交处理器 - 编排层
//!
//! ## 职责
//!
//! 命令行入口使用的应用外壳：构建参考索引、启动评测队列，把一批提交文件依次送进队列，
//! 通过推送通道等待每个任务结束并输出结果。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：加载数据集、构建 `ReferenceIndex`、注册评测器、启动 worker 与清理任务
//! 2. **批量提交**：读取并校验每个提交文件，逐个 `submit`
//! 3. **推送等待**：每个任务一条在线连接，收到终态事件后用拉取查询取最终快照
//! 4. **全局统计**：汇总成功/失败数量

use crate::config::Config;
use crate::models::{JobId, JobKind, JobSnapshot, Submission};
use crate::orchestrator::job_queue::JobOrchestrator;
use crate::orchestrator::notifier::{JobEvent, Notifier};
use crate::services::{BleuEvaluator, Evaluator, ReferenceIndex};
use crate::utils::logging::{log_job_finished, log_startup, print_final_stats};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// 应用主结构
pub struct App {
    orchestrator: JobOrchestrator,
    reference_count: usize,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let index = ReferenceIndex::from_dataset_file(Path::new(&config.dataset_path)).await?;
        Ok(Self::with_index(index, &config))
    }

    /// 使用已有的参考索引初始化（不读取磁盘）
    pub fn with_index(index: ReferenceIndex, config: &Config) -> Self {
        let reference_count = index.len();
        let bleu: Arc<dyn Evaluator> = Arc::new(BleuEvaluator::new(Arc::new(index)));

        // 代码修改的提交同样按 id 与参考文本比较
        let evaluators: HashMap<JobKind, Arc<dyn Evaluator>> = HashMap::from([
            (JobKind::CommentScoring, Arc::clone(&bleu)),
            (JobKind::RefinementScoring, bleu),
        ]);

        let orchestrator =
            JobOrchestrator::new(evaluators, Arc::new(Notifier::new()), config.result_ttl());
        orchestrator.start();
        orchestrator.spawn_sweeper(config.sweep_interval());

        Self {
            orchestrator,
            reference_count,
        }
    }

    pub fn orchestrator(&self) -> &JobOrchestrator {
        &self.orchestrator
    }

    /// 提交所有文件并等待结束，返回每个任务的最终快照
    pub async fn run(&self, kind: JobKind, files: &[PathBuf]) -> Result<Vec<JobSnapshot>> {
        log_startup(self.reference_count, files.len());

        let mut pending = Vec::with_capacity(files.len());
        for path in files {
            match self.submit_file(kind, path).await {
                Ok(job_id) => pending.push(self.wait_for_job(job_id)),
                Err(e) => error!("❌ 提交 {} 失败: {:#}", path.display(), e),
            }
        }

        let snapshots: Vec<JobSnapshot> = join_all(pending)
            .await
            .into_iter()
            .collect::<Result<_>>()?;

        let success = snapshots.iter().filter(|s| s.results.is_some()).count();
        print_final_stats(success, files.len() - success, files.len());
        Ok(snapshots)
    }

    /// 读取并校验提交文件，然后入队
    async fn submit_file(&self, kind: JobKind, path: &Path) -> Result<JobId> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("无法读取提交文件: {}", path.display()))?;
        let submission = Submission::from_json(&content)?;
        let job_id = self.orchestrator.submit(kind, submission)?;
        info!("📄 {} → 任务 {}", path.display(), job_id);
        Ok(job_id)
    }

    /// 通过推送通道等待任务进入终态
    async fn wait_for_job(&self, job_id: JobId) -> Result<JobSnapshot> {
        let notifier = self.orchestrator.notifier();
        let (token, mut receiver) = notifier.connect();
        self.orchestrator.subscribe(&token, &job_id)?;

        while let Some(message) = receiver.recv().await {
            match &message.event {
                JobEvent::Queued { position } => {
                    info!("[任务 {}] ⏳ 排队中，前面还有 {} 个任务", job_id, position)
                }
                JobEvent::StartedProcessing => info!("[任务 {}] 开始处理", job_id),
                JobEvent::Progress { percent } => debug!("[任务 {}] 进度 {}%", job_id, percent),
                JobEvent::Complete { .. } | JobEvent::Failed { .. } => break,
            }
        }
        self.orchestrator.unsubscribe(&token);

        let snapshot = self.orchestrator.get_status(&job_id)?;
        log_job_finished(&snapshot);
        Ok(snapshot)
    }
}
