//! # Crab Eval
//!
//! 代码评审生成结果的异步 BLEU 评测流水线
//!
//! ## 架构设计
//!
//! ### ① 数据模型（Models）
//! - `models/` - 提交、评分结果、任务与快照
//! - `loaders` - 读取参考数据集
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心任务和队列
//! - `bleu` - 单条参考与候选文本的 BLEU 评分
//! - `ReferenceIndex` - 启动时构建的只读参考索引
//! - `Evaluator` - 对一次提交逐个 id 评分并汇报进度
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/job_queue` - 单 worker 的 FIFO 评测队列
//! - `orchestrator/notifier` - 推送通道与拉取查询共用同一份任务记录
//! - `orchestrator/batch_processor` - 命令行应用外壳
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{JobId, JobKind, JobSnapshot, JobStatus, ScoreRecord, Submission};
pub use orchestrator::{App, ConnectionToken, JobEvent, JobOrchestrator, Notifier};
pub use services::{BleuEvaluator, Evaluator, ReferenceIndex};
