//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `job_queue` - 单 worker 评测队列
//! - 接收提交、分配任务 ID、维护生命周期与排队位置
//! - 唯一的 worker 按 FIFO 逐个调用评测器
//! - 状态查询、过期清理
//!
//! ### `notifier` - 双通道通知器
//! - 在线连接注册表
//! - 事件推送；订阅时补发当前状态，支持断线重连
//!
//! ### `batch_processor` - 批量提交处理器
//! - 命令行使用的应用外壳，组装索引、评测器和队列
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<提交文件>)
//!     ↓
//! job_queue + notifier (处理单个任务)
//!     ↓
//! services (能力层：bleu / reference_index / evaluator)
//! ```

pub mod batch_processor;
pub mod job_queue;
pub mod notifier;

// 重新导出主要类型
pub use batch_processor::App;
pub use job_queue::{JobOrchestrator, PositionReply};
pub use notifier::{ConnectionToken, JobEvent, Notifier, PushMessage};
