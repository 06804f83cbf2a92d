/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use crate::models::{JobSnapshot, JobStatus};
use tracing::info;

/// 记录程序启动信息
///
/// # 参数
/// - `reference_count`: 参考索引中的 id 数量
/// - `submissions`: 待提交的文件数量
pub fn log_startup(reference_count: usize, submissions: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 单 worker 评测队列");
    info!("📚 参考 id 数量: {}", reference_count);
    info!("📋 待提交文件: {}", submissions);
    info!("{}", "=".repeat(60));
}

/// 记录单个任务结束
pub fn log_job_finished(snapshot: &JobSnapshot) {
    info!("\n{}", "─".repeat(60));
    match snapshot.state {
        JobStatus::Complete => info!(
            "[任务 {}] ✓ 完成: {} 个结果, 跳过 {} 个 id",
            snapshot.job_id,
            snapshot.results.as_ref().map_or(0, |r| r.len()),
            snapshot.skipped.unwrap_or(0)
        ),
        _ => info!(
            "[任务 {}] ❌ 失败: {}",
            snapshot.job_id,
            snapshot.error_reason.as_deref().unwrap_or("未知原因")
        ),
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
pub fn print_final_stats(success: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
