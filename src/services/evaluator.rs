//! 评测引擎 - 业务能力层
//!
//! 对一次提交逐个 id 评分并汇报进度。进度在每个 id 处理完后回调一次（包括被跳过的 id），
//! 所以提交有 N 个 id 就恰好回调 N 次，最后一次一定是 100。

use crate::error::EvaluationError;
use crate::models::{EvaluationOutcome, ScoreRecord, Submission};
use crate::services::bleu;
use crate::services::reference_index::ReferenceIndex;
use crate::utils::logging::truncate_text;
use std::sync::Arc;
use tracing::{debug, warn};

/// 评测器：编排层按任务类型持有，测试里可以替换成会失败的实现
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        submission: &Submission,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<EvaluationOutcome, EvaluationError>;
}

/// 基于参考索引的 BLEU 评测器
pub struct BleuEvaluator {
    references: Arc<ReferenceIndex>,
}

impl BleuEvaluator {
    pub fn new(references: Arc<ReferenceIndex>) -> Self {
        Self { references }
    }
}

impl Evaluator for BleuEvaluator {
    fn evaluate(
        &self,
        submission: &Submission,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<EvaluationOutcome, EvaluationError> {
        Ok(run(submission, &self.references, on_progress))
    }
}

/// 已处理 id 数对应的进度百分比（向下取整）
fn percent(processed: usize, total: usize) -> u8 {
    (processed * 100 / total) as u8
}

/// 对提交中的每个 id 评分
///
/// 不在参考索引中的 id 只计入 `skipped`，不产生结果，但仍然推进进度。
pub fn run(
    submission: &Submission,
    references: &ReferenceIndex,
    on_progress: &mut dyn FnMut(u8),
) -> EvaluationOutcome {
    let total = submission.len();
    let mut outcome = EvaluationOutcome::default();
    if total == 0 {
        return outcome;
    }

    for (processed, (id, candidate)) in submission.iter().enumerate() {
        match references.lookup(id) {
            Some(reference_texts) => {
                let (max_score, per_reference_scores) =
                    bleu::score_against_references(reference_texts, candidate);
                debug!(
                    "id {} 得分 {:.4} (候选: {})",
                    id,
                    max_score,
                    truncate_text(candidate, 40)
                );
                outcome.results.insert(
                    id.to_string(),
                    ScoreRecord {
                        max_score,
                        per_reference_scores,
                        candidate_text: candidate.to_string(),
                    },
                );
            }
            None => {
                warn!("id \"{}\" 不在参考数据集中，已跳过", id);
                outcome.skipped += 1;
            }
        }

        on_progress(percent(processed + 1, total));
    }

    outcome
}
