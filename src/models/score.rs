use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 单个 id 的评分结果，生成后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// 所有参考文本中的最高分
    #[serde(rename = "max_bleu_score")]
    pub max_score: f64,
    /// 与每条参考文本的得分，顺序与参考文本一致
    #[serde(rename = "bleu_scores")]
    pub per_reference_scores: Vec<f64>,
    /// 提交的候选文本
    #[serde(rename = "proposed_comment")]
    pub candidate_text: String,
}

/// id → 评分结果，按提交顺序排列
pub type ScoreMap = IndexMap<String, ScoreRecord>;

/// 一次评测的产出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationOutcome {
    pub results: ScoreMap,
    /// 不在参考数据集中的 id 数量
    pub skipped: usize,
}
