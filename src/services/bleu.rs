//! BLEU 评分 - 业务能力层
//!
//! 只负责"一条候选文本和一条参考文本有多像"，不关心任务和进度。
//!
//! - 按空白切词，不做大小写或标点归一化
//! - 修正 n-gram 精度：每个 n-gram 的命中数不超过它在参考文本中出现的次数
//! - 不做平滑：任一阶精度为 0 则总分为 0
//! - 最大阶数取 `min(候选词数, 参考词数, 4)`

use std::collections::HashMap;

/// n-gram 最大阶数上限
pub const MAX_ORDER: usize = 4;

/// 空白切词
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// 本次比较使用的最大阶数
pub fn effective_order(reference_len: usize, candidate_len: usize) -> usize {
    candidate_len.min(reference_len).min(MAX_ORDER)
}

fn ngram_counts<'a>(tokens: &'a [&'a str], n: usize) -> HashMap<&'a [&'a str], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// 第 n 阶修正精度；候选文本没有该阶 n-gram 时为 0
pub fn modified_precision(reference: &[&str], candidate: &[&str], n: usize) -> f64 {
    let reference_counts = ngram_counts(reference, n);
    let candidate_counts = ngram_counts(candidate, n);

    let mut matched = 0usize;
    let mut total = 0usize;
    for (gram, count) in &candidate_counts {
        let in_reference = reference_counts.get(gram).copied().unwrap_or(0);
        matched += (*count).min(in_reference);
        total += *count;
    }

    if total == 0 {
        0.0
    } else {
        matched as f64 / total as f64
    }
}

/// 长度惩罚
pub fn brevity_penalty(reference_len: usize, candidate_len: usize) -> f64 {
    if candidate_len >= reference_len {
        1.0
    } else if candidate_len == 0 {
        0.0
    } else {
        (1.0 - reference_len as f64 / candidate_len as f64).exp()
    }
}

/// 按给定最大阶数计算 BLEU，结果在 [0, 1]
pub fn score(reference: &[&str], candidate: &[&str], max_order: usize) -> f64 {
    if max_order == 0 || candidate.is_empty() {
        return 0.0;
    }

    let mut log_sum = 0.0;
    for n in 1..=max_order {
        let p = modified_precision(reference, candidate, n);
        if p == 0.0 {
            return 0.0;
        }
        log_sum += p.ln();
    }

    let geo_mean = (log_sum / max_order as f64).exp();
    let bp = brevity_penalty(reference.len(), candidate.len());
    (bp * geo_mean).clamp(0.0, 1.0)
}

/// 两段原始文本之间的 BLEU（自动切词、自动选择阶数）
pub fn sentence_bleu(reference: &str, candidate: &str) -> f64 {
    let reference = tokenize(reference);
    let candidate = tokenize(candidate);
    let order = effective_order(reference.len(), candidate.len());
    score(&reference, &candidate, order)
}

/// 候选文本对一组参考文本的得分：返回 (最高分, 每条参考的得分)
pub fn score_against_references(references: &[String], candidate: &str) -> (f64, Vec<f64>) {
    let scores: Vec<f64> = references
        .iter()
        .map(|reference| sentence_bleu(reference, candidate))
        .collect();
    let max_score = scores.iter().copied().fold(0.0, f64::max);
    (max_score, scores)
}
