//! 提交数据：id → 生成文本

use crate::error::SubmitError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::Display;

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// 评审意见生成
    #[serde(rename = "comment")]
    CommentScoring,
    /// 代码修改
    #[serde(rename = "refinement")]
    RefinementScoring,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::CommentScoring => "comment",
            JobKind::RefinementScoring => "refinement",
        }
    }
}

impl Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次提交：保持原始插入顺序的 id → 候选文本映射
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Submission {
    answers: IndexMap<String, String>,
}

impl Submission {
    /// 构造提交，空映射会被拒绝
    pub fn new(answers: IndexMap<String, String>) -> Result<Self, SubmitError> {
        if answers.is_empty() {
            return Err(SubmitError::InvalidSubmission(
                "提交内容为空，至少需要一个 id".to_string(),
            ));
        }
        Ok(Self { answers })
    }

    /// 解析上传的 JSON 文本
    ///
    /// 必须是一个对象，且所有值都是字符串（id → comment）
    pub fn from_json(data: &str) -> Result<Self, SubmitError> {
        let value: JsonValue = serde_json::from_str(data)
            .map_err(|_| SubmitError::InvalidSubmission("Invalid JSON format".to_string()))?;
        Self::try_from(value)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// 按提交顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.answers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl TryFrom<JsonValue> for Submission {
    type Error = SubmitError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        let JsonValue::Object(map) = value else {
            return Err(SubmitError::InvalidSubmission(
                "Submitted json doesn't contain an object".to_string(),
            ));
        };

        let mut answers = IndexMap::with_capacity(map.len());
        for (id, value) in map {
            match value {
                JsonValue::String(text) => {
                    answers.insert(id, text);
                }
                _ => {
                    return Err(SubmitError::InvalidSubmission(
                        "Submitted json object must only be str -> str. Namely id -> comment"
                            .to_string(),
                    ))
                }
            }
        }

        Self::new(answers)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Submission {
    /// 测试与内部构造用，不做非空校验（`submit` 时会再检查）
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            answers: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
