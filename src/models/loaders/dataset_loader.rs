use crate::error::DatasetError;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 数据集文件的最小结构，只保留构建参考索引需要的字段
#[derive(Debug, Deserialize)]
pub struct DatasetFile {
    #[serde(default)]
    pub entries: Vec<DatasetEntry>,
}

#[derive(Debug, Deserialize)]
pub struct DatasetEntry {
    pub metadata: EntryMetadata,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
pub struct EntryMetadata {
    pub id: Option<String>,
}

/// 只读取评论正文；`file`、`paraphrases` 等字段不参与评分
#[derive(Debug, Deserialize)]
pub struct Comment {
    pub body: String,
}

impl DatasetEntry {
    /// 该条目的参考文本：每条评论的正文，按评论顺序
    pub fn reference_texts(&self) -> Vec<String> {
        self.comments.iter().map(|c| c.body.clone()).collect()
    }
}

pub fn parse_dataset(content: &str, path: &str) -> Result<DatasetFile, DatasetError> {
    serde_json::from_str(content).map_err(|source| DatasetError::ParseFailed {
        path: path.to_string(),
        source,
    })
}

/// 从 JSON 文件加载数据集
pub async fn load_dataset(path: &Path) -> Result<DatasetFile, DatasetError> {
    let path_str = path.display().to_string();
    tracing::info!("正在加载数据集: {}", path_str);

    let content = fs::read_to_string(path)
        .await
        .map_err(|source| DatasetError::ReadFailed {
            path: path_str.clone(),
            source,
        })?;

    let dataset = parse_dataset(&content, &path_str)?;
    tracing::info!("成功加载 {} 个条目", dataset.entries.len());
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "entries": [
            {
                "metadata": {"id": "e1", "repo": "a/b", "pr_number": 3},
                "comments": [
                    {"body": "rename this", "file": "A.java", "from_": 1, "to": 2,
                     "paraphrases": ["please rename", "use another name"]},
                    {"body": "add a test", "file": "B.java", "from_": 4, "to": 4}
                ]
            },
            {"metadata": {"repo": "c/d"}, "comments": []}
        ]
    }"#;

    #[test]
    fn test_reference_texts_order() {
        let dataset = parse_dataset(SAMPLE, "sample.json").unwrap();
        assert_eq!(dataset.entries.len(), 2);
        assert_eq!(
            dataset.entries[0].reference_texts(),
            vec!["rename this", "add a test"]
        );
        assert!(dataset.entries[1].metadata.id.is_none());
    }

    #[test]
    fn test_paraphrases_are_not_references() {
        let dataset = parse_dataset(
            r#"{"entries": [{"metadata": {"id": "p"}, "comments": [
                {"body": "fix the bug", "paraphrases": ["the bug should be fixed"]}
            ]}]}"#,
            "inline",
        )
        .unwrap();
        assert_eq!(dataset.entries[0].reference_texts(), vec!["fix the bug"]);
    }

    #[test]
    fn test_parse_error_carries_path() {
        let err = parse_dataset("{", "broken.json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let dataset = load_dataset(&path).await.unwrap();
        assert_eq!(dataset.entries[0].metadata.id.as_deref(), Some("e1"));

        let missing = load_dataset(&dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(DatasetError::ReadFailed { .. })));
    }
}
