//! 参考索引 - 业务能力层
//!
//! 启动时构建一次，之后只读，通过 `Arc` 在 worker 间共享，不需要加锁。

use crate::models::loaders::{load_dataset, DatasetFile};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// id → 参考文本列表
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    references: HashMap<String, Vec<String>>,
}

impl ReferenceIndex {
    /// 从已解析的数据集构建
    pub fn build(dataset: &DatasetFile) -> Self {
        let mut references = HashMap::with_capacity(dataset.entries.len());
        let mut without_id = 0usize;

        for entry in &dataset.entries {
            match &entry.metadata.id {
                Some(id) => {
                    references.insert(id.clone(), entry.reference_texts());
                }
                None => without_id += 1,
            }
        }

        if without_id > 0 {
            warn!("⚠️ 有 {} 个条目缺少 id，已忽略", without_id);
        }
        info!("✓ 参考索引构建完成，共 {} 个 id", references.len());

        Self { references }
    }

    /// 从数据集文件构建
    pub async fn from_dataset_file(path: &Path) -> Result<Self> {
        let dataset = load_dataset(path)
            .await
            .with_context(|| format!("无法构建参考索引: {}", path.display()))?;
        Ok(Self::build(&dataset))
    }

    /// 查询某个 id 的参考文本；不存在时返回 None（这不是错误）
    pub fn lookup(&self, id: &str) -> Option<&[String]> {
        self.references.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ReferenceIndex
where
    K: Into<String>,
    V: IntoIterator,
    V::Item: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            references: iter
                .into_iter()
                .map(|(id, refs)| (id.into(), refs.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loaders::dataset_loader::parse_dataset;

    #[test]
    fn test_build_and_lookup() {
        let dataset = parse_dataset(
            r#"{"entries": [
                {"metadata": {"id": "1"}, "comments": [{"body": "use a constant"}]},
                {"metadata": {}, "comments": [{"body": "orphan"}]}
            ]}"#,
            "inline",
        )
        .unwrap();

        let index = ReferenceIndex::build(&dataset);
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("1").unwrap(), ["use a constant".to_string()]);
        assert!(index.lookup("2").is_none());
    }

    #[test]
    fn test_from_dataset_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(
            &path,
            r#"{"entries": [{"metadata": {"id": "7"}, "comments": [{"body": "b", "paraphrases": ["p"]}]}]}"#,
        )
        .unwrap();

        let index = tokio_test::block_on(ReferenceIndex::from_dataset_file(&path));
        let index = tokio_test::assert_ok!(index);
        assert_eq!(index.lookup("7").unwrap(), ["b".to_string()]);

        let missing = tokio_test::block_on(ReferenceIndex::from_dataset_file(
            &dir.path().join("missing.json"),
        ));
        assert!(format!("{:#}", missing.unwrap_err()).contains("missing.json"));
    }

    #[test]
    fn test_from_iter() {
        let index: ReferenceIndex = [("a", vec!["x y", "z"])].into_iter().collect();
        assert_eq!(index.lookup("a").map(|r| r.len()), Some(2));
        assert!(!index.is_empty());
    }
}
