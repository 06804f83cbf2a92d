use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 已完成结果的默认保留时长：一周
const DEFAULT_RESULT_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 参考数据集路径
    pub dataset_path: String,
    /// 任务结束后结果的保留时长（秒）
    pub result_ttl_secs: u64,
    /// 过期任务清理间隔（秒）
    pub sweep_interval_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_path: "data/dataset.json".to_string(),
            result_ttl_secs: DEFAULT_RESULT_TTL_SECS,
            sweep_interval_secs: 60 * 60,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 先读取 `CRAB_CONFIG` 指向的 TOML 文件（如果有），再用环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("CRAB_CONFIG") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            dataset_path: std::env::var("DATASET_PATH").unwrap_or(self.dataset_path),
            result_ttl_secs: std::env::var("RESULT_TTL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.result_ttl_secs),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.sweep_interval_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
        }
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        // 间隔为 0 会让 tokio::time::interval panic
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
