use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 提交相关错误
    #[error("提交错误: {0}")]
    Submit(#[from] SubmitError),
    /// 状态查询错误
    #[error("查询错误: {0}")]
    Status(#[from] StatusError),
    /// 评测过程错误
    #[error("评测错误: {0}")]
    Evaluation(#[from] EvaluationError),
    /// 推送通道错误
    #[error("推送错误: {0}")]
    Notifier(#[from] NotifierError),
    /// 数据集加载错误
    #[error("数据集错误: {0}")]
    Dataset(#[from] DatasetError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 提交错误，同步返回给调用方，不会创建任务
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// 空提交或格式不正确
    #[error("无效的提交: {0}")]
    InvalidSubmission(String),
}

/// 状态查询错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    /// 任务不存在（或已过期被清理）
    #[error("任务不存在: {job_id}")]
    NotFound { job_id: String },
}

/// 评测错误，只影响单个任务
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// 评测器内部失败
    #[error("评测失败: {0}")]
    Failure(String),
    /// 评测线程 panic
    #[error("评测线程异常退出: {0}")]
    Panicked(String),
    /// 没有为该任务类型注册评测器
    #[error("未注册评测器: {kind}")]
    NoEvaluator { kind: String },
}

/// 推送通道错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifierError {
    /// 连接未注册或已断开
    #[error("连接不存在: {token}")]
    UnknownConnection { token: String },
}

/// 数据集加载错误
#[derive(Debug, Error)]
pub enum DatasetError {
    /// 读取文件失败
    #[error("读取数据集失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("解析数据集失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建任务不存在错误
    pub fn job_not_found(job_id: impl Into<String>) -> Self {
        AppError::Status(StatusError::NotFound {
            job_id: job_id.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
