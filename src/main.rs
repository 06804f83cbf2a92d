use anyhow::Result;
use clap::{Parser, ValueEnum};
use crab_eval::{logger, App, Config, JobKind};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Comment,
    Refinement,
}

impl From<Kind> for JobKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Comment => JobKind::CommentScoring,
            Kind::Refinement => JobKind::RefinementScoring,
        }
    }
}

/// 对生成的评审意见或代码修改做 BLEU 评测
#[derive(Parser, Debug)]
#[command(name = "crab-eval", version)]
struct Cli {
    /// 提交类型
    #[arg(long, value_enum, default_value = "comment")]
    kind: Kind,

    /// 参考数据集路径（覆盖配置）
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// 提交文件（JSON：id → 文本）
    #[arg(required = true)]
    submissions: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::load()?;
    if let Some(dataset) = cli.dataset {
        config.dataset_path = dataset.display().to_string();
    }

    // 初始化日志
    logger::init_with_verbose(config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    let snapshots = app.run(cli.kind.into(), &cli.submissions).await?;

    for snapshot in &snapshots {
        if let Some(exported) = app.orchestrator().export_results(&snapshot.job_id)? {
            println!("{}", serde_json::to_string_pretty(&exported)?);
        }
    }

    Ok(())
}
