use crab_eval::models::loaders::load_dataset;
use crab_eval::services::evaluator;
use crab_eval::{
    App, BleuEvaluator, Config, Evaluator, JobEvent, JobKind, JobOrchestrator, JobStatus, Notifier,
    ReferenceIndex, Submission,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const DATASET: &str = r#"{
    "entries": [
        {
            "metadata": {"id": "a", "repo": "apache/commons", "pr_number": 12},
            "comments": [
                {"body": "fix the bug in parser", "file": "Parser.java", "from_": 10, "to": 12,
                 "paraphrases": ["the parser has a bug, fix it"]}
            ]
        },
        {
            "metadata": {"id": "c", "repo": "apache/commons", "pr_number": 13},
            "comments": [{"body": "add a null check", "file": "Util.java", "from_": 3, "to": 3}]
        }
    ]
}"#;

/// 生命周期中的先后顺序
fn stage(status: JobStatus) -> u8 {
    match status {
        JobStatus::Queued => 0,
        JobStatus::Processing => 1,
        JobStatus::Complete | JobStatus::Failed => 2,
    }
}

fn write_dataset(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("dataset.json");
    std::fs::write(&path, DATASET).unwrap();
    path
}

#[tokio::test]
async fn test_end_to_end_from_files() {
    crab_eval::logger::init();

    let dir = tempfile::tempdir().unwrap();
    let dataset_path = write_dataset(dir.path());
    let submission_path = dir.path().join("answers.json");
    std::fs::write(
        &submission_path,
        r#"{"a": "fix the bug in parser", "b": "foo bar", "c": "unrelated text entirely"}"#,
    )
    .unwrap();

    let config = Config {
        dataset_path: dataset_path.display().to_string(),
        ..Default::default()
    };
    let app = App::initialize(config).await.unwrap();
    let snapshots = app
        .run(JobKind::CommentScoring, &[submission_path])
        .await
        .unwrap();

    assert_eq!(snapshots.len(), 1);
    let snapshot = &snapshots[0];
    assert_eq!(snapshot.state, JobStatus::Complete);
    assert_eq!(snapshot.skipped, Some(1));

    let results = snapshot.results.as_ref().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results["a"].max_score, 1.0);
    // 改写版本不计入参考文本
    assert_eq!(results["a"].per_reference_scores, vec![1.0]);
    assert_eq!(results["c"].max_score, 0.0);

    let exported = app
        .orchestrator()
        .export_results(&snapshot.job_id)
        .unwrap()
        .unwrap();
    assert_eq!(exported["type"], "comment");
    assert_eq!(
        exported["results"]["a"]["proposed_comment"],
        "fix the bug in parser"
    );
}

#[tokio::test]
async fn test_engine_progress_with_unknown_id() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = load_dataset(&write_dataset(dir.path())).await.unwrap();
    let index = ReferenceIndex::build(&dataset);

    let submission = Submission::from_json(r#"{"a": "hello world", "b": "foo bar"}"#).unwrap();
    let mut progress = Vec::new();
    let outcome = evaluator::run(&submission, &index, &mut |p| progress.push(p));

    assert_eq!(progress, vec![50, 100]);
    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.results.contains_key("a"));
}

#[tokio::test]
async fn test_pull_never_behind_push() {
    let index: ReferenceIndex = [("a", vec!["fix the bug in parser"])].into_iter().collect();
    let bleu: Arc<dyn Evaluator> = Arc::new(BleuEvaluator::new(Arc::new(index)));
    let orchestrator = JobOrchestrator::new(
        HashMap::from([(JobKind::CommentScoring, bleu)]),
        Arc::new(Notifier::new()),
        Duration::from_secs(60),
    );

    let submission: Submission = (0..50)
        .map(|i| (format!("id{i}"), "fix the bug in parser"))
        .chain([("a".to_string(), "fix the bug in parser")])
        .collect();

    let (token, mut rx) = orchestrator.notifier().connect();
    let job_id = orchestrator
        .submit(JobKind::CommentScoring, submission)
        .unwrap();
    orchestrator.subscribe(&token, &job_id).unwrap();
    orchestrator.start();

    let mut last_percent = 0;
    while let Some(message) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("推送超时")
    {
        let pulled = orchestrator.get_status(&job_id).unwrap();
        // 拉取到的状态不早于刚收到的推送
        assert!(stage(pulled.state) >= stage(message.event.status()));

        if let JobEvent::Progress { percent } = message.event {
            assert!(percent >= last_percent);
            last_percent = percent;
            if pulled.state == JobStatus::Processing {
                assert!(pulled.progress_percent.unwrap() >= percent);
            }
        }
        if message.event.status().is_terminal() {
            break;
        }
    }

    assert_eq!(last_percent, 100);
    let done = orchestrator.get_status(&job_id).unwrap();
    assert_eq!(done.results.unwrap().len(), 1);
}
