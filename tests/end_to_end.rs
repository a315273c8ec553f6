use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tasksend::config::Config;
use tasksend::error::PrepareError;
use tasksend::pacer::{DrainOutcome, StopReason};
use tasksend::shutdown::Shutdown;
use tasksend::{results, runner, stub};
use tokio::net::TcpListener;

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tasksend-e2e-{}-{}", std::process::id(), name))
}

fn config(tasks_file: &Path, results_file: &Path, port: u16) -> Config {
    Config::parse(&format!(
        r#"
        [server]
        host = "127.0.0.1"
        port = {port}

        [tasks]
        file = '{tasks}'
        max_per_category = 3
        categories = ["Term"]

        [load]
        mean_qps = 10.0
        run_time_secs = 1.0
        progress_interval_ms = 200

        [output]
        results_file = '{results}'
        "#,
        tasks = tasks_file.display(),
        results = results_file.display(),
    ))
    .unwrap()
}

#[tokio::test]
async fn replays_tasks_against_stub_server() {
    let tasks_file = scratch_path("replay.tasks");
    let results_file = scratch_path("replay.bin");
    std::fs::write(
        &tasks_file,
        "# three terms\nTerm: united\nTerm: states\n\nTerm: america # comment\n",
    )
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(stub::serve(listener, 0.0));

    let report = runner::execute(&config(&tasks_file, &results_file, port), Shutdown::new())
        .await
        .unwrap();

    assert_eq!(report.stop, StopReason::BudgetExhausted);
    assert_eq!(report.drain, DrainOutcome::Completed);
    assert!(report.tasks_sent >= 3, "only {} tasks sent", report.tasks_sent);
    assert_eq!(report.results.len() as u64, report.tasks_sent);

    let expected: HashSet<&str> = ["Term: united", "Term: states", "Term: america"].into();
    let seen: HashSet<&str> = report.results.iter().map(|r| r.task.as_str()).collect();
    assert_eq!(seen, expected);

    let ids: HashSet<u64> = report.results.iter().map(|r| r.task_id).collect();
    assert_eq!(ids.len(), report.results.len());

    for pair in report.results.windows(2) {
        assert!(pair[0].start_offset_secs <= pair[1].start_offset_secs);
    }
    for result in &report.results {
        assert_eq!(result.queue_time_ms, 0.0);
        assert!(result.latency_ms >= 0.0 && result.latency_ms < 1_000.0);
    }

    let saved = results::load(&results_file).unwrap();
    assert_eq!(saved, report.results);

    std::fs::remove_file(&tasks_file).ok();
    std::fs::remove_file(&results_file).ok();
}

#[tokio::test]
async fn oversized_task_fails_before_connecting() {
    let tasks_file = scratch_path("oversized.tasks");
    let results_file = scratch_path("oversized.bin");
    std::fs::write(&tasks_file, format!("Term: ok\nTerm: {}\n", "x".repeat(100))).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let err = runner::execute(&config(&tasks_file, &results_file, port), Shutdown::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PrepareError>(),
        Some(PrepareError::TaskTooLong { line: 2, .. })
    ));

    let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(accepted.is_err(), "a connection was opened");
    assert!(!results_file.exists());

    std::fs::remove_file(&tasks_file).ok();
}
