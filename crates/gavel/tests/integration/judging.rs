//! End-to-end judging scenarios against real sandbox containers

use std::time::Duration;

use chrono::Utc;
use gavel::{CaseOutcome, Judge, JudgeError, Submission};

use super::{fixture_source, test_config, write_case};

fn submission(language_id: u32, problem_id: u64, code: String) -> Submission {
    Submission {
        solution_id: 1,
        user_id: 1,
        problem_id,
        language_id,
        code,
        submitted_at: Utc::now(),
    }
}

#[tokio::test]
async fn correct_python_solution_passes() {
    let (config, root) = test_config("py-pass");
    write_case(&config.asset_root, 1, "case1.txt", "1 2\n", "3\n");

    let judge = Judge::new(config);
    let summary = judge
        .judge(&submission(1, 1, fixture_source("sum.py")))
        .await
        .expect("judging failed");

    assert_eq!(summary.total_cases, 1);
    assert_eq!(summary.correct_cases, 1);
    assert_eq!(summary.case_results[0].outcome, CaseOutcome::Passed);
    assert!(summary.case_results[0].execution_time > Duration::ZERO);

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn wrong_output_is_failed_and_siblings_unaffected() {
    let (config, root) = test_config("py-wrong");
    // The doubling program matches only the second expectation
    write_case(&config.asset_root, 2, "case1.txt", "3\n", "7\n");
    write_case(&config.asset_root, 2, "case2.txt", "3\n", "6\n");

    let judge = Judge::new(config);
    let summary = judge
        .judge(&submission(1, 2, fixture_source("double.py")))
        .await
        .expect("judging failed");

    assert_eq!(summary.total_cases, 2);
    assert_eq!(summary.incorrect_cases, 1);
    assert_eq!(summary.correct_cases, 1);
    assert_eq!(summary.case_results[0].outcome, CaseOutcome::Failed);
    assert_eq!(summary.case_results[1].outcome, CaseOutcome::Passed);

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn infinite_loop_is_time_limited() {
    let (config, root) = test_config("py-loop");
    write_case(&config.asset_root, 3, "case1.txt", "1\n", "1\n");

    let judge = Judge::new(config);
    let summary = judge
        .judge(&submission(1, 3, fixture_source("forever.py")))
        .await
        .expect("judging failed");

    assert_eq!(summary.time_limit_exceeded, 1);
    assert_eq!(
        summary.case_results[0].outcome,
        CaseOutcome::TimeLimitExceeded
    );
    // Measured time reflects the sandbox timeout, past the 2s threshold
    assert!(summary.case_results[0].execution_time > Duration::from_secs(2));

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn compile_failure_is_internal_error() {
    let (config, root) = test_config("cpp-bad");
    write_case(&config.asset_root, 4, "case1.txt", "1 2\n", "3\n");
    write_case(&config.asset_root, 4, "case2.txt", "4 5\n", "9\n");

    let judge = Judge::new(config);
    let summary = judge
        .judge(&submission(2, 4, fixture_source("broken.cpp")))
        .await
        .expect("judging failed");

    // Both cases completed independently despite the compiler error
    assert_eq!(summary.total_cases, 2);
    assert_eq!(summary.case_results.len(), 2);
    assert_eq!(summary.incorrect_cases, 2);
    for verdict in &summary.case_results {
        assert_eq!(verdict.outcome, CaseOutcome::InternalError);
    }

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn compiled_cpp_solution_passes() {
    let (config, root) = test_config("cpp-pass");
    write_case(&config.asset_root, 5, "case1.txt", "1 2\n", "3\n");

    let judge = Judge::new(config);
    let summary = judge
        .judge(&submission(2, 5, fixture_source("sum.cpp")))
        .await
        .expect("judging failed");

    assert_eq!(summary.correct_cases, 1);
    assert_eq!(summary.case_results[0].outcome, CaseOutcome::Passed);

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn escaped_newlines_in_submitted_code_are_restored() {
    let (config, root) = test_config("py-escaped");
    write_case(&config.asset_root, 6, "case1.txt", "1 2\n", "3\n");

    let code = "a, b = map(int, input().split())\\nprint(a + b)".to_string();

    let judge = Judge::new(config);
    let summary = judge
        .judge(&submission(1, 6, code))
        .await
        .expect("judging failed");

    assert_eq!(summary.correct_cases, 1);

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn deadline_expiry_kills_in_flight_sandboxes() {
    let (mut config, root) = test_config("deadline");
    for i in 0..5 {
        write_case(&config.asset_root, 7, &format!("case{i}.txt"), "1\n", "1\n");
    }
    config.submission_deadline = Some(1.0);

    let judge = Judge::new(config);
    let started = std::time::Instant::now();
    let result = judge
        .judge(&submission(1, 7, fixture_source("forever.py")))
        .await;

    assert!(matches!(result, Err(JudgeError::DeadlineExceeded)));
    assert!(started.elapsed() < Duration::from_secs(5));

    std::fs::remove_dir_all(&root).unwrap();
}
