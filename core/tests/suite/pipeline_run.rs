#![cfg(unix)]

use std::sync::Arc;

use assert_matches::assert_matches;
use covpilot_core::PipelineError;
use covpilot_core::pipeline::CommitStatus;
use covpilot_core::pipeline::PipelineOutcome;
use covpilot_core::pipeline::RunOptions;
use covpilot_core::progress::Step;
use covpilot_core::progress::StepStatus;
use covpilot_core::test_file::TestFileError;
use covpilot_synthesis::BackendError;
use covpilot_synthesis::SynthesisError;
use pretty_assertions::assert_eq;

use super::fixture::FakeVcs;
use super::fixture::GENERATED;
use super::fixture::Project;
use super::fixture::ScriptedBackend;

fn fenced(code: &str) -> String {
    format!("Here is the test:\n```java\n{code}\n```\n")
}

fn statuses(report: &covpilot_core::pipeline::PipelineReport) -> Vec<(Step, StepStatus)> {
    report
        .steps
        .iter()
        .map(|record| (record.step, record.status))
        .collect()
}

#[tokio::test]
async fn uncovered_method_gets_a_test_and_a_commit() {
    let project = Project::new(5);
    let backend = ScriptedBackend::replying(&fenced(GENERATED));
    let vcs = Arc::new(FakeVcs::default());

    let report = project.pipeline(backend.clone(), vcs.clone()).run().await;

    assert_eq!(report.exit_code(), 0, "{:?}", report.outcome);
    assert_eq!(
        statuses(&report),
        vec![
            (Step::Build, StepStatus::Ok),
            (Step::Select, StepStatus::Ok),
            (Step::Synthesize, StepStatus::Ok),
            (Step::Mutate, StepStatus::Ok),
            (Step::Verify, StepStatus::Ok),
            (Step::Commit, StepStatus::Ok),
        ]
    );
    assert_matches!(
        &report.outcome,
        Ok(PipelineOutcome::Completed { verified: true, commit: CommitStatus::Created, .. })
    );

    let test_file = std::fs::read_to_string(project.test_file()).unwrap();
    assert_eq!(
        test_file,
        "package com.example;\n\nimport org.junit.jupiter.api.Test;\n\npublic class FooTest {\n    @Test\n    void barReturnsFortyTwo() {\n        assertEquals(42, new Foo().bar());\n    }\n}\n"
    );

    let prompts = backend.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Class: Foo"));
    assert!(prompts[0].contains("Method: bar()I"));
    assert!(prompts[0].contains("public int bar() { return 42; }"));

    assert_eq!(
        vcs.calls(),
        vec![
            format!("add {}", project.config.codebase_root.display()),
            "commit Add test for Foo.bar()I".to_string(),
        ]
    );

    let history =
        std::fs::read_to_string(project.config.trend_log.as_ref().unwrap()).unwrap();
    assert!(history.starts_with("| Timestamp | Instruction | Branch | Note |"));
    assert!(history.contains("| 3/8 (37.50%) | 0/0 (0.00%) | before Foo.bar()I |"));
}

#[tokio::test]
async fn fully_covered_report_is_a_successful_no_op() {
    let project = Project::new(0);
    let backend = ScriptedBackend::replying(GENERATED);
    let vcs = Arc::new(FakeVcs::default());
    let before = std::fs::read_to_string(project.test_file()).unwrap();

    let report = project.pipeline(backend.clone(), vcs.clone()).run().await;

    assert_eq!(report.exit_code(), 0);
    assert_matches!(report.outcome, Ok(PipelineOutcome::NoGap));
    assert_eq!(
        statuses(&report),
        vec![(Step::Build, StepStatus::Ok), (Step::Select, StepStatus::Ok)]
    );
    assert_eq!(backend.calls(), 0);
    assert!(vcs.calls().is_empty());
    assert_eq!(std::fs::read_to_string(project.test_file()).unwrap(), before);
    let history =
        std::fs::read_to_string(project.config.trend_log.as_ref().unwrap()).unwrap();
    assert!(history.trim_end().ends_with("| no gap |"));
}

#[tokio::test]
async fn failing_build_is_fatal_and_keeps_output_tail() {
    let mut project = Project::new(5);
    project.config.build_command = "sh -c 'echo compiling; echo BUILD FAILURE >&2; exit 1'".to_string();
    let backend = ScriptedBackend::replying(GENERATED);

    let report = project
        .pipeline(backend.clone(), Arc::new(FakeVcs::default()))
        .run()
        .await;

    assert_eq!(report.exit_code(), 1);
    assert_eq!(statuses(&report), vec![(Step::Build, StepStatus::Failed)]);
    let err = report.outcome.unwrap_err();
    assert_eq!(err.output_tail(), Some("compiling\nBUILD FAILURE"));
    assert_matches!(err, PipelineError::BuildFailed { exit_code: Some(1), .. });
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn failing_verification_is_only_a_warning() {
    let mut project = Project::new(5);
    project.config.verify_command = "sh -c 'echo \"Tests run: 2, Failures: 1\"; exit 1'".to_string();
    let vcs = Arc::new(FakeVcs::default());

    let report = project
        .pipeline(ScriptedBackend::replying(GENERATED), vcs.clone())
        .run()
        .await;

    assert_eq!(report.exit_code(), 0);
    let verify = report.step(Step::Verify).unwrap();
    assert_eq!(verify.status, StepStatus::Warning);
    assert!(verify.detail.contains("Tests run: 2, Failures: 1"));
    assert_matches!(
        report.outcome,
        Ok(PipelineOutcome::Completed { verified: false, commit: CommitStatus::Created, .. })
    );
    assert_eq!(vcs.calls().len(), 2);
}

#[tokio::test]
async fn commit_failure_is_recorded_not_fatal() {
    let project = Project::new(5);

    let report = project
        .pipeline(ScriptedBackend::replying(GENERATED), FakeVcs::failing())
        .run()
        .await;

    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.step(Step::Commit).unwrap().status, StepStatus::Warning);
    assert_matches!(
        report.outcome,
        Ok(PipelineOutcome::Completed { commit: CommitStatus::Failed(detail), .. })
            if detail.contains("not a git repository")
    );
    assert!(
        std::fs::read_to_string(project.test_file())
            .unwrap()
            .contains("barReturnsFortyTwo")
    );
}

#[tokio::test]
async fn unwritable_trend_log_is_only_a_warning() {
    let mut project = Project::new(5);
    let history_dir = project.config.codebase_root.join("history-is-a-directory");
    std::fs::create_dir_all(&history_dir).unwrap();
    project.config.trend_log = Some(history_dir);
    let backend = ScriptedBackend::replying(&fenced(GENERATED));

    let report = project
        .pipeline(backend.clone(), Arc::new(FakeVcs::default()))
        .run()
        .await;

    assert_eq!(report.exit_code(), 0, "{:?}", report.outcome);
    let select = report.step(Step::Select).unwrap();
    assert_eq!(select.status, StepStatus::Warning);
    assert!(select.detail.starts_with("Foo.bar()I"), "{}", select.detail);
    assert!(select.detail.contains("coverage history not updated"));
    assert_eq!(backend.calls(), 1);
    assert_matches!(report.outcome, Ok(PipelineOutcome::Completed { .. }));
}

#[tokio::test]
async fn no_commit_option_skips_version_control() {
    let project = Project::new(5);
    let vcs = Arc::new(FakeVcs::default());

    let report = project
        .pipeline_with(
            ScriptedBackend::replying(GENERATED),
            vcs.clone(),
            RunOptions {
                no_commit: true,
                ..RunOptions::default()
            },
        )
        .run()
        .await;

    assert_eq!(report.step(Step::Commit).unwrap().status, StepStatus::Skipped);
    assert!(vcs.calls().is_empty());
}

#[tokio::test]
async fn dry_run_stops_after_selection() {
    let project = Project::new(5);
    let backend = ScriptedBackend::replying(GENERATED);

    let report = project
        .pipeline_with(
            backend.clone(),
            Arc::new(FakeVcs::default()),
            RunOptions {
                dry_run: true,
                ..RunOptions::default()
            },
        )
        .run()
        .await;

    assert_eq!(report.exit_code(), 0);
    assert_matches!(
        &report.outcome,
        Ok(PipelineOutcome::DryRun { gap, source_file })
            if gap.describe() == "Foo.bar()I" && source_file.ends_with("com/example/Foo.java")
    );
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn unavailable_backend_is_fatal_after_retries() {
    let project = Project::new(5);
    let backend = ScriptedBackend::failing(BackendError::Transient("503".to_string()));
    let before = std::fs::read_to_string(project.test_file()).unwrap();

    let report = project
        .pipeline(backend.clone(), Arc::new(FakeVcs::default()))
        .run()
        .await;

    assert_eq!(report.exit_code(), 1);
    assert_eq!(backend.calls(), 2);
    assert_eq!(report.step(Step::Synthesize).unwrap().status, StepStatus::Failed);
    assert_matches!(
        report.outcome,
        Err(PipelineError::Synthesis(SynthesisError::Unavailable { attempts: 2, .. }))
    );
    assert_eq!(std::fs::read_to_string(project.test_file()).unwrap(), before);
}

#[tokio::test]
async fn missing_test_file_is_fatal_unless_scaffolding() {
    let project = Project::new(5);
    std::fs::remove_file(project.test_file()).unwrap();

    let report = project
        .pipeline(
            ScriptedBackend::replying(GENERATED),
            Arc::new(FakeVcs::default()),
        )
        .run()
        .await;
    assert_eq!(report.exit_code(), 1);
    assert_matches!(
        report.outcome,
        Err(PipelineError::TestFile(TestFileError::TargetMissing { .. }))
    );
    assert!(!project.test_file().exists());

    let mut project = project;
    project.config.scaffold_missing = true;
    let report = project
        .pipeline(
            ScriptedBackend::replying(GENERATED),
            Arc::new(FakeVcs::default()),
        )
        .run()
        .await;
    assert_eq!(report.exit_code(), 0, "{:?}", report.outcome);
    let generated = project
        .config
        .test_dir()
        .join("com/example/FooGeneratedTest.java");
    let text = std::fs::read_to_string(generated).unwrap();
    assert!(text.starts_with("package com.example;"));
    assert!(text.contains("public class FooGeneratedTest {\n    @Test\n    void barReturnsFortyTwo()"));
}

#[tokio::test]
async fn missing_source_is_fatal() {
    let project = Project::new(5);
    std::fs::remove_file(project.config.source_dir().join("com/example/Foo.java")).unwrap();
    let backend = ScriptedBackend::replying(GENERATED);

    let report = project
        .pipeline(backend.clone(), Arc::new(FakeVcs::default()))
        .run()
        .await;

    assert_eq!(report.exit_code(), 1);
    assert_matches!(report.outcome, Err(PipelineError::SourceMissing { class, .. }) if class == "com.example.Foo");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn missing_report_is_fatal() {
    let project = Project::new(5);
    std::fs::remove_file(project.config.report_file()).unwrap();

    let report = project
        .pipeline(
            ScriptedBackend::replying(GENERATED),
            Arc::new(FakeVcs::default()),
        )
        .run()
        .await;

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.step(Step::Select).unwrap().status, StepStatus::Failed);
    assert_matches!(report.outcome, Err(PipelineError::Coverage(_)));
}
