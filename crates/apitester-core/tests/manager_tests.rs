mod common;

use std::sync::Arc;
use std::time::Duration;

use apitester_core::{
    ChannelKey, FileStorage, ManagerError, RunnerConfig, StorageConfig, SuiteManager,
    SuiteResultDocument, TestCase, TestSuite,
};
use common::{json_response, ScriptedTransport};
use tempfile::TempDir;

const URL: &str = "https://example.test/json";

fn create_test_manager(
    transport: ScriptedTransport,
) -> (SuiteManager<FileStorage>, Arc<ScriptedTransport>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileStorage::with_config(StorageConfig::rooted_at(temp_dir.path()));
    let transport = Arc::new(transport);
    let manager = SuiteManager::new(storage, transport.clone(), &RunnerConfig::default());
    (manager, transport, temp_dir)
}

fn people_suite() -> TestSuite {
    TestSuite::new("people").with_case(
        TestCase::new("t1", "https://example.test")
            .with_path("/json")
            .with_assertion("$.firstName==john"),
    )
}

#[test]
fn test_create_suite() {
    let (manager, _, _temp) = create_test_manager(ScriptedTransport::new());

    let suite = manager.create_suite(people_suite()).unwrap();

    assert!(!suite.id.is_empty());
    assert_eq!(manager.get_suite(&suite.id).unwrap(), suite);
    assert!(manager.get_results(&suite.id).unwrap().results.is_empty());
}

#[test]
fn test_create_rejects_duplicate_names() {
    let (manager, _, _temp) = create_test_manager(ScriptedTransport::new());
    let suite = people_suite().with_case(TestCase::new("t1", "https://other.test"));

    let err = manager.create_suite(suite).unwrap_err();

    assert!(err.is_invalid());
}

#[test]
fn test_replace_suite_keeps_path_id() {
    let (manager, _, _temp) = create_test_manager(ScriptedTransport::new());
    let created = manager.create_suite(people_suite()).unwrap();

    let mut replacement = TestSuite::new("renamed");
    replacement.id = "ignored".to_string();
    let replaced = manager.replace_suite(&created.id, replacement).unwrap();

    assert_eq!(replaced.id, created.id);
    assert_eq!(manager.get_suite(&created.id).unwrap().name, "renamed");
}

#[test]
fn test_list_suites() {
    let (manager, _, _temp) = create_test_manager(ScriptedTransport::new());

    manager.create_suite(TestSuite::new("b")).unwrap();
    manager.create_suite(TestSuite::new("a")).unwrap();

    let names: Vec<_> = manager.list_suites().unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn test_delete_suite() {
    let (manager, _, _temp) = create_test_manager(ScriptedTransport::new());
    let suite = manager.create_suite(people_suite()).unwrap();

    manager.delete_suite(&suite.id).await.unwrap();

    assert!(manager.get_suite(&suite.id).unwrap_err().is_not_found());
    assert!(manager.get_results(&suite.id).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_summary_follows_latest_run() {
    let transport = ScriptedTransport::new().respond(URL, json_response(r#"{"firstName":"John"}"#));
    let (manager, transport, _temp) = create_test_manager(transport);
    let suite = manager.create_suite(people_suite()).unwrap();

    let run = manager.run_suite(&suite.id).await.unwrap();
    assert!(run.is_success());
    assert_eq!(manager.get_results(&suite.id).unwrap().results["t1"].passed, 1);

    transport.set(URL, json_response(r#"{"firstName":"Jane"}"#));
    manager.run_suite(&suite.id).await.unwrap();

    let summary = &manager.get_results(&suite.id).unwrap().results["t1"];
    assert_eq!((summary.tests, summary.passed, summary.failed), (1, 0, 1));
}

#[tokio::test]
async fn test_rerun_grows_history_by_one() {
    let transport = ScriptedTransport::new().respond(URL, json_response(r#"{"firstName":"John"}"#));
    let (manager, _, _temp) = create_test_manager(transport);
    let suite = manager.create_suite(people_suite()).unwrap();

    manager.run_suite(&suite.id).await.unwrap();
    let first = manager.get_results(&suite.id).unwrap();
    manager.run_suite(&suite.id).await.unwrap();
    let second = manager.get_results(&suite.id).unwrap();

    let counts = |doc: &SuiteResultDocument| {
        let s = &doc.results["t1"];
        (s.tests, s.passed, s.failed)
    };
    assert_eq!(counts(&first), counts(&second));
    assert!(second.updated >= first.updated);
    assert_eq!(manager.get_case_history(&suite.id, "t1").unwrap().results.len(), 2);
}

#[tokio::test]
async fn test_subscribers_see_cases_in_suite_order() {
    let transport = ScriptedTransport::new()
        .respond("https://a.test", json_response("{}"))
        .respond("https://b.test", json_response("{}"))
        .respond("https://c.test", json_response("{}"));
    let (manager, _, _temp) = create_test_manager(transport);
    let mut suite = TestSuite::new("ordered");
    for name in ["a", "b", "c"] {
        suite.tests.push(TestCase::new(name, format!("https://{name}.test")));
    }
    let suite = manager.create_suite(suite).unwrap();
    let mut updates = manager.subscribe(ChannelKey::suite(&suite.id)).await;

    manager.run_suite(&suite.id).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let doc: SuiteResultDocument = serde_json::from_str(&updates.recv().await.unwrap()).unwrap();
        seen.push(doc.results.len());
    }
    assert_eq!(seen, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_run_unknown_suite() {
    let (manager, _, _temp) = create_test_manager(ScriptedTransport::new());

    let err = manager.run_suite("missing").await.unwrap_err();

    assert!(matches!(err, ManagerError::Storage(_)));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_record_external_result() {
    let (manager, _, _temp) = create_test_manager(ScriptedTransport::new());
    let suite = manager.create_suite(people_suite()).unwrap();
    let result = apitester_core::CaseResult::request_failed("t1", "proxy timeout");

    manager.record_external_result(&suite.id, result).await.unwrap();

    let history = manager.get_case_history(&suite.id, "t1").unwrap();
    assert_eq!(history.results.len(), 1);
    assert_eq!(history.results[0].error.as_deref(), Some("proxy timeout"));

    let err = manager
        .record_external_result("missing", apitester_core::CaseResult::request_failed("t1", "x"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_case_history_of_unknown_suite() {
    let (manager, _, _temp) = create_test_manager(ScriptedTransport::new());
    assert!(manager.get_case_history("missing", "t1").unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_abandoned_run_is_released() {
    let transport = ScriptedTransport::new().hang(URL);
    let (manager, _, _temp) = create_test_manager(transport);
    let suite = manager.create_suite(people_suite()).unwrap();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), manager.run_suite(&suite.id)).await;

    assert!(abandoned.is_err());
    assert!(!manager.is_running(&suite.id));
    assert!(!manager.cancel_run(&suite.id));
}

#[test]
fn test_cancel_without_run() {
    let (manager, _, _temp) = create_test_manager(ScriptedTransport::new());
    assert!(!manager.cancel_run("idle"));
}
