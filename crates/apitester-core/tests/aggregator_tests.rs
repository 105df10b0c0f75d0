use std::sync::Arc;

use apitester_core::{
    AggregationError, AssertionOutcome, AssertionStatus, Broadcaster, CaseResult,
    CaseResultDocument, ChannelKey, FileStorage, ResultsAggregator, Storage, SuiteResultDocument,
    TestCase, TestSuite,
};
use tempfile::TempDir;

fn create_aggregator() -> (ResultsAggregator<FileStorage>, Arc<FileStorage>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let storage = Arc::new(FileStorage::new(temp_dir.path()));
    let aggregator = ResultsAggregator::new(storage.clone(), Arc::new(Broadcaster::new()));
    (aggregator, storage, temp_dir)
}

fn saved_suite(storage: &FileStorage, id: &str) -> TestSuite {
    let mut suite = TestSuite::new("agg").with_case(TestCase::new("t1", "https://example.test"));
    suite.id = id.to_string();
    storage.save_suite(&suite).unwrap();
    suite
}

fn result(case: &str, status: AssertionStatus) -> CaseResult {
    let mut result = CaseResult::request_failed(case, "");
    result.error = None;
    result.status = Some(200);
    result.result_set.push(AssertionOutcome {
        name: "$.a==1".to_string(),
        status,
        message: String::new(),
        duration: 0,
    });
    result
}

#[tokio::test]
async fn test_summary_requires_result_document() {
    let (aggregator, _storage, _temp) = create_aggregator();

    let err = aggregator
        .update_suite_summary("never-created", &result("t1", AssertionStatus::Passed))
        .await
        .unwrap_err();

    assert!(matches!(err, AggregationError::MissingResults(id) if id == "never-created"));
}

#[tokio::test]
async fn test_summary_replaces_entry() {
    let (aggregator, storage, _temp) = create_aggregator();
    saved_suite(&storage, "s1");

    aggregator
        .update_suite_summary("s1", &result("t1", AssertionStatus::Passed))
        .await
        .unwrap();
    let doc = aggregator
        .update_suite_summary("s1", &result("t1", AssertionStatus::Failed))
        .await
        .unwrap();

    assert_eq!(doc.results.len(), 1);
    assert_eq!(doc.results["t1"].passed, 0);
    assert_eq!(doc.results["t1"].failed, 1);
    assert_eq!(storage.load_suite_results("s1").unwrap(), doc);
}

#[tokio::test]
async fn test_history_is_created_lazily_and_appended() {
    let (aggregator, storage, _temp) = create_aggregator();
    saved_suite(&storage, "s1");

    let first = aggregator
        .append_case_history("s1", "t1", result("t1", AssertionStatus::Passed))
        .await
        .unwrap();
    assert_eq!(first.results.len(), 1);

    let second = aggregator
        .append_case_history("s1", "t1", result("t1", AssertionStatus::Failed))
        .await
        .unwrap();

    assert_eq!(second.test_case_id, "t1");
    assert_eq!(second.results.len(), 2);
    assert_eq!(second.results[0], first.results[0]);
    assert!(second.updated >= first.updated);
}

#[tokio::test]
async fn test_record_publishes_both_documents() {
    let (aggregator, storage, _temp) = create_aggregator();
    saved_suite(&storage, "s1");
    let mut suite_sub = aggregator.broadcaster().subscribe(ChannelKey::suite("s1")).await;
    let mut case_sub = aggregator.broadcaster().subscribe(ChannelKey::case("s1", "t1")).await;

    aggregator
        .record("s1", &result("t1", AssertionStatus::Passed))
        .await
        .unwrap();

    let suite_doc: SuiteResultDocument =
        serde_json::from_str(&suite_sub.recv().await.unwrap()).unwrap();
    assert_eq!(suite_doc.results["t1"].passed, 1);

    let case_doc: CaseResultDocument =
        serde_json::from_str(&case_sub.recv().await.unwrap()).unwrap();
    assert_eq!(case_doc.results.len(), 1);
}

#[tokio::test]
async fn test_record_without_summary_document_writes_nothing() {
    let (aggregator, storage, temp) = create_aggregator();

    let err = aggregator
        .record("orphan", &result("t1", AssertionStatus::Passed))
        .await
        .unwrap_err();

    assert!(matches!(err, AggregationError::MissingResults(_)));
    assert!(!temp.path().join("orphan").exists());
    assert!(storage.load_case_history("orphan", "t1").unwrap().results.is_empty());
}

#[tokio::test]
async fn test_record_after_delete_does_not_recreate_suite() {
    let (aggregator, storage, temp) = create_aggregator();
    saved_suite(&storage, "gone");
    storage.delete_suite("gone").unwrap();
    let mut updates = aggregator.broadcaster().subscribe(ChannelKey::case("gone", "t1")).await;

    let err = aggregator
        .record("gone", &result("t1", AssertionStatus::Passed))
        .await
        .unwrap_err();

    assert!(matches!(err, AggregationError::MissingResults(_)));
    assert!(!temp.path().join("gone").exists());
    assert!(updates.try_recv().is_none());
    assert!(storage.list_suites().unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_records_lose_nothing() {
    let (aggregator, storage, _temp) = create_aggregator();
    saved_suite(&storage, "s1");
    let aggregator = Arc::new(aggregator);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let aggregator = aggregator.clone();
        handles.push(tokio::spawn(async move {
            aggregator
                .record("s1", &result("t1", AssertionStatus::Passed))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(storage.load_case_history("s1", "t1").unwrap().results.len(), 10);
}
