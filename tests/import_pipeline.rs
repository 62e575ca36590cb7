//! End-to-end import pipeline tests against the in-memory store

use jindex::config::EngineConfig;
use jindex::embedding::{HashVectorProvider, UnavailableProvider};
use jindex::mapping::{shard_count_for, IndexConfigGenerator, MappingOptions};
use jindex::schema::{FieldType, SchemaAnalyzer};
use jindex::staging::StagedFile;
use jindex::store::InMemoryStore;
use jindex::task::{TaskCoordinator, TaskState};
use jindex::types::{ErrorStrategy, ImportMode, ImportParams};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

fn stage(dir: &tempfile::TempDir, content: &str) -> StagedFile {
    let path = dir.path().join(format!("{}.json", uuid::Uuid::new_v4()));
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "{}", content).unwrap();
    StagedFile::new(path)
}

fn stage_products(dir: &tempfile::TempDir, n: usize) -> StagedFile {
    let records: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            json!({
                "id": format!("p{}", i),
                "title": format!("商品 {}", i),
                "price": 10.5 + i as f64,
                "in_stock": i % 2 == 0,
                "created": "2024-03-15",
            })
        })
        .collect();
    stage(dir, &serde_json::to_string(&records).unwrap())
}

fn engine_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.bulk.retry_base_delay_ms = 1;
    config.bulk.inter_chunk_delay_ms = 0;
    config
}

fn coordinator(store: Arc<InMemoryStore>) -> TaskCoordinator {
    TaskCoordinator::new(
        store.clone(),
        store,
        Arc::new(UnavailableProvider),
        engine_config(),
    )
}

// ==== analysis through mapping ====

#[test]
fn analysis_drives_typed_mappings_end_to_end() {
    let records: Vec<jindex::types::Record> = (0..5)
        .map(|i| {
            json!({
                "id": format!("p{}", i),
                "title": "纯中文标题",
                "price": 9.99,
                "count": i,
                "created": "2024-03-15",
                "contact": "a@example.com",
            })
            .as_object()
            .unwrap()
            .clone()
        })
        .collect();

    let analysis = SchemaAnalyzer::new(engine_config().analysis).analyze(&records);
    assert_eq!(analysis.fields["price"].inferred_type, FieldType::Float);
    assert_eq!(analysis.fields["count"].inferred_type, FieldType::Integer);
    assert_eq!(analysis.fields["created"].inferred_type, FieldType::Date);
    assert_eq!(analysis.fields["contact"].inferred_type, FieldType::Email);
    assert_eq!(analysis.recommended_id_field.as_deref(), Some("id"));

    let config = IndexConfigGenerator::default().generate("shop", &analysis);
    assert!(config.validate());
    assert_eq!(config.index_name, "space_shop");
    // Fully-Chinese title gets phonetic subfields, the email field does not
    let title = &config.field_mappings["title"];
    assert!(title.subfields.contains_key("pinyin"));
    assert!(title.subfields.contains_key("initials"));
    assert!(!config.field_mappings["contact"].subfields.contains_key("pinyin"));
    // Dataset of 5 records stays at one shard
    assert_eq!(config.settings.shards, 1);
}

#[test]
fn shard_policy_matches_boundaries() {
    for (total, expected) in [
        (9_999usize, 1u32),
        (10_000, 2),
        (99_999, 2),
        (100_000, 3),
        (999_999, 3),
        (1_000_000, 5),
    ] {
        assert_eq!(shard_count_for(total), expected, "total {}", total);
    }
}

// ==== full pipeline ====

#[test]
fn import_completes_and_documents_carry_system_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let coordinator = coordinator(store.clone());

    let task = coordinator.start_blocking(
        "shop",
        stage_products(&dir, 30),
        ImportParams::with_batch_size(10),
    );

    assert_eq!(task.state, TaskState::Completed);
    assert_eq!(task.success_count, 30);
    assert_eq!(task.current_batch, 3);
    assert_eq!(task.total_batches, 3);

    let docs = store.documents("space_shop");
    assert_eq!(docs.len(), 30);
    for doc in docs {
        assert_eq!(doc["_space_id"], "shop");
        assert!(doc["_doc_id"].is_string());
        assert!(doc["_imported_at"].is_string());
        assert_eq!(doc["_schema_version"], 1);
    }
}

#[test]
fn append_accumulates_and_replace_rebuilds() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let coordinator = coordinator(store.clone());

    let append = |c: &TaskCoordinator, dir: &tempfile::TempDir| {
        c.start_blocking("shop", stage_products(dir, 10), ImportParams::default())
    };

    assert_eq!(append(&coordinator, &dir).state, TaskState::Completed);
    assert_eq!(append(&coordinator, &dir).state, TaskState::Completed);
    assert_eq!(store.doc_count("space_shop"), 20);

    let params = ImportParams {
        mode: ImportMode::Replace,
        ..ImportParams::default()
    };
    let task = coordinator.start_blocking("shop", stage_products(&dir, 10), params);
    assert_eq!(task.state, TaskState::Completed);
    assert_eq!(store.doc_count("space_shop"), 10);
}

#[test]
fn vectors_flow_into_documents_when_provider_available() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let coordinator = TaskCoordinator::new(
        store.clone(),
        store.clone(),
        Arc::new(HashVectorProvider::new(16)),
        engine_config(),
    );

    let task = coordinator.start_blocking("shop", stage_products(&dir, 5), ImportParams::default());
    assert_eq!(task.state, TaskState::Completed);

    let docs = store.documents("space_shop");
    assert!(docs.iter().all(|d| {
        d["title_vector"]
            .as_array()
            .is_some_and(|v| v.len() == 16)
    }));
}

// ==== error strategies ====

#[test]
fn skip_error_completes_with_full_accounting() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new().with_doc_failure_every(10));
    let coordinator = coordinator(store);

    let params = ImportParams {
        batch_size: 10,
        error_strategy: ErrorStrategy::SkipError,
        ..ImportParams::default()
    };
    let task = coordinator.start_blocking("shop", stage_products(&dir, 100), params);

    assert_eq!(task.state, TaskState::Completed);
    assert_eq!(task.success_count + task.error_count, 100);
    assert!(task.error_count > 0);
    assert!(task.error_details.len() <= 20);
}

#[test]
fn stop_on_error_fails_at_first_bad_batch() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new().with_doc_failure_every(10));
    let coordinator = coordinator(store);

    let params = ImportParams {
        batch_size: 10,
        error_strategy: ErrorStrategy::StopOnError,
        ..ImportParams::default()
    };
    let task = coordinator.start_blocking("shop", stage_products(&dir, 100), params);

    assert_eq!(task.state, TaskState::Failed);
    assert_eq!(task.processed_records, 10);
    assert!(task.result_summary.unwrap().contains("batch 1"));
}

#[test]
fn throttled_writes_recover_transparently() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        InMemoryStore::new()
            .with_scripted_errors(vec!["429 too_many_requests", "circuit_breaking_exception"]),
    );
    let coordinator = coordinator(store.clone());

    let task = coordinator.start_blocking("shop", stage_products(&dir, 5), ImportParams::default());
    assert_eq!(task.state, TaskState::Completed);
    assert_eq!(task.success_count, 5);
    assert_eq!(store.write_attempts(), 3);
}

// ==== cancellation ====

#[tokio::test]
async fn cancellation_wins_and_keeps_committed_batches() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        InMemoryStore::new().with_write_delay(std::time::Duration::from_millis(20)),
    );
    let coordinator = Arc::new(coordinator(store.clone()));

    let task = coordinator.start(
        "shop",
        stage_products(&dir, 200),
        ImportParams::with_batch_size(10),
    );
    tokio::time::sleep(std::time::Duration::from_millis(60)).await;
    assert!(coordinator.cancel(&task.task_id));
    // A second cancel of a now-terminal task is refused
    assert!(!coordinator.cancel(&task.task_id));

    let mut status = coordinator.status(&task.task_id).unwrap();
    for _ in 0..200 {
        if status.state.is_terminal() && status.end_time.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        status = coordinator.status(&task.task_id).unwrap();
    }

    assert_eq!(status.state, TaskState::Cancelled);
    assert!(status.processed_records < 200);
    assert_eq!(status.processed_records % 10, 0);
    assert_eq!(store.doc_count("space_shop"), status.processed_records);
}

// ==== staged input shapes ====

#[test]
fn wrapped_and_bare_object_inputs_import() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let coordinator = coordinator(store.clone());

    let wrapped = stage(&dir, r#"{"meta": 1, "items": [{"a": "x"}, {"a": "y"}]}"#);
    let task = coordinator.start_blocking("wrapped", wrapped, ImportParams::default());
    assert_eq!(task.state, TaskState::Completed);
    assert_eq!(store.doc_count("space_wrapped"), 2);

    let bare = stage(&dir, r#"{"a": "only"}"#);
    let task = coordinator.start_blocking("bare", bare, ImportParams::default());
    assert_eq!(task.state, TaskState::Completed);
    assert_eq!(store.doc_count("space_bare"), 1);
}

#[test]
fn scalar_input_fails_with_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(Arc::new(InMemoryStore::new()));

    let task = coordinator.start_blocking("bad", stage(&dir, "42"), ImportParams::default());
    assert_eq!(task.state, TaskState::Failed);
    assert!(task.result_summary.unwrap().contains("validation"));
}

// ==== oversized batches ====

#[test]
fn oversized_batches_are_sub_chunked() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new());

    let mut config = engine_config();
    config.bulk.max_payload_bytes = 12_000;
    let coordinator = TaskCoordinator::new(
        store.clone(),
        store.clone(),
        Arc::new(UnavailableProvider),
        config,
    );

    let big = "x".repeat(400);
    let records: Vec<serde_json::Value> = (0..40)
        .map(|i| json!({"id": format!("d{}", i), "body": big.clone()}))
        .collect();
    let staged = stage(&dir, &serde_json::to_string(&records).unwrap());

    let task = coordinator.start_blocking("big", staged, ImportParams::with_batch_size(40));
    assert_eq!(task.state, TaskState::Completed);
    assert_eq!(task.success_count, 40);
    assert_eq!(store.doc_count("space_big"), 40);
    // One outer batch, multiple sub-chunk writes
    assert_eq!(task.total_batches, 1);
    assert!(store.write_attempts() >= 2);
}
