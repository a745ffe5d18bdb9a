//! Integration tests for the public API

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use blueprint::prelude::*;
use blueprint::{
    decode, encode, ChartPatch, DataPoint, GenerationPatch, GenerationStatus, Role, Series,
    SessionMessage,
};
use serde_json::json;

/// Backend whose writes can be switched off to simulate a full disk
#[derive(Default)]
struct FlakyStorage {
    inner: MemoryStorage,
    failing: AtomicBool,
}

impl FlakyStorage {
    fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl StorageBackend for FlakyStorage {
    fn get_item(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.inner.get_item(name)
    }

    fn set_item(&self, name: &str, value: &str) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::storage("quota exceeded"));
        }
        self.inner.set_item(name, value)
    }

    fn remove_item(&self, name: &str) -> Result<(), StoreError> {
        self.inner.remove_item(name)
    }
}

fn api_doc(id: &str, title: &str) -> Document {
    Document::new(
        id,
        title,
        DocumentContent::ApiSpec {
            base_path: "/v1".to_string(),
            endpoints: Vec::new(),
        },
    )
}

#[test]
fn test_add_then_get() {
    let mut hub = blueprint::open_memory_hub();
    let doc = api_doc("a", "Orders");
    hub.assets.add(doc.clone());
    assert_eq!(hub.assets.get::<Document>("a"), Some(&doc));
}

#[test]
fn test_add_is_idempotent() {
    let mut hub = blueprint::open_memory_hub();
    let chart = Chart::new("c", "Latency", ChartKind::Line);
    hub.charts.add(chart.clone());
    let once = hub.charts.collection::<Chart>().clone();
    hub.charts.add(chart);
    assert_eq!(hub.charts.collection::<Chart>(), &once);
    assert_eq!(once.len(), 1);
}

#[test]
fn test_update_missing_key_changes_nothing() {
    let mut hub = blueprint::open_memory_hub();
    hub.charts.add(Chart::new("c", "Latency", ChartKind::Line));
    let before = hub.charts.collection::<Chart>().clone();

    let applied = hub.charts.update::<Chart, _>(
        "nonexistent",
        ChartPatch {
            title: Some("x".to_string()),
            ..Default::default()
        },
    );
    assert!(!applied);
    assert_eq!(hub.charts.collection::<Chart>(), &before);
}

#[test]
fn test_partial_update_keeps_omitted_fields() {
    let mut hub = blueprint::open_memory_hub();
    let mut doc = api_doc("a", "Orders");
    doc.description = "Order handling".to_string();
    doc.tags = vec!["billing".to_string()];
    hub.assets.add(doc);

    let patch = JsonPatch::from_value(json!({"title": "Orders v2"})).unwrap();
    assert!(hub.assets.update::<Document, _>("a", patch));

    let updated = hub.assets.get::<Document>("a").unwrap();
    assert_eq!(updated.title, "Orders v2");
    assert_eq!(updated.description, "Order handling");
    assert_eq!(updated.tags, vec!["billing".to_string()]);
    assert_eq!(updated.kind(), DocumentKind::ApiSpec);
}

#[test]
fn test_json_patch_cannot_break_a_record() {
    let mut hub = blueprint::open_memory_hub();
    hub.assets.add(api_doc("a", "Orders"));

    // Wrong type for a field and a key change are both rejected
    let bad_type = JsonPatch::from_value(json!({"title": 42})).unwrap();
    assert!(!hub.assets.update::<Document, _>("a", bad_type));
    let new_key = JsonPatch::from_value(json!({"id": "b"})).unwrap();
    let err = hub
        .assets
        .try_update::<Document, _>("a", new_key)
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidPatch { .. }));

    let doc = hub.assets.get::<Document>("a").unwrap();
    assert_eq!(doc.title, "Orders");
    assert!(hub.assets.get::<Document>("b").is_none());
}

#[test]
fn test_removing_selected_record_clears_selection() {
    let mut hub = blueprint::open_memory_hub();
    let doc = api_doc("a", "Orders");
    hub.assets.add(doc.clone());
    hub.assets.set_current(Some(&doc));
    assert_eq!(hub.assets.current_key::<Document>(), Some("a"));

    let removed = hub.assets.remove::<Document>("a");
    assert_eq!(removed, Some(doc));
    assert_eq!(hub.assets.state().current_document, None);
}

#[test]
fn test_removing_other_record_keeps_selection() {
    let mut hub = blueprint::open_memory_hub();
    let a = api_doc("a", "Orders");
    hub.assets.add(a.clone());
    hub.assets.add(api_doc("b", "Billing"));
    hub.assets.set_current(Some(&a));

    hub.assets.remove::<Document>("b");
    assert_eq!(hub.assets.current::<Document>(), Some(&a));
}

#[test]
fn test_corrupted_snapshot_opens_empty() {
    let storage = MemoryStorage::new();
    storage
        .set_item("blueprint-core-assets", "{not valid json")
        .unwrap();

    let hub = StoreHub::with_backend(Arc::new(storage));
    assert!(hub.assets.collection::<Document>().is_empty());
    assert!(hub.assets.collection::<Model>().is_empty());
    assert!(hub.recovered_on_open(StoreKind::Assets));
    assert!(!hub.recovered_on_open(StoreKind::Charts));
}

#[test]
fn test_malformed_collection_decodes_empty_but_keeps_scalars() {
    let storage = MemoryStorage::new();
    storage
        .set_item(
            "blueprint-user-customization",
            r#"{"state": {"templates": {"oops": true}, "theme": "dark"}, "version": 0}"#,
        )
        .unwrap();

    let hub = StoreHub::with_backend(Arc::new(storage));
    assert!(hub.customization.collection::<Template>().is_empty());
    assert_eq!(hub.customization.state().theme, Theme::Dark);
    assert!(!hub.recovered_on_open(StoreKind::Customization));
}

#[test]
fn test_failed_writes_keep_memory_state() {
    let storage = Arc::new(FlakyStorage::default());
    let mut hub = StoreHub::with_backend(storage.clone());

    storage.fail_writes(true);
    hub.charts.add(Chart::new("c", "Latency", ChartKind::Line));
    hub.charts.add(Chart::new("d", "Errors", ChartKind::Bar));

    assert_eq!(hub.charts.collection::<Chart>().len(), 2);
    assert_eq!(hub.persist_failures(StoreKind::Charts), 2);
    assert_eq!(hub.persist_failures(StoreKind::Assets), 0);
    assert_eq!(storage.get_item("blueprint-chart-engine").unwrap(), None);

    // The next successful write carries the whole state
    storage.fail_writes(false);
    hub.charts.add(Chart::new("e", "Saturation", ChartKind::Pie));
    let reopened = StoreHub::with_backend(storage.clone());
    assert_eq!(reopened.charts.collection::<Chart>().len(), 3);
}

#[test]
fn test_non_finite_chart_value_does_not_wipe_persisted_charts() {
    let storage = MemoryStorage::new();
    {
        let mut hub = StoreHub::with_backend(Arc::new(storage.clone()));
        hub.charts.add(Chart::new("a", "Latency", ChartKind::Line));

        let mut broken = Chart::new("b", "Errors", ChartKind::Bar);
        broken.series.push(Series {
            name: "5xx".to_string(),
            points: vec![DataPoint {
                label: "mon".to_string(),
                value: f64::NAN,
            }],
        });
        hub.charts.add(broken);

        assert_eq!(hub.charts.collection::<Chart>().len(), 2);
        assert_eq!(hub.persist_failures(StoreKind::Charts), 1);
    }

    // The last readable snapshot is kept
    let hub = StoreHub::with_backend(Arc::new(storage));
    assert!(!hub.recovered_on_open(StoreKind::Charts));
    let charts = hub.charts.collection::<Chart>();
    assert_eq!(charts.len(), 1);
    assert!(charts.get("a").is_some());
}

#[test]
fn test_state_survives_reopen_in_memory() {
    let storage = MemoryStorage::new();
    {
        let mut hub = StoreHub::with_backend(Arc::new(storage.clone()));
        hub.initialize();
        hub.documents
            .add(Generation::pending("g-1", DocumentKind::Deployment, "staging"));
        hub.documents
            .update::<Generation, _>("g-1", GenerationPatch::completed("doc-1"));
        hub.sessions.add(ProtocolSession::open("s-1", "openapi"));
        hub.sessions
            .append_message("s-1", SessionMessage::new(Role::User, "add a health check"));
        hub.customization.set_locale("fr");
    }

    let hub = StoreHub::with_backend(Arc::new(storage));
    let job = hub.documents.get::<Generation>("g-1").unwrap();
    assert_eq!(job.status, GenerationStatus::Completed);
    assert_eq!(job.document_id.as_deref(), Some("doc-1"));
    assert_eq!(
        hub.sessions.get::<ProtocolSession>("s-1").unwrap().messages.len(),
        1
    );
    assert_eq!(hub.customization.state().locale, "fr");
    assert_eq!(hub.count(CollectionKind::Schemas), 5);
}

#[test]
fn test_state_survives_reopen_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let doc = api_doc("a", "Orders");
    {
        let mut hub = blueprint::open_file_hub(dir.path()).unwrap();
        hub.assets.add(doc.clone());
        hub.assets.set_current(Some(&doc));
    }

    let hub = blueprint::open_file_hub(dir.path()).unwrap();
    assert_eq!(hub.assets.current::<Document>(), Some(&doc));
}

#[test]
fn test_initialize_registers_builtin_schemas() {
    let mut hub = blueprint::open_memory_hub();
    hub.initialize();

    for kind in DocumentKind::ALL {
        let schema = hub.documents.schema_for(kind).unwrap();
        assert!(schema.builtin);
    }
    assert_eq!(hub.documents.collection::<DocumentSchema>().len(), 5);
}

#[test]
fn test_hubs_with_different_prefixes_are_isolated() {
    let storage = MemoryStorage::new();
    let mut first = StoreHub::open(Arc::new(storage.clone()), &HubConfig::new("one"));
    let second = StoreHub::open(Arc::new(storage.clone()), &HubConfig::new("two"));

    first.charts.add(Chart::new("c", "Latency", ChartKind::Line));
    let second_reopened = StoreHub::open(Arc::new(storage.clone()), second.config());
    assert!(second_reopened.charts.collection::<Chart>().is_empty());
    assert_eq!(storage.names(), vec!["one-chart-engine".to_string()]);
}

#[test]
fn test_codec_malformed_inputs() {
    for raw in [
        json!(null),
        json!({"a": 1}),
        json!("documents"),
        json!([1, 2, 3]),
        json!([["a"]]),
    ] {
        let collection: Collection<Chart> = decode(&raw);
        assert!(collection.is_empty(), "expected empty for {}", raw);
    }
}

#[test]
fn test_codec_round_trip_with_domain_records() {
    let charts: Collection<Chart> = [
        Chart::new("b", "Errors", ChartKind::Bar),
        Chart::new("a", "Latency", ChartKind::Line),
    ]
    .into_iter()
    .collect();

    let encoded = encode(&charts);
    assert_eq!(encoded[0][0], "a");
    assert_eq!(encoded[1][0], "b");
    assert_eq!(decode::<Chart>(&encoded), charts);
}
