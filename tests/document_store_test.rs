use dbfacade_lib::engine::nosql::{DocumentBody, DocumentBucket, FileCluster};
use dbfacade_lib::{DocumentStoreClient, FetchMode, StoreError};
use serde_json::{json, Value};
use std::path::Path;

fn body(v: Value) -> DocumentBody {
    match v {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn setup(dir: &Path) -> DocumentStoreClient {
    let cluster = FileCluster::create(dir, "Administrator", "password").unwrap();
    cluster.create_bucket("travel-sample").unwrap();
    let url = format!("file://{}", dir.display());
    DocumentStoreClient::connect(&url, "Administrator", "password", Some("travel-sample")).unwrap()
}

#[test]
fn test_update_requires_existing_document() {
    let dir = tempfile::tempdir().unwrap();
    let client = setup(dir.path());
    let doc = body(json!({"type": "airline", "name": "Jet"}));

    let err = client.update("airline_10", &doc).unwrap_err();
    assert!(err.is_not_found());

    client.upsert("airline_10", &doc).unwrap();
    assert_eq!(client.get_value("airline_10").unwrap(), doc);

    let changed = body(json!({"type": "airline", "name": "Jet Two"}));
    client.update("airline_10", &changed).unwrap();
    assert_eq!(client.get_value("airline_10").unwrap()["name"], json!("Jet Two"));
}

#[test]
fn test_insert_twice_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let client = setup(dir.path());
    let doc = body(json!({"city": "Paris"}));

    client.insert("hotel_1", &doc).unwrap();
    let err = client.insert("hotel_1", &doc).unwrap_err();
    assert!(err.is_conflict());

    // The original survives the failed insert
    assert_eq!(client.get_value("hotel_1").unwrap(), doc);
}

#[test]
fn test_delete_and_missing_documents() {
    let dir = tempfile::tempdir().unwrap();
    let client = setup(dir.path());

    assert!(client.delete("ghost").unwrap_err().is_not_found());
    assert!(client.get("ghost", FetchMode::Envelope).unwrap_err().is_not_found());

    client.upsert("route_1", &body(json!({"stops": 0}))).unwrap();
    let removed = client.delete("route_1").unwrap();
    assert_eq!(removed.id, "route_1");
    assert!(client.get_value("route_1").unwrap_err().is_not_found());
}

#[test]
fn test_upsert_replaces_whole_document() {
    let dir = tempfile::tempdir().unwrap();
    let client = setup(dir.path());

    let first = client.upsert("k", &body(json!({"a": 1, "b": 2}))).unwrap();
    let second = client.upsert("k", &body(json!({"c": 3}))).unwrap();
    assert_ne!(first.cas, second.cas);

    let envelope = client.get("k", FetchMode::Envelope).unwrap();
    assert_eq!(envelope.body(), &body(json!({"c": 3})));
    let meta = envelope.meta().unwrap();
    assert_eq!(meta.cas, second.cas);
    assert!(meta.modified_at >= meta.created_at);
}

#[test]
fn test_query_is_single_pass() {
    let dir = tempfile::tempdir().unwrap();
    let client = setup(dir.path());
    for i in 0..5 {
        client.insert(&format!("doc_{}", i), &body(json!({"i": i}))).unwrap();
    }

    let text = r#"{"filters": [{"field": "i", "op": {"lt": 3}}], "select": ["i"]}"#;
    let mut rows = client.query(text).unwrap();
    let first = rows.next().unwrap().unwrap();
    assert_eq!(first, json!({"i": 0}));
    assert_eq!(rows.by_ref().count(), 2);
    assert!(rows.next().is_none());

    // Re-running gives a fresh sequence
    assert_eq!(client.query_all(text).unwrap().len(), 3);
}

#[test]
fn test_malformed_query_is_query_error() {
    let dir = tempfile::tempdir().unwrap();
    let client = setup(dir.path());
    let err = client.query_all("SELECT * FROM `travel-sample`").unwrap_err();
    assert!(matches!(err, StoreError::Query(_)));
}

#[test]
fn test_connect_failures() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());
    let url = dir.path().to_str().unwrap();

    let bad_auth = DocumentStoreClient::connect(url, "Administrator", "wrong", None).err().unwrap();
    assert!(matches!(bad_auth, StoreError::Connection(_)));

    let bad_bucket = DocumentStoreClient::connect(url, "Administrator", "password", Some("nope"))
        .err()
        .unwrap();
    assert!(bad_bucket.is_not_found());

    // Empty bucket name means "do not open one"
    let client = DocumentStoreClient::connect(url, "Administrator", "password", Some("")).unwrap();
    assert!(matches!(client.active_collection(), Err(StoreError::NoActiveCollection)));
}

#[test]
fn test_active_collection_escape_hatch() {
    let dir = tempfile::tempdir().unwrap();
    let client = setup(dir.path());
    client.insert("x", &body(json!({"v": 1}))).unwrap();

    let bucket = client.active_collection().unwrap();
    assert_eq!(bucket.name(), "travel-sample");
    assert_eq!(bucket.list_ids().unwrap(), vec!["x"]);
    assert_eq!(bucket.get("x").unwrap().body["v"], json!(1));
}

#[test]
fn test_long_ids_keep_update_and_insert_contracts() {
    let dir = tempfile::tempdir().unwrap();
    let client = setup(dir.path());
    let id = "airline_".repeat(31) + "xx";
    assert_eq!(id.len(), 250);
    let doc = body(json!({"type": "airline"}));

    assert!(client.update(&id, &doc).unwrap_err().is_not_found());
    client.insert(&id, &doc).unwrap();
    assert!(client.insert(&id, &doc).unwrap_err().is_conflict());
    assert_eq!(client.get_value(&id).unwrap(), doc);

    let rows = client.query_all(r#"{"select": ["_id"]}"#).unwrap();
    assert_eq!(rows, vec![json!({"_id": id})]);
}
