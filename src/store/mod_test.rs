use super::*;
use serde::Deserialize;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Note {
    title: String,
}

// =============================================================================
// validate_key
// =============================================================================

#[test]
fn validate_key_accepts_email() {
    assert!(validate_key("a@x.com").is_ok());
}

#[test]
fn validate_key_accepts_random_id() {
    assert!(validate_key("abcDEF0123456789wxyz").is_ok());
}

#[test]
fn validate_key_rejects_empty() {
    assert!(matches!(validate_key(""), Err(StoreError::InvalidKey(_))));
}

#[test]
fn validate_key_rejects_traversal() {
    for id in [".", "..", "../users/a@x.com", "a/b", "a\\b", "..\\x"] {
        assert!(validate_key(id).is_err(), "expected {id:?} to be rejected");
    }
}

#[test]
fn validate_key_accepts_inner_double_dot() {
    assert!(validate_key("first..last@x.com").is_ok());
    assert!(validate_key("a..").is_ok());
}

#[test]
fn validate_key_rejects_control_chars() {
    assert!(validate_key("a\nb").is_err());
    assert!(validate_key("a\0b").is_err());
}

// =============================================================================
// Collection
// =============================================================================

#[test]
fn collection_names_are_directory_names() {
    let names: Vec<_> = Collection::ALL.iter().map(|c| c.as_str()).collect();
    assert_eq!(names, vec!["users", "tokens", "checks"]);
    assert_eq!(Collection::Checks.to_string(), "checks");
}

// =============================================================================
// typed helpers
// =============================================================================

#[tokio::test]
async fn find_maps_missing_to_none() {
    let store = MemoryStore::new();
    let found: Option<Note> = find(&store, Collection::Users, "nobody").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn insert_then_get_returns_record() {
    let store = MemoryStore::new();
    let note = Note { title: "hello".into() };
    insert(&store, Collection::Checks, "n1", &note).await.unwrap();

    let restored: Note = get(&store, Collection::Checks, "n1").await.unwrap();
    assert_eq!(restored, note);
}

#[tokio::test]
async fn get_with_wrong_shape_is_serde_error() {
    let store = MemoryStore::new();
    store
        .create(Collection::Checks, "n1", serde_json::json!({"other": 1}))
        .await
        .unwrap();

    let err = get::<Note>(&store, Collection::Checks, "n1").await.unwrap_err();
    assert!(matches!(err, StoreError::Serde(_)));
}

#[tokio::test]
async fn put_requires_existing_record() {
    let store = MemoryStore::new();
    let err = put(&store, Collection::Users, "ghost", &Note { title: "x".into() })
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
