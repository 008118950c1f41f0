use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;
use wa_relay::alias::AliasTable;
use wa_relay::types::SenderId;

#[test]
fn test_resolve_mapped_name() {
    let mut names = HashMap::new();
    names.insert("447700900000".to_string(), "Alice".to_string());
    let table = AliasTable::new(names);
    assert_eq!(table.resolve("447700900000"), "Alice");
}

#[test]
fn test_resolve_identity_fallback() {
    let mut names = HashMap::new();
    names.insert("447700900000".to_string(), "Alice".to_string());
    let table = AliasTable::new(names);
    assert_eq!(table.resolve("15550001111"), "15550001111");
    assert_eq!(table.resolve(""), "");
}

#[test]
fn test_resolve_by_sender_user_part() {
    let table =
        AliasTable::from_json_str(r#"{"senderNames": {"447700900000": "Alice"}}"#).unwrap();
    let sender = SenderId::new("447700900000:12@s.whatsapp.net");
    assert_eq!(table.resolve(sender.user()), "Alice");
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("numbers-to-names.json");
    fs::write(
        &path,
        r#"{"senderNames": {"447700900000": "Alice", "15550001111": "Bob"}}"#,
    )
    .unwrap();
    let table = AliasTable::load(&path);
    assert_eq!(table.len(), 2);
    assert_eq!(table.resolve("15550001111"), "Bob");
}

#[test]
fn test_load_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let table = AliasTable::load(&dir.path().join("absent.json"));
    assert!(table.is_empty());
    assert_eq!(table.resolve("447700900000"), "447700900000");
}

#[test]
fn test_load_malformed_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("numbers-to-names.json");
    fs::write(&path, "{ senderNames: nope").unwrap();
    let table = AliasTable::load(&path);
    assert!(table.is_empty());
}

#[test]
fn test_unrelated_keys_are_ignored() {
    let table = AliasTable::from_json_str(
        r#"{"senderNames": {"1": "One"}, "somethingElse": true}"#,
    )
    .unwrap();
    assert_eq!(table.len(), 1);
}
