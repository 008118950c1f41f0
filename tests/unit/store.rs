use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use wa_relay::store::{self, DbKind, DeviceRecord};

async fn temp_store() -> (TempDir, sqlx::AnyPool, DbKind) {
    let dir = TempDir::new().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("devices.sqlite").display()
    );
    let (pool, kind) = store::connect(&url).await.unwrap();
    (dir, pool, kind)
}

fn record(account: &str, jid: Option<&str>, ts: i64) -> DeviceRecord {
    DeviceRecord {
        account_id: account.to_string(),
        jid: jid.map(str::to_string),
        paired_at: Utc.timestamp_opt(ts, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_missing_device_is_none() {
    let (_dir, pool, kind) = temp_store().await;
    assert!(store::get_device(&pool, kind, "default")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_save_and_get_device() {
    let (_dir, pool, kind) = temp_store().await;
    let saved = record("default", Some("447700900000:3@s.whatsapp.net"), 1_700_000_000);
    store::save_device(&pool, kind, &saved).await.unwrap();

    let loaded = store::get_device(&pool, kind, "default")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, saved);
}

#[tokio::test]
async fn test_save_device_without_jid() {
    let (_dir, pool, kind) = temp_store().await;
    store::save_device(&pool, kind, &record("shop", None, 1_700_000_100))
        .await
        .unwrap();

    let loaded = store::get_device(&pool, kind, "shop").await.unwrap().unwrap();
    assert!(loaded.jid.is_none());
}

#[tokio::test]
async fn test_save_device_overwrites() {
    let (_dir, pool, kind) = temp_store().await;
    store::save_device(&pool, kind, &record("default", Some("old@s.whatsapp.net"), 1))
        .await
        .unwrap();
    store::save_device(&pool, kind, &record("default", Some("new@s.whatsapp.net"), 2))
        .await
        .unwrap();

    let loaded = store::get_device(&pool, kind, "default")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.jid.as_deref(), Some("new@s.whatsapp.net"));
    assert_eq!(loaded.paired_at.timestamp(), 2);
}

#[tokio::test]
async fn test_delete_device() {
    let (_dir, pool, kind) = temp_store().await;
    store::save_device(&pool, kind, &record("default", None, 1))
        .await
        .unwrap();

    assert!(store::delete_device(&pool, kind, "default").await.unwrap());
    assert!(!store::delete_device(&pool, kind, "default").await.unwrap());
    assert!(store::get_device(&pool, kind, "default")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_accounts_are_isolated() {
    let (_dir, pool, kind) = temp_store().await;
    store::save_device(&pool, kind, &record("a", Some("a@s.whatsapp.net"), 1))
        .await
        .unwrap();

    assert!(store::get_device(&pool, kind, "b").await.unwrap().is_none());
    assert!(!store::delete_device(&pool, kind, "b").await.unwrap());
    assert!(store::get_device(&pool, kind, "a").await.unwrap().is_some());
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("devices.sqlite").display()
    );
    let (pool, kind) = store::connect(&url).await.unwrap();
    store::save_device(&pool, kind, &record("default", None, 5))
        .await
        .unwrap();
    pool.close().await;

    let (pool, kind) = store::connect(&url).await.unwrap();
    assert!(store::get_device(&pool, kind, "default")
        .await
        .unwrap()
        .is_some());
}
