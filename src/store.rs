use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{AnyPool, Row};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Sqlite,
    Postgres,
}

pub fn db_kind_from_url(url: &str) -> DbKind {
    let lower = url.to_lowercase();
    if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
        DbKind::Postgres
    } else {
        DbKind::Sqlite
    }
}

pub fn rewrite_sql<'a>(sql: &'a str, kind: DbKind) -> Cow<'a, str> {
    match kind {
        DbKind::Sqlite => Cow::Borrowed(sql),
        DbKind::Postgres => {
            let mut out = String::with_capacity(sql.len() + 8);
            let mut idx = 1;
            for ch in sql.chars() {
                if ch == '?' {
                    out.push('$');
                    out.push_str(&idx.to_string());
                    idx += 1;
                } else {
                    out.push(ch);
                }
            }
            Cow::Owned(out)
        }
    }
}

/// Paired device for one account. Presence means the sidecar holds usable
/// session material and the bridge can connect without pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub account_id: String,
    pub jid: Option<String>,
    pub paired_at: DateTime<Utc>,
}

fn i64_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}

pub async fn connect(url: &str) -> Result<(AnyPool, DbKind)> {
    sqlx::any::install_default_drivers();
    let kind = db_kind_from_url(url);
    let pool = AnyPool::connect(url).await?;
    init_db(&pool, kind).await?;
    Ok((pool, kind))
}

pub async fn init_db(pool: &AnyPool, kind: DbKind) -> Result<()> {
    let stmt = r#"CREATE TABLE IF NOT EXISTS devices (
            account_id TEXT PRIMARY KEY,
            jid TEXT,
            paired_at BIGINT NOT NULL
        )"#;
    let sql = rewrite_sql(stmt, kind);
    sqlx::query(sql.as_ref()).execute(pool).await?;
    Ok(())
}

pub async fn get_device(
    pool: &AnyPool,
    kind: DbKind,
    account_id: &str,
) -> Result<Option<DeviceRecord>> {
    let sql = rewrite_sql(
        "SELECT account_id, jid, paired_at FROM devices WHERE account_id = ?",
        kind,
    );
    let row = sqlx::query(sql.as_ref())
        .bind(account_id)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    Ok(Some(DeviceRecord {
        account_id: row.try_get("account_id")?,
        jid: row.try_get("jid")?,
        paired_at: i64_to_datetime(row.try_get("paired_at")?),
    }))
}

pub async fn save_device(pool: &AnyPool, kind: DbKind, record: &DeviceRecord) -> Result<()> {
    let sql = rewrite_sql(
        r#"INSERT INTO devices (account_id, jid, paired_at) VALUES (?, ?, ?)
        ON CONFLICT(account_id) DO UPDATE SET
            jid=excluded.jid,
            paired_at=excluded.paired_at"#,
        kind,
    );
    sqlx::query(sql.as_ref())
        .bind(&record.account_id)
        .bind(record.jid.as_deref())
        .bind(record.paired_at.timestamp())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_device(pool: &AnyPool, kind: DbKind, account_id: &str) -> Result<bool> {
    let sql = rewrite_sql("DELETE FROM devices WHERE account_id = ?", kind);
    let result = sqlx::query(sql.as_ref())
        .bind(account_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
