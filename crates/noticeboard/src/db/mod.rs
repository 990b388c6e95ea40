//! Database access.

mod migrations;

use anyhow::Result;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

pub use migrations::run_migrations;

/// Database connection wrapper.
pub struct Db(pub Mutex<Connection>);

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self(Mutex::new(conn)))
    }

    pub fn run_migrations(&self) -> Result<()> {
        run_migrations(&self.0.lock().unwrap())
    }
}

/// Insert or refresh a subscription by endpoint. The row id is stable across
/// refreshes of the same endpoint; at most one row exists per endpoint.
pub fn upsert_subscription(
    conn: &Connection,
    endpoint: &str,
    p256dh: &str,
    auth: &str,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = now_iso8601();
    conn.execute(
        "INSERT INTO subscriptions (id, endpoint, p256dh, auth, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(endpoint) DO UPDATE SET
             p256dh = excluded.p256dh,
             auth = excluded.auth,
             updated_at = excluded.updated_at",
        params![id.to_string(), endpoint, p256dh, auth, now],
    )?;
    let stored: String = conn.query_row(
        "SELECT id FROM subscriptions WHERE endpoint = ?1",
        [endpoint],
        |row| row.get(0),
    )?;
    Ok(Uuid::parse_str(&stored)?)
}

/// List every current subscription: (id, endpoint, p256dh, auth).
pub fn list_subscriptions(conn: &Connection) -> Result<Vec<(Uuid, String, String, String)>> {
    let mut stmt = conn.prepare("SELECT id, endpoint, p256dh, auth FROM subscriptions")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
        ))
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Delete one subscription. An absent row is not an error: concurrent
/// broadcasts may race to prune the same dead endpoint.
pub fn delete_subscription(conn: &Connection, id: Uuid) -> Result<bool> {
    let rows = conn.execute("DELETE FROM subscriptions WHERE id = ?1", [id.to_string()])?;
    Ok(rows > 0)
}

/// Append a message, stamping creation time.
pub fn insert_message(conn: &Connection, content: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = now_iso8601();
    conn.execute(
        "INSERT INTO messages (id, content, created_at) VALUES (?1, ?2, ?3)",
        params![id.to_string(), content, now],
    )?;
    Ok(id)
}

/// Most recent message: (id, content, created_at). Timestamps have second
/// precision, so insertion order breaks same-second ties.
pub fn latest_message(conn: &Connection) -> Result<Option<(Uuid, String, String)>> {
    let row = conn.query_row(
        "SELECT id, content, created_at FROM messages
         ORDER BY created_at DESC, rowid DESC
         LIMIT 1",
        [],
        |row| {
            Ok((
                Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                row.get(1)?,
                row.get(2)?,
            ))
        },
    );
    match row {
        Ok(r) => Ok(Some(r)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn now_iso8601() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
