use eyre::Result;
use rusqlite::{params, Connection};
use time::OffsetDateTime;

use crate::models::AddressQuery;

pub const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode=WAL;
CREATE TABLE IF NOT EXISTS address_queries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL,
    created_at_unix INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_address_queries_address ON address_queries(address);
"#;

pub fn init(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(conn)
}

/// Record that an address was queried. Written before the report is
/// computed, so failed lookups still show up in the history.
pub fn record_query(conn: &Connection, address: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO address_queries (address, created_at_unix) VALUES (?, ?)",
        params![address, OffsetDateTime::now_utc().unix_timestamp()],
    )?;
    Ok(())
}

pub fn recent_queries(conn: &Connection, limit: u32) -> Result<Vec<AddressQuery>> {
    let mut stmt = conn.prepare(
        "SELECT id, address, created_at_unix FROM address_queries ORDER BY id DESC LIMIT ?",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(AddressQuery {
            id: row.get(0)?,
            address: row.get(1)?,
            created_at_unix: row.get(2)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
