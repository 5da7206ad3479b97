//! Stored response entries.
//!
//! An entry is an immutable snapshot of a successful response. It is only
//! ever replaced as a whole; there is no partial update.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use super::partitions::PartitionId;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// Original response headers in arrival order, names lowercased.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

/// Age of an entry according to its `Date` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAge {
    /// No `Date` header was stored.
    Undated,
    /// A `Date` header exists but could not be parsed.
    Unreadable,
    /// Time elapsed since the `Date` header. Negative under clock skew.
    Elapsed(chrono::Duration),
}

impl CachedEntry {
    /// First header value with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Parsed `Date` header (IMF-fixdate is a subset of RFC 2822).
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.header("date")
            .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> EntryAge {
        match (self.header("date"), self.date()) {
            (None, _) => EntryAge::Undated,
            (Some(_), None) => EntryAge::Unreadable,
            (Some(_), Some(date)) => EntryAge::Elapsed(now - date),
        }
    }
}

impl CacheDb {
    /// Look up the entry for a request identity in a partition.
    ///
    /// Returns None if the partition or the entry doesn't exist.
    pub async fn match_entry(&self, partition: &PartitionId, method: &str, url: &str) -> Result<Option<CachedEntry>, Error> {
        let name = partition.name();
        let key_hash = compute_request_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, status_text, headers_json, body, stored_at
                    FROM entries WHERE partition = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![name, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u16>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                match result {
                    Ok((method, url, status, status_text, headers_json, body, stored_at)) => Ok(Some(CachedEntry {
                        method,
                        url,
                        status,
                        status_text,
                        headers: serde_json::from_str(&headers_json)?,
                        body,
                        stored_at,
                    })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Store an entry, creating the partition if needed.
    ///
    /// Uses UPSERT semantics: an existing entry for the same request
    /// identity is replaced as a whole (last write wins).
    pub async fn put_entry(&self, partition: &PartitionId, entry: &CachedEntry) -> Result<(), Error> {
        let name = partition.name();
        let kind = partition.kind.as_str();
        let version = partition.version.clone();
        let key_hash = compute_request_key(&entry.method, &entry.url);
        let headers_json = serde_json::to_string(&entry.headers)?;
        let entry = entry.clone();
        let now = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, kind, version, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![name, kind, version, now],
                )?;
                tx.execute(
                    "INSERT INTO entries (partition, key_hash, method, url, status, status_text, headers_json, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(partition, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        name,
                        key_hash,
                        entry.method.to_ascii_uppercase(),
                        entry.url,
                        entry.status,
                        entry.status_text,
                        headers_json,
                        entry.body,
                        entry.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in a partition.
    pub async fn entry_count(&self, partition: &PartitionId) -> Result<u64, Error> {
        let name = partition.name();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs of every entry in a partition, sorted.
    pub async fn entry_urls(&self, partition: &PartitionId) -> Result<Vec<String>, Error> {
        let name = partition.name();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE partition = ?1 ORDER BY url")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
