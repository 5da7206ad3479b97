//! Partition registry operations.
//!
//! A partition is a named, versioned bucket of entries for one resource
//! kind. The registry records kind and version explicitly so garbage
//! collection compares versions instead of matching substrings in names.

use std::fmt;
use std::str::FromStr;

use super::connection::CacheDb;
use crate::Error;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Logical resource kind a partition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    /// HTML documents, navigations and anything unclassified.
    Page,
    /// Scripts, stylesheets and fonts.
    Static,
    /// Bitmap and vector images.
    Image,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 3] = [PartitionKind::Page, PartitionKind::Static, PartitionKind::Image];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Page => "page",
            PartitionKind::Static => "static",
            PartitionKind::Image => "image",
        }
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" => Ok(PartitionKind::Page),
            "static" => Ok(PartitionKind::Static),
            "image" => Ok(PartitionKind::Image),
            other => Err(Error::CorruptEntry(format!("unknown partition kind: {other}"))),
        }
    }
}

/// A partition address: kind plus version tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionId {
    pub kind: PartitionKind,
    pub version: String,
}

impl PartitionId {
    pub fn new(kind: PartitionKind, version: impl Into<String>) -> Self {
        Self { kind, version: version.into() }
    }

    /// Physical partition name, e.g. `page-cache-v3`.
    pub fn name(&self) -> String {
        format!("{}-cache-{}", self.kind, self.version)
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-cache-{}", self.kind, self.version)
    }
}

/// A row of the partition registry.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionRecord {
    pub name: String,
    pub kind: PartitionKind,
    pub version: String,
    pub created_at: String,
    pub entry_count: u64,
}

impl CacheDb {
    /// Create the partition if it does not exist yet.
    ///
    /// Returns true when the partition was created by this call.
    pub async fn open_partition(&self, id: &PartitionId) -> Result<bool, Error> {
        let name = id.name();
        let kind = id.kind.as_str();
        let version = id.version.clone();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, kind, version, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![name, kind, version, created_at],
                )?;
                Ok(inserted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a partition with this physical name exists.
    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List the physical names of every partition, sorted.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// List every partition with its entry count.
    pub async fn list_partitions(&self) -> Result<Vec<PartitionRecord>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, p.kind, p.version, p.created_at,
                        (SELECT COUNT(*) FROM entries e WHERE e.partition = p.name)
                    FROM partitions p ORDER BY p.name",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(name, kind, version, created_at, count)| {
                        Ok(PartitionRecord { name, kind: kind.parse()?, version, created_at, entry_count: count as u64 })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if no partition had this name.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
