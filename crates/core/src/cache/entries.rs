//! Entry operations within a partition.
//!
//! Provides match/put/delete/keys plus FIFO trimming. Every write assigns the
//! entry a fresh insertion sequence number; reads never touch it, so the
//! sequence order is the eviction order.

use super::connection::CacheStorage;
use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Identity of a cached request: method plus canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url: url.into() }
    }

    /// A GET request for `url`, the only method the controller caches.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn hash(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

/// A stored response: status, headers and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// A stored response together with its bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub method: String,
    pub url: String,
    pub seq: i64,
    pub stored_at: String,
    pub response: CachedResponse,
}

fn insert_entry(
    conn: &rusqlite::Connection, partition: &str, key: &RequestKey, response: &CachedResponse,
) -> Result<(), Error> {
    let headers_json =
        serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;

    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![partition, chrono::Utc::now().to_rfc3339()],
    )?;

    conn.execute(
        "INSERT INTO entries (partition, key_hash, method, url, seq, status, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(seq), 0) + 1 FROM entries), ?5, ?6, ?7, ?8)
        ON CONFLICT(partition, key_hash) DO UPDATE SET
            seq = excluded.seq,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            partition,
            key.hash(),
            &key.method,
            &key.url,
            response.status as i64,
            headers_json,
            &response.body,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn decode_headers(json: &str) -> Result<Vec<(String, String)>, Error> {
    serde_json::from_str(json).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))
}

impl CacheStorage {
    /// Store a response under `key`, replacing any existing entry.
    ///
    /// Opens the partition if needed. A replaced entry moves to the back of
    /// the eviction order.
    pub async fn put(&self, partition: &str, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = key.clone();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> { insert_entry(conn, &partition, &key, &response) })
            .await
            .map_err(Error::from)
    }

    /// Store several responses in one transaction, in the given order.
    ///
    /// Either every entry is written or none is.
    pub async fn put_all(&self, partition: &str, items: Vec<(RequestKey, CachedResponse)>) -> Result<usize, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                for (key, response) in &items {
                    insert_entry(&tx, &partition, key, response)?;
                }
                tx.commit()?;
                Ok(items.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` in a partition.
    ///
    /// Returns None on a miss, including when the partition does not exist.
    pub async fn match_entry(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        Ok(self.entry(partition, key).await?.map(|entry| entry.response))
    }

    /// Look up `key` in a partition, returning bookkeeping with the response.
    pub async fn entry(&self, partition: &str, key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        let partition = partition.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, seq, stored_at, status, headers_json, body
                    FROM entries WHERE partition = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![partition, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Vec<u8>>(6)?,
                    ))
                });

                match result {
                    Ok((method, url, seq, stored_at, status, headers_json, body)) => {
                        let status = u16::try_from(status)
                            .map_err(|_| Error::CorruptEntry(format!("status {status} out of range")))?;
                        Ok(Some(CacheEntry {
                            method,
                            url,
                            seq,
                            stored_at,
                            response: CachedResponse { status, headers: decode_headers(&headers_json)?, body },
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` in each partition in turn, returning the first hit.
    pub async fn match_any(&self, partitions: &[String], key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        for partition in partitions {
            if let Some(response) = self.match_entry(partition, key).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    /// Delete `key` from a partition. Returns false if it was not present.
    pub async fn delete_entry(&self, partition: &str, key: &RequestKey) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Request keys of a partition, oldest insertion first.
    pub async fn keys(&self, partition: &str) -> Result<Vec<RequestKey>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE partition = ?1 ORDER BY seq ASC")?;
                let keys = stmt
                    .query_map(params![partition], |row| {
                        Ok(RequestKey { method: row.get(0)?, url: row.get(1)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a partition.
    pub async fn entry_count(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the oldest-inserted entries until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim_partition(&self, partition: &str, max_entries: usize) -> Result<u64, Error> {
        let partition = partition.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash IN (
                    SELECT key_hash FROM entries WHERE partition = ?1 ORDER BY seq ASC LIMIT ?2
                )",
                    params![partition, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(any(test, feature = "test-util"))]
impl CacheStorage {
    /// Overwrite an entry's stored headers with data that does not decode,
    /// so later reads of it fail with `CorruptEntry`.
    ///
    /// Returns false if there was no such entry.
    pub async fn corrupt_entry(&self, partition: &str, key: &RequestKey) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let updated = conn.execute(
                    "UPDATE entries SET headers_json = '{not json' WHERE partition = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                )?;
                Ok(updated > 0)
            })
            .await
            .map_err(Error::from)
    }
}
