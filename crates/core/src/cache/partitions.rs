//! Partition lifecycle: open, list, delete.

use super::connection::CacheStorage;
use crate::Error;
use tokio_rusqlite::params;

impl CacheStorage {
    /// Open a partition by name, creating it if it does not exist yet.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a partition has been opened.
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

    /// List every partition name, oldest first.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if the partition did not exist.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE partition = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage.open_partition("portfolio-static-v1.1.0").await.unwrap();
        storage.open_partition("portfolio-static-v1.1.0").await.unwrap();

        let names = storage.partition_names().await.unwrap();
        assert_eq!(names, vec!["portfolio-static-v1.1.0".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_partition() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage.open_partition("portfolio-v1.0.0-dynamic").await.unwrap();
        storage.open_partition("portfolio-dynamic-v1.1.0").await.unwrap();

        assert!(storage.delete_partition("portfolio-v1.0.0-dynamic").await.unwrap());
        assert!(!storage.delete_partition("portfolio-v1.0.0-dynamic").await.unwrap());

        assert!(!storage.has_partition("portfolio-v1.0.0-dynamic").await.unwrap());
        assert!(storage.has_partition("portfolio-dynamic-v1.1.0").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_partition() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        assert!(!storage.has_partition("nope").await.unwrap());
        assert!(storage.partition_names().await.unwrap().is_empty());
    }
}
