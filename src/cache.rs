//! Persisted per-commit records, keyed by repository fingerprint.
//!
//! The stored entry is either extended by appending strictly newer commits
//! (the walker saves the extended list) or discarded wholesale: on schema
//! version mismatch, explicit clear, or a request the entry cannot serve.

use crate::error::Result;
use crate::model::{CacheEntry, CommitRecord, FileChange};
use chrono::{TimeZone, Utc};
use log::debug;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;

pub struct Cache {
    conn: Connection,
}

impl Cache {
    pub fn open<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)?;
        let db_path = cache_dir.as_ref().join("cache.db");
        let conn = Connection::open(&db_path)?;
        let cache = Self { conn };
        cache.initialize()?;
        Ok(cache)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entries (
                fingerprint TEXT PRIMARY KEY,
                version TEXT NOT NULL,
                last_sha TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS commits (
                fingerprint TEXT NOT NULL,
                seq INTEGER NOT NULL,
                sha TEXT NOT NULL,
                author_name TEXT NOT NULL,
                author_email TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                lines_added INTEGER NOT NULL,
                lines_deleted INTEGER NOT NULL,
                bytes_added INTEGER NOT NULL,
                bytes_deleted INTEGER NOT NULL,
                PRIMARY KEY (fingerprint, seq)
            );
            CREATE TABLE IF NOT EXISTS files (
                fingerprint TEXT NOT NULL,
                seq INTEGER NOT NULL,
                ordinal INTEGER NOT NULL,
                path TEXT NOT NULL,
                lines_added INTEGER NOT NULL,
                lines_deleted INTEGER NOT NULL,
                file_type TEXT NOT NULL,
                bytes_added INTEGER NOT NULL,
                bytes_deleted INTEGER NOT NULL,
                PRIMARY KEY (fingerprint, seq, ordinal)
            );
            ",
        )?;
        Ok(())
    }

    /// Returns the stored entry, or `None` when the fingerprint is unknown
    /// or the stored schema version does not match the caller's. A
    /// mismatched entry is discarded so the next save starts clean.
    pub fn load(&mut self, fingerprint: &str, version: &str) -> Result<Option<CacheEntry>> {
        let row = self.conn.query_row(
            "SELECT version, last_sha FROM entries WHERE fingerprint = ?",
            params![fingerprint],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        );
        let (stored_version, last_sha) = match row {
            Ok(pair) => pair,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if stored_version != version {
            debug!("cache version mismatch ({stored_version} != {version}), discarding entry");
            self.clear(fingerprint)?;
            return Ok(None);
        }
        let commits = self.load_commits(fingerprint)?;
        Ok(Some(CacheEntry {
            fingerprint: fingerprint.to_string(),
            version: stored_version,
            last_sha,
            commits,
        }))
    }

    fn load_commits(&self, fingerprint: &str) -> Result<Vec<CommitRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, sha, author_name, author_email, message, timestamp,
                    lines_added, lines_deleted, bytes_added, bytes_deleted
             FROM commits WHERE fingerprint = ? ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![fingerprint], |row| {
            let ts: i64 = row.get(5)?;
            let timestamp = Utc.timestamp_opt(ts, 0).single().ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(
                    5,
                    "timestamp".to_string(),
                    rusqlite::types::Type::Integer,
                )
            })?;
            Ok((
                row.get::<_, i64>(0)?,
                CommitRecord {
                    sha: row.get(1)?,
                    author_name: row.get(2)?,
                    author_email: row.get(3)?,
                    message: row.get(4)?,
                    timestamp,
                    lines_added: row.get::<_, i64>(6)? as u64,
                    lines_deleted: row.get::<_, i64>(7)? as u64,
                    bytes_added: row.get::<_, i64>(8)? as u64,
                    bytes_deleted: row.get::<_, i64>(9)? as u64,
                    files: Vec::new(),
                },
            ))
        })?;

        let mut commits: Vec<(i64, CommitRecord)> = Vec::new();
        for row in rows {
            commits.push(row?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT seq, path, lines_added, lines_deleted, file_type, bytes_added, bytes_deleted
             FROM files WHERE fingerprint = ? ORDER BY seq, ordinal",
        )?;
        let file_rows = stmt.query_map(params![fingerprint], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                FileChange {
                    path: row.get(1)?,
                    lines_added: row.get::<_, i64>(2)? as u64,
                    lines_deleted: row.get::<_, i64>(3)? as u64,
                    file_type: row.get(4)?,
                    bytes_added: row.get::<_, i64>(5)? as u64,
                    bytes_deleted: row.get::<_, i64>(6)? as u64,
                },
            ))
        })?;

        let mut files_by_seq: HashMap<i64, Vec<FileChange>> = HashMap::new();
        for row in file_rows {
            let (seq, file) = row?;
            files_by_seq.entry(seq).or_default().push(file);
        }

        Ok(commits
            .into_iter()
            .map(|(seq, mut record)| {
                if let Some(files) = files_by_seq.remove(&seq) {
                    record.files = files;
                }
                record
            })
            .collect())
    }

    /// Overwrites the stored entry for `fingerprint` with the full ordered
    /// commit list. Saving an empty list clears the entry.
    pub fn save(
        &mut self,
        fingerprint: &str,
        version: &str,
        commits: &[CommitRecord],
    ) -> Result<()> {
        let Some(last) = commits.last() else {
            return self.clear(fingerprint);
        };
        let last_sha = last.sha.clone();

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM files WHERE fingerprint = ?", params![fingerprint])?;
        tx.execute(
            "DELETE FROM commits WHERE fingerprint = ?",
            params![fingerprint],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO entries (fingerprint, version, last_sha) VALUES (?, ?, ?)",
            params![fingerprint, version, last_sha],
        )?;
        {
            let mut insert_commit = tx.prepare(
                "INSERT INTO commits (fingerprint, seq, sha, author_name, author_email, message,
                                      timestamp, lines_added, lines_deleted, bytes_added, bytes_deleted)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            let mut insert_file = tx.prepare(
                "INSERT INTO files (fingerprint, seq, ordinal, path, lines_added, lines_deleted,
                                    file_type, bytes_added, bytes_deleted)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for (seq, record) in commits.iter().enumerate() {
                insert_commit.execute(params![
                    fingerprint,
                    seq as i64,
                    record.sha,
                    record.author_name,
                    record.author_email,
                    record.message,
                    record.timestamp.timestamp(),
                    record.lines_added as i64,
                    record.lines_deleted as i64,
                    record.bytes_added as i64,
                    record.bytes_deleted as i64,
                ])?;
                for (ordinal, file) in record.files.iter().enumerate() {
                    insert_file.execute(params![
                        fingerprint,
                        seq as i64,
                        ordinal as i64,
                        file.path,
                        file.lines_added as i64,
                        file.lines_deleted as i64,
                        file.file_type,
                        file.bytes_added as i64,
                        file.bytes_deleted as i64,
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Deletes any stored entry for `fingerprint`.
    pub fn clear(&mut self, fingerprint: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM files WHERE fingerprint = ?", params![fingerprint])?;
        tx.execute(
            "DELETE FROM commits WHERE fingerprint = ?",
            params![fingerprint],
        )?;
        tx.execute(
            "DELETE FROM entries WHERE fingerprint = ?",
            params![fingerprint],
        )?;
        tx.commit()?;
        Ok(())
    }
}
