//! SQLite backend of the media index.

use anyhow::Context;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use super::schema::SCHEMA;
use super::{ChangeSubscription, MatchTrashed, MediaIndex, ObserverRegistry, QueryArgs, ResultSet};
use crate::error::{MediaIndexError, Result};
use crate::models::{Collection, ContentUri, MediaType};
use crate::query::{columns, Value};

/// A file to add to the index.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub path: String,
    pub bucket_display_name: Option<String>,
    pub media_type: MediaType,
    pub mime_type: String,
    /// Epoch seconds.
    pub date_added: i64,
    /// Epoch seconds.
    pub date_modified: i64,
    pub orientation: i32,
}

pub struct SqliteMediaIndex {
    conn: Mutex<Connection>,
    observers: ObserverRegistry,
    atomic_trash_toggle: bool,
}

impl SqliteMediaIndex {
    /// Open (or create) the index file.
    ///
    /// With `atomic_trash_toggle` the index hides trashed rows by default and
    /// honours [`MatchTrashed`]; without it every row is visible and trash
    /// visibility is left to selection predicates.
    pub fn open(path: &Path, atomic_trash_toggle: bool) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create index directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open media index at {}", path.display()))?;
        Self::with_connection(conn, atomic_trash_toggle)
    }

    pub fn open_in_memory(atomic_trash_toggle: bool) -> anyhow::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, atomic_trash_toggle)
    }

    fn with_connection(conn: Connection, atomic_trash_toggle: bool) -> anyhow::Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize media index schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
            observers: ObserverRegistry::new(),
            atomic_trash_toggle,
        })
    }

    pub fn supports_atomic_trash_toggle(&self) -> bool {
        self.atomic_trash_toggle
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a file, or refresh its metadata if the path is already indexed.
    /// Returns the row id.
    pub fn insert(&self, media: &NewMedia) -> Result<i64> {
        let directory = Path::new(&media.path)
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let id = {
            let conn = self.conn();
            conn.execute(
                r#"
                INSERT INTO files (_data, bucket_id, bucket_display_name, media_type, mime_type,
                                   date_added, date_modified, orientation)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(_data) DO UPDATE SET
                    media_type = excluded.media_type,
                    mime_type = excluded.mime_type,
                    date_modified = excluded.date_modified,
                    orientation = excluded.orientation
                "#,
                rusqlite::params![
                    media.path,
                    bucket_id_for(&directory),
                    media.bucket_display_name,
                    media.media_type.index_value(),
                    media.mime_type,
                    media.date_added,
                    media.date_modified,
                    media.orientation,
                ],
            )?;
            conn.query_row(
                "SELECT _id FROM files WHERE _data = ?",
                [&media.path],
                |row| row.get::<_, i64>(0),
            )?
        };
        let uri = ContentUri::with_appended_id(media.media_type.collection(), id);
        tracing::debug!(uri = %uri, path = %media.path, "Indexed file");
        self.observers.notify(&uri);
        Ok(id)
    }

    pub fn contains_path(&self, path: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM files WHERE _data = ?",
            [path],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Remove rows under `directory` whose path is not in `present`.
    /// Returns the number of rows removed.
    pub fn remove_missing(&self, directory: &Path, present: &HashSet<String>) -> Result<usize> {
        let stale: Vec<(i64, i64, String)> = {
            let conn = self.conn();
            let mut stmt = conn.prepare("SELECT _id, media_type, _data FROM files")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<rusqlite::Result<Vec<(i64, i64, String)>>>()?;
            rows.into_iter()
                .filter(|(_, _, path)| {
                    Path::new(path).starts_with(directory) && !present.contains(path)
                })
                .collect()
        };

        let mut removed = 0;
        for (id, media_type, path) in stale {
            let changed = self
                .conn()
                .execute("DELETE FROM files WHERE _id = ?", [id])?;
            if changed == 0 {
                continue;
            }
            removed += changed;
            let collection = MediaType::from_index_value(media_type)
                .map(|t| t.collection())
                .unwrap_or(Collection::Files);
            let uri = ContentUri::with_appended_id(collection, id);
            tracing::debug!(uri = %uri, path = %path, "Removed missing file");
            self.observers.notify(&uri);
        }
        Ok(removed)
    }

    /// Number of live change observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn trash_clause(&self, match_trashed: Option<MatchTrashed>) -> Option<&'static str> {
        if !self.atomic_trash_toggle {
            return None;
        }
        match match_trashed.unwrap_or(MatchTrashed::Exclude) {
            MatchTrashed::Include => None,
            MatchTrashed::Exclude => Some("is_trashed = 0"),
            MatchTrashed::Only => Some("is_trashed = 1"),
        }
    }

    /// WHERE clause restricting rows to `uri`, with its parameters.
    fn where_clause(
        &self,
        uri: &ContentUri,
        selection: Option<(&str, &[Value])>,
        match_trashed: Option<MatchTrashed>,
    ) -> (String, Vec<SqlValue>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        match uri.collection_kind() {
            Collection::Files => {}
            Collection::Images => {
                clauses.push(format!("{} = {}", columns::MEDIA_TYPE, MediaType::INDEX_IMAGE));
            }
            Collection::Videos => {
                clauses.push(format!("{} = {}", columns::MEDIA_TYPE, MediaType::INDEX_VIDEO));
            }
        }
        if let Some(id) = uri.id() {
            clauses.push(format!("{} = ?", columns::ID));
            params.push(SqlValue::Integer(id));
        }
        if let Some((clause, args)) = selection {
            clauses.push(format!("({})", clause));
            params.extend(args.iter().map(to_sql_value));
        }
        if let Some(clause) = self.trash_clause(match_trashed) {
            clauses.push(clause.to_string());
        }

        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), params)
        }
    }
}

impl MediaIndex for SqliteMediaIndex {
    fn query(&self, uri: &ContentUri, args: &QueryArgs) -> Result<Option<ResultSet>> {
        let projection = if args.projection.is_empty() {
            "*".to_string()
        } else {
            args.projection.join(", ")
        };
        let selection = args
            .selection
            .as_ref()
            .map(|s| (s.clause.as_str(), s.args.as_slice()));
        let (where_clause, mut params) = self.where_clause(uri, selection, args.match_trashed);

        let mut sql = format!("SELECT {} FROM files{}", projection, where_clause);
        if let Some(sort_order) = args.sort_order {
            sql.push_str(" ORDER BY ");
            sql.push_str(sort_order);
        }
        if args.limit.is_some() || args.offset.is_some() {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(SqlValue::Integer(args.limit.map(|l| l as i64).unwrap_or(-1)));
            params.push(SqlValue::Integer(args.offset.unwrap_or(0) as i64));
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let column_names: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = column_names.len();
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                (0..column_count)
                    .map(|i| row.get_ref(i).map(from_sql_value))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::trace!(uri = %uri, rows = rows.len(), "Query executed");
        Ok(Some(ResultSet::new(column_names, rows)))
    }

    fn subscribe(&self, uri: &ContentUri, cancel: CancellationToken) -> ChangeSubscription {
        self.observers.register(uri, cancel)
    }

    fn update(
        &self,
        uri: &ContentUri,
        values: &[(&'static str, Value)],
        match_trashed: Option<MatchTrashed>,
    ) -> Result<usize> {
        if uri.id().is_none() {
            return Err(MediaIndexError::Unsupported("update without a row id"));
        }
        if values.is_empty() {
            return Ok(0);
        }

        let assignments: Vec<String> = values.iter().map(|(c, _)| format!("{} = ?", c)).collect();
        let (where_clause, where_params) = self.where_clause(uri, None, match_trashed);
        let sql = format!("UPDATE files SET {}{}", assignments.join(", "), where_clause);
        let params: Vec<SqlValue> = values
            .iter()
            .map(|(_, v)| to_sql_value(v))
            .chain(where_params)
            .collect();

        let changed = self
            .conn()
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(|e| MediaIndexError::Mutation(e.to_string()))?;
        if changed > 0 {
            self.observers.notify(uri);
        }
        Ok(changed)
    }

    fn delete(&self, uri: &ContentUri, match_trashed: Option<MatchTrashed>) -> Result<usize> {
        if uri.id().is_none() {
            return Err(MediaIndexError::Unsupported("delete without a row id"));
        }

        let (where_clause, params) = self.where_clause(uri, None, match_trashed);
        let sql = format!("DELETE FROM files{}", where_clause);
        let removed = self
            .conn()
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(|e| MediaIndexError::Mutation(e.to_string()))?;
        if removed > 0 {
            self.observers.notify(uri);
        }
        Ok(removed)
    }
}

/// Bucket id of a folder: a stable non-negative 31-bit FNV-1a hash of its path.
///
/// Non-negative ids never collide with the reserved synthetic album ids.
pub fn bucket_id_for(directory: &str) -> i32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in directory.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    (hash & 0x7fff_ffff) as i32
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Integer(v as i64),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).to_string()),
    }
}
