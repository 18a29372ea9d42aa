//! core/snapshot/mod.rs
//!
//! The snapshot: a throwaway SQLite database mirroring the loaded tags.
//!
//! - One `tracks` row per file, columns from `core::schema`
//! - `id INTEGER PRIMARY KEY` is the row identity, `path` the identifier field
//! - Three log tables filled by the tracking triggers (see `tracking`)
//!
//! Lifetime: the database file is a temp file owned by `Snapshot`. Dropping the
//! snapshot closes the connection and deletes the file, whatever happened.

pub mod load;
pub mod tracking;

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{Connection, params};
use tempfile::TempPath;
use tracing::debug;

use super::error::StoreError;
use super::schema::{self, FIELDS};
use super::types::{ChangedRow, Record, RowId};

/// Name of the table the editor works on.
pub const TABLE: &str = "tracks";

/// Counts shown before the save / edit / abandon decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pending {
    pub changed: usize,
    pub renamed: usize,
    pub deleted: usize,
}

impl Pending {
    pub fn is_empty(&self) -> bool {
        self.changed == 0 && self.deleted == 0
    }
}

pub struct Snapshot {
    // Field order matters: the connection must close before the file is removed.
    conn: Connection,
    file: TempPath,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("path", &self.path())
            .finish()
    }
}

impl Snapshot {
    /// Create an empty snapshot file (`sonora-*.db`) inside `dir`.
    pub fn create_in(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(StoreError::Create)?;

        let file = tempfile::Builder::new()
            .prefix("sonora-")
            .suffix(".db")
            .tempfile_in(dir)
            .map_err(StoreError::Create)?
            .into_temp_path();

        let conn = Connection::open(&file)?;
        conn.execute_batch(&table_ddl())?;
        conn.execute_batch(tracking::LOG_SCHEMA)?;

        debug!(path = %file.display(), "snapshot created");
        Ok(Self { conn, file })
    }

    /// Location of the database file, for an external editor.
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Install the change-tracking triggers. Call once, after loading.
    pub fn install_tracking(&self) -> Result<(), StoreError> {
        if tracking::installed(&self.conn)? > 0 {
            return Ok(());
        }
        tracking::install(&self.conn)?;
        Ok(())
    }

    /// Run one or more SQL statements, as an editor would.
    ///
    /// Statements run in order; a failing statement is rolled back on its own
    /// and stops the batch. Tracking guard failures come back as
    /// `ConsistencyViolation`, `IdentityViolation`, `PathConflict` or
    /// `InsertRejected`.
    pub fn execute(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql).map_err(StoreError::from_sql)
    }

    pub fn row_count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |r| r.get(0))?;
        Ok(n as usize)
    }

    /// Current contents of one row.
    pub fn record(&self, id: RowId) -> Result<Option<Record>, StoreError> {
        let sql = format!("SELECT {} FROM {TABLE} WHERE id = ?1", column_list());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(record_from_row(row, 0)?)),
            None => Ok(None),
        }
    }

    /// Row identity of the row currently at `path`.
    pub fn id_of(&self, path: &Path) -> Result<Option<RowId>, StoreError> {
        let sql = format!("SELECT id FROM {TABLE} WHERE path = ?1");
        match self
            .conn
            .query_row(&sql, params![path.to_string_lossy().into_owned()], |r| r.get(0))
        {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Change log, in row order.
    pub fn changed(&self) -> Result<Vec<RowId>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT id FROM changed ORDER BY id")?;
        let ids = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<RowId>, _>>()?;
        Ok(ids)
    }

    /// Rename log: row identity -> first original path.
    pub fn renamed(&self) -> Result<Vec<(RowId, PathBuf)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, original FROM renamed ORDER BY id")?;
        let rows = stmt
            .query_map([], |r| {
                Ok((r.get::<_, RowId>(0)?, PathBuf::from(r.get::<_, String>(1)?)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete log, sorted by path.
    pub fn deleted(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT path FROM deleted ORDER BY path")?;
        let paths = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .map(|p| p.map(PathBuf::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(paths)
    }

    pub fn pending(&self) -> Result<Pending, StoreError> {
        let count = |table: &str| -> Result<usize, StoreError> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
            Ok(n as usize)
        };
        Ok(Pending {
            changed: count("changed")?,
            renamed: count("renamed")?,
            deleted: count("deleted")?,
        })
    }

    /// Every changed row, joined with its original path if it was renamed.
    pub fn changed_rows(&self) -> Result<Vec<ChangedRow>, StoreError> {
        let cols = FIELDS
            .iter()
            .map(|f| format!("t.\"{}\"", f.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT c.id, r.original, {cols}
             FROM changed c
             JOIN {TABLE} t ON t.id = c.id
             LEFT JOIN renamed r ON r.id = c.id
             ORDER BY c.id"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ChangedRow {
                    id: row.get(0)?,
                    original: row.get::<_, Option<String>>(1)?.map(PathBuf::from),
                    record: record_from_row(row, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Drop a reconciled row from the change and rename logs.
    pub(crate) fn forget_change(&self, id: RowId) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM changed WHERE id = ?1", params![id])?;
        self.conn
            .execute("DELETE FROM renamed WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Drop a reconciled path from the delete log.
    pub(crate) fn forget_delete(&self, path: &Path) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM deleted WHERE path = ?1",
            params![path.to_string_lossy().into_owned()],
        )?;
        Ok(())
    }

    /// Empty all three logs.
    pub(crate) fn forget_all(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("DELETE FROM changed; DELETE FROM renamed; DELETE FROM deleted;")?;
        Ok(())
    }

    /// Close the connection and delete the file, reporting failures.
    ///
    /// Dropping does the same thing silently.
    pub fn close(self) -> Result<(), StoreError> {
        let Snapshot { conn, file } = self;
        conn.close().map_err(|(_, e)| StoreError::Sql(e))?;
        let path = file.to_path_buf();
        file.close().map_err(StoreError::Create)?;
        debug!(path = %path.display(), "snapshot deleted");
        Ok(())
    }
}

/// `CREATE TABLE tracks (...)` from the schema.
fn table_ddl() -> String {
    let mut cols = vec!["id INTEGER PRIMARY KEY".to_string()];
    for field in FIELDS {
        let (name, ty) = field.column();
        if field.is_identifier() {
            cols.push(format!("\"{name}\" {ty} NOT NULL UNIQUE"));
        } else {
            cols.push(format!("\"{name}\" {ty}"));
        }
    }
    format!("CREATE TABLE {TABLE} (\n  {}\n);", cols.join(",\n  "))
}

/// Quoted schema columns, identifier first.
fn column_list() -> String {
    FIELDS
        .iter()
        .map(|f| format!("\"{}\"", f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read `path` + data fields starting at column `offset`.
fn record_from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Record> {
    let path: String = row.get(offset)?;
    let mut values = Vec::with_capacity(FIELDS.len() - 1);
    for i in 0..schema::data_fields().count() {
        values.push(row.get::<_, Value>(offset + 1 + i)?);
    }
    Ok(Record {
        path: PathBuf::from(path),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_every_schema_column() {
        let ddl = table_ddl();
        for field in FIELDS {
            assert!(ddl.contains(&format!("\"{}\"", field.name)), "{}", field.name);
        }
        assert!(ddl.contains("\"path\" TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn file_is_deleted_on_drop_and_on_close() {
        let dir = tempfile::tempdir().expect("tempdir");

        let snapshot = Snapshot::create_in(dir.path()).expect("create");
        let path = snapshot.path().to_path_buf();
        assert!(path.exists());
        drop(snapshot);
        assert!(!path.exists());

        let snapshot = Snapshot::create_in(dir.path()).expect("create");
        let path = snapshot.path().to_path_buf();
        snapshot.close().expect("close");
        assert!(!path.exists());
    }

    #[test]
    fn creates_missing_snapshot_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        let snapshot = Snapshot::create_in(&nested).expect("create");
        assert!(snapshot.path().starts_with(&nested));
        assert_eq!(snapshot.row_count().expect("count"), 0);
        assert!(snapshot.pending().expect("pending").is_empty());
    }
}
