//! Core data types shared between the loader, the snapshot and the reconciler.
//!
//! Rule of thumb:
//! - These structs are "boring bags of data"
//! - No SQL
//! - No filesystem code
//! - No tag parsing code
//!
//! Why?
//! - The loader, the snapshot and the reconciler all pass these around, and
//!   none of them should need to know how the others store things
//! - Easy to build by hand in unit tests (no file, no database)
//!
//! `Record` represents ONE audio file on disk, shaped exactly like a row of
//! the `tracks` table.

use std::path::PathBuf;

use rusqlite::types::Value;

use super::schema;

/// Stable identity of a snapshot row (the `id` column).
///
/// The `path` column can change during an edit session (renames), this never does.
pub type RowId = i64;

/// One file on disk plus its metadata, shaped like a snapshot row.
///
/// Why `Vec<Value>` and not one named field per tag?
/// - The field list lives in `schema::FIELDS`; adding a tag there should not
///   mean touching this struct, the SQL, and the reconciler
/// - `Value` is what SQLite hands back, so NULL / INTEGER / REAL / TEXT survive
///   the round trip unchanged (NULL = "this file has no such tag")
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Identifier field: the file's current path.
    pub path: PathBuf,

    /// One value per `schema::data_fields()`, same order.
    /// `Value::Null` means "unset" (no such tag on the file).
    pub values: Vec<Value>,
}

impl Record {
    /// A record with every data field unset.
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            values: vec![Value::Null; schema::data_fields().count()],
        }
    }

    /// Look up a data field's value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        schema::data_fields()
            .position(|f| f.name == name)
            .and_then(|i| self.values.get(i))
    }

    /// Set a data field's value by name.
    /// Unknown names, and slots a short hand-built `values` lacks, are ignored.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(slot) = schema::data_fields()
            .position(|f| f.name == name)
            .and_then(|i| self.values.get_mut(i))
        {
            *slot = value;
        }
    }
}

/// A row the change log says was modified, as the reconciler sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedRow {
    pub id: RowId,
    /// First path seen before any rename, if the row was renamed.
    pub original: Option<PathBuf>,
    pub record: Record,
}

impl ChangedRow {
    /// Where the file lives right now on disk.
    ///
    /// Renames only happen in the snapshot until the reconciler moves the file,
    /// so the file is still at the FIRST path the row had.
    pub fn source_path(&self) -> &PathBuf {
        self.original.as_ref().unwrap_or(&self.record.path)
    }

    /// Where the file should end up.
    pub fn target_path(&self) -> &PathBuf {
        &self.record.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_by_name() {
        let mut r = Record::empty(PathBuf::from("/music/a.mp3"));
        r.set("title", Value::Text("Air".into()));
        r.set("no_such_field", Value::Integer(1));
        assert_eq!(r.get("title"), Some(&Value::Text("Air".into())));
        assert_eq!(r.get("album"), Some(&Value::Null));
        assert_eq!(r.get("no_such_field"), None);
    }

    #[test]
    fn set_on_short_record_is_ignored() {
        let mut r = Record {
            path: PathBuf::from("/music/a.mp3"),
            values: vec![Value::Null],
        };
        r.set("comment", Value::Text("late field".into()));
        assert_eq!(r.values, vec![Value::Null]);
        assert_eq!(r.get("comment"), None);
    }

    #[test]
    fn renamed_row_is_read_from_its_original_path() {
        let row = ChangedRow {
            id: 1,
            original: Some(PathBuf::from("/music/old.mp3")),
            record: Record::empty(PathBuf::from("/music/new.mp3")),
        };
        assert_eq!(row.source_path(), &PathBuf::from("/music/old.mp3"));
        assert_eq!(row.target_path(), &PathBuf::from("/music/new.mp3"));
    }
}
