//! core/snapshot/load.rs
//!
//! Snapshot loader: tag set -> `Record` -> `tracks` row.
//!
//! - Every file is read inside ONE transaction: if any file fails, nothing is
//!   inserted and the session never starts editing.
//! - Each file is opened, read, and released before the next one is touched.

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{Statement, params_from_iter};
use tracing::{debug, info};

use super::super::error::LoadError;
use super::super::multivalue::MultiValue;
use super::super::schema::{self, FIELDS, Field, FieldKind};
use super::super::tags::{TagCodec, TagFile};
use super::super::types::Record;
use super::{Snapshot, TABLE};

/// Read one file into a `Record`. The file is closed when this returns.
pub fn load<C: TagCodec>(codec: &C, path: &Path, mv: MultiValue) -> Result<Record, LoadError> {
    if path.to_str().is_none() {
        return Err(LoadError::NonUtf8Path(path.to_path_buf()));
    }

    let file = codec.open(path)?;
    Ok(record_from_file(&file, mv))
}

/// Build a record from an already opened file.
pub fn record_from_file<F: TagFile>(file: &F, mv: MultiValue) -> Record {
    let values = schema::data_fields()
        .map(|field| cell(field, file.read_field(field), mv))
        .collect();

    Record {
        path: file.path().to_path_buf(),
        values,
    }
}

/// Load every path, all-or-nothing. Returns the number of rows inserted.
pub fn load_all<C: TagCodec>(
    snapshot: &mut Snapshot,
    codec: &C,
    mv: MultiValue,
    paths: &[PathBuf],
) -> Result<usize, LoadError> {
    let n = load_records(snapshot, paths.iter().map(|p| load(codec, p, mv)))?;
    info!(rows = n, separator = %mv.separator(), "snapshot loaded");
    Ok(n)
}

/// Insert records produced lazily by `records` inside a single transaction.
///
/// The first `Err` aborts: the transaction rolls back and the snapshot stays empty.
pub fn load_records<I>(snapshot: &mut Snapshot, records: I) -> Result<usize, LoadError>
where
    I: IntoIterator<Item = Result<Record, LoadError>>,
{
    let tx = snapshot.conn.transaction()?;
    let mut n = 0;
    {
        let mut stmt = tx.prepare(&insert_sql())?;
        for record in records {
            let record = record?;
            insert(&mut stmt, &record)?;
            debug!(path = %record.path.display(), "loaded");
            n += 1;
        }
    }
    tx.commit()?;
    Ok(n)
}

fn insert_sql() -> String {
    let cols = FIELDS
        .iter()
        .map(|f| format!("\"{}\"", f.name))
        .collect::<Vec<_>>()
        .join(", ");
    let marks = (1..=FIELDS.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {TABLE} ({cols}) VALUES ({marks})")
}

fn insert(stmt: &mut Statement<'_>, record: &Record) -> Result<(), LoadError> {
    let path = record
        .path
        .to_str()
        .ok_or_else(|| LoadError::NonUtf8Path(record.path.clone()))?;

    let row = std::iter::once(Value::Text(path.to_owned())).chain(record.values.iter().cloned());
    stmt.execute(params_from_iter(row))?;
    Ok(())
}

/// Raw tag values -> one snapshot cell.
/// - no values -> NULL ("unset")
/// - a single value of an integer/numeric field -> INTEGER/REAL when it parses
/// - otherwise -> TEXT, multiple values joined with the separator
///
/// The reconciler uses the same conversion to tell an edited cell from one
/// that still matches the file.
pub(crate) fn cell(field: &Field, values: Vec<String>, mv: MultiValue) -> Value {
    let values: Vec<String> = values.into_iter().filter(|v| !v.is_empty()).collect();

    match (field.kind, values.as_slice()) {
        (_, []) => Value::Null,
        (FieldKind::Integer, [one]) => match one.trim().parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Text(one.clone()),
        },
        (FieldKind::Numeric, [one]) => match one.trim().parse::<f64>() {
            Ok(x) => Value::Real(x),
            Err(_) => Value::Text(one.clone()),
        },
        _ => Value::Text(mv.encode(&values)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::TagError;
    use crate::core::tags::Id3Codec;
    use id3::{Tag, TagLike, Version};

    fn field(name: &str) -> &'static Field {
        schema::field(name).expect("known field")
    }

    #[test]
    fn cells_follow_field_kind() {
        let mv = MultiValue::new(';');
        let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();

        assert_eq!(cell(field("title"), vec![], mv), Value::Null);
        assert_eq!(cell(field("title"), s(&[""]), mv), Value::Null);
        assert_eq!(
            cell(field("genre"), s(&["Baroque", "Sacred"]), mv),
            Value::Text("Baroque;Sacred".into())
        );
        assert_eq!(cell(field("bpm"), s(&["120"]), mv), Value::Integer(120));
        assert_eq!(cell(field("bpm"), s(&["fast"]), mv), Value::Text("fast".into()));
        assert_eq!(cell(field("duration"), s(&["3.5"]), mv), Value::Real(3.5));
    }

    #[test]
    fn loads_tagged_files_into_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bwv147.mp3");
        std::fs::write(&path, b"audio").expect("write");
        let mut tag = Tag::new();
        tag.set_artist("J.S. Bach");
        tag.set_text("TCON", "Baroque\0Sacred");
        tag.set_text("TRCK", "6/10");
        tag.write_to_path(&path, Version::Id3v24).expect("tag");

        let mut snapshot = Snapshot::create_in(dir.path()).expect("snapshot");
        let n = load_all(
            &mut snapshot,
            &Id3Codec::default(),
            MultiValue::new(';'),
            &[path.clone()],
        )
        .expect("load");
        assert_eq!(n, 1);

        let id = snapshot.id_of(&path).expect("query").expect("row");
        let record = snapshot.record(id).expect("query").expect("row");
        assert_eq!(record.path, path);
        assert_eq!(record.get("artist"), Some(&Value::Text("J.S. Bach".into())));
        assert_eq!(
            record.get("genre"),
            Some(&Value::Text("Baroque;Sacred".into()))
        );
        assert_eq!(record.get("track_no"), Some(&Value::Integer(6)));
        assert_eq!(record.get("track_total"), Some(&Value::Integer(10)));
        assert_eq!(record.get("album"), Some(&Value::Null));
    }

    #[test]
    fn one_bad_file_aborts_the_whole_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("good.mp3");
        std::fs::write(&good, b"audio").expect("write");
        let missing = dir.path().join("missing.mp3");

        let mut snapshot = Snapshot::create_in(dir.path()).expect("snapshot");
        let err = load_all(
            &mut snapshot,
            &Id3Codec::default(),
            MultiValue::default(),
            &[good, missing],
        )
        .expect_err("missing file");

        assert!(matches!(err, LoadError::Tag(TagError::Open { .. })));
        assert_eq!(snapshot.row_count().expect("count"), 0);
    }
}
