//! core/snapshot/tracking.rs
//!
//! Change tracking, installed on the snapshot as SQLite triggers.
//!
//! The editor is usually another process (`sqlite3`, a GUI browser...), so the
//! rules have to live inside the database file: they fire for every row a
//! statement touches, synchronously, in the order statements run, no matter
//! who issued them.
//!
//! SQLite does not fire delete triggers for rows removed by REPLACE conflict
//! resolution (`recursive_triggers` is off, also in `sqlite3`). The two extra
//! guards close that door: no path update may land on another row's path, and
//! no row may be inserted (`REPLACE INTO` is an insert).
//!
//! Log tables:
//! - `changed(id)`          rows updated after load
//! - `renamed(id, original)` first path seen before a rename
//! - `deleted(path)`         paths of removed rows

use rusqlite::Connection;

use super::super::error::{
    IDENTITY_UPDATE_MESSAGE, INSERT_MESSAGE, MODIFIED_DELETE_MESSAGE, PATH_CONFLICT_MESSAGE,
};
use super::TABLE;

pub(crate) const LOG_SCHEMA: &str = "
CREATE TABLE changed (id INTEGER PRIMARY KEY);
CREATE TABLE renamed (id INTEGER PRIMARY KEY, original TEXT NOT NULL);
CREATE TABLE deleted (path TEXT PRIMARY KEY);
";

/// One mutation-observing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Reject deleting a row that is already in `changed`.
    DeletionGuard,
    /// Reject changing a row's `id`; every log is keyed by it.
    IdentityGuard,
    /// Log the path of every deleted row.
    DeleteRecorder,
    /// Log the first path of a renamed row; later renames keep it.
    RenameRecorder,
    /// Log every updated row, whatever column changed.
    ChangeRecorder,
    /// Reject a path update onto a path another row holds.
    PathConflictGuard,
    /// Reject any insert once loading is done.
    InsertGuard,
}

pub const RULES: [Rule; 7] = [
    Rule::DeletionGuard,
    Rule::IdentityGuard,
    Rule::PathConflictGuard,
    Rule::InsertGuard,
    Rule::DeleteRecorder,
    Rule::RenameRecorder,
    Rule::ChangeRecorder,
];

impl Rule {
    pub fn trigger_name(self) -> &'static str {
        match self {
            Rule::DeletionGuard => "guard_delete_changed",
            Rule::IdentityGuard => "guard_update_id",
            Rule::DeleteRecorder => "record_delete",
            Rule::RenameRecorder => "record_rename",
            Rule::ChangeRecorder => "record_change",
            Rule::PathConflictGuard => "guard_path_conflict",
            Rule::InsertGuard => "guard_insert",
        }
    }

    /// The `CREATE TRIGGER` statement for this rule.
    pub fn ddl(self) -> String {
        let name = self.trigger_name();
        match self {
            Rule::DeletionGuard => format!(
                "CREATE TRIGGER {name} BEFORE DELETE ON {TABLE} FOR EACH ROW
                 WHEN EXISTS (SELECT 1 FROM changed WHERE id = OLD.id)
                 BEGIN SELECT RAISE(ABORT, '{MODIFIED_DELETE_MESSAGE}'); END;"
            ),
            Rule::IdentityGuard => format!(
                "CREATE TRIGGER {name} BEFORE UPDATE OF id ON {TABLE} FOR EACH ROW
                 WHEN NEW.id IS NOT OLD.id
                 BEGIN SELECT RAISE(ABORT, '{IDENTITY_UPDATE_MESSAGE}'); END;"
            ),
            Rule::DeleteRecorder => format!(
                "CREATE TRIGGER {name} AFTER DELETE ON {TABLE} FOR EACH ROW
                 BEGIN INSERT OR IGNORE INTO deleted (path) VALUES (OLD.path); END;"
            ),
            Rule::RenameRecorder => format!(
                "CREATE TRIGGER {name} AFTER UPDATE OF path ON {TABLE} FOR EACH ROW
                 WHEN NEW.path IS NOT OLD.path
                 BEGIN INSERT OR IGNORE INTO renamed (id, original) VALUES (NEW.id, OLD.path); END;"
            ),
            Rule::ChangeRecorder => format!(
                "CREATE TRIGGER {name} AFTER UPDATE ON {TABLE} FOR EACH ROW
                 BEGIN INSERT OR IGNORE INTO changed (id) VALUES (NEW.id); END;"
            ),
            Rule::PathConflictGuard => format!(
                "CREATE TRIGGER {name} BEFORE UPDATE OF path ON {TABLE} FOR EACH ROW
                 WHEN NEW.path IS NOT OLD.path
                  AND EXISTS (SELECT 1 FROM {TABLE} WHERE path = NEW.path AND id IS NOT OLD.id)
                 BEGIN SELECT RAISE(ABORT, '{PATH_CONFLICT_MESSAGE}'); END;"
            ),
            Rule::InsertGuard => format!(
                "CREATE TRIGGER {name} BEFORE INSERT ON {TABLE} FOR EACH ROW
                 BEGIN SELECT RAISE(ABORT, '{INSERT_MESSAGE}'); END;"
            ),
        }
    }
}

/// Install every rule. Runs once, right after the load.
pub(crate) fn install(conn: &Connection) -> rusqlite::Result<()> {
    for rule in RULES {
        conn.execute_batch(&rule.ddl())?;
    }
    tracing::debug!(rules = RULES.len(), "change tracking installed");
    Ok(())
}

pub(crate) fn installed(conn: &Connection) -> rusqlite::Result<usize> {
    let mut count = 0;
    for rule in RULES {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger' AND name = ?1",
            [rule.trigger_name()],
            |r| r.get(0),
        )?;
        count += n as usize;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rusqlite::types::Value;

    use super::super::Snapshot;
    use super::super::load::load_records;
    use crate::core::error::StoreError;
    use crate::core::types::Record;

    /// Snapshot with `n` rows (`/music/0.mp3`, ...) and tracking installed.
    fn snapshot_with(n: usize) -> (tempfile::TempDir, Snapshot) {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut snapshot = Snapshot::create_in(dir.path()).expect("snapshot");
        let records = (0..n).map(|i| {
            let mut r = Record::empty(PathBuf::from(format!("/music/{i}.mp3")));
            r.set("artist", Value::Text("J.S. Bach".into()));
            Ok(r)
        });
        load_records(&mut snapshot, records).expect("load");
        snapshot.install_tracking().expect("tracking");
        (dir, snapshot)
    }

    #[test]
    fn installs_every_rule_once() {
        let (_dir, snapshot) = snapshot_with(1);
        snapshot.install_tracking().expect("idempotent");
        assert_eq!(
            super::installed(&snapshot.conn).expect("count"),
            super::RULES.len()
        );
    }

    #[test]
    fn bulk_update_logs_every_row() {
        let (_dir, snapshot) = snapshot_with(80);
        snapshot
            .execute("UPDATE tracks SET genre = 'Baroque'")
            .expect("update");
        assert_eq!(snapshot.changed().expect("changed").len(), 80);

        // Updating again does not duplicate entries.
        snapshot
            .execute("UPDATE tracks SET genre = 'Sacred'")
            .expect("update");
        assert_eq!(snapshot.changed().expect("changed").len(), 80);
        assert!(snapshot.renamed().expect("renamed").is_empty());
    }

    #[test]
    fn loading_is_not_a_change() {
        let (_dir, snapshot) = snapshot_with(3);
        assert!(snapshot.pending().expect("pending").is_empty());
    }

    #[test]
    fn deleting_a_changed_row_is_rejected() {
        let (_dir, snapshot) = snapshot_with(2);
        snapshot
            .execute("UPDATE tracks SET title = 'x' WHERE path = '/music/0.mp3'")
            .expect("update");
        let before = snapshot.changed().expect("changed");

        let err = snapshot
            .execute("DELETE FROM tracks")
            .expect_err("guarded");
        assert!(matches!(err, StoreError::ConsistencyViolation));

        // The whole statement was rolled back, including the unchanged row.
        assert_eq!(snapshot.row_count().expect("count"), 2);
        assert!(snapshot.deleted().expect("deleted").is_empty());
        assert_eq!(snapshot.changed().expect("changed"), before);
    }

    #[test]
    fn deleting_an_unchanged_row_is_logged_once() {
        let (_dir, snapshot) = snapshot_with(2);
        snapshot
            .execute("DELETE FROM tracks WHERE path = '/music/1.mp3'")
            .expect("delete");
        assert_eq!(
            snapshot.deleted().expect("deleted"),
            vec![PathBuf::from("/music/1.mp3")]
        );
        assert_eq!(snapshot.row_count().expect("count"), 1);
        assert!(snapshot.changed().expect("changed").is_empty());
    }

    #[test]
    fn first_original_path_survives_renames() {
        let (_dir, snapshot) = snapshot_with(1);
        let id = snapshot
            .id_of(&PathBuf::from("/music/0.mp3"))
            .expect("query")
            .expect("row");

        snapshot
            .execute("UPDATE tracks SET path = '/music/a.mp3'")
            .expect("rename 1");
        snapshot
            .execute("UPDATE tracks SET path = '/music/b.mp3'")
            .expect("rename 2");

        assert_eq!(
            snapshot.renamed().expect("renamed"),
            vec![(id, PathBuf::from("/music/0.mp3"))]
        );
        // A rename is also a change.
        assert_eq!(snapshot.changed().expect("changed"), vec![id]);
    }

    #[test]
    fn same_value_path_update_is_not_a_rename() {
        let (_dir, snapshot) = snapshot_with(1);
        snapshot
            .execute("UPDATE tracks SET path = path")
            .expect("noop update");
        assert!(snapshot.renamed().expect("renamed").is_empty());
        assert_eq!(snapshot.changed().expect("changed").len(), 1);
    }

    #[test]
    fn row_identity_is_immutable() {
        let (_dir, snapshot) = snapshot_with(1);
        let err = snapshot
            .execute("UPDATE tracks SET id = 99")
            .expect_err("guarded");
        assert!(matches!(err, StoreError::IdentityViolation));
        assert!(snapshot.changed().expect("changed").is_empty());
    }

    #[test]
    fn replace_onto_a_changed_row_is_rejected() {
        let (_dir, snapshot) = snapshot_with(2);
        snapshot
            .execute("UPDATE tracks SET title = 'x' WHERE path = '/music/0.mp3'")
            .expect("update");

        let err = snapshot
            .execute("UPDATE OR REPLACE tracks SET path = '/music/0.mp3' WHERE path = '/music/1.mp3'")
            .expect_err("guarded");
        assert!(matches!(err, StoreError::PathConflict));

        assert_eq!(snapshot.row_count().expect("count"), 2);
        assert!(snapshot.deleted().expect("deleted").is_empty());
        assert!(snapshot.renamed().expect("renamed").is_empty());
        assert_eq!(snapshot.changed_rows().expect("rows").len(), 1);
    }

    #[test]
    fn inserts_and_replace_into_are_rejected() {
        let (_dir, snapshot) = snapshot_with(1);
        for sql in [
            "INSERT INTO tracks (path) VALUES ('/music/extra.mp3')",
            "REPLACE INTO tracks (id, path) VALUES (1, '/music/0.mp3')",
            "INSERT OR REPLACE INTO tracks (path, title) VALUES ('/music/0.mp3', 'y')",
        ] {
            let err = snapshot.execute(sql).expect_err(sql);
            assert!(matches!(err, StoreError::InsertRejected), "{sql}");
        }
        assert_eq!(snapshot.row_count().expect("count"), 1);
        assert!(snapshot.pending().expect("pending").is_empty());
    }

    #[test]
    fn rename_onto_a_freed_path_is_allowed() {
        let (_dir, snapshot) = snapshot_with(2);
        snapshot
            .execute(
                "DELETE FROM tracks WHERE path = '/music/1.mp3';
                 UPDATE tracks SET path = '/music/1.mp3' WHERE path = '/music/0.mp3';",
            )
            .expect("free then reuse");
        assert_eq!(
            snapshot.deleted().expect("deleted"),
            vec![PathBuf::from("/music/1.mp3")]
        );
        assert_eq!(snapshot.renamed().expect("renamed").len(), 1);
    }

    #[test]
    fn rename_then_delete_is_rejected() {
        let (_dir, snapshot) = snapshot_with(1);
        snapshot
            .execute("UPDATE tracks SET path = '/music/new.mp3'")
            .expect("rename");
        let err = snapshot
            .execute("DELETE FROM tracks WHERE path = '/music/new.mp3'")
            .expect_err("guarded");
        assert!(matches!(err, StoreError::ConsistencyViolation));
    }
}
