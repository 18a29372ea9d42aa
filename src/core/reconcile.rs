//! core/reconcile.rs
//!
//! Write-back: replay what the logs say onto the real files.
//!
//! Order of operations:
//! 1. every changed row: write tags to its ORIGINAL path (the file has not
//!    moved yet, only the snapshot row has)
//! 2. every deleted path: remove the file (already gone is fine)
//! 3. every renamed row: move the file to its current path
//!
//! Why this order?
//! - Tags are written while every file is still where the loader found it,
//!   so no write depends on a move having worked
//! - Deleting before moving frees paths a rename may want to reuse
//!   ("delete 02, rename 01 -> 02")
//! - Moves run in dependency order: a move whose target is still occupied by
//!   a file that is itself about to move waits for that move. A closed loop
//!   (a swap) is broken by parking one file under a temporary name.
//!
//! Only the fields the editor actually changed are written. A cell that still
//! equals what the file holds is left alone, so an odd value the codec can
//! read but would not accept back (a BPM of "120.5") never blocks an
//! unrelated edit.
//!
//! A failing file never stops the batch. Failures are collected with the path
//! and the operation, and handed back in the report.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::error::{ReconcileError, StoreError};
use super::multivalue::MultiValue;
use super::schema::{self, Field};
use super::snapshot::{Snapshot, load};
use super::tags::{TagCodec, TagFile};
use super::types::{Record, RowId};

/// What to do with a NULL (unset / cleared) cell of a changed row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullPolicy {
    /// Write an empty field: the tag is removed from the file.
    #[default]
    Clear,
    /// Leave whatever the file has for that field.
    Skip,
}

/// What happens to the log entries of a file that failed to reconcile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Every entry is used up by the pass, failed or not.
    #[default]
    Consume,
    /// Failed entries stay in the logs so another save can retry them.
    Retain,
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Files whose tags were written (at their original path).
    pub updated: Vec<PathBuf>,
    /// (from, to) for every moved file.
    pub moved: Vec<(PathBuf, PathBuf)>,
    /// Files removed from disk.
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<ReconcileError>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold a later pass into this one. Failures are replaced, not summed:
    /// a retried entry that failed before may have succeeded since.
    pub(crate) fn absorb(&mut self, next: ReconcileReport) {
        self.updated.extend(next.updated);
        self.moved.extend(next.moved);
        self.deleted.extend(next.deleted);
        self.failures = next.failures;
    }

    fn fail(&mut self, e: ReconcileError) {
        warn!(path = %e.path().display(), error = %e, "reconcile failed");
        self.failures.push(e);
    }
}

/// A file whose tags are written and that still has to move.
#[derive(Debug)]
struct Move {
    id: RowId,
    /// Where the file was loaded from (for the report).
    original: PathBuf,
    /// Where it is right now; differs from `original` once parked.
    from: PathBuf,
    to: PathBuf,
}

pub struct Reconciler<'a, C> {
    codec: &'a C,
    mv: MultiValue,
    nulls: NullPolicy,
    on_failure: FailurePolicy,
}

impl<'a, C: TagCodec> Reconciler<'a, C> {
    pub fn new(codec: &'a C, mv: MultiValue) -> Self {
        Self {
            codec,
            mv,
            nulls: NullPolicy::default(),
            on_failure: FailurePolicy::default(),
        }
    }

    pub fn null_policy(mut self, nulls: NullPolicy) -> Self {
        self.nulls = nulls;
        self
    }

    pub fn failure_policy(mut self, on_failure: FailurePolicy) -> Self {
        self.on_failure = on_failure;
        self
    }

    /// Reconcile every pending change and deletion.
    ///
    /// Only snapshot (SQL) errors abort the pass; file errors end up in the report.
    pub fn run(&self, snapshot: &Snapshot) -> Result<ReconcileReport, StoreError> {
        let retain = self.on_failure == FailurePolicy::Retain;
        let mut report = ReconcileReport::default();
        let mut moves = Vec::new();

        for row in snapshot.changed_rows()? {
            let source = row.source_path();
            let target = row.target_path();

            if let Err(e) = self.write_tags(source, &row.record) {
                report.fail(e);
                continue;
            }
            report.updated.push(source.clone());

            if source != target {
                moves.push(Move {
                    id: row.id,
                    original: source.clone(),
                    from: source.clone(),
                    to: target.clone(),
                });
            } else if retain {
                snapshot.forget_change(row.id)?;
            }
        }

        for path in snapshot.deleted()? {
            match delete_file(&path) {
                Ok(removed) => {
                    if removed {
                        report.deleted.push(path.clone());
                    }
                    if retain {
                        snapshot.forget_delete(&path)?;
                    }
                }
                Err(e) => report.fail(e),
            }
        }

        for id in apply_moves(moves, &mut report) {
            if retain {
                snapshot.forget_change(id)?;
            }
        }

        if !retain {
            snapshot.forget_all()?;
        }

        info!(
            updated = report.updated.len(),
            moved = report.moved.len(),
            deleted = report.deleted.len(),
            failed = report.failures.len(),
            "reconcile finished"
        );
        Ok(report)
    }

    /// Open, write every edited field, save. The file is released on return,
    /// whichever way it returns. A bad field means the file is not saved at all.
    fn write_tags(&self, path: &Path, record: &Record) -> Result<(), ReconcileError> {
        let mut file = self.codec.open(path).map_err(ReconcileError::Open)?;

        for (field, value) in schema::data_fields().zip(&record.values) {
            if !field.is_writable() {
                continue;
            }

            // Same conversion as the loader: equal means the editor left it alone.
            if load::cell(field, file.read_field(field), self.mv) == *value {
                continue;
            }

            let values = values_for(field, value, self.mv, self.nulls).map_err(|reason| {
                ReconcileError::Write {
                    path: path.to_path_buf(),
                    field: field.name,
                    reason,
                }
            })?;
            let Some(values) = values else { continue };

            file.write_field(field, &values, true)
                .map_err(|e| ReconcileError::Write {
                    path: path.to_path_buf(),
                    field: field.name,
                    reason: e.to_string(),
                })?;
        }

        file.save().map_err(ReconcileError::Save)?;
        debug!(path = %path.display(), "tags written");
        Ok(())
    }
}

/// Run every move, waiting on occupied targets that are about to be vacated.
/// Returns the rows whose file reached its target.
fn apply_moves(mut pending: Vec<Move>, report: &mut ReconcileReport) -> Vec<RowId> {
    let mut done = Vec::new();

    while !pending.is_empty() {
        let ready = pending
            .iter()
            .position(|m| !pending.iter().any(|other| other.from == m.to));

        let Some(i) = ready else {
            // Every target is another pending move's source: a cycle.
            let m = &mut pending[0];
            match park(&m.from, m.id) {
                Ok(tmp) => {
                    debug!(from = %m.from.display(), tmp = %tmp.display(), "parked");
                    m.from = tmp;
                }
                Err(e) => {
                    pending.remove(0);
                    report.fail(e);
                }
            }
            continue;
        };

        let m = pending.remove(i);
        match move_file(&m.from, &m.to) {
            Ok(()) => {
                debug!(from = %m.original.display(), to = %m.to.display(), "moved");
                report.moved.push((m.original, m.to));
                done.push(m.id);
            }
            Err(e) => report.fail(e),
        }
    }

    done
}

/// Move a file aside to `.sonora-<id>-<name>` in its own directory.
fn park(from: &Path, id: RowId) -> Result<PathBuf, ReconcileError> {
    let name = from
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = from.with_file_name(format!(".sonora-{id}-{name}"));
    move_file(from, &tmp)?;
    Ok(tmp)
}

/// Snapshot cell -> values to write.
/// - TEXT in a multi-valued field: decoded with the separator
/// - TEXT elsewhere, INTEGER, REAL: one value, its string form
/// - NULL: empty list (`Clear`) or `None` = leave the field alone (`Skip`)
/// - BLOB: rejected
pub fn values_for(
    field: &Field,
    value: &Value,
    mv: MultiValue,
    nulls: NullPolicy,
) -> Result<Option<Vec<String>>, String> {
    let values = match value {
        Value::Null => match nulls {
            NullPolicy::Clear => Vec::new(),
            NullPolicy::Skip => return Ok(None),
        },
        Value::Text(s) if field.multi => mv.decode(s),
        Value::Text(s) if s.is_empty() => Vec::new(),
        Value::Text(s) => vec![s.clone()],
        Value::Integer(n) => vec![n.to_string()],
        Value::Real(x) => vec![x.to_string()],
        Value::Blob(_) => return Err("binary values cannot be written as tags".to_string()),
    };
    Ok(Some(values))
}

/// Move `from` to `to`, creating the destination directory. Never overwrites.
fn move_file(from: &Path, to: &Path) -> Result<(), ReconcileError> {
    let move_err = |source: io::Error| ReconcileError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if to.exists() {
        return Err(ReconcileError::TargetExists {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
    }

    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(move_err)?;
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to).map_err(move_err)?;
            fs::remove_file(from).map_err(move_err)
        }
        Err(e) => Err(move_err(e)),
    }
}

/// Remove a file. Returns false if it was already gone.
fn delete_file(path: &Path) -> Result<bool, ReconcileError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "deleted");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "already gone");
            Ok(false)
        }
        Err(e) => Err(ReconcileError::Delete {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
