//! core/error.rs
//!
//! One error enum per concern. Which ones are fatal?
//! - `DiscoveryError`: no. Reported, the file is skipped.
//! - `LoadError`: yes. The whole load is rolled back before any edit can happen.
//! - `StoreError` guard variants: no. Only the offending statement is rejected.
//! - `ReconcileError`: no. Collected per file and reported after the pass.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Message raised by the deletion guard trigger.
pub const MODIFIED_DELETE_MESSAGE: &str = "modified record cannot be deleted";

/// Message raised by the identity guard trigger.
pub const IDENTITY_UPDATE_MESSAGE: &str = "row identity cannot be changed";

/// Message raised when a path update would land on another row's path.
pub const PATH_CONFLICT_MESSAGE: &str = "path already belongs to another record";

/// Message raised by the insert guard trigger.
pub const INSERT_MESSAGE: &str = "records cannot be added after loading";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cannot read {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

#[derive(Debug, Error)]
pub enum TagError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: id3::Error,
    },

    #[error("{path}: field `{field}` is read-only")]
    ReadOnly { path: PathBuf, field: &'static str },

    #[error("{path}: field `{field}` has no tag mapping")]
    Unmapped { path: PathBuf, field: &'static str },

    #[error("{path}: invalid value {value:?} for field `{field}`")]
    InvalidValue {
        path: PathBuf,
        field: &'static str,
        value: String,
    },

    #[error("cannot save tags to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: id3::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}", MODIFIED_DELETE_MESSAGE)]
    ConsistencyViolation,

    #[error("{}", IDENTITY_UPDATE_MESSAGE)]
    IdentityViolation,

    #[error("{}", PATH_CONFLICT_MESSAGE)]
    PathConflict,

    #[error("{}", INSERT_MESSAGE)]
    InsertRejected,

    #[error("cannot create snapshot file: {0}")]
    Create(#[source] io::Error),

    #[error("snapshot: {0}")]
    Sql(#[from] rusqlite::Error),
}

impl StoreError {
    /// Map a raw SQLite error, recognizing the tracking guards by their message.
    pub(crate) fn from_sql(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg == MODIFIED_DELETE_MESSAGE => {
                StoreError::ConsistencyViolation
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg == IDENTITY_UPDATE_MESSAGE => {
                StoreError::IdentityViolation
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg == PATH_CONFLICT_MESSAGE => {
                StoreError::PathConflict
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg == INSERT_MESSAGE => {
                StoreError::InsertRejected
            }
            _ => StoreError::Sql(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Tag(#[from] TagError),

    #[error("path is not valid UTF-8: {0:?}")]
    NonUtf8Path(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for LoadError {
    fn from(e: rusqlite::Error) -> Self {
        LoadError::Store(StoreError::from_sql(e))
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("open: {0}")]
    Open(#[source] TagError),

    #[error("write `{field}` to {path}: {reason}")]
    Write {
        path: PathBuf,
        field: &'static str,
        reason: String,
    },

    #[error("save: {0}")]
    Save(#[source] TagError),

    #[error("move {from} -> {to}: target already exists")]
    TargetExists { from: PathBuf, to: PathBuf },

    #[error("move {from} -> {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ReconcileError {
    /// The file this failure is about.
    pub fn path(&self) -> &PathBuf {
        match self {
            ReconcileError::Open(e) | ReconcileError::Save(e) => e.path(),
            ReconcileError::Write { path, .. } | ReconcileError::Delete { path, .. } => path,
            ReconcileError::TargetExists { from, .. } | ReconcileError::Move { from, .. } => from,
        }
    }
}

impl TagError {
    pub fn path(&self) -> &PathBuf {
        match self {
            TagError::Open { path, .. }
            | TagError::ReadOnly { path, .. }
            | TagError::Unmapped { path, .. }
            | TagError::InvalidValue { path, .. }
            | TagError::Save { path, .. } => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("load aborted: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot launch editor `{program}`: {source}")]
    Editor {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("edit script failed: {0}")]
    Script(#[source] StoreError),

    #[error("cannot read decision: {0}")]
    Prompt(#[source] io::Error),
}
