//! core/session/editor.rs
//! How the snapshot gets edited: an external program, or SQL run in-process.

use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

use super::super::error::SessionError;
use super::super::snapshot::Snapshot;

pub trait Editor {
    /// One editing pass over the snapshot. Returns when the operator is done.
    fn edit(&mut self, snapshot: &Snapshot) -> Result<(), SessionError>;
}

/// Spawns `program args... <snapshot path>` and waits for it.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    program: String,
    args: Vec<String>,
}

impl CommandEditor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, db: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(db);
        cmd
    }
}

impl Editor for CommandEditor {
    fn edit(&mut self, snapshot: &Snapshot) -> Result<(), SessionError> {
        info!(program = %self.program, db = %snapshot.path().display(), "launching editor");

        let status = self
            .command(snapshot.path())
            .status()
            .map_err(|source| SessionError::Editor {
                program: self.program.clone(),
                source,
            })?;

        // The edits made before a crash are still in the snapshot; let the
        // operator decide what to do with them.
        if !status.success() {
            warn!(program = %self.program, %status, "editor exited with failure");
        }
        Ok(())
    }
}

/// Runs a fixed SQL script against the snapshot (`--execute`).
#[derive(Debug, Clone)]
pub struct ScriptEditor {
    sql: String,
}

impl ScriptEditor {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

impl Editor for ScriptEditor {
    fn edit(&mut self, snapshot: &Snapshot) -> Result<(), SessionError> {
        snapshot.execute(&self.sql).map_err(SessionError::Script)?;
        let pending = snapshot.pending()?;
        info!(
            changed = pending.changed,
            renamed = pending.renamed,
            deleted = pending.deleted,
            "script applied"
        );
        Ok(())
    }
}
