//! core/session/mod.rs
//!
//! One editing session, start to finish:
//! 1. `open` creates the snapshot file
//! 2. `load` fills it from the discovered files and installs tracking
//! 3. `run` loops edit -> decide until the operator saves or abandons
//!
//! The session owns the snapshot. It is deleted when `run` returns, and on
//! drop if anything fails before that.
//!
//! Saving with the `retain` failure policy keeps the failed entries, so the
//! operator is asked again and can re-edit or retry. A retry that reconciles
//! nothing new ends the session.

pub mod editor;
pub mod prompt;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::error::SessionError;
use super::multivalue::MultiValue;
use super::reconcile::{ReconcileReport, Reconciler};
use super::snapshot::{Snapshot, load};
use super::tags::TagCodec;

pub use editor::{CommandEditor, Editor, ScriptEditor};
pub use prompt::{Decision, DecisionPrompt, FixedDecision, TerminalPrompt};

#[derive(Debug)]
pub enum Outcome {
    /// Files were reconciled. The report sums up every save of the session;
    /// `failures` are those of the last one.
    Saved(ReconcileReport),
    /// Nothing was written.
    Abandoned,
}

#[derive(Debug)]
pub struct Session {
    snapshot: Snapshot,
}

impl Session {
    /// Create an empty snapshot inside `snapshot_dir`.
    pub fn open(snapshot_dir: &Path) -> Result<Self, SessionError> {
        let snapshot = Snapshot::create_in(snapshot_dir)?;
        Ok(Self { snapshot })
    }

    /// Load every file (all-or-nothing), then start tracking.
    pub fn load<C: TagCodec>(
        &mut self,
        codec: &C,
        mv: MultiValue,
        paths: &[PathBuf],
    ) -> Result<usize, SessionError> {
        let n = load::load_all(&mut self.snapshot, codec, mv, paths)?;
        self.snapshot.install_tracking()?;
        Ok(n)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn run<E, P, C>(
        self,
        editor: &mut E,
        prompt: &mut P,
        reconciler: &Reconciler<'_, C>,
    ) -> Result<Outcome, SessionError>
    where
        E: Editor,
        P: DecisionPrompt,
        C: TagCodec,
    {
        let mut saved: Option<ReconcileReport> = None;
        let mut edit = true;

        let outcome = loop {
            if edit {
                editor.edit(&self.snapshot)?;
            }

            let before = self.snapshot.pending()?;
            match prompt.decide(&before)? {
                Decision::Edit => edit = true,
                Decision::Abandon => {
                    info!("session abandoned");
                    break match saved {
                        Some(report) => Outcome::Saved(report),
                        None => Outcome::Abandoned,
                    };
                }
                Decision::Save => {
                    let report = reconciler.run(&self.snapshot)?;
                    let report = match saved.take() {
                        Some(mut total) => {
                            total.absorb(report);
                            total
                        }
                        None => report,
                    };

                    let after = self.snapshot.pending()?;
                    if after.is_empty() || after == before {
                        break Outcome::Saved(report);
                    }
                    warn!(
                        changed = after.changed,
                        deleted = after.deleted,
                        "failed entries kept for another try"
                    );
                    saved = Some(report);
                    edit = false;
                }
            }
        };

        self.snapshot.close()?;
        Ok(outcome)
    }
}
