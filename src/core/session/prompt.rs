//! core/session/prompt.rs
//!
//! The commit decision, asked after every editing pass.
//!
//! Answers:
//! - `s` / `save`    reconcile the logs onto the files
//! - `e` / `edit`    go back to the editor, logs kept
//! - `a` / `abandon` drop everything, no file is touched
//!
//! End of input counts as abandon.

use std::io::{self, BufRead, Write};

use super::super::error::SessionError;
use super::super::snapshot::Pending;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Save,
    Edit,
    Abandon,
}

impl Decision {
    pub fn parse(answer: &str) -> Option<Decision> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "s" | "save" => Some(Decision::Save),
            "e" | "edit" => Some(Decision::Edit),
            "a" | "abandon" => Some(Decision::Abandon),
            _ => None,
        }
    }
}

pub trait DecisionPrompt {
    fn decide(&mut self, pending: &Pending) -> Result<Decision, SessionError>;
}

/// Same answer every time.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub Decision);

impl DecisionPrompt for FixedDecision {
    fn decide(&mut self, _pending: &Pending) -> Result<Decision, SessionError> {
        Ok(self.0)
    }
}

/// Asks on a line-based terminal. Generic so tests can feed it a buffer.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, pending: &Pending) -> io::Result<Option<Decision>> {
        write!(
            self.output,
            "{} changed ({} renamed), {} deleted. [s]ave / [e]dit / [a]bandon? ",
            pending.changed, pending.renamed, pending.deleted
        )?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(Some(Decision::Abandon));
        }

        let decision = Decision::parse(&line);
        if decision.is_none() {
            writeln!(self.output, "please answer s, e or a")?;
        }
        Ok(decision)
    }
}

impl<R: BufRead, W: Write> DecisionPrompt for TerminalPrompt<R, W> {
    fn decide(&mut self, pending: &Pending) -> Result<Decision, SessionError> {
        loop {
            if let Some(decision) = self.ask(pending).map_err(SessionError::Prompt)? {
                return Ok(decision);
            }
        }
    }
}
