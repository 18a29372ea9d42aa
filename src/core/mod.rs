//! core/mod.rs
//!
//! Everything that is not the command line:
//! - Discover candidate audio file paths (filesystem walk)
//! - Read/write tags (metadata IO)
//! - Mirror them into a throwaway SQLite snapshot, track edits, write them back
//!
//! The pipeline, one stage per module:
//!   (A) discover paths -> Vec<PathBuf>            (`library`, `scan_paths`)
//!   (B) load tags -> snapshot rows                (`snapshot::load`)
//!   (C) edit, tracked by triggers                 (`snapshot::tracking`, `session`)
//!   (D) reconcile logs -> files                   (`reconcile`)

pub mod error;
pub mod library;
pub mod multivalue;
pub mod reconcile;
pub mod schema;
pub mod session;
pub mod snapshot;
pub mod tags;
pub mod types;

use std::collections::HashSet;
use std::path::PathBuf;

use error::DiscoveryError;
use library::Filter;

/// Discover candidate audio files under multiple roots.
///
/// - Extension rules come from `filter`
/// - De-dupes across overlapping roots by full path
/// - Sorts paths once, so load order (and row ids) are stable
/// - Unreadable entries come back next to the paths; they were already logged
pub fn scan_paths(roots: &[PathBuf], filter: &Filter) -> (Vec<PathBuf>, Vec<DiscoveryError>) {
    let mut seen: HashSet<PathBuf> = HashSet::with_capacity(1024);
    let mut out: Vec<PathBuf> = Vec::new();
    let mut errors = Vec::new();

    for root in roots {
        for path in library::scan_root(root, filter, &mut errors) {
            if seen.insert(path.clone()) {
                out.push(path);
            }
        }
    }

    out.sort();
    tracing::info!(files = out.len(), skipped = errors.len(), "discovery finished");
    (out, errors)
}
