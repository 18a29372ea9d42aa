//! Sonora bulk tag editor
//!
//! Loads the tags of many audio files into a throwaway SQLite snapshot, lets
//! any SQL editor change them, and writes back only what was changed, renamed
//! or deleted.
//!
//! - `core`: discovery, tag codec, snapshot, change tracking, write-back, session
//! - `config`: layered configuration (file, environment, CLI)
//! - `logging`: tracing subscriber for the binary

pub mod config;
pub mod core;
pub mod logging;
