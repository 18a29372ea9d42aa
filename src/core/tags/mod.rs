//! core/tags/mod.rs
//!
//! Tag codec: the only place that knows how metadata lives inside a file.
//!
//! Public API:
//! - [`TagCodec`] opens a file and hands back a [`TagFile`]
//! - [`TagFile`] reads/writes one schema field at a time, then saves
//! - [`Id3Codec`] is the ID3v2 implementation (MP3)
//!
//! Closing a file is `Drop`: whatever the codec holds is released when the
//! `TagFile` goes out of scope, success or failure.

mod duration;
mod frames;
mod read;
mod util;
mod write;

use std::path::{Path, PathBuf};

use id3::{ErrorKind, Tag, Version};

use super::error::TagError;
use super::schema::Field;

use frames::{Frame, frame_for};

/// Opens files for tag access.
pub trait TagCodec {
    type File: TagFile;

    /// Fails if the file is missing, unreadable or its tag is corrupt.
    fn open(&self, path: &Path) -> Result<Self::File, TagError>;
}

/// One opened file.
pub trait TagFile {
    fn path(&self) -> &Path;

    /// Zero or more raw values for a schema field.
    fn read_field(&self, field: &Field) -> Vec<String>;

    /// Write values for a schema field.
    /// - `replace == true`: existing values are dropped, `values` take their place
    /// - `replace == false`: `values` are appended after the existing ones
    ///
    /// An empty `values` with `replace == true` clears the field.
    fn write_field(&mut self, field: &Field, values: &[String], replace: bool)
    -> Result<(), TagError>;

    /// Persist pending writes to disk.
    fn save(&mut self) -> Result<(), TagError>;
}

/// ID3v2 codec backed by the `id3` crate.
///
/// Writes always use ID3v2.4, which stores multiple values in one frame.
#[derive(Debug, Clone, Copy)]
pub struct Id3Codec {
    /// Probe the audio stream for the read-only `duration` field.
    pub probe_duration: bool,
}

impl Default for Id3Codec {
    fn default() -> Self {
        Self {
            probe_duration: true,
        }
    }
}

impl TagCodec for Id3Codec {
    type File = Id3File;

    fn open(&self, path: &Path) -> Result<Id3File, TagError> {
        // A file without a tag is fine: it just has no values yet.
        let tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, ErrorKind::NoTag) => Tag::new(),
            Err(e) => {
                return Err(TagError::Open {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        Ok(Id3File {
            path: path.to_path_buf(),
            tag,
            probe_duration: self.probe_duration,
        })
    }
}

/// An MP3's tag, held in memory between `open` and `save`.
#[derive(Debug)]
pub struct Id3File {
    path: PathBuf,
    tag: Tag,
    probe_duration: bool,
}

impl TagFile for Id3File {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_field(&self, field: &Field) -> Vec<String> {
        match frame_for(field.name) {
            Some(Frame::Duration) if self.probe_duration => {
                duration::probe_secs(&self.path).map_or_else(Vec::new, |s| vec![s.to_string()])
            }
            Some(Frame::Duration) | None => Vec::new(),
            Some(frame) => read::read_frame(&self.tag, frame),
        }
    }

    fn write_field(
        &mut self,
        field: &Field,
        values: &[String],
        replace: bool,
    ) -> Result<(), TagError> {
        let frame = match frame_for(field.name) {
            Some(Frame::Duration) => {
                return Err(TagError::ReadOnly {
                    path: self.path.clone(),
                    field: field.name,
                });
            }
            Some(frame) => frame,
            None => {
                return Err(TagError::Unmapped {
                    path: self.path.clone(),
                    field: field.name,
                });
            }
        };

        write::write_frame(&mut self.tag, frame, values, replace).map_err(|value| {
            TagError::InvalidValue {
                path: self.path.clone(),
                field: field.name,
                value,
            }
        })
    }

    fn save(&mut self) -> Result<(), TagError> {
        self.tag
            .write_to_path(&self.path, Version::Id3v24)
            .map_err(|e| TagError::Save {
                path: self.path.clone(),
                source: e,
            })
    }
}
